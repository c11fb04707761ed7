//! Pub/Sub event bus between viewports and the rest of the application.
//!
//! Architecture:
//! - Components subscribe to event types with callbacks (immediate invocation)
//! - emit() invokes callbacks immediately AND queues for deferred processing
//! - poll() returns queued events for batch processing in the host loop
//!
//! Viewports publish redraw requests, undo/redo state, pixel and area info,
//! user-visible errors and dropped files here. Callback order is FIFO within
//! one event type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::warn;

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events.
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

pub type BoxedEvent = Box<dyn Event>;

#[derive(Default)]
struct Shared {
    subscribers: RwLock<HashMap<TypeId, Vec<Callback>>>,
    queue: Mutex<Vec<BoxedEvent>>,
}

impl Shared {
    fn publish<E: Event>(&self, event: E) {
        if let Some(cbs) = self
            .subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&TypeId::of::<E>())
        {
            for cb in cbs {
                cb(&event);
            }
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(Box::new(event));
    }
}

/// Pub/Sub bus with deferred processing support.
#[derive(Clone, Default)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type E. The callback runs inside `emit()`.
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapped);
    }

    /// Invoke callbacks and queue the event for `poll()`.
    pub fn emit<E: Event>(&self, event: E) {
        self.shared.publish(event);
    }

    /// All events emitted since the last poll.
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Remove and return queued events of type E, leaving the others queued.
    pub fn take<E: Event + Clone>(&self) -> Vec<E> {
        let mut queue = self.shared.queue.lock().unwrap_or_else(|e| e.into_inner());
        let mut taken = Vec::new();
        queue.retain(|ev| match downcast_event::<E>(ev) {
            Some(e) => {
                taken.push(e.clone());
                false
            }
            None => true,
        });
        taken
    }

    /// Emitter handle for widgets.
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Lightweight emitter handle. Cloned into each viewport.
#[derive(Clone)]
pub struct EventEmitter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("queue_len", &self.shared.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl EventEmitter {
    pub fn emit<E: Event>(&self, event: E) {
        self.shared.publish(event);
    }
}

/// Downcast a queued event.
///
/// Derefs to `dyn Event` first; calling `as_any()` on the box itself would
/// hit the blanket impl for `Box<dyn Event>` and never match.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Clone, Debug)]
    struct TestEvent {
        value: i32,
    }

    #[derive(Clone, Debug)]
    struct OtherEvent;

    #[test]
    fn test_subscribe_emit_immediate() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);
        bus.subscribe::<TestEvent, _>(move |e| {
            c.fetch_add(e.value, Ordering::SeqCst);
        });

        bus.emit(TestEvent { value: 10 });
        bus.emitter().emit(TestEvent { value: 5 });
        assert_eq!(counter.load(Ordering::SeqCst), 15);
        assert_eq!(bus.poll().len(), 2);
        assert_eq!(bus.poll().len(), 0);
    }

    #[test]
    fn test_take_filters_by_type() {
        let bus = EventBus::new();
        bus.emit(TestEvent { value: 1 });
        bus.emit(OtherEvent);
        bus.emit(TestEvent { value: 2 });

        let taken = bus.take::<TestEvent>();
        assert_eq!(taken.iter().map(|e| e.value).collect::<Vec<_>>(), vec![1, 2]);
        let rest = bus.poll();
        assert_eq!(rest.len(), 1);
        assert!(downcast_event::<OtherEvent>(&rest[0]).is_some());
    }
}
