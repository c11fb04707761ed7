//! Network mirror: replicates interactive viewport state to observers.
//!
//! Each message is a command name plus a JSON value. Live strokes send a
//! small "Add Shape Point" per pointer move; full shapes travel only on
//! create, update and end.

use std::sync::{Arc, Mutex};

use glam::Vec2;
use log::trace;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::shapes::Shape;
use crate::entities::space::Box2i;
use crate::entities::time::RationalTime;

pub const ADD_SHAPE_POINT: &str = "Add Shape Point";
pub const CREATE_SHAPE: &str = "Create Shape";
pub const UPDATE_SHAPE: &str = "Update Shape";
pub const END_SHAPE: &str = "End Shape";
pub const LASER_FADE: &str = "Laser Fade";
pub const SELECTION_AREA: &str = "Selection Area";
pub const VIEW_POS_AND_ZOOM: &str = "viewPosAndZoom";
pub const SET_OCIO_OPTIONS: &str = "setOCIOOptions";
pub const CLEAR_FRAME_ANNOTATIONS: &str = "Clear Frame Annotations";
pub const CLEAR_ALL_ANNOTATIONS: &str = "Clear All Annotations";
pub const UNDO_ANNOTATION: &str = "Undo Annotation";
pub const REDO_ANNOTATION: &str = "Redo Annotation";

/// Push-only sink for mirrored commands.
pub trait NetworkMirror: Send + Sync {
    fn push(&self, command: &str, value: serde_json::Value);

    /// Serialize `payload` and push it. Serialization failures are logged and dropped.
    fn send<T: Serialize>(&self, command: &str, payload: &T)
    where
        Self: Sized,
    {
        send_dyn(self, command, payload);
    }
}

/// `send` for trait objects.
pub fn send_dyn<T: Serialize>(mirror: &dyn NetworkMirror, command: &str, payload: &T) {
    match serde_json::to_value(payload) {
        Ok(value) => mirror.push(command, value),
        Err(e) => log::warn!("network mirror: cannot serialize {}: {}", command, e),
    }
}

/// Mirror that drops everything (no collaborative session).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMirror;

impl NetworkMirror for NullMirror {
    fn push(&self, command: &str, _value: serde_json::Value) {
        trace!("network mirror (offline): {}", command);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMessage {
    pub command: String,
    pub value: serde_json::Value,
}

/// Mirror that queues messages for a transport to flush.
#[derive(Debug, Default, Clone)]
pub struct QueueMirror {
    queue: Arc<Mutex<Vec<NetworkMessage>>>,
}

impl QueueMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<NetworkMessage> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Command names currently queued, oldest first.
    pub fn commands(&self) -> Vec<String> {
        self.queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|m| m.command.clone())
            .collect()
    }
}

impl NetworkMirror for QueueMirror {
    fn push(&self, command: &str, value: serde_json::Value) {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).push(NetworkMessage {
            command: command.to_string(),
            value,
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapePoint {
    pub id: Uuid,
    pub point: Vec2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeMessage {
    pub time: RationalTime,
    pub all_frames: bool,
    pub shape: Shape,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaserFadeMessage {
    pub id: Uuid,
    pub fade: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewPosAndZoom {
    pub pos: Vec2,
    pub zoom: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionArea {
    pub area: Box2i,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_mirror_records() {
        let mirror = QueueMirror::new();
        mirror.send(VIEW_POS_AND_ZOOM, &ViewPosAndZoom { pos: Vec2::new(1.0, 2.0), zoom: 3.0 });
        let dynamic: &dyn NetworkMirror = &mirror;
        send_dyn(dynamic, SELECTION_AREA, &SelectionArea { area: Box2i::NONE });

        assert_eq!(mirror.commands(), vec![VIEW_POS_AND_ZOOM, SELECTION_AREA]);
        let msgs = mirror.drain();
        assert_eq!(msgs[0].value["zoom"], 3.0);
        assert!(mirror.drain().is_empty());
    }
}
