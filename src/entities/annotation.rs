//! Annotations: shapes bound to one frame or to all frames of a clip.
//!
//! The list is owned by the timeline player. Per-frame and all-frames
//! annotations are mutually exclusive at a given time; asking for one kind
//! while the other covers the current frame fails without touching the list.
//!
//! Undo works at shape granularity. A finished shape is one undo unit, a
//! cleared frame or a full clear is one unit too. Laser shapes never enter
//! the undo stack since they remove themselves.

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shapes::Shape;
use super::time::RationalTime;
use crate::error::{ViewportError, ViewportResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub time: RationalTime,
    pub all_frames: bool,
    pub shapes: Vec<Shape>,
}

impl Annotation {
    pub fn new(time: RationalTime, all_frames: bool) -> Self {
        Self {
            time,
            all_frames,
            shapes: Vec::new(),
        }
    }

    /// Visible at `time`.
    pub fn covers(&self, time: &RationalTime) -> bool {
        self.all_frames || self.time.same_frame(time)
    }

    fn is_slot(&self, time: &RationalTime, all_frames: bool) -> bool {
        if all_frames {
            self.all_frames
        } else {
            !self.all_frames && self.time.same_frame(time)
        }
    }
}

#[derive(Debug, Clone)]
enum UndoEntry {
    Shape {
        time: RationalTime,
        all_frames: bool,
        shape: Shape,
    },
    ClearFrame(Annotation),
    ClearAll(Vec<Annotation>),
}

/// Annotations of one player with their undo/redo history.
#[derive(Debug, Clone, Default)]
pub struct AnnotationList {
    annotations: Vec<Annotation>,
    undo: Vec<UndoEntry>,
    redo: Vec<UndoEntry>,
}

impl AnnotationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Annotations drawn at `time`: the frame's own and any all-frames one.
    pub fn visible_at<'a>(&'a self, time: &'a RationalTime) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.annotations.iter().filter(move |a| a.covers(time))
    }

    /// Per-frame annotations of neighbouring frames with their ghost alpha.
    ///
    /// Alpha falls off linearly: `1 - |dt| / (window + 1)`.
    pub fn ghosts(&self, time: &RationalTime, previous: i64, next: i64) -> Vec<(&Annotation, f32)> {
        let frame = time.frame();
        self.annotations
            .iter()
            .filter(|a| !a.all_frames)
            .filter_map(|a| {
                let dt = a.time.rescaled_to(time.rate).frame() - frame;
                let window = if dt < 0 { previous } else { next };
                if dt == 0 || dt.abs() > window {
                    return None;
                }
                Some((a, 1.0 - dt.abs() as f32 / (window + 1) as f32))
            })
            .collect()
    }

    fn slot_index(&self, time: &RationalTime, all_frames: bool) -> Option<usize> {
        self.annotations.iter().position(|a| a.is_slot(time, all_frames))
    }

    /// Find or create the annotation for `time`.
    ///
    /// Fails when the other kind of annotation already covers `time`.
    pub fn get_or_create(&mut self, time: RationalTime, all_frames: bool) -> ViewportResult<&mut Annotation> {
        if let Some(i) = self.slot_index(&time, all_frames) {
            return Ok(&mut self.annotations[i]);
        }
        if self.slot_index(&time, !all_frames).is_some() {
            return Err(ViewportError::AnnotationScope {
                frame: time.frame(),
                all_frames,
            });
        }
        debug!("creating annotation at frame {} (all frames: {})", time.frame(), all_frames);
        self.annotations.push(Annotation::new(time, all_frames));
        let last = self.annotations.len() - 1;
        Ok(&mut self.annotations[last])
    }

    /// Start a shape in the annotation for `time`. The shape is live until `end_shape`.
    ///
    /// A laser shape drops the redo history like any other new drawing.
    pub fn begin_shape(&mut self, time: RationalTime, all_frames: bool, shape: Shape) -> ViewportResult<Uuid> {
        let id = shape.id();
        let laser = shape.is_laser();
        self.get_or_create(time, all_frames)?.shapes.push(shape);
        if laser {
            self.redo.clear();
        }
        Ok(id)
    }

    pub fn shape(&self, id: Uuid) -> Option<&Shape> {
        self.annotations.iter().flat_map(|a| a.shapes.iter()).find(|s| s.id() == id)
    }

    pub fn shape_mut(&mut self, id: Uuid) -> Option<&mut Shape> {
        self.annotations
            .iter_mut()
            .flat_map(|a| a.shapes.iter_mut())
            .find(|s| s.id() == id)
    }

    /// Finish a live shape and record it as one undo unit.
    pub fn end_shape(&mut self, id: Uuid) -> bool {
        let Some((time, all_frames, shape)) = self
            .annotations
            .iter()
            .find_map(|a| a.shapes.iter().find(|s| s.id() == id).map(|s| (a.time, a.all_frames, s)))
        else {
            return false;
        };
        if shape.is_laser() {
            return true;
        }
        let shape = shape.clone();
        self.undo.push(UndoEntry::Shape { time, all_frames, shape });
        self.redo.clear();
        true
    }

    /// Remove a shape without recording history (laser fade, cancelled edits).
    ///
    /// Drops the owning annotation when it becomes empty.
    pub fn remove_shape(&mut self, id: Uuid) -> Option<Shape> {
        let ai = self.annotations.iter().position(|a| a.shapes.iter().any(|s| s.id() == id))?;
        let annotation = &mut self.annotations[ai];
        let si = annotation.shapes.iter().position(|s| s.id() == id)?;
        let shape = annotation.shapes.remove(si);
        if annotation.shapes.is_empty() {
            debug!("removing empty annotation at frame {}", annotation.time.frame());
            self.annotations.remove(ai);
        }
        Some(shape)
    }

    /// Remove the annotation visible at `time`. Per-frame annotations win over all-frames.
    pub fn clear_frame(&mut self, time: &RationalTime) -> bool {
        let index = self
            .slot_index(time, false)
            .or_else(|| self.slot_index(time, true));
        let Some(i) = index else {
            return false;
        };
        let annotation = self.annotations.remove(i);
        self.undo.push(UndoEntry::ClearFrame(annotation));
        self.redo.clear();
        true
    }

    pub fn clear_all(&mut self) -> bool {
        if self.annotations.is_empty() {
            return false;
        }
        let all = std::mem::take(&mut self.annotations);
        self.undo.push(UndoEntry::ClearAll(all));
        self.redo.clear();
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.undo.pop() else {
            return false;
        };
        let entry = match entry {
            UndoEntry::Shape { time, all_frames, shape } => {
                // The shape may have been edited after it finished; keep the latest.
                let shape = self.remove_shape(shape.id()).unwrap_or(shape);
                UndoEntry::Shape { time, all_frames, shape }
            }
            UndoEntry::ClearFrame(annotation) => {
                self.restore(annotation.clone());
                UndoEntry::ClearFrame(annotation)
            }
            UndoEntry::ClearAll(all) => {
                for a in all.iter().cloned() {
                    self.restore(a);
                }
                UndoEntry::ClearAll(all)
            }
        };
        self.redo.push(entry);
        true
    }

    /// Other kind of annotation already covers `time`.
    fn blocked(&self, time: &RationalTime, all_frames: bool) -> bool {
        self.slot_index(time, !all_frames).is_some()
    }

    /// Reapply the last undone entry. Leaves the list untouched and keeps the
    /// entry when it would put both kinds of annotation on one frame.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.redo.pop() else {
            return false;
        };
        if let UndoEntry::Shape { time, all_frames, .. } = &entry
            && self.blocked(time, *all_frames)
        {
            debug!("redo blocked at frame {} (all frames: {})", time.frame(), all_frames);
            self.redo.push(entry);
            return false;
        }
        match &entry {
            UndoEntry::Shape { time, all_frames, shape } => {
                match self.slot_index(time, *all_frames) {
                    Some(i) => self.annotations[i].shapes.push(shape.clone()),
                    None => {
                        let mut a = Annotation::new(*time, *all_frames);
                        a.shapes.push(shape.clone());
                        self.annotations.push(a);
                    }
                }
            }
            UndoEntry::ClearFrame(annotation) => {
                if let Some(i) = self.slot_index(&annotation.time, annotation.all_frames) {
                    self.annotations.remove(i);
                }
            }
            UndoEntry::ClearAll(_) => self.annotations.clear(),
        }
        self.undo.push(entry);
        true
    }

    /// Put an annotation back, merging into an existing slot if one was recreated.
    fn restore(&mut self, annotation: Annotation) {
        match self.slot_index(&annotation.time, annotation.all_frames) {
            Some(i) => {
                let existing = &mut self.annotations[i];
                let mut shapes = annotation.shapes;
                shapes.append(&mut existing.shapes);
                existing.shapes = shapes;
            }
            None => self.annotations.push(annotation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::spaces::Color4f;
    use crate::entities::shapes::{ShapeBase, ShapeKind};
    use glam::Vec2;

    fn t(frame: i64) -> RationalTime {
        RationalTime::from_frame(frame, 24.0)
    }

    fn shape(kind: ShapeKind, x: f32) -> Shape {
        Shape::start(kind, ShapeBase::new(Color4f::new(1.0, 0.5, 0.0, 1.0), 3.0), Vec2::new(x, x))
    }

    fn draw(list: &mut AnnotationList, time: RationalTime, all: bool, s: Shape) -> Uuid {
        let id = list.begin_shape(time, all, s).unwrap();
        assert!(list.end_shape(id));
        id
    }

    #[test]
    fn test_undo_redo_symmetry() {
        let mut list = AnnotationList::new();
        let originals: Vec<Shape> = (0..4).map(|i| shape(ShapeKind::Rectangle, i as f32)).collect();
        for s in &originals {
            draw(&mut list, t(10), false, s.clone());
        }
        for _ in 0..4 {
            assert!(list.undo());
        }
        assert!(list.is_empty());
        assert!(!list.undo());

        for _ in 0..4 {
            assert!(list.redo());
        }
        let t10 = t(10);
        let restored: Vec<&Shape> = list.visible_at(&t10).flat_map(|a| a.shapes.iter()).collect();
        assert_eq!(restored.len(), 4);
        for (a, b) in restored.iter().zip(&originals) {
            assert_eq!(*a, b);
        }
        assert!(!list.can_redo());
    }

    #[test]
    fn test_all_frames_blocked_by_frame_annotation() {
        let mut list = AnnotationList::new();
        draw(&mut list, t(5), false, shape(ShapeKind::Path, 0.0));
        let before = list.annotations.clone();

        let err = list.begin_shape(t(5), true, shape(ShapeKind::Path, 1.0));
        assert!(matches!(err, Err(ViewportError::AnnotationScope { frame: 5, all_frames: true })));
        assert_eq!(list.annotations, before);
    }

    #[test]
    fn test_frame_blocked_by_all_frames_annotation() {
        let mut list = AnnotationList::new();
        draw(&mut list, t(1), true, shape(ShapeKind::Path, 0.0));
        assert!(list.begin_shape(t(30), false, shape(ShapeKind::Path, 1.0)).is_err());
        // all-frames slot is reused at any time
        assert!(list.begin_shape(t(30), true, shape(ShapeKind::Path, 1.0)).is_ok());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_new_shape_clears_redo() {
        let mut list = AnnotationList::new();
        draw(&mut list, t(0), false, shape(ShapeKind::Path, 0.0));
        list.undo();
        assert!(list.can_redo());
        draw(&mut list, t(0), false, shape(ShapeKind::Path, 1.0));
        assert!(!list.can_redo());
    }

    #[test]
    fn test_laser_shape_skips_history() {
        let mut list = AnnotationList::new();
        let mut s = shape(ShapeKind::Path, 0.0);
        s.base_mut().laser = true;
        let id = draw(&mut list, t(0), false, s);
        assert!(!list.can_undo());
        assert!(list.remove_shape(id).is_some());
        assert!(list.is_empty());
    }

    fn per_frame_and_all_frames(list: &AnnotationList, time: &RationalTime) -> (usize, usize) {
        let frame = list.visible_at(time).filter(|a| !a.all_frames).count();
        let all = list.visible_at(time).filter(|a| a.all_frames).count();
        (frame, all)
    }

    #[test]
    fn test_laser_after_undo_keeps_scopes_exclusive() {
        let mut list = AnnotationList::new();
        draw(&mut list, t(5), false, shape(ShapeKind::Path, 0.0));
        assert!(list.undo());
        assert!(list.can_redo());

        let mut laser = shape(ShapeKind::Path, 1.0);
        laser.base_mut().laser = true;
        draw(&mut list, t(5), true, laser);
        assert!(!list.can_redo());
        assert!(!list.redo());
        assert_eq!(per_frame_and_all_frames(&list, &t(5)), (0, 1));
    }

    #[test]
    fn test_redo_blocked_by_other_scope() {
        let mut list = AnnotationList::new();
        draw(&mut list, t(5), false, shape(ShapeKind::Path, 0.0));
        assert!(list.undo());

        // a collaborator fills the all-frames slot without touching history
        list.get_or_create(t(5), true)
            .expect("slot")
            .shapes
            .push(shape(ShapeKind::Circle, 2.0));
        let before = list.annotations.clone();

        assert!(!list.redo());
        assert_eq!(list.annotations, before);
        assert!(list.can_redo());
        assert_eq!(per_frame_and_all_frames(&list, &t(5)), (0, 1));
    }

    #[test]
    fn test_clear_frame_undoable() {
        let mut list = AnnotationList::new();
        draw(&mut list, t(2), false, shape(ShapeKind::Circle, 0.0));
        draw(&mut list, t(3), false, shape(ShapeKind::Circle, 0.0));
        assert!(list.clear_frame(&t(2)));
        assert_eq!(list.len(), 1);
        assert!(list.undo());
        assert_eq!(list.len(), 2);
        assert!(list.redo());
        assert_eq!(list.len(), 1);
        assert!(list.clear_all());
        assert!(list.is_empty());
        assert!(list.undo());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_ghost_alpha() {
        let mut list = AnnotationList::new();
        draw(&mut list, t(8), false, shape(ShapeKind::Path, 0.0));
        draw(&mut list, t(12), false, shape(ShapeKind::Path, 0.0));
        draw(&mut list, t(20), false, shape(ShapeKind::Path, 0.0));
        let ghosts = list.ghosts(&t(10), 3, 3);
        assert_eq!(ghosts.len(), 2);
        for (_, alpha) in ghosts {
            assert!((alpha - 0.5).abs() < 1e-6);
        }
    }
}
