//! Entities - plain data shared by the player and the viewport
//!
//! Attributes, time, raster geometry, decoded frames, annotation shapes.

pub mod annotation;
pub mod attrs;
pub mod frame;
pub mod loader;
pub mod shapes;
pub mod space;
pub mod time;

pub use annotation::{Annotation, AnnotationList};
pub use attrs::{AttrValue, Attrs};
pub use frame::{Image, PixelBuffer, PixelType, VideoData, VideoLayer};
pub use shapes::{Shape, ShapeBase, ShapeKind};
pub use space::{Box2f, Box2i};
pub use time::{RationalTime, TimeRange};
