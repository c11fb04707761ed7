//! Viewport error type.
//!
//! Only user-input conflicts and backend failures are errors. Missing
//! players, unmapped buffers and empty frames are normal conditions and are
//! handled with `Option` and early returns instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewportError {
    /// An annotation of the other scope already covers the requested slot.
    #[error("{}", scope_message(.frame, .all_frames))]
    AnnotationScope { frame: i64, all_frames: bool },
    #[error("no timeline player")]
    NoPlayer,
    #[error("resource not ready: {0}")]
    NotReady(&'static str),
    #[error("OpenGL error: {0}")]
    Gl(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image decode error: {0}")]
    Decode(String),
    #[error("glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
}

fn scope_message(frame: &i64, all_frames: &bool) -> String {
    if *all_frames {
        format!("Cannot create an all frames annotation here. A current frame annotation already exists at frame {frame}.")
    } else {
        format!("Cannot create a current frame annotation here. An all frames annotation already exists (frame {frame}).")
    }
}

pub type ViewportResult<T> = Result<T, ViewportError>;
