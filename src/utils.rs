//! Utility functions and constants
//!
//! **Why**: Centralized helpers used across multiple modules
//!
//! **Used by**: viewport drag-and-drop, the viewport binary

pub mod sequences;

/// Media file type detection
pub mod media {
    use std::path::Path;

    /// Movie containers
    pub const VIDEO_EXTS: &[&str] = &["mp4", "mov", "avi", "mkv", "m4v", "mxf", "webm", "wmv", "mpg", "mpeg", "gif"];

    /// Still formats, usually numbered into sequences
    pub const IMAGE_EXTS: &[&str] = &[
        "exr", "png", "jpg", "jpeg", "tif", "tiff", "tga", "hdr", "dpx", "cin", "bmp", "psd", "sxr",
    ];

    /// Audio tracks
    pub const AUDIO_EXTS: &[&str] = &["wav", "mp3", "aac", "flac", "ogg", "aiff", "m4a"];

    fn has_ext(path: &Path, exts: &[&str]) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .map(|s| exts.contains(&s.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Check if file is a movie format
    pub fn is_video(path: &Path) -> bool {
        has_ext(path, VIDEO_EXTS)
    }

    /// Check if file is an image format
    pub fn is_image(path: &Path) -> bool {
        has_ext(path, IMAGE_EXTS)
    }

    pub fn is_audio(path: &Path) -> bool {
        has_ext(path, AUDIO_EXTS)
    }

    /// Anything the player can open
    pub fn is_media(path: &Path) -> bool {
        is_video(path) || is_image(path) || is_audio(path)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_case_insensitive() {
            assert!(is_video(Path::new("/a/b.MOV")));
            assert!(is_image(Path::new("plate.0001.Exr")));
            assert!(is_audio(Path::new("mix.wav")));
            assert!(!is_media(Path::new("notes.txt")));
            assert!(!is_media(Path::new("no_extension")));
        }
    }
}
