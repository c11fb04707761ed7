//! Image loading for the standalone viewport.
//!
//! Float formats (EXR, HDR) decode to half-float RGBA, everything else to
//! 8-bit RGBA. Numbered stills load as a whole sequence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::UVec2;
use half::f16 as F16;
use log::{debug, warn};

use crate::entities::frame::{Image, PixelBuffer, PixelType};
use crate::error::{ViewportError, ViewportResult};
use crate::utils::sequences::{glob_paths, split_sequence_path};

pub struct Loader;

impl Loader {
    /// Decode one image file.
    pub fn load(path: &Path) -> ViewportResult<Image> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "exr" | "hdr" => Self::load_float(path),
            _ => Self::load_generic(path),
        }
    }

    /// Format tags shown by the HUD attributes line.
    pub fn header(path: &Path) -> ViewportResult<BTreeMap<String, String>> {
        let reader = image::ImageReader::open(path)?
            .with_guessed_format()
            .map_err(|e| ViewportError::Decode(format!("{}: {}", path.display(), e)))?;
        let format = reader.format();
        let (w, h) = reader
            .into_dimensions()
            .map_err(|e| ViewportError::Decode(format!("{}: {}", path.display(), e)))?;

        let mut tags = BTreeMap::new();
        if let Some(format) = format {
            tags.insert("format".to_string(), format!("{:?}", format));
        }
        tags.insert("size".to_string(), format!("{w}x{h}"));
        Ok(tags)
    }

    fn load_float(path: &Path) -> ViewportResult<Image> {
        debug!("Loading float image: {}", path.display());
        let img = image::open(path).map_err(|e| ViewportError::Decode(format!("{}: {}", path.display(), e)))?;
        let size = UVec2::new(img.width(), img.height());
        let buffer = img.to_rgba32f().into_raw().into_iter().map(F16::from_f32).collect();
        Image::new(PixelType::RgbaF16, size, PixelBuffer::F16(buffer))
    }

    fn load_generic(path: &Path) -> ViewportResult<Image> {
        debug!("Loading image: {}", path.display());
        let img = image::open(path).map_err(|e| ViewportError::Decode(format!("{}: {}", path.display(), e)))?;
        let size = UVec2::new(img.width(), img.height());
        Image::new(PixelType::Rgba8, size, PixelBuffer::U8(img.to_rgba8().into_raw()))
    }
}

/// Frames of the sequence `path` belongs to, sorted by frame number.
///
/// A file without a frame number is a one-frame sequence at frame 0.
pub fn sequence_frames(path: &Path) -> ViewportResult<Vec<(i64, PathBuf)>> {
    let Some(seq) = split_sequence_path(path) else {
        return Ok(vec![(0, path.to_path_buf())]);
    };
    let pattern = seq.glob_pattern();
    let mut frames: Vec<(i64, PathBuf)> = glob_paths(&pattern)?
        .into_iter()
        .filter_map(|p| {
            let other = split_sequence_path(&p)?;
            (other.prefix == seq.prefix && other.padding == seq.padding).then_some((other.number as i64, p))
        })
        .collect();
    debug!("{} frame(s) match {}", frames.len(), pattern);
    if frames.is_empty() {
        warn!("No frames found next to {}", path.display());
        frames.push((seq.number as i64, path.to_path_buf()));
    }
    frames.sort();
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_png_sequence_loads_in_order() {
        let dir = std::env::temp_dir().join(format!("mrv_loader_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("mkdir");
        for (frame, value) in [(3, 30u8), (1, 10), (2, 20)] {
            let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([value, 0, 0, 255]));
            img.save(dir.join(format!("shot.{frame:04}.png"))).expect("save");
        }
        fs::write(dir.join("shot.01.png"), b"").expect("write");

        let frames = sequence_frames(&dir.join("shot.0002.png")).expect("frames");
        let numbers: Vec<i64> = frames.iter().map(|(n, _)| *n).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let image = Loader::load(&frames[2].1).expect("load");
        assert_eq!(image.size(), UVec2::new(4, 2));
        assert_eq!(image.pixel_type(), PixelType::Rgba8);
        assert!((image.sample(0, 0).r - 30.0 / 255.0).abs() < 1e-4);

        let tags = Loader::header(&frames[0].1).expect("header");
        assert_eq!(tags.get("size").map(String::as_str), Some("4x2"));

        assert!(Loader::load(&dir.join("shot.01.png")).is_err());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unnumbered_file_is_one_frame() {
        let frames = sequence_frames(Path::new("/tmp/plate.exr")).expect("frames");
        assert_eq!(frames, vec![(0, PathBuf::from("/tmp/plate.exr"))]);
    }
}
