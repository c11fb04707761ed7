//! Shared shell for the standalone viewport binary.
//!
//! Logger setup plus [`Clip`], the decoded frames a [`Player`] plays through.

use std::path::Path;
use std::sync::Arc;

use glam::UVec2;
use log::{info, warn};
use rayon::prelude::*;

use crate::core::player::Player;
use crate::entities::frame::{Image, MediaInfo, VideoData};
use crate::entities::loader::{sequence_frames, Loader};
use crate::entities::time::TimeRange;
use crate::error::{ViewportError, ViewportResult};

/// Initialize logging for standalone binaries. `RUST_LOG` wins over `default_filter`.
pub fn init_logger(default_filter: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

/// Decoded frames starting at `first`.
pub struct Clip {
    frames: Vec<Arc<Image>>,
    first: i64,
    pub media: MediaInfo,
}

impl Clip {
    /// Load every frame of the sequence `path` belongs to.
    pub fn open(path: &Path) -> ViewportResult<Self> {
        let files = sequence_frames(path)?;
        let first = files.first().map(|(n, _)| *n).unwrap_or(0);
        info!("Loading {} frame(s) from {}", files.len(), path.display());

        let frames = files
            .par_iter()
            .map(|(_, p)| Loader::load(p).map(Arc::new))
            .collect::<ViewportResult<Vec<_>>>()?;

        let mut media = MediaInfo {
            path: Some(path.to_path_buf()),
            ..Default::default()
        };
        match Loader::header(path) {
            Ok(tags) => media.tags = tags,
            Err(e) => warn!("No header for {}: {}", path.display(), e),
        }
        if let Some(last) = files.last() {
            media.tags.insert("frames".to_string(), format!("{}-{}", first, last.0));
        }
        Ok(Self { frames, first, media })
    }

    /// Color bars with a bar sweeping across them, one position per frame.
    pub fn test_pattern(size: UVec2, frames: usize) -> ViewportResult<Self> {
        const BARS: [[f32; 3]; 7] = [
            [0.75, 0.75, 0.75],
            [0.75, 0.75, 0.0],
            [0.0, 0.75, 0.75],
            [0.0, 0.75, 0.0],
            [0.75, 0.0, 0.75],
            [0.75, 0.0, 0.0],
            [0.0, 0.0, 0.75],
        ];
        if size.x == 0 || size.y == 0 || frames == 0 {
            return Err(ViewportError::NotReady("empty test pattern"));
        }
        let (w, h) = (size.x as usize, size.y as usize);
        let images = (0..frames)
            .into_par_iter()
            .map(|frame| {
                let sweep = frame * w / frames;
                let mut data = vec![0.0f32; w * h * 4];
                for (i, px) in data.chunks_exact_mut(4).enumerate() {
                    let x = i % w;
                    let y = i / w;
                    let rgb = if x.abs_diff(sweep) < 2 {
                        [1.0; 3]
                    } else if y > h * 3 / 4 {
                        let v = x as f32 / w as f32;
                        [v; 3]
                    } else {
                        BARS[x * BARS.len() / w]
                    };
                    px.copy_from_slice(&[rgb[0], rgb[1], rgb[2], 1.0]);
                }
                Image::from_rgba_f32(size, data).map(Arc::new)
            })
            .collect::<ViewportResult<Vec<_>>>()?;

        let mut media = MediaInfo::default();
        media.tags.insert("format".to_string(), "test pattern".to_string());
        media.tags.insert("size".to_string(), format!("{}x{}", size.x, size.y));
        Ok(Self {
            frames: images,
            first: 0,
            media,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn range(&self, rate: f64) -> TimeRange {
        TimeRange::from_frames(self.first, self.first + self.frames.len() as i64 - 1, rate)
    }

    /// New player over this clip, showing the first frame.
    pub fn player(&self, rate: f64) -> Player {
        let mut player = Player::new(self.range(rate));
        player.media = self.media.clone();
        self.sync(&mut player);
        player
    }

    /// Image shown at `frame`, clamped to the clip.
    pub fn image(&self, frame: i64) -> Option<&Arc<Image>> {
        let last = self.frames.len().checked_sub(1)?;
        let index = (frame - self.first).clamp(0, last as i64) as usize;
        self.frames.get(index)
    }

    /// Hand the player the video for its current time. Returns true when it changed.
    pub fn sync(&self, player: &mut Player) -> bool {
        let time = player.current_time();
        if player.current_video().first().is_some_and(|v| v.time.same_frame(&time)) {
            return false;
        }
        let Some(image) = self.image(time.frame()) else {
            return false;
        };
        player.set_video(vec![VideoData::new(time, Arc::clone(image))]);
        true
    }
}

impl std::fmt::Debug for Clip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clip")
            .field("frames", &self.frames.len())
            .field("first", &self.first)
            .field("media", &self.media.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_sweeps_and_syncs() {
        let clip = Clip::test_pattern(UVec2::new(70, 8), 10).expect("pattern");
        assert_eq!(clip.len(), 10);

        let a = clip.image(0).expect("frame 0").sample(0, 0);
        let b = clip.image(5).expect("frame 5").sample(35, 0);
        assert!((a.r - 1.0).abs() < 1e-6, "sweep starts at column 0");
        assert!((b.g - 1.0).abs() < 1e-6, "sweep reaches the middle");
        assert!((clip.image(5).expect("frame 5").sample(0, 0).r - 0.75).abs() < 1e-6);

        let mut player = clip.player(24.0);
        assert_eq!(player.current_video().len(), 1);
        assert!(!clip.sync(&mut player), "already in sync");

        player.step(3);
        assert!(clip.sync(&mut player));
        assert_eq!(player.current_video()[0].time.frame(), 3);
        assert!(clip.image(99).is_some(), "clamped past the end");
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert!(Clip::test_pattern(UVec2::ZERO, 4).is_err());
        assert!(Clip::test_pattern(UVec2::new(4, 4), 0).is_err());
    }

    #[test]
    fn test_open_png_sequence() {
        let dir = std::env::temp_dir().join(format!("mrv_clip_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        for frame in 10..13 {
            let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 255, 0, 255]));
            img.save(dir.join(format!("plate.{frame:03}.png"))).expect("save");
        }

        let clip = Clip::open(&dir.join("plate.011.png")).expect("open");
        assert_eq!(clip.len(), 3);
        assert_eq!(clip.media.tags.get("frames").map(String::as_str), Some("10-12"));
        assert_eq!(clip.range(24.0).first_frame(), 10);

        let player = clip.player(24.0);
        assert_eq!(player.current_frame(), 10);
        assert_eq!(player.current_video()[0].size, UVec2::new(2, 2));
        std::fs::remove_dir_all(&dir).ok();
    }
}
