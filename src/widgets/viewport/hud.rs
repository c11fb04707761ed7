//! Heads-up display text.
//!
//! Each line is toggled by one bit of the `hud` setting.

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::entities::frame::MediaInfo;
use crate::entities::time::{RationalTime, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HudFlags(pub u32);

impl HudFlags {
    pub const NONE: HudFlags = HudFlags(0);
    pub const DIRECTORY: HudFlags = HudFlags(1 << 0);
    pub const FILENAME: HudFlags = HudFlags(1 << 1);
    pub const RESOLUTION: HudFlags = HudFlags(1 << 2);
    pub const FRAME_RANGE: HudFlags = HudFlags(1 << 3);
    pub const FRAME_COUNT: HudFlags = HudFlags(1 << 4);
    pub const FRAME: HudFlags = HudFlags(1 << 5);
    pub const TIMECODE: HudFlags = HudFlags(1 << 6);
    pub const FPS: HudFlags = HudFlags(1 << 7);
    pub const ATTRIBUTES: HudFlags = HudFlags(1 << 8);
    pub const ALL: HudFlags = HudFlags((1 << 9) - 1);

    pub fn contains(&self, other: HudFlags) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn toggle(&mut self, other: HudFlags) {
        self.0 ^= other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for HudFlags {
    type Output = HudFlags;
    fn bitor(self, rhs: HudFlags) -> HudFlags {
        HudFlags(self.0 | rhs.0)
    }
}

/// Values the HUD can show.
pub struct HudInput<'a> {
    pub media: &'a MediaInfo,
    pub render_size: UVec2,
    pub time: RationalTime,
    pub range: TimeRange,
    /// Measured playback rate, when playing.
    pub actual_fps: Option<f64>,
}

/// HUD lines in display order, top-left first.
pub fn lines(flags: HudFlags, input: &HudInput<'_>) -> Vec<String> {
    let mut out = Vec::new();
    if flags.is_empty() {
        return out;
    }
    let path = input.media.path.as_deref();

    if flags.contains(HudFlags::DIRECTORY)
        && let Some(dir) = path.and_then(|p| p.parent())
    {
        out.push(dir.display().to_string());
    }
    if flags.contains(HudFlags::FILENAME)
        && let Some(name) = path.and_then(|p| p.file_name())
    {
        out.push(name.to_string_lossy().into_owned());
    }
    if flags.contains(HudFlags::RESOLUTION) && input.render_size.x > 0 {
        out.push(format!("{} x {}", input.render_size.x, input.render_size.y));
    }

    let mut row = Vec::new();
    if flags.contains(HudFlags::FRAME) {
        row.push(format!("F: {}", input.time.frame()));
    }
    if flags.contains(HudFlags::FRAME_RANGE) {
        row.push(format!("Range: {} - {}", input.range.first_frame(), input.range.last_frame()));
    }
    if flags.contains(HudFlags::FRAME_COUNT) {
        row.push(format!("FC: {}", input.range.frame_count()));
    }
    if flags.contains(HudFlags::TIMECODE) {
        row.push(format!("TC: {}", input.time.to_timecode()));
    }
    if flags.contains(HudFlags::FPS) {
        let fps = input.actual_fps.unwrap_or(input.time.rate);
        row.push(format!("FPS: {:.2}", fps));
    }
    if !row.is_empty() {
        out.push(row.join("  "));
    }

    if flags.contains(HudFlags::ATTRIBUTES) {
        for (key, value) in &input.media.tags {
            out.push(format!("{key} = {value}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_lines_follow_flags() {
        let mut media = MediaInfo {
            path: Some(PathBuf::from("/shots/sq010/plate.0001.exr")),
            ..Default::default()
        };
        media.tags.insert("camera".into(), "A".into());
        let input = HudInput {
            media: &media,
            render_size: UVec2::new(1920, 1080),
            time: RationalTime::from_frame(25, 24.0),
            range: TimeRange::from_frames(1, 100, 24.0),
            actual_fps: None,
        };

        assert!(lines(HudFlags::NONE, &input).is_empty());
        let l = lines(HudFlags::FILENAME | HudFlags::RESOLUTION, &input);
        assert_eq!(l, vec!["plate.0001.exr".to_string(), "1920 x 1080".to_string()]);

        let l = lines(HudFlags::FRAME | HudFlags::TIMECODE, &input);
        assert_eq!(l, vec!["F: 25  TC: 00:00:01:01".to_string()]);

        let l = lines(HudFlags::ATTRIBUTES, &input);
        assert_eq!(l, vec!["camera = A".to_string()]);
    }

    #[test]
    fn test_toggle() {
        let mut f = HudFlags::NONE;
        f.toggle(HudFlags::FPS);
        assert!(f.contains(HudFlags::FPS));
        f.toggle(HudFlags::FPS);
        assert!(f.is_empty());
        assert!(HudFlags::ALL.contains(HudFlags::ATTRIBUTES));
    }
}
