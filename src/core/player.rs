//! Timeline player seen from the viewport.
//!
//! **Architecture**: The player owns playback state, the current decoded
//! video and the annotation list. Viewports borrow it mutably per event and
//! never keep references across events.
//!
//! # Timing Model
//!
//! FPS-based: every frame lasts `1 / rate` seconds. `update(dt)` accumulates
//! host time and advances whole frames, looping or stopping at the range ends.

use log::{info, trace};
use serde::{Deserialize, Serialize};

use crate::entities::annotation::AnnotationList;
use crate::entities::frame::{MediaInfo, VideoData};
use crate::entities::time::{RationalTime, TimeRange};

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Playback {
    #[default]
    Stop,
    Forward,
    Reverse,
}

/// Playback state manager holding the frames and annotations the viewport draws.
#[derive(Debug, Clone)]
pub struct Player {
    range: TimeRange,
    current: RationalTime,
    playback: Playback,
    pub loop_enabled: bool,
    pub has_audio: bool,
    annotations: AnnotationList,
    video: Vec<VideoData>,
    pub media: MediaInfo,
    elapsed: f64,
}

impl Player {
    pub fn new(range: TimeRange) -> Self {
        info!(
            "Player initialized: frames {}..{} @ {} fps",
            range.first_frame(),
            range.last_frame(),
            range.start.rate
        );
        Self {
            current: range.start,
            range,
            playback: Playback::Stop,
            loop_enabled: true,
            has_audio: false,
            annotations: AnnotationList::new(),
            video: Vec::new(),
            media: MediaInfo::default(),
            elapsed: 0.0,
        }
    }

    pub fn range(&self) -> TimeRange {
        self.range
    }

    pub fn rate(&self) -> f64 {
        self.range.start.rate
    }

    /// Duration of one frame in seconds.
    pub fn frame_interval(&self) -> f64 {
        if self.rate() > 0.0 { 1.0 / self.rate() } else { 0.0 }
    }

    pub fn current_time(&self) -> RationalTime {
        self.current
    }

    pub fn current_frame(&self) -> i64 {
        self.current.frame()
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn is_stopped(&self) -> bool {
        self.playback == Playback::Stop
    }

    pub fn set_playback(&mut self, playback: Playback) {
        if self.playback != playback {
            trace!("Playback {:?} -> {:?}", self.playback, playback);
            self.playback = playback;
            self.elapsed = 0.0;
        }
    }

    pub fn stop(&mut self) {
        self.set_playback(Playback::Stop);
    }

    /// Play/Pause toggle.
    pub fn toggle_playback(&mut self) {
        let next = if self.is_stopped() { Playback::Forward } else { Playback::Stop };
        self.set_playback(next);
    }

    /// Seek to `time`, clamped to the range.
    pub fn seek(&mut self, time: RationalTime) {
        let frame = time
            .rescaled_to(self.rate())
            .frame()
            .clamp(self.range.first_frame(), self.range.last_frame().max(self.range.first_frame()));
        self.current = RationalTime::from_frame(frame, self.rate());
    }

    pub fn seek_frame(&mut self, frame: i64) {
        self.seek(RationalTime::from_frame(frame, self.rate()));
    }

    pub fn to_start(&mut self) {
        self.seek_frame(self.range.first_frame());
    }

    pub fn to_end(&mut self) {
        self.seek_frame(self.range.last_frame());
    }

    /// Step by `count` frames, wrapping when looping.
    pub fn step(&mut self, count: i64) {
        if count == 0 {
            return;
        }
        let start = self.range.first_frame();
        let end = self.range.last_frame();
        let size = end - start + 1;
        if size <= 0 {
            return;
        }
        let target = self.current_frame().saturating_add(count);
        let frame = if self.loop_enabled {
            start + (target - start).rem_euclid(size)
        } else {
            target.clamp(start, end)
        };
        self.current = RationalTime::from_frame(frame, self.rate());
    }

    /// Advance playback by `dt` seconds. Returns true when the frame changed.
    pub fn update(&mut self, dt: f64) -> bool {
        let direction = match self.playback {
            Playback::Stop => return false,
            Playback::Forward => 1,
            Playback::Reverse => -1,
        };
        let interval = self.frame_interval();
        if interval <= 0.0 {
            return false;
        }
        self.elapsed += dt;
        let frames = (self.elapsed / interval).floor() as i64;
        if frames == 0 {
            return false;
        }
        self.elapsed -= frames as f64 * interval;

        let before = self.current_frame();
        let target = before + direction * frames;
        if !self.loop_enabled && (target > self.range.last_frame() || target < self.range.first_frame()) {
            trace!("Reached play range end, stopping");
            self.seek_frame(target);
            self.stop();
        } else {
            self.step(direction * frames);
        }
        self.current_frame() != before
    }

    pub fn annotations(&self) -> &AnnotationList {
        &self.annotations
    }

    pub fn annotations_mut(&mut self) -> &mut AnnotationList {
        &mut self.annotations
    }

    /// Decoded video for the current time, one entry per compared source.
    pub fn current_video(&self) -> &[VideoData] {
        &self.video
    }

    pub fn set_video(&mut self, video: Vec<VideoData>) {
        self.video = video;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(TimeRange::from_frames(0, 9, 24.0))
    }

    #[test]
    fn test_step_wraps_when_looping() {
        let mut p = player();
        p.step(-1);
        assert_eq!(p.current_frame(), 9);
        p.step(3);
        assert_eq!(p.current_frame(), 2);
    }

    #[test]
    fn test_step_clamps_without_loop() {
        let mut p = player();
        p.loop_enabled = false;
        p.step(25);
        assert_eq!(p.current_frame(), 9);
        p.step(-100);
        assert_eq!(p.current_frame(), 0);
    }

    #[test]
    fn test_update_advances_whole_frames() {
        let mut p = player();
        p.set_playback(Playback::Forward);
        assert!(!p.update(0.5 / 24.0));
        assert!(p.update(0.6 / 24.0));
        assert_eq!(p.current_frame(), 1);
        p.set_playback(Playback::Reverse);
        assert!(p.update(2.0 / 24.0));
        assert_eq!(p.current_frame(), 9);
    }

    #[test]
    fn test_update_stops_at_end_without_loop() {
        let mut p = player();
        p.loop_enabled = false;
        p.seek_frame(9);
        p.set_playback(Playback::Forward);
        p.update(1.0);
        assert!(p.is_stopped());
        assert_eq!(p.current_frame(), 9);
    }

    #[test]
    fn test_seek_clamps() {
        let mut p = player();
        p.seek_frame(42);
        assert_eq!(p.current_frame(), 9);
    }
}
