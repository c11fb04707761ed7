//! Timeline scrubbing by horizontal drag.
//!
//! Seek speed follows drag distance: every `sensitivity` pixels of travel
//! since the last seek move one frame, then the press point is rebased to
//! the pointer. With auto-play and audio the drag starts playback in the
//! drag direction instead, and a watchdog stops it when no drag event
//! arrives within a few frame intervals.

use log::trace;

use crate::core::player::{Playback, Player};
use crate::core::settings::Settings;

/// Frame intervals without drag events before auto-play stops.
pub const SCRUB_WATCHDOG_FUZZ: f64 = 2.0;

#[derive(Debug, Clone, Default)]
pub struct Scrubber {
    press_x: Option<f32>,
    /// Seconds left before auto-play stops.
    watchdog: Option<f64>,
}

impl Scrubber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.press_x.is_some()
    }

    pub fn press(&mut self, x: f32) {
        self.press_x = Some(x);
    }

    /// Handle a drag to `x`. Returns the frame delta applied, if any.
    ///
    /// `alt` selects the alternate sensitivity.
    pub fn drag(&mut self, x: f32, alt: bool, settings: &Settings, player: &mut Player) -> Option<i64> {
        let press_x = self.press_x?;
        let scale = if alt {
            settings.scrub_sensitivity_alt()
        } else {
            settings.scrub_sensitivity()
        };
        let dx = (x - press_x) / scale;
        // any drag event keeps a running auto-play alive
        if self.watchdog.is_some() && !player.is_stopped() {
            self.watchdog = Some(player.frame_interval() * SCRUB_WATCHDOG_FUZZ);
        }
        if dx.abs() < 1.0 {
            return None;
        }
        let frames = dx.trunc() as i64;
        self.press_x = Some(x);

        if settings.auto_play_scrub() && player.has_audio {
            let dir = if frames > 0 { Playback::Forward } else { Playback::Reverse };
            player.set_playback(dir);
            self.watchdog = Some(player.frame_interval() * SCRUB_WATCHDOG_FUZZ);
            trace!("scrub auto-play {:?}", dir);
        } else {
            player.seek_frame(player.current_frame() + frames);
            trace!("scrub {} frames -> {}", frames, player.current_frame());
        }
        Some(frames)
    }

    /// Pointer released: stop auto-play started by the drag.
    pub fn release(&mut self, player: Option<&mut Player>) {
        self.press_x = None;
        if self.watchdog.take().is_some()
            && let Some(p) = player
        {
            p.stop();
        }
    }

    /// Advance the watchdog. Firing after playback already stopped is a no-op.
    pub fn tick(&mut self, dt: f64, player: Option<&mut Player>) {
        let Some(left) = self.watchdog.as_mut() else {
            return;
        };
        *left -= dt;
        if *left > 0.0 {
            return;
        }
        self.watchdog = None;
        if let Some(p) = player
            && !p.is_stopped()
        {
            trace!("scrub watchdog: stopping playback");
            p.stop();
        }
    }

    pub fn watchdog_armed(&self) -> bool {
        self.watchdog.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::{AUTO_PLAY_SCRUB, SCRUB_SENSITIVITY};
    use crate::entities::attrs::AttrValue;
    use crate::entities::time::TimeRange;

    fn setup(sensitivity: f32) -> (Settings, Player) {
        let mut s = Settings::new();
        s.set(SCRUB_SENSITIVITY, AttrValue::Float(sensitivity));
        let mut p = Player::new(TimeRange::from_frames(0, 99, 24.0));
        p.seek_frame(50);
        (s, p)
    }

    #[test]
    fn test_threshold_and_rebase() {
        let (s, mut p) = setup(10.0);
        let mut scrub = Scrubber::new();
        scrub.press(100.0);

        // dx = 0.5
        assert_eq!(scrub.drag(105.0, false, &s, &mut p), None);
        assert_eq!(p.current_frame(), 50);

        // dx = 1.2 -> one frame, press rebased to 112
        assert_eq!(scrub.drag(112.0, false, &s, &mut p), Some(1));
        assert_eq!(p.current_frame(), 51);

        // dx = (140 - 112) / 10 = 2.8 -> two frames
        assert_eq!(scrub.drag(140.0, false, &s, &mut p), Some(2));
        assert_eq!(p.current_frame(), 53);

        assert_eq!(scrub.drag(110.0, false, &s, &mut p), Some(-3));
        assert_eq!(p.current_frame(), 50);
    }

    #[test]
    fn test_alt_sensitivity() {
        let (s, mut p) = setup(1.0);
        let mut scrub = Scrubber::new();
        scrub.press(0.0);
        // default alt sensitivity is 25 px per frame
        assert_eq!(scrub.drag(10.0, true, &s, &mut p), None);
        assert_eq!(scrub.drag(30.0, true, &s, &mut p), Some(1));
    }

    #[test]
    fn test_auto_play_watchdog() {
        let (mut s, mut p) = setup(1.0);
        s.set(AUTO_PLAY_SCRUB, AttrValue::Bool(true));
        p.has_audio = true;
        let mut scrub = Scrubber::new();
        scrub.press(0.0);
        scrub.drag(-5.0, false, &s, &mut p);
        assert_eq!(p.playback(), Playback::Reverse);
        assert!(scrub.watchdog_armed());

        scrub.tick(1.0 / 24.0, Some(&mut p));
        assert_eq!(p.playback(), Playback::Reverse);
        scrub.tick(1.5 / 24.0, Some(&mut p));
        assert!(p.is_stopped());
        assert!(!scrub.watchdog_armed());

        // late fire with nothing armed is harmless
        scrub.tick(1.0, Some(&mut p));
        assert!(p.is_stopped());
    }

    #[test]
    fn test_release_stops_auto_play() {
        let (mut s, mut p) = setup(1.0);
        s.set(AUTO_PLAY_SCRUB, AttrValue::Bool(true));
        p.has_audio = true;
        let mut scrub = Scrubber::new();
        scrub.press(0.0);
        scrub.drag(5.0, false, &s, &mut p);
        assert_eq!(p.playback(), Playback::Forward);
        scrub.release(Some(&mut p));
        assert!(p.is_stopped());
        assert!(!scrub.is_active());
    }

    #[test]
    fn test_slow_drag_keeps_auto_play_running() {
        let (mut s, mut p) = setup(10.0);
        s.set(AUTO_PLAY_SCRUB, AttrValue::Bool(true));
        p.has_audio = true;
        let mut scrub = Scrubber::new();
        scrub.press(0.0);
        assert_eq!(scrub.drag(12.0, false, &s, &mut p), Some(1));
        assert_eq!(p.playback(), Playback::Forward);

        // each step stays below one frame of travel but arrives inside the watchdog window
        for i in 1..=6 {
            scrub.tick(1.5 / 24.0, Some(&mut p));
            assert_eq!(scrub.drag(12.0 + i as f32, false, &s, &mut p), None);
            assert_eq!(p.playback(), Playback::Forward, "stopped after slow drag {i}");
        }

        // no more events: the watchdog fires
        scrub.tick(2.5 / 24.0, Some(&mut p));
        assert!(p.is_stopped());
    }
}
