//! Dual-view press detection.
//!
//! The top view picks the key (horizontal position inside the key-area band);
//! the front view decides whether the finger is pushed down (vertical position
//! past the threshold).  A finger seen in only one view never presses.

use std::collections::BTreeMap;

use crate::finger::{FingerId, FingerSnapshot};
use crate::layout::{KeyLayout, Note};

/// Fingers pressing this frame, each with its resolved note.
pub type PressSet = BTreeMap<FingerId, Note>;

/// Fraction of the frame height used as the front-view push threshold.
pub const DEFAULT_PRESS_RATIO: f64 = 0.6;

/// Top-view row where the key-area band starts.
pub const DEFAULT_KEY_AREA_TOP: i32 = 480;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PressDetector {
    layout:          KeyLayout,
    key_area_top:    i32,
    frame_height:    i32,
    press_threshold: i32,
}

impl PressDetector {
    /// `press_threshold = trunc(frame_height × press_ratio)`.
    pub fn new(layout: KeyLayout, key_area_top: i32, frame_height: u32, press_ratio: f64) -> Self {
        PressDetector {
            layout,
            key_area_top,
            frame_height:    frame_height as i32,
            press_threshold: (frame_height as f64 * press_ratio) as i32,
        }
    }

    /// Standard geometry: band `[480, height]`, threshold `0.6 × height`.
    pub fn standard(layout: KeyLayout, frame_height: u32) -> Self {
        Self::new(layout, DEFAULT_KEY_AREA_TOP, frame_height, DEFAULT_PRESS_RATIO)
    }

    pub fn layout(&self)          -> &KeyLayout { &self.layout }
    pub fn key_area_top(&self)    -> i32        { self.key_area_top }
    pub fn frame_height(&self)    -> i32        { self.frame_height }
    pub fn press_threshold(&self) -> i32        { self.press_threshold }

    /// Top-view `y` lies within `[key_area_top, frame_height]`.
    pub fn in_key_area(&self, y: i32) -> bool {
        (self.key_area_top..=self.frame_height).contains(&y)
    }

    /// Front-view `y` is strictly past the push threshold.
    pub fn is_pushed(&self, y: i32) -> bool {
        y > self.press_threshold
    }

    /// Fuse one frame's top and front snapshots into the press set.
    pub fn detect(&self, top: &FingerSnapshot, front: &FingerSnapshot) -> PressSet {
        let mut presses = PressSet::new();
        for (id, at) in top.iter() {
            if !self.in_key_area(at.y) { continue; }
            let Some(note) = self.layout.note_index(at.x) else { continue };
            match front.get(id) {
                Some(depth) if self.is_pushed(depth.y) => {
                    presses.insert(*id, note);
                }
                _ => {}
            }
        }
        presses
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
