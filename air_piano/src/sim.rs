//! Simulation mode: synthetic cameras and a mouse-driven hand.
//!
//! The visualizer writes the mouse state over the "Top View" window into a
//! shared [`Pointer`]; two [`PointerDetector`]s (one per view) turn that into
//! a single hand each frame.
//!
//! * Top view: the index fingertip sits under the cursor, the other tips fan
//!   out beside it and a little higher.
//! * Front view: every tip rests above the push threshold; holding the left
//!   mouse button drops the index tip well below it.
//!
//! So hovering over the key area and clicking plays the key under the cursor,
//! and dragging while held slides the finger across keys.

use std::cell::Cell;
use std::rc::Rc;

use air_keys::{Finger, Frame, FrameSource, Hand, HandDetector, NormPoint};

/// Mouse state in frame pixels, as last seen over the top-view window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pointer {
    /// `None` while the cursor is outside the window.
    pub at:      Option<(f32, f32)>,
    pub pressed: bool,
}

pub type SharedPointer = Rc<Cell<Pointer>>;

/// Front-view `y` (normalised) of a resting / pushed fingertip.
const REST_DEPTH:   f64 = 0.45;
const PUSHED_DEPTH: f64 = 0.80;

/// Horizontal offsets (pixels) of each tip from the index finger.
const TIP_SPREAD: [f64; 5] = [-60.0, 0.0, 30.0, 60.0, 90.0];
/// Vertical offsets (pixels); non-index tips sit higher, outside a press.
const TIP_LIFT:   [f64; 5] = [ 40.0, 0.0, -120.0, -110.0, -90.0];

// ════════════════════════════════════════════════════════════════════════════
// SimCamera
// ════════════════════════════════════════════════════════════════════════════

/// Produces a plain frame on every read, forever.
pub struct SimCamera {
    name:   String,
    width:  u32,
    height: u32,
    color:  [u8; 3],
}

impl SimCamera {
    pub fn new(name: &str, width: u32, height: u32, color: [u8; 3]) -> Self {
        SimCamera { name: name.to_string(), width, height, color }
    }
}

impl FrameSource for SimCamera {
    fn name(&self) -> &str { &self.name }

    fn read(&mut self) -> Option<Frame> {
        Some(Frame::solid(self.width, self.height, self.color))
    }

    fn release(&mut self) {
        log::debug!("released {}", self.name);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PointerDetector
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimView { Top, Front }

pub struct PointerDetector {
    view:    SimView,
    pointer: SharedPointer,
    width:   f64,
    height:  f64,
}

impl PointerDetector {
    pub fn new(view: SimView, pointer: SharedPointer, width: u32, height: u32) -> Self {
        PointerDetector { view, pointer, width: width as f64, height: height as f64 }
    }

    fn hand_for(&self, p: Pointer) -> Option<Hand> {
        let (px, py) = p.at.map(|(x, y)| (x as f64, y as f64))?;
        let mut tips = [NormPoint::default(); 5];
        for finger in Finger::ALL {
            let i = finger.ordinal();
            let x = (px + TIP_SPREAD[i]) / self.width;
            let y = match self.view {
                SimView::Top => (py + TIP_LIFT[i]) / self.height,
                SimView::Front if finger == Finger::Index && p.pressed => PUSHED_DEPTH,
                SimView::Front => REST_DEPTH,
            };
            tips[i] = NormPoint::new(x, y);
        }
        Some(Hand::new(tips))
    }
}

impl HandDetector for PointerDetector {
    fn detect(&mut self, _frame: &Frame) -> air_keys::Result<Vec<Hand>> {
        Ok(self.hand_for(self.pointer.get()).into_iter().collect())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
