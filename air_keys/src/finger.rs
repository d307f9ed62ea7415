//! Fingertips: identifiers, detector hands, and per-view pixel snapshots.
//!
//! A [`FingerId`] is rebuilt every frame from the detector's hand ordering.
//! If the detector swaps hands between frames, the same physical finger gets a
//! different id; nothing here tries to stabilise that.

use std::collections::BTreeMap;
use std::fmt;

// ════════════════════════════════════════════════════════════════════════════
// Finger
// ════════════════════════════════════════════════════════════════════════════

/// The five canonical fingertips of one hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb, Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky,
    ];

    /// Index of this fingertip in the 21-point hand landmark model.
    pub fn landmark(self) -> usize {
        match self {
            Finger::Thumb  => 4,
            Finger::Index  => 8,
            Finger::Middle => 12,
            Finger::Ring   => 16,
            Finger::Pinky  => 20,
        }
    }

    /// Position in [`Finger::ALL`].
    pub fn ordinal(self) -> usize { self as usize }

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb  => "thumb",
            Finger::Index  => "index",
            Finger::Middle => "middle",
            Finger::Ring   => "ring",
            Finger::Pinky  => "pinky",
        }
    }
}

/// Per-frame fingertip identifier: `(hand position in detector output, finger)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FingerId {
    pub hand:   usize,
    pub finger: Finger,
}

impl FingerId {
    pub fn new(hand: usize, finger: Finger) -> Self {
        FingerId { hand, finger }
    }
}

impl fmt::Display for FingerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hand{}/{}", self.hand, self.finger.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hand: detector output
// ════════════════════════════════════════════════════════════════════════════

/// A point in normalised image coordinates, `[0,1] × [0,1]` when on-frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormPoint {
    pub x: f64,
    pub y: f64,
}

impl NormPoint {
    pub fn new(x: f64, y: f64) -> Self { NormPoint { x, y } }
}

/// One detected hand, reduced to its five fingertips.
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    pub tips: [NormPoint; 5],
}

impl Hand {
    pub fn new(tips: [NormPoint; 5]) -> Self { Hand { tips } }

    /// Pick the fingertips out of a full landmark list.
    ///
    /// Returns `None` when the list is too short to contain the pinky tip.
    pub fn from_landmarks(landmarks: &[NormPoint]) -> Option<Self> {
        let mut tips = [NormPoint::default(); 5];
        for finger in Finger::ALL {
            tips[finger.ordinal()] = *landmarks.get(finger.landmark())?;
        }
        Some(Hand { tips })
    }

    pub fn tip(&self, finger: Finger) -> NormPoint {
        self.tips[finger.ordinal()]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FingerSnapshot
// ════════════════════════════════════════════════════════════════════════════

/// Integer frame-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self { PixelPoint { x, y } }
}

/// All fingertips seen in one view during one frame.
///
/// Replaced wholesale every frame, never merged with the previous one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FingerSnapshot {
    tips: BTreeMap<FingerId, PixelPoint>,
}

impl FingerSnapshot {
    pub fn new() -> Self { Self::default() }

    /// Project detector hands onto a `width × height` pixel grid.
    ///
    /// Coordinates truncate toward zero.  No hands → empty snapshot.
    pub fn from_hands(hands: &[Hand], width: u32, height: u32) -> Self {
        let mut tips = BTreeMap::new();
        for (hand_idx, hand) in hands.iter().enumerate() {
            for finger in Finger::ALL {
                let p = hand.tip(finger);
                let px = PixelPoint::new(
                    (p.x * width  as f64) as i32,
                    (p.y * height as f64) as i32,
                );
                tips.insert(FingerId::new(hand_idx, finger), px);
            }
        }
        FingerSnapshot { tips }
    }

    pub fn get(&self, id: &FingerId) -> Option<PixelPoint> {
        self.tips.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FingerId, &PixelPoint)> {
        self.tips.iter()
    }

    pub fn len(&self)      -> usize { self.tips.len() }
    pub fn is_empty(&self) -> bool  { self.tips.is_empty() }
}

impl FromIterator<(FingerId, PixelPoint)> for FingerSnapshot {
    fn from_iter<I: IntoIterator<Item = (FingerId, PixelPoint)>>(iter: I) -> Self {
        FingerSnapshot { tips: iter.into_iter().collect() }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
