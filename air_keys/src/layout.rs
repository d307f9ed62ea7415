//! Keyboard geometry: horizontal pixel position → MIDI note.
//!
//! The frame width is cut into a fixed number of equal vertical divisions.
//! Division `i` maps to note `21 + i`, so the leftmost division is A0.  The
//! black/white key index lists exist for drawing only and are never consulted
//! by [`KeyLayout::note_index`].

// ════════════════════════════════════════════════════════════════════════════
// Constants
// ════════════════════════════════════════════════════════════════════════════

/// MIDI note number, 21–108 on an 88-key piano.
pub type Note = u8;

/// A0, the lowest piano key.
pub const LOWEST_NOTE:  Note  = 21;
/// C8, the highest piano key.
pub const HIGHEST_NOTE: Note  = 108;
/// Vertical divisions across the frame width.
pub const DIVISIONS:    u32   = 53;

/// Divisions whose dividing line is drawn short (white-key boundary).
pub const WHITE_INDICES: [u32; 36] = [
    1, 3, 4, 6, 7, 8, 10, 11, 13, 14, 15, 17, 18, 20, 21, 22, 24, 25,
    27, 28, 29, 31, 32, 34, 35, 36, 38, 39, 41, 42, 43, 45, 46, 48, 49, 50,
];

/// Half-spacing offsets at which black-key outlines are drawn.
pub const BLACK_INDICES: [u32; 36] = [
    1, 5, 7, 11, 13, 15, 19, 21, 25, 27, 29, 33, 35, 39, 41, 43, 47, 49,
    53, 55, 57, 61, 63, 67, 69, 71, 75, 77, 81, 83, 85, 89, 91, 95, 97, 99,
];

/// Bottom edge (pixels) of the drawn black keys.
pub const BLACK_KEY_BOTTOM: i32 = 620;

// ════════════════════════════════════════════════════════════════════════════
// KeyLayout
// ════════════════════════════════════════════════════════════════════════════

/// Immutable key geometry derived once from the frame width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyLayout {
    frame_width: u32,
    divisions:   u32,
    spacing:     u32,
}

/// An outline rectangle in frame pixels, `top_left` inclusive,
/// `bottom_right` inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyRect {
    pub left:   i32,
    pub top:    i32,
    pub right:  i32,
    pub bottom: i32,
}

impl KeyLayout {
    /// Layout with the standard 53 divisions.
    pub fn new(frame_width: u32) -> Self {
        Self::with_divisions(frame_width, DIVISIONS)
    }

    /// Layout with a custom division count.
    ///
    /// `frame_width` must be at least `divisions` so that the spacing is
    /// non-zero; the application validates this when loading configuration.
    pub fn with_divisions(frame_width: u32, divisions: u32) -> Self {
        let divisions = divisions.max(1);
        let spacing   = (frame_width / divisions).max(1);
        KeyLayout { frame_width, divisions, spacing }
    }

    pub fn frame_width(&self) -> u32 { self.frame_width }
    pub fn divisions(&self)   -> u32 { self.divisions }
    pub fn spacing(&self)     -> u32 { self.spacing }

    /// Note under pixel column `x`, or `None` outside A0..=C8.
    ///
    /// Uses floor division so that slightly negative detector output lands
    /// below A0 rather than on it.
    pub fn note_index(&self, x: i32) -> Option<Note> {
        let key = x.div_euclid(self.spacing as i32) as i64 + LOWEST_NOTE as i64;
        if (LOWEST_NOTE as i64..=HIGHEST_NOTE as i64).contains(&key) {
            Some(key as Note)
        } else {
            None
        }
    }

    /// Left pixel edge of the column that maps to `note`.
    pub fn column_left(&self, note: Note) -> i32 {
        (note.saturating_sub(LOWEST_NOTE) as i32) * self.spacing as i32
    }

    // ── rendering metadata ───────────────────────────────────────────────

    /// X positions of every interior divider line.
    pub fn divider_xs(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        (1..self.divisions).map(move |i| (i, (i * self.spacing) as i32))
    }

    /// Whether divider `i` is drawn as a short (white-key) line.
    pub fn is_white_divider(i: u32) -> bool {
        WHITE_INDICES.contains(&i)
    }

    /// Row where black keys end and white-key dividers begin; never above
    /// the key area itself.
    pub fn black_key_bottom(key_area_top: i32) -> i32 {
        BLACK_KEY_BOTTOM.max(key_area_top)
    }

    /// Black-key outlines, starting at the top of the key area.
    pub fn black_key_rects(&self, key_area_top: i32) -> Vec<KeyRect> {
        let half   = (self.spacing / 2) as i32;
        let bottom = Self::black_key_bottom(key_area_top);
        BLACK_INDICES.iter()
            .map(|&index| {
                let left = index as i32 * half;
                KeyRect {
                    left,
                    top:    key_area_top,
                    right:  left + self.spacing as i32,
                    bottom,
                }
            })
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
