//! Software-rendered "Top View" / "Front View" windows using `minifb`.
//!
//! Top view:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                (darkened, outside key area)          │
//! ├──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬──┬───┤ ← key_area_top
//! │ ▯│ ▯│  │ ▯│ ▯│ ▯│  │ ▯│ ▯│  │ ...   black-key outlines│
//! │  │  │  │  │  │  │  │  │  │  │       dividers          │
//! └──┴──┴──┴──┴──┴──┴──┴──┴──┴──┴──────────────────────────┘
//! ```
//!
//! Front view: full-height dividers and the push threshold line.
//!
//! `Q` in either window, or closing either window, requests shutdown.

use std::time::Duration;

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use air_keys::{Display, FingerSnapshot, KeysError, Scene};
use air_keys::layout::KeyLayout;

use crate::canvas::Canvas;
use crate::sim::{Pointer, SharedPointer};

// ════════════════════════════════════════════════════════════════════════════
// Colours
// ════════════════════════════════════════════════════════════════════════════

const WHITE:        u32 = 0x00FF_FFFF;
const BLACK:        u32 = 0x0000_0000;
const TOP_TIP:      u32 = 0x0000_FF00;  // green
const FRONT_TIP:    u32 = 0x00FF_0000;  // red
const THRESHOLD:    u32 = 0x0000_FF00;
const SOUNDING:     u32 = 0x00FF_D700;  // gold
const TIP_RADIUS:   i32 = 10;

pub const TOP_TITLE:   &str = "Top View";
pub const FRONT_TITLE: &str = "Front View";

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// Window refresh cap.  Simulated cameras return instantly, so sim mode is
/// held to ~60fps; real cameras already block on capture.
fn update_interval(simulated: bool) -> Option<Duration> {
    simulated.then(|| Duration::from_millis(16))
}

pub struct Visualizer {
    top:          Option<Window>,
    front:        Option<Window>,
    top_canvas:   Canvas,
    front_canvas: Canvas,
    /// Mouse state published for the simulated hand, if running in sim mode.
    pointer:      Option<SharedPointer>,
}

impl Visualizer {
    pub fn new(width: usize, height: usize, pointer: Option<SharedPointer>) -> Result<Self, String> {
        let rate = update_interval(pointer.is_some());
        let open = |title: &str| -> Result<Window, String> {
            let mut w = Window::new(title, width, height, WindowOptions::default())
                .map_err(|e| e.to_string())?;
            w.limit_update_rate(rate);
            Ok(w)
        };
        Ok(Visualizer {
            top:          Some(open(TOP_TITLE)?),
            front:        Some(open(FRONT_TITLE)?),
            top_canvas:   Canvas::new(width, height),
            front_canvas: Canvas::new(width, height),
            pointer,
        })
    }

    fn publish_pointer(&self) {
        let (Some(pointer), Some(win)) = (&self.pointer, &self.top) else { return };
        pointer.set(Pointer {
            at:      win.get_mouse_pos(MouseMode::Discard),
            pressed: win.get_mouse_down(MouseButton::Left),
        });
    }
}

impl Display for Visualizer {
    fn show(&mut self, scene: &Scene<'_>) -> air_keys::Result<()> {
        draw_top(&mut self.top_canvas, scene);
        draw_front(&mut self.front_canvas, scene);

        for (win, canvas) in [(&mut self.top, &self.top_canvas), (&mut self.front, &self.front_canvas)] {
            if let Some(win) = win {
                win.update_with_buffer(canvas.buffer(), canvas.width(), canvas.height())
                    .map_err(|e| KeysError::Display(e.to_string()))?;
            }
        }
        self.publish_pointer();
        Ok(())
    }

    fn quit_requested(&mut self) -> bool {
        [&self.top, &self.front].iter().any(|w| match w {
            Some(w) => !w.is_open() || w.is_key_pressed(Key::Q, KeyRepeat::No),
            None    => true,
        })
    }

    fn close(&mut self) {
        // Dropping a minifb window destroys it.
        self.top.take();
        self.front.take();
        log::debug!("display closed");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Drawing
// ════════════════════════════════════════════════════════════════════════════

fn draw_top(c: &mut Canvas, scene: &Scene<'_>) {
    let press  = scene.press;
    let layout = press.layout();
    let bottom = c.height() as i32 - 1;
    let top    = press.key_area_top();
    let short  = KeyLayout::black_key_bottom(top);

    c.blit(scene.top_frame);

    for &note in scene.sounding {
        let x = layout.column_left(note);
        c.tint(x, top, x + layout.spacing() as i32, bottom + 1, SOUNDING, 0.45);
    }

    for (i, x) in layout.divider_xs() {
        let from = if KeyLayout::is_white_divider(i) { short } else { top };
        c.vline(x, from, bottom, WHITE);
    }

    c.tint(0, 0, c.width() as i32, top, BLACK, 0.75);

    for r in layout.black_key_rects(top) {
        c.draw_border(r.left, r.top, r.right, r.bottom, BLACK);
    }

    draw_tips(c, scene.top, TOP_TIP);
}

fn draw_front(c: &mut Canvas, scene: &Scene<'_>) {
    let press  = scene.press;
    let bottom = c.height() as i32 - 1;

    c.blit(scene.front_frame);
    for (_, x) in press.layout().divider_xs() {
        c.vline(x, 0, bottom, WHITE);
    }
    c.hline(press.press_threshold(), 2, THRESHOLD);

    draw_tips(c, scene.front, FRONT_TIP);
}

fn draw_tips(c: &mut Canvas, snapshot: &FingerSnapshot, color: u32) {
    for (_, at) in snapshot.iter() {
        c.fill_circle(at.x, at.y, TIP_RADIUS, color);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
