//! A 0RGB `u32` framebuffer with the handful of primitives the views need.

use air_keys::Frame;

pub struct Canvas {
    width:  usize,
    height: usize,
    buf:    Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, buf: vec![0; width * height] }
    }

    pub fn width(&self)  -> usize  { self.width }
    pub fn height(&self) -> usize  { self.height }
    pub fn buffer(&self) -> &[u32] { &self.buf }

    #[cfg(test)]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.buf[y * self.width + x])
    }

    /// Copy a frame in, nearest-neighbour scaled to the canvas size.
    pub fn blit(&mut self, frame: &Frame) {
        let (fw, fh) = (frame.width() as usize, frame.height() as usize);
        if fw == 0 || fh == 0 { return; }
        let data = frame.data();
        for y in 0..self.height {
            let sy = y * fh / self.height;
            for x in 0..self.width {
                let sx = x * fw / self.width;
                let i = (sy * fw + sx) * 3;
                self.buf[y * self.width + x] =
                    (data[i] as u32) << 16 | (data[i + 1] as u32) << 8 | data[i + 2] as u32;
            }
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.buf[y as usize * self.width + x as usize] = color;
        }
    }

    /// Vertical line from `y0` to `y1` inclusive.
    pub fn vline(&mut self, x: i32, y0: i32, y1: i32, color: u32) {
        for y in y0.min(y1)..=y0.max(y1) {
            self.set_pixel(x, y, color);
        }
    }

    /// Horizontal line `thickness` pixels tall, starting at row `y`.
    pub fn hline(&mut self, y: i32, thickness: i32, color: u32) {
        for row in y..y + thickness.max(1) {
            for x in 0..self.width as i32 {
                self.set_pixel(x, row, color);
            }
        }
    }

    /// One-pixel outline, corners inclusive.
    pub fn draw_border(&mut self, left: i32, top: i32, right: i32, bottom: i32, color: u32) {
        for x in left..=right {
            self.set_pixel(x, top, color);
            self.set_pixel(x, bottom, color);
        }
        for y in top..=bottom {
            self.set_pixel(left, y, color);
            self.set_pixel(right, y, color);
        }
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, r: i32, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Blend `color` over the rows `[y0, y1)` and columns `[x0, x1)`.
    /// `t` = 0.0 leaves the pixels, 1.0 replaces them.
    pub fn tint(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32, t: f32) {
        let cx = |v: i32| v.clamp(0, self.width as i32) as usize;
        let cy = |v: i32| v.clamp(0, self.height as i32) as usize;
        let (x0, x1, y0, y1) = (cx(x0), cx(x1), cy(y0), cy(y1));
        for y in y0..y1 {
            for x in x0..x1 {
                let i = y * self.width + x;
                self.buf[i] = blend(self.buf[i], color, t);
            }
        }
    }
}

/// Blend two 0RGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_packs_rgb() {
        let mut c = Canvas::new(2, 2);
        c.blit(&Frame::solid(2, 2, [0x12, 0x34, 0x56]));
        assert_eq!(c.pixel(1, 1), Some(0x123456));
    }

    #[test]
    fn blit_scales_nearest() {
        // 2×1 frame (black | white) onto a 4×1 canvas.
        let f = Frame::new(2, 1, vec![0, 0, 0, 255, 255, 255]).unwrap();
        let mut c = Canvas::new(4, 1);
        c.blit(&f);
        assert_eq!(c.buffer(), &[0, 0, 0xFFFFFF, 0xFFFFFF]);
    }

    #[test]
    fn set_pixel_clips() {
        let mut c = Canvas::new(2, 2);
        c.set_pixel(-1, 0, 1);
        c.set_pixel(0, 5, 1);
        assert!(c.buffer().iter().all(|&p| p == 0));
    }

    #[test]
    fn blend_endpoints() {
        assert_eq!(blend(0x000000, 0xFFFFFF, 0.0), 0x000000);
        assert_eq!(blend(0x000000, 0xFFFFFF, 1.0), 0xFFFFFF);
        assert_eq!(blend(0xFFFFFF, 0x000000, 0.75), 0x404040);
    }

    #[test]
    fn tint_clamps_to_canvas() {
        let mut c = Canvas::new(3, 3);
        c.tint(-5, -5, 10, 1, 0xFFFFFF, 1.0);
        assert_eq!(c.pixel(2, 0), Some(0xFFFFFF));
        assert_eq!(c.pixel(0, 1), Some(0));
    }
}
