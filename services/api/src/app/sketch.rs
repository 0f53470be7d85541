//! services/api/src/app/sketch.rs
//!
//! The note panel's freehand sketch pad, rasterised server-side.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tracing::debug;

pub const SKETCH_HEIGHT: u32 = 400;
pub const PALETTE: [&str; 5] = ["#4f46e5", "#ef4444", "#10b981", "#f59e0b", "#000000"];
pub const DEFAULT_STROKE_WIDTH: u32 = 3;
pub const MAX_STROKE_WIDTH: u32 = 10;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Receives the exported PNG data URL whenever a stroke ends.
pub type SaveHook = Box<dyn FnMut(String) + Send>;

#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("Unknown stroke color: {0}")]
    UnknownColor(String),
    #[error("Stroke width {0} is outside 1..=10")]
    WidthOutOfRange(u32),
    #[error("Failed to encode sketch: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Not a PNG data URL")]
    InvalidSnapshot,
}

fn parse_hex(color: &str) -> Option<Rgba<u8>> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// Liang-Barsky clip of a segment to an axis-aligned rectangle.
fn clip_segment(
    from: (f32, f32),
    to: (f32, f32),
    ((min_x, min_y), (max_x, max_y)): ((f32, f32), (f32, f32)),
) -> Option<((f32, f32), (f32, f32))> {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    for (p, q) in [
        (-dx, from.0 - min_x),
        (dx, max_x - from.0),
        (-dy, from.1 - min_y),
        (dy, max_y - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    // Clamped again since cancellation on huge coordinates can overshoot the edge.
    let at = |t: f32| {
        (
            (from.0 + dx * t).clamp(min_x, max_x),
            (from.1 + dy * t).clamp(min_y, max_y),
        )
    };
    Some((
        if t0 > 0.0 { at(t0) } else { from },
        if t1 < 1.0 { at(t1) } else { to },
    ))
}

pub struct SketchPad {
    canvas: RgbaImage,
    color: &'static str,
    stroke_width: u32,
    drawing: bool,
    last_point: Option<(f32, f32)>,
    on_save: Option<SaveHook>,
}

impl SketchPad {
    pub fn new(width: u32) -> Self {
        Self {
            canvas: RgbaImage::new(width.max(1), SKETCH_HEIGHT),
            color: PALETTE[0],
            stroke_width: DEFAULT_STROKE_WIDTH,
            drawing: false,
            last_point: None,
            on_save: None,
        }
    }

    pub fn with_save_hook(mut self, hook: SaveHook) -> Self {
        self.on_save = Some(hook);
        self
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas.dimensions()
    }

    pub fn color(&self) -> &'static str {
        self.color
    }

    pub fn stroke_width(&self) -> u32 {
        self.stroke_width
    }

    pub fn drawing(&self) -> bool {
        self.drawing
    }

    pub fn set_color(&mut self, color: &str) -> Result<(), SketchError> {
        let preset = PALETTE
            .iter()
            .find(|preset| preset.eq_ignore_ascii_case(color))
            .ok_or_else(|| SketchError::UnknownColor(color.to_string()))?;
        self.color = *preset;
        Ok(())
    }

    pub fn set_width(&mut self, width: u32) -> Result<(), SketchError> {
        if !(1..=MAX_STROKE_WIDTH).contains(&width) {
            return Err(SketchError::WidthOutOfRange(width));
        }
        self.stroke_width = width;
        Ok(())
    }

    /// Starts a path at the contact point. Nothing is drawn until the pointer moves.
    pub fn press(&mut self, x: f32, y: f32) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        self.drawing = true;
        self.last_point = Some((x, y));
    }

    /// Draws a segment from the last point while pressed. Returns whether anything was drawn.
    pub fn move_to(&mut self, x: f32, y: f32) -> bool {
        if !self.drawing || !(x.is_finite() && y.is_finite()) {
            return false;
        }
        let Some((x0, y0)) = self.last_point else {
            return false;
        };
        self.stroke_segment((x0, y0), (x, y));
        self.last_point = Some((x, y));
        true
    }

    /// Ends the stroke and hands the exported snapshot to the save hook.
    /// Returns the data URL when a stroke was actually in progress.
    pub fn release(&mut self) -> Result<Option<String>, SketchError> {
        if !self.drawing {
            return Ok(None);
        }
        self.drawing = false;
        self.last_point = None;

        let data_url = self.export_data_url()?;
        if let Some(hook) = self.on_save.as_mut() {
            hook(data_url.clone());
        }
        Ok(Some(data_url))
    }

    pub fn clear(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
        self.drawing = false;
        self.last_point = None;
    }

    pub fn export_png(&self) -> Result<Vec<u8>, SketchError> {
        let mut png = Vec::new();
        self.canvas.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    pub fn export_data_url(&self) -> Result<String, SketchError> {
        Ok(format!("{}{}", PNG_DATA_URL_PREFIX, STANDARD.encode(self.export_png()?)))
    }

    /// Paints a previously exported snapshot onto a clean canvas, anchored top-left.
    pub fn restore_data_url(&mut self, data_url: &str) -> Result<(), SketchError> {
        let encoded = data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or(SketchError::InvalidSnapshot)?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| SketchError::InvalidSnapshot)?;
        let snapshot = image::load_from_memory_with_format(&bytes, ImageFormat::Png)?.to_rgba8();
        self.clear();
        image::imageops::replace(&mut self.canvas, &snapshot, 0, 0);
        Ok(())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.canvas.width() && y < self.canvas.height()).then(|| *self.canvas.get_pixel(x, y))
    }

    // Round-capped line: discs of the stroke's diameter stamped along the segment.
    fn stroke_segment(&mut self, from: (f32, f32), to: (f32, f32)) {
        let Some(color) = parse_hex(self.color) else {
            return;
        };
        let radius = (self.stroke_width as f32 / 2.0).max(0.5);
        let (width, height) = self.canvas.dimensions();
        let bounds = ((-radius, -radius), (width as f32 + radius, height as f32 + radius));
        let Some((from, to)) = clip_segment(from, to, bounds) else {
            return;
        };
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        let steps = (length * 2.0).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(from.0 + dx * t, from.1 + dy * t, radius, color);
        }
        debug!(?from, ?to, "Sketch segment");
    }

    fn stamp(&mut self, cx: f32, cy: f32, radius: f32, color: Rgba<u8>) {
        if cx + radius < 0.0 || cy + radius < 0.0 {
            return;
        }
        let (width, height) = self.canvas.dimensions();
        let min_x = (cx - radius).floor().max(0.0) as u32;
        let min_y = (cy - radius).floor().max(0.0) as u32;
        let max_x = ((cx + radius).ceil().max(0.0) as u32).min(width.saturating_sub(1));
        let max_y = ((cy + radius).ceil().max(0.0) as u32).min(height.saturating_sub(1));
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let (px, py) = (x as f32 - cx, y as f32 - cy);
                if px * px + py * py <= radius * radius {
                    self.canvas.put_pixel(x, y, color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const INDIGO: Rgba<u8> = Rgba([0x4f, 0x46, 0xe5, 255]);
    const BLANK: Rgba<u8> = Rgba([0, 0, 0, 0]);

    #[test]
    fn moving_while_pressed_draws_with_the_active_color() {
        let mut pad = SketchPad::new(100);
        assert_eq!(pad.dimensions(), (100, SKETCH_HEIGHT));
        pad.press(10.0, 10.0);
        assert_eq!(pad.pixel(10, 10), Some(BLANK));

        assert!(pad.move_to(50.0, 10.0));
        assert_eq!(pad.pixel(10, 10), Some(INDIGO));
        assert_eq!(pad.pixel(30, 10), Some(INDIGO));
        assert_eq!(pad.pixel(50, 10), Some(INDIGO));
        assert_eq!(pad.pixel(30, 20), Some(BLANK));
    }

    #[test]
    fn moving_without_press_draws_nothing() {
        let mut pad = SketchPad::new(100);
        assert!(!pad.move_to(20.0, 20.0));
        assert_eq!(pad.pixel(20, 20), Some(BLANK));
    }

    #[test]
    fn release_exports_to_the_save_hook() {
        let saved = Arc::new(Mutex::new(Vec::new()));
        let sink = saved.clone();
        let mut pad = SketchPad::new(64).with_save_hook(Box::new(move |url| sink.lock().unwrap().push(url)));

        assert_eq!(pad.release().unwrap(), None);
        pad.press(5.0, 5.0);
        pad.move_to(20.0, 20.0);
        let url = pad.release().unwrap().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert!(!pad.drawing());
        assert_eq!(saved.lock().unwrap().clone(), vec![url]);
    }

    #[test]
    fn clear_wipes_everything() {
        let mut pad = SketchPad::new(64);
        pad.press(5.0, 5.0);
        pad.move_to(30.0, 30.0);
        pad.clear();
        assert!(pad.canvas.pixels().all(|p| *p == BLANK));
    }

    #[test]
    fn color_and_width_are_validated() {
        let mut pad = SketchPad::new(64);
        assert!(pad.set_color("#EF4444").is_ok());
        assert_eq!(pad.color(), "#ef4444");
        assert!(matches!(pad.set_color("#123456"), Err(SketchError::UnknownColor(_))));
        assert_eq!(pad.color(), "#ef4444");

        assert!(pad.set_width(1).is_ok());
        assert!(pad.set_width(10).is_ok());
        assert!(matches!(pad.set_width(0), Err(SketchError::WidthOutOfRange(0))));
        assert!(matches!(pad.set_width(11), Err(SketchError::WidthOutOfRange(11))));
        assert_eq!(pad.stroke_width(), 10);
    }

    #[test]
    fn strokes_off_canvas_are_clipped() {
        let mut pad = SketchPad::new(32);
        pad.press(-20.0, -20.0);
        pad.move_to(-5.0, -5.0);
        pad.move_to(40.0, 500.0);
        assert!(pad.release().unwrap().is_some());
    }

    #[test]
    fn exported_snapshot_restores() {
        let mut pad = SketchPad::new(64);
        pad.press(8.0, 8.0);
        pad.move_to(16.0, 8.0);
        let url = pad.export_data_url().unwrap();

        let mut restored = SketchPad::new(64);
        restored.restore_data_url(&url).unwrap();
        assert_eq!(restored.pixel(12, 8), Some(INDIGO));
        assert!(matches!(
            restored.restore_data_url("data:text/plain,hi"),
            Err(SketchError::InvalidSnapshot)
        ));
    }

    #[test]
    fn far_away_points_are_clipped_to_the_canvas() {
        let mut pad = SketchPad::new(100);
        pad.press(0.0, 10.0);
        assert!(pad.move_to(1e12, 10.0));
        assert_eq!(pad.pixel(99, 10), Some(INDIGO));

        pad.press(-1e9, 50.0);
        assert!(pad.move_to(20.0, 50.0));
        assert_eq!(pad.pixel(0, 50), Some(INDIGO));

        pad.press(-1e9, -1e9);
        assert!(pad.move_to(-1e9, 1e9));
        assert_eq!(pad.pixel(0, 200), Some(BLANK));
    }

    #[test]
    fn non_finite_points_are_ignored() {
        let mut pad = SketchPad::new(100);
        pad.press(f32::NAN, 0.0);
        assert!(!pad.drawing());

        pad.press(5.0, 5.0);
        assert!(!pad.move_to(f32::INFINITY, 5.0));
        assert!(pad.move_to(15.0, 5.0));
        assert_eq!(pad.pixel(10, 5), Some(INDIGO));
    }
}
