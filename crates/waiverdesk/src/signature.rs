//! Freehand signature capture.
//!
//! [`SignaturePad`] records strokes in canvas coordinates and rasterizes them
//! on demand, so the strokes themselves are the backing store: resizing the
//! canvas rescales the strokes instead of discarding them.
//!
//! The exported [`SignatureImage`] is an 8-bit grayscale raster (white
//! background, black ink) that encodes losslessly as binary PGM.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

/// Default canvas width in pixels.
pub const DEFAULT_WIDTH: u32 = 600;

/// Default canvas height in pixels.
pub const DEFAULT_HEIGHT: u32 = 200;

/// Default pen diameter in pixels.
pub const DEFAULT_PEN_WIDTH: f32 = 2.5;

/// Largest canvas side we accept, in pixels.
const MAX_SIDE: u32 = 4096;

const INK: u8 = 0;
const PAPER: u8 = 255;

/// Errors raised by signature capture and decoding.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Canvas dimensions are zero or too large.
    #[error("invalid canvas size {width}x{height}")]
    InvalidSize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// Encoded image bytes could not be decoded.
    #[error("cannot decode signature image: {0}")]
    Decode(String),
}

/// A point on the canvas, in pixels from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One continuous pen-down movement.
pub type Stroke = Vec<Point>;

/// Serialized form of a pad: canvas size plus strokes as `[x, y]` pairs.
///
/// This is the JSON shape accepted by `waiverdesk submit --signature`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeData {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Strokes as lists of `[x, y]` pairs.
    pub strokes: Vec<Vec<[f32; 2]>>,
}

/// A stroke-recording drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    pen_width: f32,
    strokes: Vec<Stroke>,
    drawing: bool,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            pen_width: DEFAULT_PEN_WIDTH,
            strokes: Vec::new(),
            drawing: false,
        }
    }
}

impl SignaturePad {
    /// Create an empty pad of the given size.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidSize`] for zero or oversized canvases.
    pub fn new(width: u32, height: u32) -> Result<Self, SignatureError> {
        check_size(width, height)?;
        Ok(Self {
            width,
            height,
            ..Self::default()
        })
    }

    /// Rebuild a pad from serialized strokes.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidSize`] for zero or oversized canvases.
    pub fn from_strokes(data: &StrokeData) -> Result<Self, SignatureError> {
        let mut pad = Self::new(data.width, data.height)?;
        for stroke in &data.strokes {
            let mut points = stroke.iter().map(|[x, y]| Point::new(*x, *y));
            if let Some(first) = points.next() {
                pad.begin_stroke(first);
                for point in points {
                    pad.extend_stroke(point);
                }
                pad.end_stroke();
            }
        }
        Ok(pad)
    }

    /// Export strokes in the serialized form.
    #[must_use]
    pub fn to_stroke_data(&self) -> StrokeData {
        StrokeData {
            width: self.width,
            height: self.height,
            strokes: self
                .strokes
                .iter()
                .map(|s| s.iter().map(|p| [p.x, p.y]).collect())
                .collect(),
        }
    }

    /// Set the pen diameter in pixels. Non-positive values are ignored.
    pub fn set_pen_width(&mut self, pen_width: f32) {
        if pen_width > 0.0 {
            self.pen_width = pen_width;
        }
    }

    /// Canvas width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Canvas height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The recorded strokes.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Pen down at `point`.
    pub fn begin_stroke(&mut self, point: Point) {
        let point = self.clamp(point);
        self.strokes.push(vec![point]);
        self.drawing = true;
    }

    /// Pen moved to `point`. Ignored unless a stroke is in progress.
    pub fn extend_stroke(&mut self, point: Point) {
        if !self.drawing {
            return;
        }
        let point = self.clamp(point);
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    /// Pen up.
    pub fn end_stroke(&mut self) {
        self.drawing = false;
    }

    /// Reset to a blank pad.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.drawing = false;
        debug!("Signature pad cleared");
    }

    /// Whether nothing has been drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Resize the canvas, rescaling existing strokes to the new size.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::InvalidSize`] for zero or oversized canvases;
    /// the pad is left unchanged in that case.
    #[allow(clippy::cast_precision_loss)]
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SignatureError> {
        check_size(width, height)?;
        let sx = width as f32 / self.width as f32;
        let sy = height as f32 / self.height as f32;
        for point in self.strokes.iter_mut().flatten() {
            point.x *= sx;
            point.y *= sy;
        }
        trace!(
            from = %format!("{}x{}", self.width, self.height),
            to = %format!("{width}x{height}"),
            strokes = self.strokes.len(),
            "Signature pad resized"
        );
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Rasterize the current strokes.
    ///
    /// The image is blank exactly when the pad is empty: every stroke,
    /// including a single tap, leaves at least one inked pixel.
    #[must_use]
    pub fn to_image(&self) -> SignatureImage {
        let mut image = SignatureImage::blank(self.width, self.height);
        let radius = (self.pen_width / 2.0).max(0.5);

        for stroke in &self.strokes {
            match stroke.as_slice() {
                [] => {}
                [only] => image.stamp(*only, radius),
                points => {
                    for pair in points.windows(2) {
                        image.line(pair[0], pair[1], radius);
                    }
                }
            }
        }
        image
    }

    fn clamp(&self, point: Point) -> Point {
        #[allow(clippy::cast_precision_loss)]
        let (max_x, max_y) = ((self.width - 1) as f32, (self.height - 1) as f32);
        let fix = |v: f32, max: f32| if v.is_finite() { v.clamp(0.0, max) } else { 0.0 };
        Point::new(fix(point.x, max_x), fix(point.y, max_y))
    }
}

fn check_size(width: u32, height: u32) -> Result<(), SignatureError> {
    if width == 0 || height == 0 || width > MAX_SIDE || height > MAX_SIDE {
        return Err(SignatureError::InvalidSize { width, height });
    }
    Ok(())
}

/// An 8-bit grayscale raster of a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SignatureImage {
    /// An all-white image.
    #[must_use]
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![PAPER; width as usize * height as usize],
        }
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major grayscale samples, 0 = ink, 255 = paper.
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Whether no pixel carries ink.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&p| p == PAPER)
    }

    /// Number of inked pixels.
    #[must_use]
    pub fn ink_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p != PAPER).count()
    }

    /// Encode as binary PGM (`P5`).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let header = format!("P5\n{} {}\n255\n", self.width, self.height);
        let mut out = Vec::with_capacity(header.len() + self.pixels.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.pixels);
        out
    }

    /// Decode a binary PGM produced by [`SignatureImage::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Decode`] if the header is malformed, the
    /// sample depth isn't 8 bits, or the pixel data is truncated.
    pub fn decode(bytes: &[u8]) -> Result<Self, SignatureError> {
        let mut fields = Vec::with_capacity(4);
        let mut pos = 0;
        while fields.len() < 4 {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let start = pos;
            while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if start == pos {
                return Err(SignatureError::Decode("truncated header".to_string()));
            }
            fields.push(&bytes[start..pos]);
        }
        // Exactly one whitespace byte separates the header from the samples.
        pos += 1;

        if fields[0] != b"P5" {
            return Err(SignatureError::Decode("not a binary PGM".to_string()));
        }
        let number = |raw: &[u8]| -> Result<u32, SignatureError> {
            std::str::from_utf8(raw)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| SignatureError::Decode("bad header number".to_string()))
        };
        let width = number(fields[1])?;
        let height = number(fields[2])?;
        if number(fields[3])? != 255 {
            return Err(SignatureError::Decode("only 8-bit samples are supported".to_string()));
        }
        check_size(width, height).map_err(|e| SignatureError::Decode(e.to_string()))?;

        let expected = width as usize * height as usize;
        let data = bytes.get(pos..).unwrap_or_default();
        if data.len() != expected {
            return Err(SignatureError::Decode(format!(
                "expected {expected} samples, found {}",
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            pixels: data.to_vec(),
        })
    }

    /// Ink a filled disk centred on `center`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn stamp(&mut self, center: Point, radius: f32) {
        let min_x = (center.x - radius).floor().max(0.0) as u32;
        let min_y = (center.y - radius).floor().max(0.0) as u32;
        let max_x = ((center.x + radius).ceil() as u32).min(self.width - 1);
        let max_y = ((center.y + radius).ceil() as u32).min(self.height - 1);
        let r2 = radius * radius;

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = x as f32 - center.x;
                let dy = y as f32 - center.y;
                if dx * dx + dy * dy <= r2 {
                    self.pixels[y as usize * self.width as usize + x as usize] = INK;
                }
            }
        }
        // A pen narrower than a pixel may miss every pixel centre.
        let (cx, cy) = (center.x.round() as u32, center.y.round() as u32);
        let idx = cy.min(self.height - 1) as usize * self.width as usize
            + cx.min(self.width - 1) as usize;
        self.pixels[idx] = INK;
    }

    /// Ink a segment by stamping disks every half pixel.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn line(&mut self, from: Point, to: Point, radius: f32) {
        let length = (to.x - from.x).hypot(to.y - from.y);
        let steps = (length * 2.0).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.stamp(
                Point::new(from.x + (to.x - from.x) * t, from.y + (to.y - from.y) * t),
                radius,
            );
        }
    }
}
