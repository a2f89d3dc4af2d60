//! Page geometry and text metrics.

use serde::{Deserialize, Serialize};

use super::pdf::Font;
use super::RenderError;

/// Supported paper sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// US Letter, 8.5 x 11 in.
    #[default]
    Letter,
    /// ISO A4, 210 x 297 mm.
    A4,
}

impl PageSize {
    /// Width and height in PDF points.
    #[must_use]
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            Self::Letter => (612.0, 792.0),
            Self::A4 => (595.28, 841.89),
        }
    }
}

impl std::fmt::Display for PageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Letter => write!(f, "letter"),
            Self::A4 => write!(f, "a4"),
        }
    }
}

/// Visual parameters of the rendered waiver.
///
/// All lengths are in PDF points (1/72 in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Paper size.
    pub page_size: PageSize,
    /// Uniform page margin.
    pub margin_pt: f32,
    /// Size of body text.
    pub body_font_size: f32,
    /// Size of the document title.
    pub title_font_size: f32,
    /// Baseline-to-baseline distance as a multiple of the font size.
    pub line_spacing: f32,
    /// Width of the signature box.
    pub signature_box_width_pt: f32,
    /// Height of the signature box.
    pub signature_box_height_pt: f32,
    /// Organization name printed under the title.
    pub organization: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::Letter,
            margin_pt: 54.0,
            body_font_size: 10.0,
            title_font_size: 16.0,
            line_spacing: 1.35,
            signature_box_width_pt: 240.0,
            signature_box_height_pt: 80.0,
            organization: "Harbor Point Watersports".to_string(),
        }
    }
}

impl LayoutConfig {
    /// Check that the layout leaves a usable content area.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidLayout`] describing the first problem.
    pub fn validate(&self) -> Result<(), RenderError> {
        let (width, height) = self.page_size.dimensions();
        let invalid = |message: String| Err(RenderError::InvalidLayout(message));

        if !(0.0..=width / 4.0).contains(&self.margin_pt) {
            return invalid(format!(
                "margin_pt must be between 0 and {:.0}, got {}",
                width / 4.0,
                self.margin_pt
            ));
        }
        for (name, size) in [
            ("body_font_size", self.body_font_size),
            ("title_font_size", self.title_font_size),
        ] {
            if !(6.0..=36.0).contains(&size) {
                return invalid(format!("{name} must be between 6 and 36, got {size}"));
            }
        }
        if !(1.0..=3.0).contains(&self.line_spacing) {
            return invalid(format!(
                "line_spacing must be between 1 and 3, got {}",
                self.line_spacing
            ));
        }
        let content_width = width - 2.0 * self.margin_pt;
        let content_height = height - 2.0 * self.margin_pt;
        if self.signature_box_width_pt < 40.0 || self.signature_box_width_pt > content_width {
            return invalid(format!(
                "signature_box_width_pt must be between 40 and {content_width:.0}"
            ));
        }
        if self.signature_box_height_pt < 20.0
            || self.signature_box_height_pt > content_height / 2.0
        {
            return invalid(format!(
                "signature_box_height_pt must be between 20 and {:.0}",
                content_height / 2.0
            ));
        }
        Ok(())
    }

    /// Page width in points.
    #[must_use]
    pub fn page_width(&self) -> f32 {
        self.page_size.dimensions().0
    }

    /// Page height in points.
    #[must_use]
    pub fn page_height(&self) -> f32 {
        self.page_size.dimensions().1
    }

    /// Width between the left and right margins.
    #[must_use]
    pub fn content_width(&self) -> f32 {
        self.page_width() - 2.0 * self.margin_pt
    }

    /// Distance between body text baselines.
    #[must_use]
    pub fn leading(&self) -> f32 {
        self.body_font_size * self.line_spacing
    }
}

/// Axis-aligned rectangle, origin bottom-left as in PDF space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Whether `other` lies entirely inside `self`.
    #[must_use]
    pub fn contains(&self, other: &Rect) -> bool {
        const EPS: f32 = 0.01;
        other.x >= self.x - EPS
            && other.y >= self.y - EPS
            && other.x + other.width <= self.x + self.width + EPS
            && other.y + other.height <= self.y + self.height + EPS
    }
}

/// Scale an image of `width` x `height` pixels to fit inside `frame`,
/// preserving aspect ratio and centring it.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn fit_within(width: u32, height: u32, frame: Rect) -> Rect {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    let scale = (frame.width / w).min(frame.height / h);
    let (fw, fh) = (w * scale, h * scale);
    Rect {
        x: frame.x + (frame.width - fw) / 2.0,
        y: frame.y + (frame.height - fh) / 2.0,
        width: fw,
        height: fh,
    }
}

/// Advance widths of Helvetica for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // a..z
    334, 260, 334, 584, // {..~
];

/// Bold glyphs run wider than regular ones; this covers the difference.
const BOLD_FACTOR: f32 = 1.08;

/// Width of `text` set in `font` at `size` points.
#[must_use]
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                u32::from(HELVETICA_WIDTHS[(code - 32) as usize])
            } else {
                556
            }
        })
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let width = units as f32 * size / 1000.0;
    match font {
        Font::Regular => width,
        Font::Bold => width * BOLD_FACTOR,
    }
}

/// Greedy word wrap of `text` into lines no wider than `max_width`.
///
/// Words wider than a whole line are broken between characters. Runs of
/// whitespace collapse to single spaces. Empty input yields no lines.
#[must_use]
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font, size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word, font, size) <= max_width {
            current = word.to_string();
        } else {
            for c in word.chars() {
                let mut next = current.clone();
                next.push(c);
                if !current.is_empty() && text_width(&next, font, size) > max_width {
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                } else {
                    current = next;
                }
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        assert!(LayoutConfig::default().validate().is_ok());
        let a4 = LayoutConfig {
            page_size: PageSize::A4,
            ..LayoutConfig::default()
        };
        assert!(a4.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_margin() {
        let layout = LayoutConfig {
            margin_pt: 300.0,
            ..LayoutConfig::default()
        };
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("margin_pt"));
    }

    #[test]
    fn test_validate_rejects_wide_signature_box() {
        let layout = LayoutConfig {
            signature_box_width_pt: 600.0,
            ..LayoutConfig::default()
        };
        assert!(layout
            .validate()
            .unwrap_err()
            .to_string()
            .contains("signature_box_width_pt"));
    }

    #[test]
    fn test_page_size_serde() {
        let json = serde_json::to_string(&PageSize::A4).unwrap();
        assert_eq!(json, "\"a4\"");
        let size: PageSize = serde_json::from_str("\"letter\"").unwrap();
        assert_eq!(size, PageSize::Letter);
    }

    #[test]
    fn test_text_width() {
        // "Hi" = H(722) + i(222)
        let width = text_width("Hi", Font::Regular, 10.0);
        assert!((width - 9.44).abs() < 0.001);
        assert!(text_width("Hi", Font::Bold, 10.0) > width);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "The guest acknowledges that watersports involve inherent risks \
                    including capsizing, collision and drowning.";
        let lines = wrap(text, Font::Regular, 10.0, 150.0);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 10.0) <= 150.0, "{line}");
        }
        assert_eq!(lines.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let word = "W".repeat(40);
        let lines = wrap(&word, Font::Regular, 10.0, 50.0);

        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_empty() {
        assert!(wrap("   ", Font::Regular, 10.0, 100.0).is_empty());
    }

    #[test]
    fn test_fit_within_preserves_aspect_and_stays_inside() {
        let frame = Rect {
            x: 100.0,
            y: 200.0,
            width: 232.0,
            height: 72.0,
        };
        let placed = fit_within(600, 200, frame);

        assert!(frame.contains(&placed));
        assert!((placed.width / placed.height - 3.0).abs() < 0.001);
        assert!((placed.height - 72.0).abs() < 0.001);
    }

    #[test]
    fn test_fit_within_tall_image() {
        let frame = Rect {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 50.0,
        };
        let placed = fit_within(10, 1000, frame);
        assert!(frame.contains(&placed));
        assert!((placed.height - 50.0).abs() < 0.001);
    }
}
