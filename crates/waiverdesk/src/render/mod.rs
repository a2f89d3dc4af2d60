//! Waiver document rendering.
//!
//! [`DocumentRenderer`] lays a [`Submission`] and its signature out on
//! paginated PDF pages. There is one renderer; everything visual is driven
//! by a [`LayoutConfig`] and the wording by a [`WaiverTemplate`].
//!
//! The output is deterministic: the same submission, signature and layout
//! always produce the same bytes.

pub mod layout;
pub mod pdf;
pub mod template;

use std::mem;

use thiserror::Error;
use tracing::{debug, warn};

pub use layout::{fit_within, LayoutConfig, PageSize, Rect};
pub use template::{Clause, WaiverTemplate};

use crate::signature::SignatureImage;
use crate::submission::Submission;
use layout::{text_width, wrap};
use pdf::{Font, GrayImage, Page, PdfDocument};

/// MIME type of rendered documents.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Vertical space kept free above the bottom margin for the footer.
const FOOTER_BAND: f32 = 20.0;

/// Width of the initials box beside each clause.
const INITIALS_BOX_WIDTH: f32 = 44.0;

/// Gap between the initials box and the clause text.
const INITIALS_GUTTER: f32 = 10.0;

/// Width reserved for labels in the guest details block.
const LABEL_WIDTH: f32 = 110.0;

/// Space between the signature box border and the image.
const SIGNATURE_PADDING: f32 = 4.0;

/// Errors raised while rendering.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    /// The layout leaves no usable room on the page.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// The finished pages could not be written as PDF.
    #[error("failed to encode PDF: {0}")]
    Encode(String),
}

/// A rendered waiver, ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// The PDF bytes.
    pub bytes: Vec<u8>,
    /// Suggested file name, unique per submission time.
    pub filename: String,
    /// BLAKE3 hex digest of `bytes`.
    pub digest: String,
    /// Number of pages.
    pub page_count: usize,
}

impl RenderedDocument {
    /// Wrap rendered bytes, computing their digest.
    #[must_use]
    pub fn new(bytes: Vec<u8>, filename: String, page_count: usize) -> Self {
        let digest = blake3::hash(&bytes).to_hex().to_string();
        Self {
            bytes,
            filename,
            digest,
            page_count,
        }
    }

    /// MIME type of the document.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        PDF_CONTENT_TYPE
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the document has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Renders submissions into PDF waivers.
#[derive(Debug, Clone)]
pub struct DocumentRenderer {
    layout: LayoutConfig,
    template: WaiverTemplate,
}

impl DocumentRenderer {
    /// Create a renderer.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidLayout`] if the layout cannot fit a page.
    pub fn new(layout: LayoutConfig, template: WaiverTemplate) -> Result<Self, RenderError> {
        layout.validate()?;
        Ok(Self { layout, template })
    }

    /// The waiver wording.
    #[must_use]
    pub fn template(&self) -> &WaiverTemplate {
        &self.template
    }

    /// The page layout.
    #[must_use]
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Suggested file name for a submission's waiver.
    #[must_use]
    pub fn filename_for(submission: &Submission) -> String {
        format!(
            "waiver-{}-{}.pdf",
            submission.form_id,
            submission.submitted_at.format("%Y%m%d%H%M%S")
        )
    }

    /// Render `submission` with the PGM-encoded `signature`.
    ///
    /// A signature that fails to decode is replaced by a notice in the
    /// signature box; it never aborts the document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Encode`] if the PDF cannot be written.
    #[allow(clippy::too_many_lines, clippy::cast_precision_loss)]
    pub fn render(
        &self,
        submission: &Submission,
        signature: &[u8],
    ) -> Result<RenderedDocument, RenderError> {
        let layout = &self.layout;
        let fields = &submission.fields;
        let doc = PdfDocument::new(
            layout.page_width(),
            layout.page_height(),
            &format!("{} - {}", self.template.title, submission.form_id),
            &submission.submitted_at.format("%Y%m%d%H%M%SZ").to_string(),
        );
        let mut flow = Flow::new(layout, doc);
        let left = layout.margin_pt;
        let width = layout.content_width();
        let body = layout.body_font_size;
        let leading = layout.leading();

        // Title block
        for line in wrap(&self.template.title, Font::Bold, layout.title_font_size, width) {
            flow.centered_line(Font::Bold, layout.title_font_size, &line);
        }
        if !layout.organization.is_empty() {
            flow.centered_line(Font::Regular, body + 1.0, &layout.organization);
        }
        flow.gap(leading * 0.5);
        flow.rule();
        flow.gap(leading * 0.5);

        // Guest details
        let date = fields.signature_date.format("%Y-%m-%d").to_string();
        let rows = [
            ("Guest Name", fields.guest_name.as_str()),
            ("Driver's License", fields.license_number.as_str()),
            ("Issuing State", fields.issuing_state.as_str()),
            ("Address", fields.address.as_str()),
            ("Signature Date", date.as_str()),
            ("Form ID", submission.form_id.as_str()),
        ];
        for (label, value) in rows {
            let lines = wrap(value, Font::Regular, body, width - LABEL_WIDTH);
            flow.ensure(leading * lines.len().max(1) as f32);
            let baseline = flow.y - body;
            flow.page.text(Font::Bold, body, left, baseline, &format!("{label}:"));
            for (i, line) in lines.iter().enumerate() {
                flow.page.text(
                    Font::Regular,
                    body,
                    left + LABEL_WIDTH,
                    baseline - i as f32 * leading,
                    line,
                );
            }
            flow.advance(leading * lines.len().max(1) as f32);
        }
        flow.gap(leading * 0.5);

        // Legal text
        for paragraph in &self.template.paragraphs {
            for line in wrap(paragraph, Font::Regular, body, width) {
                flow.text_line(Font::Regular, body, left, &line);
            }
            flow.gap(leading * 0.5);
        }

        // Initialed clauses
        flow.ensure(leading * 2.0);
        flow.text_line(Font::Bold, body + 1.0, left, "Acknowledgments");
        flow.muted_line(
            body - 1.0,
            left,
            "Initial each statement to show you have read and agree to it.",
        );
        flow.gap(leading * 0.5);

        let text_x = left + INITIALS_BOX_WIDTH + INITIALS_GUTTER;
        let text_width_avail = width - INITIALS_BOX_WIDTH - INITIALS_GUTTER;
        let box_height = body * 2.0;
        for clause in &self.template.clauses {
            let initials = fields
                .clause_initials
                .iter()
                .find(|c| c.clause_id == clause.id)
                .map_or_else(|| submission.guest_initials(), |c| c.initials.clone());
            let heading = wrap(&clause.heading, Font::Bold, body, text_width_avail);
            let text = wrap(&clause.text, Font::Regular, body, text_width_avail);
            let text_height = (heading.len() + text.len()) as f32 * leading;
            let block = text_height.max(box_height) + leading * 0.5;

            flow.ensure(block);
            let top = flow.y;
            flow.page.rect(left, top - box_height, INITIALS_BOX_WIDTH, box_height);
            let size = initials_size(&initials, body + 2.0);
            let initials_x =
                left + (INITIALS_BOX_WIDTH - text_width(&initials, Font::Bold, size)) / 2.0;
            let initials_y = top - box_height / 2.0 - size * 0.35;
            flow.page.text(Font::Bold, size, initials_x, initials_y, &initials);

            let mut baseline = top - body;
            for line in &heading {
                flow.page.text(Font::Bold, body, text_x, baseline, line);
                baseline -= leading;
            }
            for line in &text {
                flow.page.text(Font::Regular, body, text_x, baseline, line);
                baseline -= leading;
            }
            flow.advance(block);
        }

        // Age confirmation
        let statement = wrap(&self.template.age_statement, Font::Regular, body, width - 18.0);
        flow.ensure(statement.len() as f32 * leading + leading * 0.5);
        let top = flow.y;
        let check = body;
        let check_y = top - body - 1.0;
        flow.page.rect(left, check_y, check, check);
        flow.page.line(left + 2.0, check_y + 2.0, left + check - 2.0, check_y + check - 2.0);
        flow.page.line(left + 2.0, check_y + check - 2.0, left + check - 2.0, check_y + 2.0);
        for line in statement {
            flow.text_line(Font::Regular, body, left + 18.0, &line);
        }
        flow.gap(leading);

        // Signature block
        let box_w = layout.signature_box_width_pt;
        let box_h = layout.signature_box_height_pt;
        flow.ensure(leading + box_h + 6.0 + leading * 2.0);
        flow.text_line(Font::Bold, body + 1.0, left, "Guest Signature");
        let frame = Rect {
            x: left,
            y: flow.y - box_h,
            width: box_w,
            height: box_h,
        };
        flow.page.rect(frame.x, frame.y, frame.width, frame.height);
        let inner = Rect {
            x: frame.x + SIGNATURE_PADDING,
            y: frame.y + SIGNATURE_PADDING,
            width: frame.width - 2.0 * SIGNATURE_PADDING,
            height: frame.height - 2.0 * SIGNATURE_PADDING,
        };
        match SignatureImage::decode(signature) {
            Ok(image) if !image.is_blank() => {
                let placed = fit_within(image.width(), image.height(), inner);
                let index = flow.doc.add_image(GrayImage {
                    width: image.width(),
                    height: image.height(),
                    samples: image.pixels().to_vec(),
                });
                flow.page
                    .image(index, placed.x, placed.y, placed.width, placed.height);
            }
            Ok(_) => {
                warn!(form_id = %submission.form_id, "Signature image is blank");
                placeholder(&mut flow.page, frame, body, "No signature captured");
            }
            Err(e) => {
                warn!(form_id = %submission.form_id, error = %e, "Signature image unreadable");
                placeholder(&mut flow.page, frame, body, "Signature image unavailable");
            }
        }
        flow.advance(box_h + 6.0);
        flow.text_line(
            Font::Regular,
            body,
            left,
            &format!("Printed Name: {}", fields.guest_name),
        );
        flow.text_line(Font::Regular, body, left, &format!("Date: {date}"));

        let mut doc = flow.finish();
        add_footers(&mut doc, layout, submission.form_id.as_str());

        let page_count = doc.page_count();
        let bytes = doc.to_bytes()?;
        debug!(
            form_id = %submission.form_id,
            pages = page_count,
            bytes = bytes.len(),
            "Rendered waiver"
        );
        Ok(RenderedDocument::new(
            bytes,
            Self::filename_for(submission),
            page_count,
        ))
    }
}

/// Font size at which `initials` fit inside the initials box.
fn initials_size(initials: &str, preferred: f32) -> f32 {
    let unit = text_width(initials, Font::Bold, 1.0);
    if unit <= 0.0 {
        return preferred;
    }
    preferred.min((INITIALS_BOX_WIDTH - 6.0) / unit)
}

/// Font size at which `message` fits across a signature box `width` wide.
fn placeholder_size(message: &str, preferred: f32, width: f32) -> f32 {
    let unit = text_width(message, Font::Regular, 1.0);
    let room = width - 2.0 * SIGNATURE_PADDING;
    if unit <= 0.0 || room <= 0.0 {
        return preferred;
    }
    preferred.min(room / unit)
}

fn placeholder(page: &mut Page, frame: Rect, preferred: f32, message: &str) {
    let size = placeholder_size(message, preferred, frame.width);
    let x = frame.x + (frame.width - text_width(message, Font::Regular, size)) / 2.0;
    let y = frame.y + frame.height / 2.0 - size * 0.35;
    page.muted_text(Font::Regular, size, x, y, message);
}

#[allow(clippy::cast_precision_loss)]
fn add_footers(doc: &mut PdfDocument, layout: &LayoutConfig, form_id: &str) {
    let total = doc.page_count();
    let size = 8.0;
    let y = layout.margin_pt;
    for i in 0..total {
        let label = format!("Page {} of {total}", i + 1);
        let right =
            layout.page_width() - layout.margin_pt - text_width(&label, Font::Regular, size);
        if let Some(page) = doc.page_mut(i) {
            let id_label = format!("Form ID: {form_id}");
            page.muted_text(Font::Regular, size, layout.margin_pt, y, &id_label);
            page.muted_text(Font::Regular, size, right, y, &label);
        }
    }
}

/// Top-to-bottom flow of content across pages.
struct Flow<'a> {
    layout: &'a LayoutConfig,
    doc: PdfDocument,
    page: Page,
    /// Top of the space still free on the current page.
    y: f32,
    /// Nothing has been placed on the current page yet.
    fresh: bool,
}

impl<'a> Flow<'a> {
    fn new(layout: &'a LayoutConfig, doc: PdfDocument) -> Self {
        Self {
            layout,
            doc,
            page: Page::default(),
            y: layout.page_height() - layout.margin_pt,
            fresh: true,
        }
    }

    fn bottom(&self) -> f32 {
        self.layout.margin_pt + FOOTER_BAND
    }

    /// Start a new page unless `height` still fits on this one.
    ///
    /// A fresh page is never abandoned, so oversized blocks overflow
    /// instead of looping.
    fn ensure(&mut self, height: f32) {
        if !self.fresh && self.y - height < self.bottom() {
            let page = mem::take(&mut self.page);
            self.doc.push_page(page);
            self.y = self.layout.page_height() - self.layout.margin_pt;
            self.fresh = true;
        }
    }

    fn advance(&mut self, height: f32) {
        self.y -= height;
        self.fresh = false;
    }

    fn gap(&mut self, height: f32) {
        if !self.fresh {
            self.y -= height;
        }
    }

    fn line_height(&self, size: f32) -> f32 {
        size * self.layout.line_spacing
    }

    fn text_line(&mut self, font: Font, size: f32, x: f32, text: &str) {
        let height = self.line_height(size);
        self.ensure(height);
        self.page.text(font, size, x, self.y - size, text);
        self.advance(height);
    }

    fn muted_line(&mut self, size: f32, x: f32, text: &str) {
        let height = self.line_height(size);
        self.ensure(height);
        self.page.muted_text(Font::Regular, size, x, self.y - size, text);
        self.advance(height);
    }

    fn centered_line(&mut self, font: Font, size: f32, text: &str) {
        let x = self.layout.margin_pt
            + (self.layout.content_width() - text_width(text, font, size)).max(0.0) / 2.0;
        self.text_line(font, size, x, text);
    }

    fn rule(&mut self) {
        let (left, right) = (
            self.layout.margin_pt,
            self.layout.page_width() - self.layout.margin_pt,
        );
        self.page.line(left, self.y, right, self.y);
    }

    fn finish(mut self) -> PdfDocument {
        let page = mem::take(&mut self.page);
        self.doc.push_page(page);
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};

    use lopdf::{Document, Object};

    use super::*;
    use crate::signature::{Point, SignaturePad};
    use crate::submission::{ClauseInitials, FormId, SubmissionFields};

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn submission_for(template: &WaiverTemplate) -> Submission {
        let clause_initials = template
            .clauses
            .iter()
            .enumerate()
            .map(|(i, c)| ClauseInitials {
                clause_id: c.id.clone(),
                initials: format!("Q{}", char::from(b'A' + (i % 26) as u8)),
            })
            .collect();
        Submission::with_form_id(
            FormId::from_string("JD-01J9Z3TESTTESTTESTTESTTE"),
            SubmissionFields {
                guest_name: "Jane Doe".to_string(),
                license_number: "X123".to_string(),
                issuing_state: "CA".to_string(),
                address: "1 Main St".to_string(),
                signature_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                clause_initials,
            },
            Utc.with_ymd_and_hms(2026, 10, 19, 14, 30, 5).unwrap(),
        )
    }

    fn signature_bytes() -> Vec<u8> {
        let mut pad = SignaturePad::default();
        pad.begin_stroke(Point::new(20.0, 150.0));
        pad.extend_stroke(Point::new(200.0, 40.0));
        pad.extend_stroke(Point::new(380.0, 160.0));
        pad.end_stroke();
        pad.to_image().encode()
    }

    fn renderer() -> DocumentRenderer {
        DocumentRenderer::new(LayoutConfig::default(), WaiverTemplate::default()).unwrap()
    }

    #[test]
    fn test_every_clause_initials_rendered_verbatim() {
        let renderer = renderer();
        let submission = submission_for(renderer.template());
        let doc = renderer.render(&submission, &signature_bytes()).unwrap();

        for initials in &submission.fields.clause_initials {
            let needle = format!("({}) Tj", initials.initials);
            assert!(
                contains(&doc.bytes, needle.as_bytes()),
                "missing initials {} for clause {}",
                initials.initials,
                initials.clause_id
            );
        }
        for clause in &renderer.template().clauses {
            let needle = format!("({}) Tj", clause.heading);
            assert!(contains(&doc.bytes, needle.as_bytes()), "missing {}", clause.heading);
        }
    }

    #[test]
    fn test_guest_fields_rendered() {
        let renderer = renderer();
        let doc = renderer
            .render(&submission_for(renderer.template()), &signature_bytes())
            .unwrap();

        for value in ["(Jane Doe)", "(X123)", "(CA)", "(1 Main St)", "(2026-10-19)"] {
            assert!(contains(&doc.bytes, value.as_bytes()), "missing {value}");
        }
        assert!(contains(&doc.bytes, b"(Printed Name: Jane Doe)"));
    }

    #[test]
    fn test_signature_image_embedded() {
        let renderer = renderer();
        let doc = renderer
            .render(&submission_for(renderer.template()), &signature_bytes())
            .unwrap();

        let parsed = Document::load_mem(&doc.bytes).unwrap();
        let images: Vec<&lopdf::Stream> = parsed
            .objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .filter(|stream| {
                stream.dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Image".as_slice())
            })
            .collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].dict.get(b"Width").unwrap().as_i64().unwrap(), 600);
        assert_eq!(images[0].dict.get(b"Height").unwrap().as_i64().unwrap(), 200);
        assert!(contains(&doc.bytes, b"/Im0 Do"));
        assert!(!contains(&doc.bytes, b"Signature image unavailable"));
    }

    #[test]
    fn test_undecodable_signature_renders_placeholder() {
        let renderer = renderer();
        let doc = renderer
            .render(&submission_for(renderer.template()), b"not an image")
            .unwrap();

        assert!(contains(&doc.bytes, b"(Signature image unavailable)"));
        assert!(!contains(&doc.bytes, b"/Im0 Do"));
        assert!(contains(&doc.bytes, b"(Jane Doe)"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = renderer();
        let submission = submission_for(renderer.template());
        let a = renderer.render(&submission, &signature_bytes()).unwrap();
        let b = renderer.render(&submission, &signature_bytes()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.digest.len(), 64);
    }

    #[test]
    fn test_filename_uses_form_id_and_time() {
        let renderer = renderer();
        let doc = renderer
            .render(&submission_for(renderer.template()), &signature_bytes())
            .unwrap();
        assert_eq!(
            doc.filename,
            "waiver-JD-01J9Z3TESTTESTTESTTESTTE-20261019143005.pdf"
        );
        assert_eq!(doc.content_type(), "application/pdf");
    }

    #[test]
    fn test_long_template_paginates_with_footers() {
        let mut template = WaiverTemplate::default();
        let base = template.clauses.clone();
        for round in 0..5 {
            for clause in &base {
                let mut extra = clause.clone();
                extra.id = format!("{}-{round}", clause.id);
                template.clauses.push(extra);
            }
        }
        let renderer = DocumentRenderer::new(LayoutConfig::default(), template).unwrap();
        let submission = submission_for(renderer.template());
        let doc = renderer.render(&submission, &signature_bytes()).unwrap();

        assert!(doc.page_count > 1);
        let last = format!("(Page {0} of {0})", doc.page_count);
        assert!(contains(&doc.bytes, last.as_bytes()));
        assert!(contains(&doc.bytes, b"(Page 1 of "));
        assert_eq!(
            count(&doc.bytes, b"(Form ID: JD-01J9Z3TESTTESTTESTTESTTE)"),
            doc.page_count
        );
        for initials in &submission.fields.clause_initials {
            let needle = format!("({}) Tj", initials.initials);
            assert!(contains(&doc.bytes, needle.as_bytes()));
        }
    }

    #[test]
    fn test_a4_media_box() {
        let layout = LayoutConfig {
            page_size: PageSize::A4,
            ..LayoutConfig::default()
        };
        let renderer = DocumentRenderer::new(layout, WaiverTemplate::default()).unwrap();
        let doc = renderer
            .render(&submission_for(renderer.template()), &signature_bytes())
            .unwrap();
        let parsed = Document::load_mem(&doc.bytes).unwrap();
        for page_id in parsed.get_pages().into_values() {
            let page = parsed.get_dictionary(page_id).unwrap();
            let media_box: Vec<String> = page
                .get(b"MediaBox")
                .unwrap()
                .as_array()
                .unwrap()
                .iter()
                .map(|value| match value {
                    Object::Integer(i) => i.to_string(),
                    Object::Real(r) => r.to_string(),
                    other => panic!("unexpected MediaBox entry {other:?}"),
                })
                .collect();
            assert_eq!(media_box, ["0", "0", "595.28", "841.89"]);
        }
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let layout = LayoutConfig {
            body_font_size: 2.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            DocumentRenderer::new(layout, WaiverTemplate::default()),
            Err(RenderError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_placeholder_fits_narrowest_signature_box() {
        let layout = LayoutConfig {
            signature_box_width_pt: 40.0,
            ..LayoutConfig::default()
        };
        let renderer = DocumentRenderer::new(layout, WaiverTemplate::default()).unwrap();
        let doc = renderer
            .render(&submission_for(renderer.template()), b"")
            .unwrap();
        assert!(contains(&doc.bytes, b"(Signature image unavailable) Tj"));

        let body = LayoutConfig::default().body_font_size;
        for message in ["Signature image unavailable", "No signature captured"] {
            let size = placeholder_size(message, body, 40.0);
            assert!(size < body);
            let room = 40.0 - 2.0 * SIGNATURE_PADDING;
            assert!(text_width(message, Font::Regular, size) <= room + 0.01);
        }
        let roomy = placeholder_size("No signature captured", body, 240.0);
        assert!((roomy - body).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mixed_case_initials_kept() {
        let renderer = renderer();
        let mut submission = submission_for(renderer.template());
        for (initials, entered) in submission
            .fields
            .clause_initials
            .iter_mut()
            .zip(["jD", "Jd", "jd", "mcK"].into_iter().cycle())
        {
            initials.initials = entered.to_string();
        }
        let doc = renderer.render(&submission, &signature_bytes()).unwrap();

        assert!(contains(&doc.bytes, b"(jD) Tj"));
        assert!(contains(&doc.bytes, b"(Jd) Tj"));
        assert!(contains(&doc.bytes, b"(jd) Tj"));
        assert!(!contains(&doc.bytes, b"(JD) Tj"));
    }

    #[test]
    fn test_initials_shrink_to_fit_box() {
        let size = initials_size("WWWWWW", 12.0);
        assert!(size < 12.0);
        assert!(text_width("WWWWWW", Font::Bold, size) <= INITIALS_BOX_WIDTH - 6.0 + 0.01);
        assert!((initials_size("JD", 12.0) - 12.0).abs() < f32::EPSILON);
    }
}
