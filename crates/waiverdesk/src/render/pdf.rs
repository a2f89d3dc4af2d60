//! Page drawing on top of `lopdf`.
//!
//! Pages collect `lopdf` content operations; [`PdfDocument::to_bytes`]
//! assembles the object graph and lets `lopdf` write the file. Text uses
//! the two standard Helvetica faces in `WinAnsiEncoding`, so only
//! characters that encoding covers can be shown (see [`first_unrenderable`]).
//! Content streams are left uncompressed so rendered text can be checked
//! byte-for-byte.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use super::RenderError;

/// Standard fonts available to every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Helvetica.
    Regular,
    /// Helvetica-Bold.
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
        }
    }
}

/// Grayscale image embedded as an image XObject.
#[derive(Debug, Clone)]
pub struct GrayImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major 8-bit samples, 0 = black.
    pub samples: Vec<u8>,
}

/// Drawing operations for one page.
#[derive(Debug, Default)]
pub struct Page {
    ops: Vec<Operation>,
    images: Vec<usize>,
}

impl Page {
    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    /// Draw `text` with its baseline starting at (`x`, `y`).
    pub fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.op("BT", vec![]);
        self.op("Tf", vec![font.resource_name().into(), num(size)]);
        self.op("Td", vec![num(x), num(y)]);
        self.op("Tj", vec![Object::string_literal(encode_text(text))]);
        self.op("ET", vec![]);
    }

    /// Draw `text` in mid gray.
    pub fn muted_text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.op("q", vec![]);
        self.op("g", vec![num(0.45)]);
        self.text(font, size, x, y, text);
        self.op("Q", vec![]);
    }

    /// Stroke a rectangle outline.
    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.op("w", vec![num(0.75)]);
        self.op("re", vec![num(x), num(y), num(width), num(height)]);
        self.op("S", vec![]);
    }

    /// Stroke a straight line.
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.op("w", vec![num(0.75)]);
        self.op("m", vec![num(x1), num(y1)]);
        self.op("l", vec![num(x2), num(y2)]);
        self.op("S", vec![]);
    }

    /// Paint image `index` (from [`PdfDocument::add_image`]) into the box.
    pub fn image(&mut self, index: usize, x: f32, y: f32, width: f32, height: f32) {
        self.op("q", vec![]);
        self.op(
            "cm",
            vec![num(width), num(0.0), num(0.0), num(height), num(x), num(y)],
        );
        self.op("Do", vec![image_name(index).as_str().into()]);
        self.op("Q", vec![]);
        if !self.images.contains(&index) {
            self.images.push(index);
        }
    }
}

/// A document under construction.
#[derive(Debug)]
pub struct PdfDocument {
    width: f32,
    height: f32,
    title: String,
    creation_date: String,
    images: Vec<GrayImage>,
    pages: Vec<Page>,
}

impl PdfDocument {
    /// Start a document whose pages all share one size.
    ///
    /// `creation_date` is written verbatim after `D:`, e.g. `20261019120000Z`.
    #[must_use]
    pub fn new(width: f32, height: f32, title: &str, creation_date: &str) -> Self {
        Self {
            width,
            height,
            title: title.to_string(),
            creation_date: creation_date.to_string(),
            images: Vec::new(),
            pages: Vec::new(),
        }
    }

    /// Register an image and return its index.
    pub fn add_image(&mut self, image: GrayImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    /// Append a finished page.
    pub fn push_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Number of pages so far.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Mutable access to a page, for late additions such as footers.
    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    /// Serialize the document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Encode`] if `lopdf` fails to encode a
    /// content stream or write the file.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let font_regular = doc.add_object(font_dictionary(Font::Regular));
        let font_bold = doc.add_object(font_dictionary(Font::Bold));
        let image_ids: Vec<ObjectId> = self
            .images
            .iter()
            .map(|image| doc.add_object(image_stream(image)))
            .collect();

        let mut kids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content = Content {
                operations: page.ops.clone(),
            }
            .encode()
            .map_err(|e| RenderError::Encode(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let mut xobjects = Dictionary::new();
            for &index in &page.images {
                if let Some(&id) = image_ids.get(index) {
                    xobjects.set(image_name(index), id);
                }
            }
            let resources = dictionary! {
                "Font" => dictionary! {
                    Font::Regular.resource_name() => font_regular,
                    Font::Bold.resource_name() => font_bold,
                },
                "XObject" => xobjects,
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![num(0.0), num(0.0), num(self.width), num(self.height)],
                "Resources" => resources,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = i64::try_from(kids.len()).map_err(|e| RenderError::Encode(e.to_string()))?;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(encode_text(&self.title)),
            "Producer" => Object::string_literal("waiverdesk"),
            "CreationDate" => Object::string_literal(format!("D:{}", self.creation_date)),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        Ok(out)
    }
}

fn font_dictionary(font: Font) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    }
}

fn image_stream(image: &GrayImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8_i64,
        },
        image.samples.clone(),
    )
}

fn image_name(index: usize) -> String {
    format!("Im{index}")
}

/// A coordinate rounded to two decimals; whole values stay integers.
#[allow(clippy::cast_possible_truncation)]
fn num(value: f32) -> Object {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract().abs() < f32::EPSILON {
        Object::Integer(rounded as i64)
    } else {
        Object::from(rounded)
    }
}

/// `WinAnsiEncoding` byte for `c`, if the standard fonts can show it.
fn win_ansi(c: char) -> Option<u8> {
    let byte = match c {
        ' '..='~' | '\u{a0}'..='\u{ff}' => return u8::try_from(u32::from(c)).ok(),
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => return None,
    };
    Some(byte)
}

/// The first character of `text` the page fonts cannot draw.
///
/// Whitespace never counts; it is drawn as a plain space.
#[must_use]
pub fn first_unrenderable(text: &str) -> Option<char> {
    text.chars()
        .find(|&c| !c.is_whitespace() && win_ansi(c).is_none())
}

/// Encode text for a string shown with the page fonts.
///
/// Characters without a `WinAnsiEncoding` code become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match win_ansi(c) {
            Some(byte) => byte,
            None if c.is_whitespace() => b' ',
            None => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_num_rounding() {
        assert!(matches!(num(612.0), Object::Integer(612)));
        assert!(matches!(num(-0.001), Object::Integer(0)));
        match num(10.499) {
            Object::Real(value) => assert_eq!(value.to_string(), "10.5"),
            other => panic!("expected a real, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode_text("a(b)c"), b"a(b)c".to_vec());
        assert_eq!(encode_text("Zoë"), b"Zo\xeb".to_vec());
        assert_eq!(encode_text("O’Neil"), b"O\x92Neil".to_vec());
        assert_eq!(encode_text("漢"), b"?".to_vec());
        assert_eq!(encode_text("tab\there"), b"tab here".to_vec());
    }

    #[test]
    fn test_first_unrenderable() {
        assert_eq!(first_unrenderable("Zoë O’Neil\t1 Main St"), None);
        assert_eq!(first_unrenderable("Łukasz"), Some('Ł'));
        assert_eq!(first_unrenderable("Jane 漢"), Some('漢'));
        assert_eq!(first_unrenderable("👍"), Some('👍'));
    }

    #[test]
    fn test_document_structure() {
        let mut doc = PdfDocument::new(612.0, 792.0, "Test", "20261019000000Z");
        let mut page = Page::default();
        page.text(Font::Bold, 12.0, 72.0, 700.0, "Hello world");
        page.rect(72.0, 600.0, 100.0, 50.0);
        doc.push_page(page);

        let bytes = doc.to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(contains(&bytes, b"/F2 12 Tf"));
        assert!(contains(&bytes, b"(Hello world) Tj"));

        let parsed = Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 1);
        let page = parsed.get_dictionary(pages[&1]).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 612);
        assert_eq!(media_box[3].as_i64().unwrap(), 792);

        let info_id = parsed.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = parsed.get_dictionary(info_id).unwrap();
        assert_eq!(
            info.get(b"CreationDate").unwrap().as_str().unwrap(),
            b"D:20261019000000Z".as_slice()
        );
    }

    #[test]
    fn test_images_are_shared_xobjects() {
        let mut doc = PdfDocument::new(612.0, 792.0, "Images", "20261019000000Z");
        let image = doc.add_image(GrayImage {
            width: 2,
            height: 1,
            samples: vec![0, 255],
        });
        let mut page = Page::default();
        page.image(image, 10.0, 10.0, 20.0, 10.0);
        doc.push_page(page);
        doc.push_page(Page::default());

        let bytes = doc.to_bytes().unwrap();
        assert!(contains(&bytes, b"/Im0 Do"));

        let parsed = Document::load_mem(&bytes).unwrap();
        let pages = parsed.get_pages();
        assert_eq!(pages.len(), 2);

        let first = parsed.get_dictionary(pages[&1]).unwrap();
        let resources = first.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im0").unwrap().as_reference().unwrap();
        let stream = parsed.get_object(image_id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 2);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 1);
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceGray".as_slice()
        );
        assert_eq!(stream.content, vec![0, 255]);

        let second = parsed.get_dictionary(pages[&2]).unwrap();
        let resources = second.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        assert_eq!(xobjects.len(), 0);
    }
}
