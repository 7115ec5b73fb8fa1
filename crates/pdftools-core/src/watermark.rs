//! Text watermark
//!
//! Draws the same line of text on every page in translucent grey Helvetica.
//! The overlay is an extra content stream; existing content is not touched.

use crate::document::{media_box, DocumentHandle};
use crate::error::{Result, ToolboxError};
use crate::naming;
use crate::page_content::{add_resource, append_content};
use crate::sink::Deliverable;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat};
use std::str::FromStr;
use tracing::info;

/// Helvetica advance widths for codes 32..=126, in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 32..47
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 48..63
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 64..79
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 80..95
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 96..111
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 112..126
];

/// Width used for codes outside the table
const DEFAULT_WIDTH: u16 = 556;

/// Distance kept from the top and bottom edges
const EDGE_MARGIN: f32 = 50.0;

const GREY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatermarkPosition {
    #[default]
    Center,
    Top,
    Bottom,
}

impl FromStr for WatermarkPosition {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "center" | "centre" => Ok(WatermarkPosition::Center),
            "top" => Ok(WatermarkPosition::Top),
            "bottom" => Ok(WatermarkPosition::Bottom),
            other => Err(ToolboxError::InvalidRange(format!(
                "Unknown watermark position '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkOptions {
    pub text: String,
    /// Fill opacity, 0.0..=1.0
    pub opacity: f32,
    pub font_size: f32,
    /// Counter-clockwise, around the text origin
    pub rotation_degrees: f32,
    pub position: WatermarkPosition,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            text: String::new(),
            opacity: 0.3,
            font_size: 48.0,
            rotation_degrees: 45.0,
            position: WatermarkPosition::Center,
        }
    }
}

impl WatermarkOptions {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(ToolboxError::MissingInput("Enter watermark text".into()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ToolboxError::InvalidRange(format!(
                "Opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        if self.font_size <= 0.0 {
            return Err(ToolboxError::InvalidRange(format!(
                "Font size must be positive, got {}",
                self.font_size
            )));
        }
        Ok(())
    }
}

/// Encode text for a WinAnsi Helvetica. Characters outside Latin-1 become `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Advance width of encoded text at `font_size`
fn text_width(encoded: &[u8], font_size: f32) -> f32 {
    let units: u32 = encoded
        .iter()
        .map(|&b| match b {
            32..=126 => HELVETICA_WIDTHS[(b - 32) as usize] as u32,
            _ => DEFAULT_WIDTH as u32,
        })
        .sum();
    units as f32 * font_size / 1000.0
}

/// Text origin on a page of the given size
fn text_origin(options: &WatermarkOptions, width: f32, height: f32, text_width: f32) -> (f32, f32) {
    let x = (width - text_width) / 2.0;
    let y = match options.position {
        WatermarkPosition::Center => height / 2.0,
        WatermarkPosition::Top => height - options.font_size - EDGE_MARGIN,
        WatermarkPosition::Bottom => options.font_size + EDGE_MARGIN,
    };
    (x, y)
}

fn overlay_content(
    font: &str,
    state: &str,
    encoded: &[u8],
    options: &WatermarkOptions,
    origin: (f32, f32),
) -> Result<Vec<u8>> {
    let radians = options.rotation_degrees.to_radians();
    let (sin, cos) = radians.sin_cos();
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(state.as_bytes().to_vec())]),
            Operation::new("rg", vec![Object::Real(GREY), Object::Real(GREY), Object::Real(GREY)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(font.as_bytes().to_vec()),
                    Object::Real(options.font_size),
                ],
            ),
            Operation::new(
                "Tm",
                vec![
                    Object::Real(cos),
                    Object::Real(sin),
                    Object::Real(-sin),
                    Object::Real(cos),
                    Object::Real(origin.0),
                    Object::Real(origin.1),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encoded.to_vec(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    };
    Ok(content.encode()?)
}

/// Stamp every page of an opened document
pub fn apply_watermark(handle: &mut DocumentHandle, options: &WatermarkOptions) -> Result<()> {
    options.validate()?;

    let encoded = encode_text(&options.text);
    let width = text_width(&encoded, options.font_size);
    let page_ids = handle.page_ids().to_vec();
    let doc = handle.document_mut();

    let font_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ]));
    let state_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(options.opacity)),
        ("CA", Object::Real(options.opacity)),
    ]));

    for page_id in page_ids {
        let [llx, lly, urx, ury] = media_box(doc, page_id)?;
        let (x, y) = text_origin(options, urx - llx, ury - lly, width);

        let font = add_resource(doc, page_id, "Font", "WmF", Object::Reference(font_id))?;
        let state = add_resource(doc, page_id, "ExtGState", "WmGS", Object::Reference(state_id))?;
        let content = overlay_content(&font, &state, &encoded, options, (llx + x, lly + y))?;
        append_content(doc, page_id, content)?;
    }
    Ok(())
}

/// Watermark and serialize as `watermarked.pdf`
pub fn watermark_document(pdf: &[u8], options: &WatermarkOptions) -> Result<Deliverable> {
    options.validate()?;
    let mut handle = DocumentHandle::open(pdf)?;
    apply_watermark(&mut handle, options)?;
    info!("Watermarked {} pages", handle.page_count());
    Ok(Deliverable::pdf(handle.to_bytes()?, naming::WATERMARKED))
}
