//! PDF stamping with lopdf.
//!
//! Each round loads the latest artifact, adds a signature image, a text block
//! and a QR code to one page and re-serialises the whole document. Earlier
//! stamps are left untouched, so rounds accumulate on one evolving file.

mod layout;
mod page;
mod qr;
mod text;

use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::debug;

use crate::domain::ports::{PdfStampError, PdfStamper, StampRequest, StampedPdf};

use self::layout::{CAPTION, Rect, StampLayout, TextLine};
use self::page::{StampNames, StampObjects};
use self::qr::QrRaster;

const DATE_FORMAT: &str = "%d %B %Y";

/// [`PdfStamper`] backed by lopdf, the standard Helvetica font and the
/// `image` and `qrcode` crates.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfStamper;

impl LopdfStamper {
    /// Create a stamper.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn load(pdf: &[u8]) -> Result<Document, PdfStampError> {
    let doc = Document::load_mem(pdf)
        .map_err(|err| PdfStampError::corrupt_document(err.to_string()))?;
    if doc.is_encrypted() {
        return Err(PdfStampError::corrupt_document(
            "encrypted documents are not supported",
        ));
    }
    Ok(doc)
}

fn render_error(context: &str, error: impl std::fmt::Display) -> PdfStampError {
    PdfStampError::render(format!("{context}: {error}"))
}

fn decode_signature(png: &[u8]) -> Result<RgbaImage, PdfStampError> {
    image::load_from_memory(png)
        .map(|image| image.to_rgba8())
        .map_err(|err| render_error("signature image unreadable", err))
}

fn add_image(
    doc: &mut Document,
    width: u32,
    height: u32,
    color_space: &str,
    pixels: Vec<u8>,
    soft_mask: Option<ObjectId>,
) -> Result<ObjectId, PdfStampError> {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };
    if let Some(mask) = soft_mask {
        dict.set("SMask", mask);
    }
    let mut stream = Stream::new(dict, pixels);
    stream
        .compress()
        .map_err(|err| render_error("image compression failed", err))?;
    Ok(doc.add_object(stream))
}

fn embed_signature(doc: &mut Document, image: &RgbaImage) -> Result<ObjectId, PdfStampError> {
    let (width, height) = image.dimensions();
    let mut rgb = Vec::with_capacity(image.as_raw().len());
    let mut alpha = Vec::with_capacity(image.as_raw().len() / 4);
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend([r, g, b]);
        alpha.push(a);
    }
    let mask = add_image(doc, width, height, "DeviceGray", alpha, None)?;
    add_image(doc, width, height, "DeviceRGB", rgb, Some(mask))
}

fn embed_qr(doc: &mut Document, raster: QrRaster) -> Result<ObjectId, PdfStampError> {
    let QrRaster { side, pixels } = raster;
    add_image(doc, side, side, "DeviceGray", pixels, None)
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

fn draw_image(ops: &mut Vec<Operation>, rect: Rect, resource: &str) {
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![
            real(rect.width),
            real(0.0),
            real(0.0),
            real(rect.height),
            real(rect.x),
            real(rect.y),
        ],
    ));
    ops.push(Operation::new("Do", vec![name(resource)]));
    ops.push(Operation::new("Q", vec![]));
}

fn draw_text(ops: &mut Vec<Operation>, line: TextLine, font: &str, value: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![name(font), real(line.size)]));
    ops.push(Operation::new(
        "rg",
        vec![real(line.grey), real(line.grey), real(line.grey)],
    ));
    ops.push(Operation::new("Td", vec![real(line.x), real(line.y)]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(text::win_ansi(value), StringFormat::Literal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

fn stamp_content(
    layout: &StampLayout,
    names: &StampNames,
    request: &StampRequest,
) -> Result<Vec<u8>, PdfStampError> {
    let mut ops = Vec::new();
    draw_image(&mut ops, layout.signature, &names.signature);
    draw_text(
        &mut ops,
        layout.name,
        &names.font,
        &format!("({})", request.signer_name),
    );
    if let Some(position) = request
        .signer_position
        .as_deref()
        .filter(|position| !position.trim().is_empty())
    {
        draw_text(&mut ops, layout.position, &names.font, position);
    }
    let date = request.signed_at.format(DATE_FORMAT).to_string();
    draw_text(&mut ops, layout.date, &names.font, &date);
    draw_image(&mut ops, layout.qr, &names.qr);
    draw_text(&mut ops, layout.caption, &names.font, CAPTION);
    Content { operations: ops }
        .encode()
        .map_err(|err| render_error("content encoding failed", err))
}

impl PdfStamper for LopdfStamper {
    fn page_count(&self, pdf: &[u8]) -> Result<usize, PdfStampError> {
        load(pdf).map(|doc| doc.get_pages().len())
    }

    fn stamp(&self, request: StampRequest) -> Result<StampedPdf, PdfStampError> {
        let mut doc = load(&request.base_pdf)?;
        let page_id = page::page_id(&doc, request.placement.page_index)?;
        let page_box = page::media_box(&doc, page_id)?;
        let anchor = request.placement.to_pdf_point(page_box);

        let signature = decode_signature(&request.signature_png)?;
        let qr = qr::rasterise(&request.verify_url)?;
        let layout = StampLayout::around(anchor, signature.width(), signature.height());

        let objects = StampObjects {
            signature: embed_signature(&mut doc, &signature)?,
            qr: embed_qr(&mut doc, qr)?,
            font: doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
        };
        let names = page::install_resources(&mut doc, page_id, objects)?;
        let content = stamp_content(&layout, &names, &request)?;
        page::wrap_contents(&mut doc, page_id, content)?;

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|err| render_error("serialisation failed", err))?;
        debug!(
            page = request.placement.page_index,
            x = anchor.x,
            y = anchor.y,
            size = bytes.len(),
            "stamp rendered"
        );
        Ok(StampedPdf::new(bytes))
    }
}

#[cfg(test)]
#[path = "stamper_tests.rs"]
mod tests;
