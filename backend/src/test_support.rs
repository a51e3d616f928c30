//! Test utilities for the backend crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled only for tests or with the `test-support` feature.

use std::io::Cursor;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};
use mockable::Clock;

/// Errors raised while building fixtures.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// PDF assembly failed.
    #[error(transparent)]
    Pdf(#[from] lopdf::Error),
    /// Serialisation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Image encoding failed.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Start at the given Unix time in milliseconds.
    #[must_use]
    pub const fn at_millis(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    /// Start at `instant`.
    #[must_use]
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::at_millis(instant.timestamp_millis())
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let step = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(step, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// A minimal A4 PDF with `page_count` pages of text.
///
/// Resources and the media box live on the page tree root so that stamping
/// has to honour inherited attributes.
///
/// # Errors
///
/// Returns [`FixtureError`] if lopdf cannot encode the document.
pub fn sample_pdf(page_count: u32) -> Result<Vec<u8>, FixtureError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids = Vec::new();
    for page in 1..=page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 18.into()]),
                Operation::new("Td", vec![72.into(), 760.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Municipal notice, page {page}"))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => i64::from(page_count),
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// A transparent PNG with a dark blue stroke, as produced by the cleaner.
///
/// # Errors
///
/// Returns [`FixtureError::Image`] if encoding fails.
pub fn sample_signature_png() -> Result<Vec<u8>, FixtureError> {
    let image = RgbaImage::from_fn(120, 40, |x, y| {
        if y.abs_diff(20) <= 2 && (10..110).contains(&x) {
            Rgba([20, 30, 140, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    encode_png(&DynamicImage::ImageRgba8(image))
}

/// An opaque photo-like PNG: blue ink on off-white paper.
///
/// # Errors
///
/// Returns [`FixtureError::Image`] if encoding fails.
pub fn sample_signature_photo() -> Result<Vec<u8>, FixtureError> {
    let image = RgbImage::from_fn(60, 20, |x, y| {
        if y == 10 && (5..55).contains(&x) {
            Rgb([40, 60, 200])
        } else {
            Rgb([235, 232, 225])
        }
    });
    encode_png(&DynamicImage::ImageRgb8(image))
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, FixtureError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}
