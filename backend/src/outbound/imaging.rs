//! Signature image clean-up with the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};

use crate::domain::CleanedSignature;
use crate::domain::ports::{SignatureImageCleaner, SignatureImageError};

const INK_DARKEN: u8 = 30;
const INK_BOOST: u8 = 20;

/// Keeps blue ink strokes and drops paper, shadows and other colours.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlueInkCleaner;

impl BlueInkCleaner {
    /// Create a cleaner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn is_blue_ink(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    b > 80.0 && b > r * 1.3 && b > g * 1.2
}

fn extract_ink(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        let Rgba([r, g, b, _]) = *pixel;
        *pixel = if is_blue_ink(r, g, b) {
            Rgba([
                r.saturating_sub(INK_DARKEN),
                g.saturating_sub(INK_DARKEN),
                b.saturating_add(INK_BOOST),
                u8::MAX,
            ])
        } else {
            Rgba([r, g, b, 0])
        };
    }
}

impl SignatureImageCleaner for BlueInkCleaner {
    fn clean(
        &self,
        image: &[u8],
        remove_background: bool,
    ) -> Result<CleanedSignature, SignatureImageError> {
        let mut rgba = image::load_from_memory(image)
            .map_err(|err| SignatureImageError::decode(err.to_string()))?
            .to_rgba8();
        if remove_background {
            extract_ink(&mut rgba);
        }
        let (width, height) = rgba.dimensions();
        let mut png = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)
            .map_err(|err| SignatureImageError::encode(err.to_string()))?;
        Ok(CleanedSignature { png, width, height })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::test_support::sample_signature_photo;

    fn decode(png: &[u8]) -> RgbaImage {
        image::load_from_memory(png).expect("decodes").to_rgba8()
    }

    #[rstest]
    #[case(40, 60, 200, true)]
    #[case(235, 232, 225, false)]
    #[case(20, 20, 70, false)]
    #[case(100, 120, 140, false)]
    fn classifies_ink(#[case] r: u8, #[case] g: u8, #[case] b: u8, #[case] expected: bool) {
        assert_eq!(is_blue_ink(r, g, b), expected);
    }

    #[rstest]
    fn keeps_darkened_strokes_and_clears_paper() {
        let photo = sample_signature_photo().expect("photo");

        let cleaned = BlueInkCleaner::new().clean(&photo, true).expect("cleaned");

        assert_eq!((cleaned.width, cleaned.height), (60, 20));
        let image = decode(&cleaned.png);
        assert_eq!(image.get_pixel(10, 10), &Rgba([10, 30, 220, 255]));
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
    }

    #[rstest]
    fn leaves_pixels_alone_without_background_removal() {
        let photo = sample_signature_photo().expect("photo");

        let cleaned = BlueInkCleaner::new().clean(&photo, false).expect("cleaned");

        let image = decode(&cleaned.png);
        assert_eq!(image.get_pixel(0, 0), &Rgba([235, 232, 225, 255]));
    }

    #[rstest]
    fn rejects_bytes_that_are_not_an_image() {
        let err = BlueInkCleaner::new()
            .clean(b"GIF89a but not really", true)
            .expect_err("undecodable");

        assert!(matches!(err, SignatureImageError::Decode { .. }));
    }
}
