//! QR rasterisation for the verification link.

use qrcode::{Color, QrCode};

use crate::domain::ports::PdfStampError;

const QUIET_ZONE: usize = 1;

/// One byte per module, 0 for dark and 255 for light, quiet zone included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct QrRaster {
    pub side: u32,
    pub pixels: Vec<u8>,
}

pub(super) fn rasterise(payload: &str) -> Result<QrRaster, PdfStampError> {
    let code = QrCode::new(payload.as_bytes())
        .map_err(|err| PdfStampError::render(format!("qr encoding failed: {err}")))?;
    let modules = code.width();
    let side = modules + 2 * QUIET_ZONE;
    let mut pixels = vec![255_u8; side * side];
    for (index, color) in code.to_colors().iter().enumerate() {
        if matches!(color, Color::Dark) {
            let row = index / modules + QUIET_ZONE;
            let column = index % modules + QUIET_ZONE;
            if let Some(pixel) = pixels.get_mut(row * side + column) {
                *pixel = 0;
            }
        }
    }
    let side = u32::try_from(side)
        .map_err(|_| PdfStampError::render("qr code too large"))?;
    Ok(QrRaster { side, pixels })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn border_is_a_light_quiet_zone() {
        let raster = rasterise("https://cosign.example.org/verify/abcdefghijklmnop")
            .expect("rasterised");
        let side = raster.side as usize;

        assert_eq!(raster.pixels.len(), side * side);
        let top = raster.pixels.get(..side).expect("top row");
        assert!(top.iter().all(|pixel| *pixel == 255));
        let left_column = (0..side).filter_map(|row| raster.pixels.get(row * side));
        assert!(left_column.into_iter().all(|pixel| *pixel == 255));
        assert!(raster.pixels.contains(&0));
    }

    #[rstest]
    fn finder_pattern_starts_inside_the_quiet_zone() {
        let raster = rasterise("verify").expect("rasterised");
        let side = raster.side as usize;

        assert_eq!(raster.pixels.get(side + 1), Some(&0));
    }
}
