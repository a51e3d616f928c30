//! Stamp geometry in PDF user space.
//!
//! Everything is anchored on the click point: the signature image is centred
//! on it, the text block hangs below the image's left edge and the QR code
//! sits to the right.

use crate::domain::PdfPoint;

const SIGNATURE_WIDTH: f64 = 150.0;
const TEXT_DROP: f64 = 15.0;
const POSITION_DROP: f64 = 13.0;
const DATE_DROP: f64 = 25.0;
const QR_SIZE: f64 = 60.0;
const QR_GAP: f64 = 10.0;
const CAPTION_DROP: f64 = 12.0;

/// Caption printed under the QR code.
pub(super) const CAPTION: &str = "Scan to verify";

/// An axis-aligned box, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Baseline origin, font size and grey level of one text line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct TextLine {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub grey: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct StampLayout {
    pub signature: Rect,
    pub name: TextLine,
    pub position: TextLine,
    pub date: TextLine,
    pub qr: Rect,
    pub caption: TextLine,
}

impl StampLayout {
    /// Lay out a stamp around `anchor` for a signature image of the given
    /// pixel dimensions.
    pub(super) fn around(anchor: PdfPoint, image_width: u32, image_height: u32) -> Self {
        let aspect = if image_width == 0 {
            1.0
        } else {
            f64::from(image_height) / f64::from(image_width)
        };
        let signature_height = SIGNATURE_WIDTH * aspect;
        let left = anchor.x - SIGNATURE_WIDTH / 2.0;
        let bottom = anchor.y - signature_height / 2.0;
        let text_y = bottom - TEXT_DROP;
        let qr = Rect {
            x: anchor.x + SIGNATURE_WIDTH / 2.0 + QR_GAP,
            y: anchor.y - QR_SIZE / 2.0,
            width: QR_SIZE,
            height: QR_SIZE,
        };
        Self {
            signature: Rect {
                x: left,
                y: bottom,
                width: SIGNATURE_WIDTH,
                height: signature_height,
            },
            name: TextLine {
                x: left,
                y: text_y,
                size: 9.0,
                grey: 0.0,
            },
            position: TextLine {
                x: left,
                y: text_y - POSITION_DROP,
                size: 8.0,
                grey: 0.3,
            },
            date: TextLine {
                x: left,
                y: text_y - DATE_DROP,
                size: 8.0,
                grey: 0.3,
            },
            caption: TextLine {
                x: qr.x,
                y: qr.y - CAPTION_DROP,
                size: 6.0,
                grey: 0.4,
            },
            qr,
        }
    }
}
