//! Conversion of a UI click into PDF user-space coordinates.
//!
//! The signing UI renders each page at a known zoom `scale` with the origin at
//! the top-left; PDF user space has its origin at the bottom-left of the
//! page's MediaBox.

use serde::{Deserialize, Serialize};

/// Where the signer clicked on a rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Zero-based page index.
    pub page_index: u32,
    /// Horizontal pixel offset from the left edge of the rendered page.
    pub click_x: f64,
    /// Vertical pixel offset from the top edge of the rendered page.
    pub click_y: f64,
    /// Rendered pixels per PDF point.
    pub scale: f64,
}

/// Reasons a placement is refused before any PDF is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// The scale was zero, negative or not finite.
    #[error("scale must be a positive finite number")]
    InvalidScale,
    /// A coordinate was negative or not finite.
    #[error("click coordinates must be non-negative finite numbers")]
    InvalidCoordinate,
}

/// A page's MediaBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    /// Lower-left x.
    pub llx: f64,
    /// Lower-left y.
    pub lly: f64,
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

/// A point in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPoint {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Placement {
    /// Validate the raw values supplied by the UI.
    pub fn new(page_index: u32, click_x: f64, click_y: f64, scale: f64) -> Result<Self, PlacementError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PlacementError::InvalidScale);
        }
        let valid = |value: f64| value.is_finite() && value >= 0.0;
        if !valid(click_x) || !valid(click_y) {
            return Err(PlacementError::InvalidCoordinate);
        }
        Ok(Self {
            page_index,
            click_x,
            click_y,
            scale,
        })
    }

    /// Convert the click to user space on a page with the given MediaBox.
    ///
    /// `pdfX = llx + clickX / scale` and
    /// `pdfY = lly + height - clickY / scale`.
    ///
    /// # Examples
    /// ```
    /// use cosign_backend::domain::{PageBox, Placement};
    ///
    /// let placement = Placement::new(0, 150.0, 300.0, 1.5).expect("valid placement");
    /// let page = PageBox { llx: 0.0, lly: 0.0, width: 595.0, height: 842.0 };
    /// let point = placement.to_pdf_point(page);
    /// assert_eq!(point.x, 100.0);
    /// assert_eq!(point.y, 642.0);
    /// ```
    #[must_use]
    pub fn to_pdf_point(&self, page: PageBox) -> PdfPoint {
        PdfPoint {
            x: page.llx + self.click_x / self.scale,
            y: page.lly + page.height - self.click_y / self.scale,
        }
    }
}
