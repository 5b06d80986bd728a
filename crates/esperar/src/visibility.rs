//! Viewport-geometry visibility.
//!
//! The document's own displayed flag is necessary but not sufficient: an
//! element can be "displayed" yet parked entirely outside the viewport.
//! Visibility here means the displayed flag is set AND the element's
//! bounding box intersects the viewport rectangle.

use crate::driver::{Element, Point, Size};
use crate::result::EsperarResult;

/// True when a box at `location` with `size` intersects a viewport anchored
/// at the origin.
///
/// All four bounds are strict: a box that merely touches a viewport edge
/// from outside does not intersect it.
#[must_use]
pub fn intersects_viewport(location: Point, size: Size, viewport: Size) -> bool {
    location.x > -size.width
        && location.y > -size.height
        && location.y < viewport.height
        && location.x < viewport.width
}

/// Determine visual visibility of `el` against `viewport`.
///
/// The displayed flag short-circuits: geometry is only fetched for elements
/// the document itself reports as displayed.
///
/// # Errors
///
/// Propagates transport failures from the handle reads.
pub async fn is_visible(el: &dyn Element, viewport: Size) -> EsperarResult<bool> {
    if !el.is_displayed().await? {
        return Ok(false);
    }
    let location = el.location().await?;
    let size = el.size().await?;
    Ok(intersects_viewport(location, size, viewport))
}
