// THEORY:
// The `BlobFilter` turns a list of blobs into the single number the rest of the
// system cares about. Anything at or below `min_area` is sensor noise or a
// shadow fleck; anything at or above `max_area` is usually several touching
// items merged into one region, which would otherwise be counted as one.

use crate::config::AreaBounds;
use crate::core_modules::blob_extractor::Blob;

impl AreaBounds {
    /// True when `area` lies strictly inside the bounds.
    pub fn accepts(&self, area: f64) -> bool {
        area > self.min_area && self.max_area.is_none_or(|max_area| area < max_area)
    }
}

/// Number of blobs whose area is accepted by `bounds`.
pub fn count(blobs: &[Blob], bounds: &AreaBounds) -> u32 {
    blobs.iter().filter(|blob| bounds.accepts(blob.area)).count() as u32
}

/// The accepted blobs themselves, for annotation.
pub fn accepted<'a>(blobs: &'a [Blob], bounds: &'a AreaBounds) -> impl Iterator<Item = &'a Blob> + 'a {
    blobs.iter().filter(move |blob| bounds.accepts(blob.area))
}
