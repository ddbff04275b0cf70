use image::GrayImage;
use imageproc::contours::{self, BorderType};
use crate::models::{Point, RawContour};

/// Trace every border in a binary image (non-zero pixels are foreground).
///
/// Contours come back in tracing order, each with the index of its
/// immediately enclosing border.
pub fn find_contours(binary: &GrayImage) -> Vec<RawContour> {
    contours::find_contours::<u32>(binary)
        .into_iter()
        .map(|contour| RawContour {
            points: contour
                .points
                .iter()
                .map(|p| Point::new(p.x as f32, p.y as f32))
                .collect(),
            parent: contour.parent,
            is_hole: matches!(contour.border_type, BorderType::Hole),
        })
        .collect()
}
