// THEORY:
// The `BlobExtractor` is the spatial grouping stage. It takes the binary mask
// from the `Segmenter` and finds every connected foreground region, reporting
// each one as a `Blob`: the region's outer boundary and the area enclosed by it.
//
// Key architectural principles:
// 1.  **Outer boundaries only**: A tray item with a specular highlight or a hole
//     in its mask is still one item. Holes and anything nested inside a hole are
//     never reported separately.
// 2.  **Library tracing**: Border following is delegated to `imageproc`'s
//     Suzuki-Abe implementation. This module only selects, simplifies and
//     measures what it returns. The tracer cannot start an outer border in
//     column 0, so the mask is traced inside a one-pixel background margin and
//     the points are shifted back afterwards.
// 3.  **Polygon area, not pixel tally**: `area` is the shoelace area of the
//     boundary polygon through pixel centers. It undercounts small or jagged
//     blobs relative to their pixel count (a single pixel has area 0), and the
//     size thresholds in the configuration are tuned against exactly this.
// 4.  **Stateless Utility**: `extract` has no memory of previous frames and the
//     order of the returned blobs carries no meaning.

use crate::core_modules::segmenter::Mask;
use image::imageops;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

/// A connected foreground region in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Outer boundary, consecutive collinear points collapsed.
    pub boundary: Vec<Point<i32>>,
    /// Shoelace area of `boundary`.
    pub area: f64,
}

impl Blob {
    pub fn from_boundary(boundary: Vec<Point<i32>>) -> Self {
        let boundary = blob_extractor::simplify_boundary(boundary);
        let area = blob_extractor::area(&boundary);
        Self { boundary, area }
    }
}

pub mod blob_extractor {
    use super::*;

    /// Finds the externally visible blobs in `mask`. Any non-zero pixel is foreground.
    pub fn extract(mask: &Mask) -> Vec<Blob> {
        find_contours::<i32>(&with_margin(mask))
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .map(|contour| {
                let boundary = contour
                    .points
                    .into_iter()
                    .map(|p| Point::new(p.x - 1, p.y - 1))
                    .collect();
                Blob::from_boundary(boundary)
            })
            .collect()
    }

    /// Copy of `mask` surrounded by one pixel of background on every side.
    fn with_margin(mask: &Mask) -> Mask {
        let mut padded = Mask::new(mask.width() + 2, mask.height() + 2);
        imageops::replace(&mut padded, mask, 1, 1);
        padded
    }

    /// Absolute shoelace area of a closed polygon.
    pub fn area(points: &[Point<i32>]) -> f64 {
        if points.len() < 3 {
            return 0.0;
        }

        let doubled: i64 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
            .sum();

        doubled.abs() as f64 / 2.0
    }

    /// Drops every point that continues a straight run in the same direction,
    /// leaving only the corners of the boundary.
    pub fn simplify_boundary(points: Vec<Point<i32>>) -> Vec<Point<i32>> {
        let n = points.len();
        if n < 3 {
            return points;
        }

        let keep: Vec<bool> = (0..n)
            .map(|i| {
                let prev = points[(i + n - 1) % n];
                let current = points[i];
                let next = points[(i + 1) % n];
                !continues_straight(prev, current, next)
            })
            .collect();

        let simplified: Vec<Point<i32>> = points
            .iter()
            .zip(keep)
            .filter_map(|(point, keep)| keep.then_some(*point))
            .collect();

        if simplified.is_empty() {
            // Degenerate input where every point was a duplicate.
            vec![points[0]]
        } else {
            simplified
        }
    }

    fn continues_straight(prev: Point<i32>, current: Point<i32>, next: Point<i32>) -> bool {
        let (ax, ay) = ((current.x - prev.x) as i64, (current.y - prev.y) as i64);
        let (bx, by) = ((next.x - current.x) as i64, (next.y - current.y) as i64);

        if (ax, ay) == (0, 0) || (bx, by) == (0, 0) {
            return true;
        }

        let cross = ax * by - ay * bx;
        let dot = ax * bx + ay * by;
        cross == 0 && dot > 0
    }
}

#[cfg(test)]
mod tests {
    use super::blob_extractor::*;
    use super::*;
    use crate::core_modules::segmenter::FOREGROUND;
    use image::Luma;

    fn mask_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> Mask {
        let mut mask = Mask::new(width, height);
        for &(x0, y0, w, h) in rects {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    mask.put_pixel(x, y, Luma([FOREGROUND]));
                }
            }
        }
        mask
    }

    #[test]
    fn square_blob_has_four_corners_and_polygon_area() {
        let mask = mask_with_rects(20, 20, &[(3, 3, 10, 10)]);
        let blobs = extract(&mask);

        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].boundary.len(), 4);
        // Pixel centers span 9 units on each side.
        assert_eq!(blobs[0].area, 81.0);
    }

    #[test]
    fn separate_regions_are_separate_blobs() {
        let mask = mask_with_rects(40, 20, &[(1, 1, 5, 5), (10, 2, 6, 4), (25, 10, 8, 8)]);
        let mut areas: Vec<f64> = extract(&mask).iter().map(|b| b.area).collect();
        areas.sort_by(|a, b| a.partial_cmp(b).expect("finite"));
        assert_eq!(areas, vec![15.0, 16.0, 49.0]);
    }

    #[test]
    fn holes_and_nested_regions_are_not_reported() {
        let mut mask = mask_with_rects(20, 20, &[(2, 2, 12, 12)]);
        for y in 5..11 {
            for x in 5..11 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        // An island inside the hole.
        mask.put_pixel(7, 7, Luma([FOREGROUND]));
        mask.put_pixel(8, 7, Luma([FOREGROUND]));
        mask.put_pixel(7, 8, Luma([FOREGROUND]));
        mask.put_pixel(8, 8, Luma([FOREGROUND]));

        let blobs = extract(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 121.0);
    }

    #[test]
    fn single_pixel_and_line_have_zero_area() {
        let mask = mask_with_rects(20, 20, &[(2, 2, 1, 1), (6, 6, 8, 1)]);
        let blobs = extract(&mask);
        assert_eq!(blobs.len(), 2);
        assert!(blobs.iter().all(|b| b.area == 0.0));
    }

    #[test]
    fn empty_mask_has_no_blobs() {
        assert!(extract(&Mask::new(16, 16)).is_empty());
    }

    #[test]
    fn blobs_touching_the_border_are_found() {
        let mask = mask_with_rects(10, 10, &[(0, 0, 4, 4)]);
        let blobs = extract(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 9.0);
        assert!(blobs[0].boundary.contains(&Point::new(0, 0)));
    }

    #[test]
    fn blobs_on_every_edge_are_found() {
        let mask = mask_with_rects(
            20,
            20,
            &[(0, 7, 5, 5), (7, 0, 5, 5), (15, 7, 5, 5), (7, 15, 5, 5), (7, 7, 5, 5)],
        );
        let blobs = extract(&mask);
        assert_eq!(blobs.len(), 5);
        assert!(blobs.iter().all(|b| b.area == 16.0));
        assert!(
            blobs
                .iter()
                .flat_map(|b| &b.boundary)
                .all(|p| (0..20).contains(&p.x) && (0..20).contains(&p.y))
        );
    }

    #[test]
    fn left_edge_blob_keeps_its_hole_hidden() {
        let mut mask = mask_with_rects(20, 20, &[(0, 2, 10, 10)]);
        for y in 5..9 {
            for x in 3..7 {
                mask.put_pixel(x, y, Luma([0]));
            }
        }
        let blobs = extract(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 81.0);
    }

    #[test]
    fn full_frame_blob_is_traced_on_the_image_border() {
        let mask = mask_with_rects(8, 6, &[(0, 0, 8, 6)]);
        let blobs = extract(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 35.0);
    }

    #[test]
    fn area_ignores_orientation() {
        let clockwise = [Point::new(0, 0), Point::new(4, 0), Point::new(4, 3)];
        let counter: Vec<Point<i32>> = clockwise.iter().rev().copied().collect();
        assert_eq!(area(&clockwise), 6.0);
        assert_eq!(area(&counter), 6.0);
        assert_eq!(area(&clockwise[..2]), 0.0);
    }

    #[test]
    fn simplify_collapses_straight_runs_only() {
        let boundary = vec![
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(2, 0),
            Point::new(2, 1),
            Point::new(2, 2),
            Point::new(1, 2),
            Point::new(0, 2),
            Point::new(0, 1),
        ];
        let simplified = simplify_boundary(boundary.clone());
        assert_eq!(
            simplified,
            vec![Point::new(0, 0), Point::new(2, 0), Point::new(2, 2), Point::new(0, 2)]
        );
        assert_eq!(area(&simplified), area(&boundary));
    }

    #[test]
    fn simplify_keeps_reversals() {
        // A one-pixel-wide line is traced out and back.
        let boundary = vec![Point::new(0, 0), Point::new(1, 0), Point::new(2, 0), Point::new(1, 0)];
        assert_eq!(simplify_boundary(boundary), vec![Point::new(0, 0), Point::new(2, 0)]);
    }
}
