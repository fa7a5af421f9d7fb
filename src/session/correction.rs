use crate::capture::DepthFrame;

/// Neighbours whose depth is within this fraction count as similar.
const SIMILARITY_TOLERANCE: f32 = 0.05;

/// Pixels with fewer similar neighbours than this are treated as speckle.
const MIN_SIMILAR_NEIGHBOURS: usize = 2;

/// Removes isolated depth readings in place.
///
/// A pixel is cleared to `0.0` (no reading) when fewer than
/// `MIN_SIMILAR_NEIGHBOURS` of its eight neighbours hold a depth within
/// `SIMILARITY_TOLERANCE` of its own. Decisions are made against the
/// uncorrected frame so the result does not depend on scan order.
pub fn apply_depth_correction(frame: &mut DepthFrame) -> usize {
    if !frame.is_valid() {
        return 0;
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let source = frame.pixels.clone();
    let mut removed = 0;

    for y in 0..height {
        for x in 0..width {
            let depth = source[y * width + x];
            if !has_reading(depth) {
                continue;
            }

            let similar = neighbours(x, y, width, height)
                .filter(|&(nx, ny)| {
                    let other = source[ny * width + nx];
                    has_reading(other) && (other - depth).abs() <= depth * SIMILARITY_TOLERANCE
                })
                .count();

            if similar < MIN_SIMILAR_NEIGHBOURS {
                frame.pixels[y * width + x] = 0.0;
                removed += 1;
            }
        }
    }

    removed
}

fn has_reading(depth: f32) -> bool {
    depth.is_finite() && depth > 0.0
}

fn neighbours(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> {
    (-1i64..=1)
        .flat_map(|dy| (-1i64..=1).map(move |dx| (dx, dy)))
        .filter(|&(dx, dy)| dx != 0 || dy != 0)
        .filter_map(move |(dx, dy)| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            (nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height)
                .then_some((nx as usize, ny as usize))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Frame;

    #[test]
    fn test_isolated_pixel_is_removed() {
        let mut pixels = vec![0.0f32; 9];
        pixels[4] = 1200.0;
        let mut frame = Frame::new(0.0, 3, 3, pixels);

        assert_eq!(apply_depth_correction(&mut frame), 1);
        assert!(frame.pixels.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_plateau_is_kept() {
        let mut frame = Frame::new(0.0, 4, 4, vec![1000.0f32; 16]);
        frame.pixels[5] = 1020.0;

        assert_eq!(apply_depth_correction(&mut frame), 0);
        assert_eq!(frame.pixels[5], 1020.0);
    }

    #[test]
    fn test_outlier_inside_plateau_is_removed() {
        let mut frame = Frame::new(0.0, 3, 3, vec![1000.0f32; 9]);
        frame.pixels[4] = 3000.0;

        assert_eq!(apply_depth_correction(&mut frame), 1);
        assert_eq!(frame.pixels[4], 0.0);
        assert_eq!(frame.pixels[0], 1000.0);
    }

    #[test]
    fn test_invalid_frame_is_untouched() {
        let mut frame = Frame::new(0.0, 3, 3, vec![1000.0f32; 4]);
        assert_eq!(apply_depth_correction(&mut frame), 0);
        assert_eq!(frame.pixels, vec![1000.0; 4]);
    }
}
