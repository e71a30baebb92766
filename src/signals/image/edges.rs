// Canny edge detection — 3x3 Sobel gradients, L1 magnitude, non-maximum
// suppression along the quantised gradient direction, then hysteresis.

use image::GrayImage;

pub const LOW_THRESHOLD: i32 = 50;
pub const HIGH_THRESHOLD: i32 = 150;

/// tan(22.5°) in the form used to bucket gradient directions.
const TAN_22_5: f64 = 0.414_213_562_373_095;

/// Edge map of `gray` as a row-major mask.
pub fn canny(gray: &GrayImage, low: i32, high: i32) -> Vec<bool> {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }

    let px = |x: isize, y: isize| -> i32 {
        let x = x.clamp(0, w as isize - 1) as u32;
        let y = y.clamp(0, h as isize - 1) as u32;
        gray.get_pixel(x, y).0[0] as i32
    };

    let mut dx = vec![0i32; w * h];
    let mut dy = vec![0i32; w * h];
    let mut mag = vec![0i32; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let gx = (px(x + 1, y - 1) + 2 * px(x + 1, y) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x - 1, y) + px(x - 1, y + 1));
            let gy = (px(x - 1, y + 1) + 2 * px(x, y + 1) + px(x + 1, y + 1))
                - (px(x - 1, y - 1) + 2 * px(x, y - 1) + px(x + 1, y - 1));
            let i = y as usize * w + x as usize;
            dx[i] = gx;
            dy[i] = gy;
            mag[i] = gx.abs() + gy.abs();
        }
    }

    let at = |x: isize, y: isize| -> i32 {
        if x < 0 || y < 0 || x >= w as isize || y >= h as isize {
            0
        } else {
            mag[y as usize * w + x as usize]
        }
    };

    // 0 = suppressed, 1 = weak candidate, 2 = strong edge
    let mut state = vec![0u8; w * h];
    let mut stack = Vec::new();
    for y in 0..h as isize {
        for x in 0..w as isize {
            let i = y as usize * w + x as usize;
            let m = mag[i];
            if m <= low {
                continue;
            }

            let xs = dx[i].abs() as f64;
            let ys = dy[i].abs() as f64;
            let tg22 = xs * TAN_22_5;
            let is_max = if ys < tg22 {
                m > at(x - 1, y) && m >= at(x + 1, y)
            } else if ys > tg22 + 2.0 * xs {
                m > at(x, y - 1) && m >= at(x, y + 1)
            } else {
                let s: isize = if (dx[i] < 0) != (dy[i] < 0) { -1 } else { 1 };
                m > at(x - s, y - 1) && m > at(x + s, y + 1)
            };
            if !is_max {
                continue;
            }

            if m > high {
                state[i] = 2;
                stack.push((x, y));
            } else {
                state[i] = 1;
            }
        }
    }

    while let Some((x, y)) = stack.pop() {
        for ny in y - 1..=y + 1 {
            for nx in x - 1..=x + 1 {
                if nx < 0 || ny < 0 || nx >= w as isize || ny >= h as isize {
                    continue;
                }
                let j = ny as usize * w + nx as usize;
                if state[j] == 1 {
                    state[j] = 2;
                    stack.push((nx, ny));
                }
            }
        }
    }

    state.into_iter().map(|s| s == 2).collect()
}

/// Fraction of pixels that are edges under the default thresholds.
pub fn edge_density(gray: &GrayImage) -> f64 {
    let edges = canny(gray, LOW_THRESHOLD, HIGH_THRESHOLD);
    if edges.is_empty() {
        return 0.0;
    }
    edges.iter().filter(|&&e| e).count() as f64 / edges.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn flat_image_has_no_edges() {
        let gray = GrayImage::from_pixel(50, 50, Luma([128]));
        assert_eq!(edge_density(&gray), 0.0);
    }

    #[test]
    fn single_step_gives_a_thin_line() {
        let gray = GrayImage::from_fn(100, 100, |x, _| Luma([if x < 50 { 0 } else { 255 }]));
        let edges = canny(&gray, LOW_THRESHOLD, HIGH_THRESHOLD);
        // One edge pixel per row, on the dark side of the step.
        for y in 0..100 {
            let row = &edges[y * 100..(y + 1) * 100];
            assert_eq!(row.iter().filter(|&&e| e).count(), 1, "row {y}");
            assert!(row[49]);
        }
        assert!((edge_density(&gray) - 0.01).abs() < 1e-9);
    }

    #[test]
    fn fine_checkerboard_is_edge_dense() {
        let gray = GrayImage::from_fn(64, 64, |x, y| {
            Luma([if (x / 4 + y / 4) % 2 == 0 { 0 } else { 255 }])
        });
        assert!(edge_density(&gray) > 0.1);
    }

    #[test]
    fn weak_step_below_low_threshold_is_ignored() {
        // Step of 10 gives an L1 magnitude of 40.
        let gray = GrayImage::from_fn(30, 30, |x, _| Luma([if x < 15 { 100 } else { 110 }]));
        assert_eq!(edge_density(&gray), 0.0);
    }

    #[test]
    fn empty_image_has_zero_density() {
        assert_eq!(edge_density(&GrayImage::new(0, 0)), 0.0);
    }
}
