//! Perceptual image comparison and diff rendering
//!
//! Equality is a perceptual match within a tolerance, not byte identity.
//! Pixels are compared by CIE76 distance in CIELAB space after compositing
//! over white, so alpha differences count. Tolerance 0 demands exact color
//! equality per pixel. The default (non-strict) mode additionally forgives
//! pixels that look like anti-aliasing artifacts: a divergent pixel passes
//! when each image's pixel has a matching color somewhere in the other
//! image's 3x3 neighborhood, the signature of a sub-pixel edge shift.

use image::{Rgba, RgbaImage};

/// Color used to mark divergent pixels in diff artifacts.
pub const HIGHLIGHT_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);

/// Settings shared by comparison and diff rendering within one run
#[derive(Debug, Clone)]
pub struct CompareOptions {
    /// Maximum per-pixel CIELAB distance still considered equal (0 = exact)
    pub tolerance: f64,
    /// Disables anti-aliasing forgiveness
    pub strict: bool,
}

impl CompareOptions {
    /// Non-strict comparison at the given tolerance, the default mode.
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            strict: false,
        }
    }
}

/// Outcome of comparing a capture against a baseline
#[derive(Debug, Clone)]
pub struct Comparison {
    pub equal: bool,
    /// Pixels that diverge beyond tolerance (after anti-aliasing forgiveness)
    pub divergent_pixels: usize,
    /// Largest per-pixel distance seen over the overlapping area
    pub max_distance: f64,
}

/// Compares two images with the configured tolerance.
///
/// Images of different dimensions are never equal; the non-overlapping area
/// counts as divergent.
pub fn compare(current: &RgbaImage, reference: &RgbaImage, options: &CompareOptions) -> Comparison {
    let mask = DiffMask::build(current, reference, options);
    Comparison {
        equal: mask.divergent == 0,
        divergent_pixels: mask.divergent,
        max_distance: mask.max_distance,
    }
}

/// Renders a diff image: the reference with every divergent pixel painted in
/// [`HIGHLIGHT_COLOR`].
///
/// The canvas spans the union of both dimensions; area outside the reference
/// is black where it is not highlighted.
pub fn render_diff(
    current: &RgbaImage,
    reference: &RgbaImage,
    options: &CompareOptions,
) -> RgbaImage {
    let mask = DiffMask::build(current, reference, options);
    let mut out = RgbaImage::from_pixel(mask.width, mask.height, Rgba([0, 0, 0, 255]));

    for y in 0..mask.height {
        for x in 0..mask.width {
            let pixel = if mask.is_divergent(x, y) {
                HIGHLIGHT_COLOR
            } else if x < reference.width() && y < reference.height() {
                *reference.get_pixel(x, y)
            } else {
                Rgba([0, 0, 0, 255])
            };
            out.put_pixel(x, y, pixel);
        }
    }

    out
}

/// Per-pixel divergence over the union of both images' dimensions
struct DiffMask {
    width: u32,
    height: u32,
    flags: Vec<bool>,
    divergent: usize,
    max_distance: f64,
}

impl DiffMask {
    fn build(current: &RgbaImage, reference: &RgbaImage, options: &CompareOptions) -> Self {
        let cur = LabPlane::from_image(current);
        let refp = LabPlane::from_image(reference);

        let width = cur.width.max(refp.width);
        let height = cur.height.max(refp.height);
        let mut flags = vec![false; width as usize * height as usize];
        let mut divergent = 0usize;
        let mut max_distance = 0.0f64;

        for y in 0..height {
            for x in 0..width {
                let in_both =
                    x < cur.width && y < cur.height && x < refp.width && y < refp.height;
                let is_divergent = if !in_both {
                    true
                } else {
                    let d = distance(cur.get(x, y), refp.get(x, y));
                    if d > max_distance {
                        max_distance = d;
                    }
                    if d <= options.tolerance {
                        false
                    } else {
                        options.strict
                            || !is_antialiasing_artifact(&cur, &refp, x, y, options.tolerance)
                    }
                };
                if is_divergent {
                    flags[(y * width + x) as usize] = true;
                    divergent += 1;
                }
            }
        }

        Self {
            width,
            height,
            flags,
            divergent,
            max_distance,
        }
    }

    fn is_divergent(&self, x: u32, y: u32) -> bool {
        self.flags[(y * self.width + x) as usize]
    }
}

/// CIELAB values for every pixel of one image, computed once up front
struct LabPlane {
    width: u32,
    height: u32,
    data: Vec<[f64; 3]>,
}

impl LabPlane {
    fn from_image(image: &RgbaImage) -> Self {
        let data = image.pixels().map(|p| lab_over_white(*p)).collect();
        Self {
            width: image.width(),
            height: image.height(),
            data,
        }
    }

    fn get(&self, x: u32, y: u32) -> [f64; 3] {
        self.data[(y * self.width + x) as usize]
    }
}

/// A divergent pixel is forgiven as anti-aliasing noise when both images can
/// explain it as a sub-pixel shift: the current pixel's color appears within
/// tolerance in the reference's 3x3 neighborhood and vice versa.
fn is_antialiasing_artifact(
    current: &LabPlane,
    reference: &LabPlane,
    x: u32,
    y: u32,
    tolerance: f64,
) -> bool {
    has_close_neighbor(current.get(x, y), reference, x, y, tolerance)
        && has_close_neighbor(reference.get(x, y), current, x, y, tolerance)
}

fn has_close_neighbor(color: [f64; 3], plane: &LabPlane, x: u32, y: u32, tolerance: f64) -> bool {
    let x0 = x.saturating_sub(1);
    let y0 = y.saturating_sub(1);
    let x1 = (x + 1).min(plane.width.saturating_sub(1));
    let y1 = (y + 1).min(plane.height.saturating_sub(1));

    for ny in y0..=y1 {
        for nx in x0..=x1 {
            if nx == x && ny == y {
                continue;
            }
            if distance(color, plane.get(nx, ny)) <= tolerance {
                return true;
            }
        }
    }
    false
}

fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dl = a[0] - b[0];
    let da = a[1] - b[1];
    let db = a[2] - b[2];
    (dl * dl + da * da + db * db).sqrt()
}

fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_over_white(pixel: Rgba<u8>) -> [f64; 3] {
    let alpha = pixel[3] as f64 / 255.0;
    let blend = |c: u8| srgb_to_linear(c) * alpha + (1.0 - alpha);

    let (r, g, b) = (blend(pixel[0]), blend(pixel[1]), blend(pixel[2]));

    // linear sRGB -> XYZ (D65)
    let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
    let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
    let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;

    // XYZ -> Lab, D65 reference white
    const DELTA: f64 = 6.0 / 29.0;
    let f = |t: f64| {
        if t > DELTA * DELTA * DELTA {
            t.cbrt()
        } else {
            t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
        }
    };
    let (fx, fy, fz) = (f(x / 0.95047), f(y), f(z / 1.08883));

    [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn test_identical_images_are_equal() {
        let img = solid(16, 16, [120, 80, 200, 255]);
        let result = compare(&img, &img, &CompareOptions::new(0.0));
        assert!(result.equal);
        assert_eq!(result.divergent_pixels, 0);
        assert_eq!(result.max_distance, 0.0);
    }

    #[test]
    fn test_tolerance_monotonicity() {
        let a = solid(8, 8, [100, 100, 100, 255]);
        let b = solid(8, 8, [110, 104, 98, 255]);

        let measured = compare(&a, &b, &CompareOptions::new(0.0));
        assert!(!measured.equal);
        let d = measured.max_distance;
        assert!(d > 0.0);

        assert!(compare(&a, &b, &CompareOptions::new(d)).equal);
        assert!(!compare(&a, &b, &CompareOptions::new(d * 0.9)).equal);
    }

    #[test]
    fn test_antialiasing_shift_forgiven_by_default() {
        // A one-pixel vertical shift of a horizontal line reads as an
        // anti-aliasing artifact, not a regression.
        let mut reference = solid(16, 16, [255, 255, 255, 255]);
        let mut current = solid(16, 16, [255, 255, 255, 255]);
        for x in 0..16 {
            reference.put_pixel(x, 5, Rgba([0, 0, 0, 255]));
            current.put_pixel(x, 6, Rgba([0, 0, 0, 255]));
        }

        assert!(compare(&current, &reference, &CompareOptions::new(0.0)).equal);

        let strict = CompareOptions {
            tolerance: 0.0,
            strict: true,
        };
        assert!(!compare(&current, &reference, &strict).equal);
    }

    #[test]
    fn test_solid_color_difference_not_forgiven() {
        let a = solid(8, 8, [255, 0, 0, 255]);
        let b = solid(8, 8, [0, 0, 255, 255]);
        let result = compare(&a, &b, &CompareOptions::new(0.0));
        assert!(!result.equal);
        assert_eq!(result.divergent_pixels, 64);
    }

    #[test]
    fn test_alpha_difference_counts() {
        let a = solid(4, 4, [0, 0, 0, 255]);
        let b = solid(4, 4, [0, 0, 0, 0]);
        assert!(!compare(&a, &b, &CompareOptions::new(0.0)).equal);
    }

    #[test]
    fn test_dimension_mismatch_is_not_equal() {
        let a = solid(10, 10, [50, 50, 50, 255]);
        let b = solid(8, 10, [50, 50, 50, 255]);
        let result = compare(&a, &b, &CompareOptions::new(1000.0));
        assert!(!result.equal);
        assert_eq!(result.divergent_pixels, 2 * 10);
    }

    #[test]
    fn test_render_diff_highlights_divergence() {
        let reference = solid(8, 8, [0, 128, 0, 255]);
        let mut current = reference.clone();
        current.put_pixel(2, 3, Rgba([255, 255, 255, 255]));

        let diff = render_diff(&current, &reference, &CompareOptions::new(0.0));
        assert_eq!(diff.dimensions(), (8, 8));
        assert_eq!(*diff.get_pixel(2, 3), HIGHLIGHT_COLOR);
        assert_eq!(*diff.get_pixel(0, 0), Rgba([0, 128, 0, 255]));
    }

    #[test]
    fn test_render_diff_spans_union_canvas() {
        let reference = solid(8, 8, [10, 10, 10, 255]);
        let current = solid(12, 6, [10, 10, 10, 255]);

        let diff = render_diff(&current, &reference, &CompareOptions::new(0.0));
        assert_eq!(diff.dimensions(), (12, 8));
        // outside the overlap everything is divergent
        assert_eq!(*diff.get_pixel(11, 0), HIGHLIGHT_COLOR);
        assert_eq!(*diff.get_pixel(0, 7), HIGHLIGHT_COLOR);
    }
}
