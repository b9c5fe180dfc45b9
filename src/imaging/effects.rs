//! Gaussian blur, unsharp-mask sharpening, mosaic, and the pointwise
//! contrast and gamma adaptors.
//!
//! ## Alpha-aware separable blur
//!
//! [`blur`] runs a horizontal pass (one row per item) and then a vertical
//! pass (one column per item) with the same 1-D kernel. Each tap is weighted
//! by kernel weight *and* neighbour alpha, so transparent neighbours never
//! bleed their (meaningless) colour into the result:
//!
//! ```text
//! wa   = Σ k(|d|) · α
//! rgb  = Σ k(|d|) · α · rgb / wa
//! α'   = wa / Σ k(|d|)        (sum over in-image taps only)
//! ```
//!
//! Taps falling outside the image are dropped rather than mirrored or
//! wrapped, and the alpha is renormalized by the weight actually summed.
//! Dividing by the full kernel mass instead would darken every edge.
//!
//! ## Sharpen
//!
//! `sharpen = clamp(2 · source − blur(source))`, byte by byte, alpha included.

use std::str::FromStr;

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use super::parallel::parallel;
use super::scanner::Scanner;
use super::source::SourceImage;

/// Edge length of a mosaic tile, in pixels.
const MOSAIC_BLOCK: u32 = 10;

fn gaussian(x: f64, sigma: f64) -> f64 {
    (-(x * x) / (2.0 * sigma * sigma)).exp() / (sigma * (2.0 * std::f64::consts::PI).sqrt())
}

/// Non-negative half of a Gaussian kernel: weights for distances `0..=radius`
/// with `radius = ceil(3σ)`.
///
/// Returns `None` when `sigma` is not a positive finite number; callers treat
/// that as "no convolution".
pub fn gaussian_kernel(sigma: f64) -> Option<Vec<f64>> {
    if !(sigma > 0.0 && sigma.is_finite()) {
        return None;
    }
    let radius = (sigma * 3.0).ceil() as usize;
    Some((0..=radius).map(|i| gaussian(i as f64, sigma)).collect())
}

/// Round half up and saturate to a byte.
#[inline]
fn clamp(v: f64) -> u8 {
    (v + 0.5).clamp(0.0, 255.0) as u8
}

fn into_image(width: u32, height: u32, pix: Vec<u8>) -> RgbaImage {
    RgbaImage::from_raw(width, height, pix).expect("buffer sized for its dimensions")
}

/// Canonical copy of `source`.
pub fn clone_canonical(source: &SourceImage) -> RgbaImage {
    let scanner = Scanner::new(source);
    let (w, h) = (scanner.width(), scanner.height());
    let mut dst = vec![0u8; w as usize * h as usize * 4];
    parallel(&mut dst, w as usize * 4, |rows, block| {
        scanner.scan(0, rows.start as u32, w, rows.end as u32, block);
    });
    into_image(w, h, dst)
}

/// Gaussian blur with standard deviation `sigma`.
///
/// `sigma <= 0` returns an exact canonical copy.
pub fn blur(source: &SourceImage, sigma: f64) -> RgbaImage {
    let Some(kernel) = gaussian_kernel(sigma) else {
        return clone_canonical(source);
    };
    let (w, h) = source.dimensions();
    debug!(
        sigma,
        radius = kernel.len() - 1,
        width = w,
        height = h,
        layout = source.layout_name(),
        "gaussian blur"
    );

    let horizontal = SourceImage::Rgba8(blur_horizontal(source, &kernel));
    blur_vertical(&horizontal, &kernel)
}

/// Convolve one line of `n` pixels (`src` holds `4n` floats) into `dst` (`4n` bytes).
///
/// Pixels whose weighted alpha is zero, or rounds to zero, are left untouched.
fn convolve_line(src: &[f64], kernel: &[f64], dst: &mut [u8]) {
    let n = src.len() / 4;
    let radius = kernel.len() - 1;
    for (i, d) in dst.chunks_exact_mut(4).enumerate() {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(n - 1);

        let (mut r, mut g, mut b, mut a, mut wsum) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for j in lo..=hi {
            let weight = kernel[i.abs_diff(j)];
            wsum += weight;
            let s = &src[j * 4..j * 4 + 4];
            let wa = s[3] * weight;
            r += s[0] * wa;
            g += s[1] * wa;
            b += s[2] * wa;
            a += wa;
        }

        // Alpha that rounds to zero keeps the pixel transparent black.
        let alpha = clamp(a / wsum);
        if a != 0.0 && alpha != 0 {
            let a_inv = 1.0 / a;
            d[0] = clamp(r * a_inv);
            d[1] = clamp(g * a_inv);
            d[2] = clamp(b * a_inv);
            d[3] = alpha;
        }
    }
}

fn blur_horizontal(source: &SourceImage, kernel: &[f64]) -> RgbaImage {
    let scanner = Scanner::new(source);
    let (w, h) = (scanner.width(), scanner.height());
    let row_len = w as usize * 4;
    let mut dst = vec![0u8; row_len * h as usize];

    parallel(&mut dst, row_len, |rows, block| {
        let mut line = vec![0u8; row_len];
        let mut line_f = vec![0f64; row_len];
        for (y, out) in rows.zip(block.chunks_exact_mut(row_len)) {
            scanner.scan(0, y as u32, w, y as u32 + 1, &mut line);
            for (f, &v) in line_f.iter_mut().zip(&line) {
                *f = v as f64;
            }
            convolve_line(&line_f, kernel, out);
        }
    });

    into_image(w, h, dst)
}

fn blur_vertical(source: &SourceImage, kernel: &[f64]) -> RgbaImage {
    let scanner = Scanner::new(source);
    let (w, h) = (scanner.width(), scanner.height());
    let col_len = h as usize * 4;

    // Column-major scratch: column x occupies bytes [x * col_len, (x + 1) * col_len).
    let mut columns = vec![0u8; col_len * w as usize];
    parallel(&mut columns, col_len, |cols, block| {
        let mut line = vec![0u8; col_len];
        let mut line_f = vec![0f64; col_len];
        for (x, out) in cols.zip(block.chunks_exact_mut(col_len)) {
            scanner.scan(x as u32, 0, x as u32 + 1, h, &mut line);
            for (f, &v) in line_f.iter_mut().zip(&line) {
                *f = v as f64;
            }
            convolve_line(&line_f, kernel, out);
        }
    });

    let row_len = w as usize * 4;
    let mut dst = vec![0u8; row_len * h as usize];
    parallel(&mut dst, row_len, |rows, block| {
        for (y, row) in rows.zip(block.chunks_exact_mut(row_len)) {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let i = x * col_len + y * 4;
                px.copy_from_slice(&columns[i..i + 4]);
            }
        }
    });

    into_image(w, h, dst)
}

/// Unsharp-mask sharpening: `clamp(2 · source − blur(source, sigma))`.
///
/// `sigma <= 0` returns an exact canonical copy.
pub fn sharpen(source: &SourceImage, sigma: f64) -> RgbaImage {
    if gaussian_kernel(sigma).is_none() {
        return clone_canonical(source);
    }
    let blurred = blur(source, sigma);
    let blurred = blurred.as_raw();

    let scanner = Scanner::new(source);
    let (w, h) = (scanner.width(), scanner.height());
    let row_len = w as usize * 4;
    let mut dst = vec![0u8; row_len * h as usize];

    parallel(&mut dst, row_len, |rows, block| {
        scanner.scan(0, rows.start as u32, w, rows.end as u32, block);
        let offset = rows.start * row_len;
        let len = block.len();
        for (d, &b) in block.iter_mut().zip(&blurred[offset..offset + len]) {
            *d = (2 * *d as i32 - b as i32).clamp(0, 255) as u8;
        }
    });

    into_image(w, h, dst)
}

/// Axis-aligned pixel rectangle, parsed from `x,y,width,height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Clip to a `width` x `height` image. `None` if nothing is left.
    pub fn intersect(self, width: u32, height: u32) -> Option<Rect> {
        let x2 = self.x.saturating_add(self.width).min(width);
        let y2 = self.y.saturating_add(self.height).min(height);
        (self.x < x2 && self.y < y2).then(|| Rect {
            x: self.x,
            y: self.y,
            width: x2 - self.x,
            height: y2 - self.y,
        })
    }
}

impl FromStr for Rect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid rectangle '{s}': {e}"))?;
        match parts[..] {
            [x, y, width, height] => Ok(Rect {
                x,
                y,
                width,
                height,
            }),
            _ => Err(format!("invalid rectangle '{s}': expected x,y,width,height")),
        }
    }
}

/// Pixelate `rect` with square tiles, each filled with the alpha-weighted
/// average of the pixels it covers.
///
/// Pixels outside `rect` are copied unchanged; a rectangle that misses the
/// image entirely yields a plain canonical copy.
pub fn mosaic(source: &SourceImage, rect: Rect) -> RgbaImage {
    let mut out = clone_canonical(source);
    let Some(rect) = rect.intersect(out.width(), out.height()) else {
        debug!(?rect, "mosaic rectangle outside image");
        return out;
    };

    let (x_end, y_end) = (rect.x + rect.width, rect.y + rect.height);
    for by in (rect.y..y_end).step_by(MOSAIC_BLOCK as usize) {
        for bx in (rect.x..x_end).step_by(MOSAIC_BLOCK as usize) {
            let bx2 = (bx + MOSAIC_BLOCK).min(x_end);
            let by2 = (by + MOSAIC_BLOCK).min(y_end);

            let (mut r, mut g, mut b, mut a) = (0u64, 0u64, 0u64, 0u64);
            for y in by..by2 {
                for x in bx..bx2 {
                    let [pr, pg, pb, pa] = out.get_pixel(x, y).0.map(u64::from);
                    r += pr * pa;
                    g += pg * pa;
                    b += pb * pa;
                    a += pa;
                }
            }

            let count = ((bx2 - bx) * (by2 - by)) as u64;
            let avg = if a == 0 {
                [0, 0, 0, 0]
            } else {
                [
                    ((r + a / 2) / a) as u8,
                    ((g + a / 2) / a) as u8,
                    ((b + a / 2) / a) as u8,
                    ((a + count / 2) / count) as u8,
                ]
            };
            for y in by..by2 {
                for x in bx..bx2 {
                    out.put_pixel(x, y, image::Rgba(avg));
                }
            }
        }
    }
    out
}

/// Contrast adjustment by `percent` in `[-100, 100]`; 0 leaves the image unchanged.
///
/// Pointwise tone maps are delegated to the `image` crate.
pub fn adjust_contrast(img: &DynamicImage, percent: f32) -> DynamicImage {
    let percent = percent.clamp(-100.0, 100.0);
    if percent == 0.0 {
        return img.clone();
    }
    img.adjust_contrast(percent)
}

/// Gamma correction of the colour channels; alpha is left alone.
///
/// `gamma < 1` darkens, `gamma > 1` lightens. Values at or below zero are
/// treated as a tiny positive gamma. RGB8 input stays RGB8, anything else
/// comes back as RGBA8.
pub fn adjust_gamma(img: &DynamicImage, gamma: f64) -> DynamicImage {
    if gamma == 1.0 {
        return img.clone();
    }
    let exponent = 1.0 / gamma.max(0.0001);
    let lut: [u8; 256] =
        std::array::from_fn(|i| clamp((i as f64 / 255.0).powf(exponent) * 255.0));

    match img {
        DynamicImage::ImageRgb8(buf) => {
            let mut out = buf.clone();
            for p in out.pixels_mut() {
                p.0 = p.0.map(|c| lut[c as usize]);
            }
            out.into()
        }
        _ => {
            let mut out = img.to_rgba8();
            for p in out.pixels_mut() {
                for c in &mut p.0[..3] {
                    *c = lut[*c as usize];
                }
            }
            out.into()
        }
    }
}

/// Lanczos3 resize. A zero `width` or `height` is derived from the other
/// so the aspect ratio is kept; both zero is `None`.
pub fn resize(img: &DynamicImage, width: u32, height: u32) -> Option<DynamicImage> {
    let (src_w, src_h) = (img.width(), img.height());
    if src_w == 0 || src_h == 0 {
        return None;
    }
    let (w, h) = match (width, height) {
        (0, 0) => return None,
        (0, h) => (scaled(src_w, h, src_h), h),
        (w, 0) => (w, scaled(src_h, w, src_w)),
        dims => dims,
    };
    debug!(from_w = src_w, from_h = src_h, to_w = w, to_h = h, "lanczos3 resize");
    Some(img.resize_exact(w, h, FilterType::Lanczos3))
}

/// `len * num / den`, rounded, at least 1.
fn scaled(len: u32, num: u32, den: u32) -> u32 {
    ((len as f64 * num as f64 / den as f64) + 0.5).floor().max(1.0) as u32
}
