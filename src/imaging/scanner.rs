//! Conversion of any [`SourceImage`] into canonical RGBA scanlines.
//!
//! The canonical buffer is row-major, 4 bytes per pixel, 8-bit
//! non-premultiplied RGBA, stride `width * 4`. Every pixel with alpha 0 has
//! colour channels 0.
//!
//! Layout dispatch happens once per [`Scanner::scan`] call; each variant has
//! its own tight loop so the hot path never branches on layout per pixel.

use super::source::{
    Gray16Image, PalettedImage, PixelSource, PremultipliedImage, Rgba16Image, SourceImage,
    SubsampleRatio, YCbCrImage,
};
use image::{GrayImage, RgbImage, RgbaImage};

/// Read-only view over a [`SourceImage`] that fills canonical buffers.
///
/// Cheap to share between rayon workers: scanning never mutates the scanner
/// or the source, so disjoint rectangles can be scanned concurrently.
pub struct Scanner<'a> {
    source: &'a SourceImage,
    width: u32,
    height: u32,
    /// Canonical colour for every possible index byte. Only built for paletted sources.
    palette: Option<Box<[[u8; 4]; 256]>>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a SourceImage) -> Self {
        let (width, height) = source.dimensions();
        let palette = match source {
            SourceImage::Paletted(img) => Some(palette_table(img)),
            _ => None,
        };
        Self {
            source,
            width,
            height,
            palette,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill `dst` with the canonical pixels of the half-open rectangle
    /// `[x1, x2) x [y1, y2)`.
    ///
    /// `dst` must be exactly `(x2 - x1) * (y2 - y1) * 4` bytes; the rectangle
    /// must lie inside the image.
    pub fn scan(&self, x1: u32, y1: u32, x2: u32, y2: u32, dst: &mut [u8]) {
        debug_assert!(x1 <= x2 && x2 <= self.width, "x range {x1}..{x2} out of bounds");
        debug_assert!(y1 <= y2 && y2 <= self.height, "y range {y1}..{y2} out of bounds");
        debug_assert_eq!(dst.len(), (x2 - x1) as usize * (y2 - y1) as usize * 4);

        let rect = Rect {
            x1: x1 as usize,
            y1: y1 as usize,
            x2: x2 as usize,
            y2: y2 as usize,
        };
        if rect.is_empty() {
            return;
        }
        match self.source {
            SourceImage::Rgba8(img) => scan_rgba8(img, rect, dst),
            SourceImage::Rgb8(img) => scan_rgb8(img, rect, dst),
            SourceImage::Rgba16(img) => scan_rgba16(img, rect, dst),
            SourceImage::PremultipliedRgba8(img) => scan_premultiplied8(img, rect, dst),
            SourceImage::PremultipliedRgba16(img) => scan_premultiplied16(img, rect, dst),
            SourceImage::Gray8(img) => scan_gray8(img, rect, dst),
            SourceImage::Gray16(img) => scan_gray16(img, rect, dst),
            SourceImage::YCbCr(img) => scan_ycbcr(img, rect, dst),
            SourceImage::Paletted(img) => {
                // Built in `new` for every paletted source.
                if let Some(table) = &self.palette {
                    scan_paletted(img, table, rect, dst)
                }
            }
            SourceImage::Generic(src) => scan_generic(src.as_ref(), rect, dst),
        }
    }
}

#[derive(Clone, Copy)]
struct Rect {
    x1: usize,
    y1: usize,
    x2: usize,
    y2: usize,
}

impl Rect {
    fn width(self) -> usize {
        self.x2 - self.x1
    }

    fn is_empty(self) -> bool {
        self.x1 == self.x2 || self.y1 == self.y2
    }
}

fn palette_table(img: &PalettedImage) -> Box<[[u8; 4]; 256]> {
    let mut table = Box::new([[0u8; 4]; 256]);
    for (slot, c) in table.iter_mut().zip(img.palette()) {
        *slot = if c.0[3] == 0 { [0; 4] } else { c.0 };
    }
    table
}

/// Canonical pixel from 16-bit premultiplied samples.
///
/// Branches on the 8-bit output alpha so a pixel that ends up fully
/// transparent never carries colour.
#[inline]
pub(crate) fn unpremultiply16(r: u32, g: u32, b: u32, a: u32) -> [u8; 4] {
    match a >> 8 {
        0 => [0, 0, 0, 0],
        0xff => [(r >> 8) as u8, (g >> 8) as u8, (b >> 8) as u8, 0xff],
        a8 => {
            let un = |c: u32| ((c * 0xffff / a) >> 8).min(0xff) as u8;
            [un(r), un(g), un(b), a8 as u8]
        }
    }
}

fn scan_rgba8(img: &RgbaImage, rect: Rect, dst: &mut [u8]) {
    let stride = img.width() as usize * 4;
    let size = rect.width() * 4;
    let pix = img.as_raw();
    for (y, d) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(size)) {
        let i = y * stride + rect.x1 * 4;
        d.copy_from_slice(&pix[i..i + size]);
    }
}

fn scan_rgb8(img: &RgbImage, rect: Rect, dst: &mut [u8]) {
    let stride = img.width() as usize * 3;
    let pix = img.as_raw();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let i = y * stride + rect.x1 * 3;
        let src = &pix[i..i + rect.width() * 3];
        for (d, s) in row.chunks_exact_mut(4).zip(src.chunks_exact(3)) {
            d.copy_from_slice(&[s[0], s[1], s[2], 0xff]);
        }
    }
}

fn scan_rgba16(img: &Rgba16Image, rect: Rect, dst: &mut [u8]) {
    let stride = img.width() as usize * 4;
    let pix = img.as_raw();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let i = y * stride + rect.x1 * 4;
        let src = &pix[i..i + rect.width() * 4];
        for (d, s) in row.iter_mut().zip(src) {
            *d = (s >> 8) as u8;
        }
    }
}

fn scan_premultiplied8(img: &PremultipliedImage<u8>, rect: Rect, dst: &mut [u8]) {
    let stride = img.stride();
    let pix = img.as_raw();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let i = y * stride + rect.x1 * 4;
        let src = &pix[i..i + rect.width() * 4];
        for (d, s) in row.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            match s[3] {
                0 => d.copy_from_slice(&[0, 0, 0, 0]),
                0xff => d.copy_from_slice(s),
                a => {
                    let a = a as u32;
                    let un = |c: u8| ((c as u32 * 0xff + a / 2) / a).min(0xff) as u8;
                    d[0] = un(s[0]);
                    d[1] = un(s[1]);
                    d[2] = un(s[2]);
                    d[3] = a as u8;
                }
            }
        }
    }
}

fn scan_premultiplied16(img: &PremultipliedImage<u16>, rect: Rect, dst: &mut [u8]) {
    let stride = img.stride();
    let pix = img.as_raw();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let i = y * stride + rect.x1 * 4;
        let src = &pix[i..i + rect.width() * 4];
        for (d, s) in row.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            d.copy_from_slice(&unpremultiply16(
                s[0] as u32,
                s[1] as u32,
                s[2] as u32,
                s[3] as u32,
            ));
        }
    }
}

fn scan_gray8(img: &GrayImage, rect: Rect, dst: &mut [u8]) {
    let stride = img.width() as usize;
    let pix = img.as_raw();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let i = y * stride + rect.x1;
        for (d, &c) in row.chunks_exact_mut(4).zip(&pix[i..i + rect.width()]) {
            d.copy_from_slice(&[c, c, c, 0xff]);
        }
    }
}

fn scan_gray16(img: &Gray16Image, rect: Rect, dst: &mut [u8]) {
    let stride = img.width() as usize;
    let pix = img.as_raw();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let i = y * stride + rect.x1;
        for (d, &c) in row.chunks_exact_mut(4).zip(&pix[i..i + rect.width()]) {
            let c = (c >> 8) as u8;
            d.copy_from_slice(&[c, c, c, 0xff]);
        }
    }
}

/// Saturate a 16.16 fixed-point channel to a byte.
///
/// If the top byte is clear the value is in range and the integer part is
/// used; otherwise the sign decides between 0 and 0xff.
#[inline]
fn clamp_fixed(v: i32) -> u8 {
    if (v as u32) & 0xff00_0000 == 0 {
        (v >> 16) as u8
    } else {
        !(v >> 31) as u8
    }
}

/// Full-range Y'CbCr to RGB in 16.16 fixed point.
///
/// R = Y + 1.40200 (Cr-128), G = Y - 0.34414 (Cb-128) - 0.71414 (Cr-128),
/// B = Y + 1.77200 (Cb-128).
#[inline]
fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 4] {
    let yy = y as i32 * 0x10101;
    let cb = cb as i32 - 128;
    let cr = cr as i32 - 128;
    [
        clamp_fixed(yy + 91881 * cr),
        clamp_fixed(yy - 22554 * cb - 46802 * cr),
        clamp_fixed(yy + 116130 * cb),
        0xff,
    ]
}

fn scan_ycbcr(img: &YCbCrImage, rect: Rect, dst: &mut [u8]) {
    let ratio: SubsampleRatio = img.ratio;
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let iy = y * img.y_stride;
        let cy = if ratio.halves_y() { y / 2 } else { y };
        let c_base = cy * img.c_stride;
        for (x, d) in (rect.x1..rect.x2).zip(row.chunks_exact_mut(4)) {
            let cx = if ratio.halves_x() { x / 2 } else { x };
            let ic = c_base + cx;
            d.copy_from_slice(&ycbcr_to_rgb(img.y[iy + x], img.cb[ic], img.cr[ic]));
        }
    }
}

fn scan_paletted(img: &PalettedImage, table: &[[u8; 4]; 256], rect: Rect, dst: &mut [u8]) {
    let stride = img.dimensions().0 as usize;
    let pix = img.indices();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let i = y * stride + rect.x1;
        for (d, &idx) in row.chunks_exact_mut(4).zip(&pix[i..i + rect.width()]) {
            d.copy_from_slice(&table[idx as usize]);
        }
    }
}

fn scan_generic(src: &dyn PixelSource, rect: Rect, dst: &mut [u8]) {
    let b = src.bounds();
    for (y, row) in (rect.y1..rect.y2).zip(dst.chunks_exact_mut(rect.width() * 4)) {
        let ay = b.min_y + y as i64;
        for (x, d) in (rect.x1..rect.x2).zip(row.chunks_exact_mut(4)) {
            let [r, g, bl, a] = src.rgba16_premultiplied(b.min_x + x as i64, ay);
            d.copy_from_slice(&unpremultiply16(r as u32, g as u32, bl as u32, a as u32));
        }
    }
}
