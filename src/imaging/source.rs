//! Source image layouts understood by the [scanner](super::scanner).
//!
//! A [`SourceImage`] is a closed set of concrete pixel layouts. Each variant
//! gets its own conversion routine in the scanner; anything outside the set
//! goes through [`SourceImage::Generic`] and the per-pixel [`PixelSource`]
//! query.
//!
//! | Variant | Storage | Notes |
//! |---|---|---|
//! | `Rgba8` | `image::RgbaImage` | already canonical |
//! | `Rgb8` | `image::RgbImage` | opaque, what JPEG decodes to |
//! | `Rgba16` | `ImageBuffer<Rgba<u16>>` | non-premultiplied |
//! | `PremultipliedRgba8` / `16` | [`PremultipliedImage`] | colour scaled by alpha |
//! | `Gray8` / `Gray16` | `image::GrayImage` / `ImageBuffer<Luma<u16>>` | opaque |
//! | `YCbCr` | [`YCbCrImage`] | planar, with [`SubsampleRatio`] |
//! | `Paletted` | [`PalettedImage`] | index bytes + colour table |
//! | `Generic` | `Box<dyn PixelSource>` | any other layout |

use image::{
    DynamicImage, GenericImageView, GrayImage, ImageBuffer, Luma, Rgba, RgbImage, RgbaImage,
};

/// 16-bit non-premultiplied RGBA buffer.
pub type Rgba16Image = ImageBuffer<Rgba<u16>, Vec<u16>>;

/// 16-bit grayscale buffer.
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Pixel rectangle of a [`PixelSource`] in its own coordinate space.
///
/// `min_x`/`min_y` is the coordinate of the top-left pixel; it need not be zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i64,
    pub min_y: i64,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            width,
            height,
        }
    }
}

/// Per-pixel colour query for layouts the scanner has no dedicated routine for.
pub trait PixelSource: Send + Sync {
    fn bounds(&self) -> Bounds;

    /// Colour at absolute coordinates `(x, y)` as 16-bit premultiplied RGBA.
    fn rgba16_premultiplied(&self, x: i64, y: i64) -> [u16; 4];
}

/// Packed RGBA with colour channels already multiplied by alpha.
///
/// Row-major, four samples per pixel, stride = `width * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PremultipliedImage<T> {
    width: u32,
    height: u32,
    pix: Vec<T>,
}

impl<T> PremultipliedImage<T> {
    /// Wrap raw samples. Returns `None` if `pix` is not exactly `width * height * 4` long.
    pub fn from_raw(width: u32, height: u32, pix: Vec<T>) -> Option<Self> {
        (pix.len() == width as usize * height as usize * 4).then_some(Self { width, height, pix })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[T] {
        &self.pix
    }

    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }
}

impl PremultipliedImage<u8> {
    /// Premultiply a canonical (non-premultiplied) buffer, rounding to nearest.
    pub fn from_rgba(img: &RgbaImage) -> Self {
        let pix = img
            .as_raw()
            .chunks_exact(4)
            .flat_map(|p| {
                let a = p[3] as u32;
                let mul = |c: u8| ((c as u32 * a + 127) / 255) as u8;
                [mul(p[0]), mul(p[1]), mul(p[2]), p[3]]
            })
            .collect();
        Self {
            width: img.width(),
            height: img.height(),
            pix,
        }
    }
}

impl PremultipliedImage<u16> {
    /// Premultiply a 16-bit non-premultiplied buffer, rounding to nearest.
    pub fn from_rgba16(img: &Rgba16Image) -> Self {
        let pix = img
            .as_raw()
            .chunks_exact(4)
            .flat_map(|p| {
                let a = p[3] as u32;
                let mul = |c: u16| ((c as u32 * a + 0x7fff) / 0xffff) as u16;
                [mul(p[0]), mul(p[1]), mul(p[2]), p[3]]
            })
            .collect();
        Self {
            width: img.width(),
            height: img.height(),
            pix,
        }
    }
}

/// How much the chroma planes of a [`YCbCrImage`] are reduced relative to luma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsampleRatio {
    /// 4:4:4, one chroma sample per pixel.
    Full,
    /// 4:2:2, chroma width halved.
    HalfHorizontal,
    /// 4:4:0, chroma height halved.
    HalfVertical,
    /// 4:2:0, both halved.
    HalfBoth,
}

impl SubsampleRatio {
    pub fn halves_x(self) -> bool {
        matches!(self, Self::HalfHorizontal | Self::HalfBoth)
    }

    pub fn halves_y(self) -> bool {
        matches!(self, Self::HalfVertical | Self::HalfBoth)
    }

    /// Chroma plane dimensions for a luma plane of `width` x `height`.
    pub fn chroma_dimensions(self, width: u32, height: u32) -> (u32, u32) {
        let w = if self.halves_x() { width.div_ceil(2) } else { width };
        let h = if self.halves_y() { height.div_ceil(2) } else { height };
        (w, h)
    }
}

/// Planar Y'CbCr image (JFIF full-range), one byte per sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YCbCrImage {
    pub width: u32,
    pub height: u32,
    pub ratio: SubsampleRatio,
    pub y: Vec<u8>,
    pub cb: Vec<u8>,
    pub cr: Vec<u8>,
    pub y_stride: usize,
    pub c_stride: usize,
}

impl YCbCrImage {
    /// Allocate zeroed planes (luma 0, chroma 0) sized for `ratio`.
    pub fn new(width: u32, height: u32, ratio: SubsampleRatio) -> Self {
        let (cw, ch) = ratio.chroma_dimensions(width, height);
        let c_len = cw as usize * ch as usize;
        Self {
            width,
            height,
            ratio,
            y: vec![0; width as usize * height as usize],
            cb: vec![0; c_len],
            cr: vec![0; c_len],
            y_stride: width as usize,
            c_stride: cw as usize,
        }
    }
}

/// Index-per-pixel image with a colour table.
///
/// Palette entries are non-premultiplied RGBA (PNG `PLTE` + `tRNS` semantics).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedImage {
    width: u32,
    height: u32,
    pix: Vec<u8>,
    palette: Vec<Rgba<u8>>,
}

impl PalettedImage {
    /// Returns `None` if `pix` is not exactly `width * height` long or the
    /// palette has more than 256 entries.
    pub fn from_raw(width: u32, height: u32, pix: Vec<u8>, palette: Vec<Rgba<u8>>) -> Option<Self> {
        if pix.len() != width as usize * height as usize || palette.len() > 256 {
            return None;
        }
        Some(Self {
            width,
            height,
            pix,
            palette,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn indices(&self) -> &[u8] {
        &self.pix
    }

    pub fn palette(&self) -> &[Rgba<u8>] {
        &self.palette
    }
}

/// An image in one of the layouts the scanner understands.
pub enum SourceImage {
    Rgba8(RgbaImage),
    Rgb8(RgbImage),
    Rgba16(Rgba16Image),
    PremultipliedRgba8(PremultipliedImage<u8>),
    PremultipliedRgba16(PremultipliedImage<u16>),
    Gray8(GrayImage),
    Gray16(Gray16Image),
    YCbCr(YCbCrImage),
    Paletted(PalettedImage),
    Generic(Box<dyn PixelSource>),
}

impl SourceImage {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Rgba8(img) => img.dimensions(),
            Self::Rgb8(img) => img.dimensions(),
            Self::Rgba16(img) => img.dimensions(),
            Self::PremultipliedRgba8(img) => img.dimensions(),
            Self::PremultipliedRgba16(img) => img.dimensions(),
            Self::Gray8(img) => img.dimensions(),
            Self::Gray16(img) => img.dimensions(),
            Self::YCbCr(img) => (img.width, img.height),
            Self::Paletted(img) => img.dimensions(),
            Self::Generic(src) => {
                let b = src.bounds();
                (b.width, b.height)
            }
        }
    }

    /// Short layout name for log lines.
    pub fn layout_name(&self) -> &'static str {
        match self {
            Self::Rgba8(_) => "rgba8",
            Self::Rgb8(_) => "rgb8",
            Self::Rgba16(_) => "rgba16",
            Self::PremultipliedRgba8(_) => "premultiplied-rgba8",
            Self::PremultipliedRgba16(_) => "premultiplied-rgba16",
            Self::Gray8(_) => "gray8",
            Self::Gray16(_) => "gray16",
            Self::YCbCr(_) => "ycbcr",
            Self::Paletted(_) => "paletted",
            Self::Generic(_) => "generic",
        }
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (w, h) = self.dimensions();
        write!(f, "SourceImage::{}({w}x{h})", self.layout_name())
    }
}

/// Adapter exposing any decoded [`DynamicImage`] through [`PixelSource`].
struct DynamicSource(DynamicImage);

impl PixelSource for DynamicSource {
    fn bounds(&self) -> Bounds {
        Bounds::from_dimensions(self.0.width(), self.0.height())
    }

    fn rgba16_premultiplied(&self, x: i64, y: i64) -> [u16; 4] {
        let Rgba([r, g, b, a]) = self.0.get_pixel(x as u32, y as u32);
        let a16 = a as u32 * 0x101;
        let mul = |c: u8| ((c as u32 * 0x101 * a16) / 0xffff) as u16;
        [mul(r), mul(g), mul(b), a16 as u16]
    }
}

impl From<DynamicImage> for SourceImage {
    fn from(img: DynamicImage) -> Self {
        match img {
            DynamicImage::ImageRgba8(buf) => Self::Rgba8(buf),
            DynamicImage::ImageRgb8(buf) => Self::Rgb8(buf),
            DynamicImage::ImageRgba16(buf) => Self::Rgba16(buf),
            DynamicImage::ImageLuma8(buf) => Self::Gray8(buf),
            DynamicImage::ImageLuma16(buf) => Self::Gray16(buf),
            other => Self::Generic(Box::new(DynamicSource(other))),
        }
    }
}

impl From<RgbaImage> for SourceImage {
    fn from(img: RgbaImage) -> Self {
        Self::Rgba8(img)
    }
}
