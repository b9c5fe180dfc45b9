//! File formats, encoding, and file-system access.
//!
//! Container codecs are the `image` crate's; this module only picks the
//! codec from a file extension, maps [`EncodeOptions`] onto it, and routes
//! file access through the [`FileSystem`] trait so tests can run in memory.
//!
//! | Format | Extensions      | Encoded as                          |
//! |--------|-----------------|-------------------------------------|
//! | JPEG   | `jpg`, `jpeg`   | RGB (alpha dropped) or gray         |
//! | PNG    | `png`           | source layout                       |
//! | GIF    | `gif`           | RGBA8, single frame                 |
//! | TIFF   | `tif`, `tiff`   | source layout                       |
//! | BMP    | `bmp`           | RGB8 / RGBA8 / gray                 |

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{self, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, Frame, ImageFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::decode::{DecodeOptions, decode};
use super::orientation::{Orientation, read_orientation};

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Orientation reader panicked")]
    OrientationTask,
}

// ============================================================================
// Formats
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    Jpeg,
    Png,
    Gif,
    Tiff,
    Bmp,
}

impl Format {
    /// Parse a file extension, case-insensitive, with or without the dot.
    pub fn from_extension(ext: &str) -> Result<Self, ImagingError> {
        let ext = ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "tif" | "tiff" => Ok(Self::Tiff),
            "bmp" => Ok(Self::Bmp),
            _ => Err(ImagingError::UnsupportedFormat(ext)),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ImagingError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
            .map_err(|_| ImagingError::UnsupportedFormat(path.display().to_string()))
    }

    /// Map a format sniffed by the `image` crate, if it is one of ours.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::Tiff => Some(Self::Tiff),
            ImageFormat::Bmp => Some(Self::Bmp),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Gif => "GIF",
            Self::Tiff => "TIFF",
            Self::Bmp => "BMP",
        })
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// PNG deflate effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    Fast,
    #[default]
    Default,
    Best,
}

impl From<PngCompression> for png::CompressionType {
    fn from(c: PngCompression) -> Self {
        match c {
            PngCompression::Fast => png::CompressionType::Fast,
            PngCompression::Default => png::CompressionType::Default,
            PngCompression::Best => png::CompressionType::Best,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// 1-100, higher is better.
    pub jpeg_quality: u8,
    pub png_compression: PngCompression,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 95,
            png_compression: PngCompression::Default,
        }
    }
}

/// `img` in a layout the 8-bit-only encoders accept.
fn eight_bit(img: &DynamicImage, keep_alpha: bool) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(img),
        DynamicImage::ImageRgba8(_) if keep_alpha => Cow::Borrowed(img),
        _ if keep_alpha && img.color().has_alpha() => {
            Cow::Owned(DynamicImage::ImageRgba8(img.to_rgba8()))
        }
        _ => Cow::Owned(DynamicImage::ImageRgb8(img.to_rgb8())),
    }
}

/// Write `img` to `w` as `format`.
pub fn encode<W: Write>(
    w: &mut W,
    img: &DynamicImage,
    format: Format,
    options: &EncodeOptions,
) -> Result<(), ImagingError> {
    debug!(%format, width = img.width(), height = img.height(), "encoding");
    match format {
        Format::Jpeg => {
            let quality = options.jpeg_quality.clamp(1, 100);
            eight_bit(img, false).write_with_encoder(JpegEncoder::new_with_quality(w, quality))?;
        }
        Format::Png => {
            let encoder = PngEncoder::new_with_quality(
                w,
                options.png_compression.into(),
                png::FilterType::Adaptive,
            );
            img.write_with_encoder(encoder)?;
        }
        Format::Gif => {
            let mut encoder = GifEncoder::new(w);
            encoder.encode_frame(Frame::new(img.to_rgba8()))?;
        }
        Format::Tiff => {
            // TIFF needs to seek back to patch offsets.
            let mut buf = Cursor::new(Vec::new());
            img.write_with_encoder(TiffEncoder::new(&mut buf))?;
            w.write_all(buf.get_ref())?;
        }
        Format::Bmp => {
            eight_bit(img, true).write_with_encoder(BmpEncoder::new(w))?;
        }
    }
    Ok(())
}

// ============================================================================
// File system
// ============================================================================

/// File access used by [`open`], [`save`] and [`probe`].
pub trait FileSystem {
    /// Open an existing file for reading.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
    /// Create or truncate a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>>;
}

/// The local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(File::create(path)?))
    }
}

/// Open and decode the image at `path`.
pub fn open(
    fs: &dyn FileSystem,
    path: &Path,
    options: &DecodeOptions,
) -> Result<DynamicImage, ImagingError> {
    debug!(path = %path.display(), auto_orientation = options.auto_orientation, "opening image");
    let reader = BufReader::new(fs.open(path)?);
    decode(reader, options)
}

/// Encode `img` to `path`, choosing the format from its extension.
///
/// An unsupported extension is rejected before the file is created.
pub fn save(
    fs: &dyn FileSystem,
    img: &DynamicImage,
    path: &Path,
    options: &EncodeOptions,
) -> Result<(), ImagingError> {
    let format = Format::from_path(path)?;
    let mut w = BufWriter::new(fs.create(path)?);
    encode(&mut w, img, format, options)?;
    w.flush()?;
    Ok(())
}

/// Summary of an image file without any orientation applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: Option<Format>,
    pub color: String,
    #[serde(serialize_with = "orientation_value")]
    pub orientation: Orientation,
}

fn orientation_value<S: serde::Serializer>(o: &Orientation, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(o.value())
}

/// Read `path` once and report its stored dimensions, format, colour
/// layout and EXIF orientation.
pub fn probe(fs: &dyn FileSystem, path: &Path) -> Result<ImageInfo, ImagingError> {
    let mut bytes = Vec::new();
    fs.open(path)?.read_to_end(&mut bytes)?;

    let format = image::guess_format(&bytes)
        .ok()
        .and_then(Format::from_image_format);
    let orientation = read_orientation(bytes.as_slice());
    let img = image::load_from_memory(&bytes)?;

    Ok(ImageInfo {
        width: img.width(),
        height: img.height(),
        format,
        color: format!("{:?}", img.color()),
        orientation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::gradient_rgba;
    use image::{GenericImageView, RgbImage};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// In-memory file system; files become visible as they are written.
    #[derive(Default, Clone)]
    struct MemFs {
        files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    }

    struct MemFile {
        path: PathBuf,
        files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    }

    impl Write for MemFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut files = self.files.lock().unwrap();
            files.entry(self.path.clone()).or_default().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl FileSystem for MemFs {
        fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
            let files = self.files.lock().unwrap();
            let data = files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))?;
            Ok(Box::new(Cursor::new(data)))
        }

        fn create(&self, path: &Path) -> io::Result<Box<dyn Write>> {
            self.files.lock().unwrap().insert(path.to_path_buf(), Vec::new());
            Ok(Box::new(MemFile {
                path: path.to_path_buf(),
                files: Arc::clone(&self.files),
            }))
        }
    }

    impl MemFs {
        fn contains(&self, path: &str) -> bool {
            self.files.lock().unwrap().contains_key(Path::new(path))
        }
    }

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(gradient_rgba(12, 9))
    }

    #[test]
    fn format_from_extension_variants() {
        assert_eq!(Format::from_extension("jpg").unwrap(), Format::Jpeg);
        assert_eq!(Format::from_extension(".JPEG").unwrap(), Format::Jpeg);
        assert_eq!(Format::from_extension("Tif").unwrap(), Format::Tiff);
        assert_eq!(Format::from_extension("bmp").unwrap(), Format::Bmp);
        assert!(matches!(
            Format::from_extension("webp"),
            Err(ImagingError::UnsupportedFormat(_))
        ));
        assert!(Format::from_extension("").is_err());
    }

    #[test]
    fn format_from_path_uses_last_extension() {
        assert_eq!(
            Format::from_path(Path::new("dir.png/photo.tar.gif")).unwrap(),
            Format::Gif
        );
        assert!(Format::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn format_display_names() {
        let names: Vec<String> = [Format::Jpeg, Format::Png, Format::Gif, Format::Tiff, Format::Bmp]
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(names, ["JPEG", "PNG", "GIF", "TIFF", "BMP"]);
    }

    #[test]
    fn lossless_formats_preserve_pixels() {
        let img = sample();
        for format in [Format::Png, Format::Tiff, Format::Bmp] {
            let mut buf = Vec::new();
            encode(&mut buf, &img, format, &EncodeOptions::default()).unwrap();
            let back = image::load_from_memory(&buf).unwrap();
            assert_eq!(back.to_rgba8(), img.to_rgba8(), "{format}");
        }
    }

    #[test]
    fn jpeg_drops_alpha() {
        let mut buf = Vec::new();
        encode(&mut buf, &sample(), Format::Jpeg, &EncodeOptions::default()).unwrap();
        let back = image::load_from_memory(&buf).unwrap();
        assert!(!back.color().has_alpha());
        assert_eq!(back.dimensions(), (12, 9));
    }

    #[test]
    fn jpeg_quality_affects_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 4) as u8, (x ^ y) as u8])
        }));
        let size = |q| {
            let mut buf = Vec::new();
            let options = EncodeOptions {
                jpeg_quality: q,
                ..EncodeOptions::default()
            };
            encode(&mut buf, &img, Format::Jpeg, &options).unwrap();
            buf.len()
        };
        assert!(size(10) < size(95));
    }

    #[test]
    fn gif_is_decodable() {
        let mut buf = Vec::new();
        encode(&mut buf, &sample(), Format::Gif, &EncodeOptions::default()).unwrap();
        assert_eq!(image::guess_format(&buf).unwrap(), ImageFormat::Gif);
        assert_eq!(image::load_from_memory(&buf).unwrap().dimensions(), (12, 9));
    }

    #[test]
    fn save_then_open_in_memory() {
        let fs = MemFs::default();
        let img = sample();
        save(&fs, &img, Path::new("out/a.png"), &EncodeOptions::default()).unwrap();
        let back = open(&fs, Path::new("out/a.png"), &DecodeOptions::default()).unwrap();
        assert_eq!(back.to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn save_rejects_unknown_extension_before_creating() {
        let fs = MemFs::default();
        let err = save(&fs, &sample(), Path::new("a.webp"), &EncodeOptions::default()).unwrap_err();
        assert!(matches!(err, ImagingError::UnsupportedFormat(_)));
        assert!(!fs.contains("a.webp"));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let err = open(&MemFs::default(), Path::new("nope.png"), &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, ImagingError::Io(_)));
    }

    #[test]
    fn local_fs_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("photo.bmp");
        save(&LocalFs, &sample(), &path, &EncodeOptions::default()).unwrap();
        let back = open(&LocalFs, &path, &DecodeOptions::default()).unwrap();
        assert_eq!(back.dimensions(), (12, 9));
    }

    #[test]
    fn probe_reports_stored_layout() {
        let fs = MemFs::default();
        save(&fs, &sample(), Path::new("p.png"), &EncodeOptions::default()).unwrap();
        let info = probe(&fs, Path::new("p.png")).unwrap();
        assert_eq!((info.width, info.height), (12, 9));
        assert_eq!(info.format, Some(Format::Png));
        assert_eq!(info.color, "Rgba8");
        assert_eq!(info.orientation, Orientation::Unspecified);
    }
}
