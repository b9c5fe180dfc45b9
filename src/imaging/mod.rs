//! Image processing core.
//!
//! | Piece | Module | Work |
//! |---|---|---|
//! | **Source model** | [`source`] | every in-memory layout a decoder can hand us |
//! | **Scanner** | [`scanner`] | any layout → non-premultiplied RGBA8 rows |
//! | **Scheduler** | [`parallel`] | bounded fan-out over rayon |
//! | **Effects** | [`effects`] | alpha-aware blur, sharpen, mosaic, contrast, gamma |
//! | **Orientation** | [`orientation`] | EXIF orientation parser + transform table |
//! | **Decode** | [`decode`] | single-pass decode with concurrent orientation read |
//! | **I/O** | [`io`] | formats, encoders, file-system seam |
//!
//! Every effect reads through the [`Scanner`] and writes a fresh
//! [`image::RgbaImage`]; inputs are never mutated.

pub mod decode;
pub mod effects;
pub mod io;
pub mod orientation;
pub mod parallel;
pub mod scanner;
pub mod source;

pub use decode::{DecodeOptions, FormatDecoder, FrameDecoder, decode, decode_with};
pub use effects::{
    Rect, adjust_contrast, adjust_gamma, blur, clone_canonical, mosaic, resize, sharpen,
};
pub use io::{
    EncodeOptions, FileSystem, Format, ImageInfo, ImagingError, LocalFs, PngCompression, encode,
    open, probe, save,
};
pub use orientation::{Orientation, fix_orientation, read_orientation};
pub use scanner::Scanner;
pub use source::{PixelSource, SourceImage};
