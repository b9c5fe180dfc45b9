//! # gina
//!
//! A small image processing library and command-line tool: alpha-aware
//! Gaussian blur and sharpening, mosaic, resize, contrast and gamma,
//! format conversion, and EXIF-orientation-aware decoding.
//!
//! # Architecture
//!
//! ```text
//!  file ─► decode (+ orientation) ─► SourceImage ─► Scanner ─► effect ─► RgbaImage ─► encode ─► file
//! ```
//!
//! Decoders hand back images in whatever layout the container stores:
//! 8/16-bit, premultiplied or not, gray, Y'CbCr with chroma subsampling,
//! paletted. Every effect reads through [`imaging::Scanner`], which converts
//! any rectangle of any layout into one canonical form, non-premultiplied
//! RGBA with 8 bits per channel, so the numeric code is written once.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Source model, scanner, scheduler, effects, EXIF orientation, decode pipeline, format I/O |
//! | [`config`] | `gina.toml` loading, validation and merging over stock defaults |
//! | [`logging`] | `tracing-subscriber` set-up for the binary |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Alpha-Weighted Convolution
//!
//! Blur weights every tap by its alpha as well as by the kernel, and divides
//! by the weight actually accumulated. Transparent pixels therefore contribute
//! no colour, and image borders do not fade: taps that fall outside the image
//! are simply dropped from both the numerator and the denominator.
//!
//! ## Orientation Read During Decode
//!
//! Reading the EXIF orientation normally means parsing the file header twice
//! or seeking back. Instead the decoder's own reads are teed into a bounded
//! channel that a parser thread consumes concurrently. The stream is read
//! once and non-seekable inputs work. Malformed or absent metadata always
//! means "no orientation"; it is never an error.
//!
//! ## Bounded Parallelism
//!
//! Row and column passes fan out over the rayon pool in at most
//! `current_num_threads()` contiguous blocks. `processing.max_threads` in
//! `gina.toml` sizes the pool.

pub mod config;
pub mod imaging;
pub mod logging;
pub mod output;

#[cfg(test)]
pub(crate) mod test_helpers;
