//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use gina::imaging::{EncodeOptions, Format, encode};
use image::{DynamicImage, RgbImage};

/// TIFF body of an APP1 "Exif" segment holding one orientation record.
fn exif_payload(orientation: u16, big_endian: bool) -> Vec<u8> {
    let u16b = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
    let u32b = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };

    let mut p = b"Exif\0\0".to_vec();
    p.extend_from_slice(if big_endian { b"MM" } else { b"II" });
    p.extend_from_slice(&u16b(0x2a));
    p.extend_from_slice(&u32b(8));
    p.extend_from_slice(&u16b(1));
    p.extend_from_slice(&u16b(0x0112));
    p.extend_from_slice(&u16b(3));
    p.extend_from_slice(&u32b(1));
    p.extend_from_slice(&u16b(orientation));
    p.extend_from_slice(&[0, 0]);
    // No next IFD.
    p.extend_from_slice(&u32b(0));
    p
}

/// Complete APP1 segment, marker and size included.
pub fn app1_segment(orientation: u16, big_endian: bool) -> Vec<u8> {
    let payload = exif_payload(orientation, big_endian);
    let mut seg = vec![0xff, 0xe1];
    seg.extend_from_slice(&(payload.len() as u16 + 2).to_be_bytes());
    seg.extend_from_slice(&payload);
    seg
}

/// SOI followed by an APP1 segment; ends where image data would start.
pub fn exif_header(orientation: u16, big_endian: bool) -> Vec<u8> {
    let mut out = vec![0xff, 0xd8];
    out.extend_from_slice(&app1_segment(orientation, big_endian));
    out
}

/// Non-square, asymmetric test picture: blocky so JPEG keeps it recognisable.
pub fn picture() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(48, 32, |x, y| {
        let r = if x < 16 { 230 } else { 20 };
        let g = if y < 16 { 200 } else { 40 };
        image::Rgb([r, g, ((x / 8 + y / 8) * 30) as u8])
    }))
}

/// Encode `img` as JPEG and, unless `orientation` is `None`, splice an EXIF
/// APP1 segment in right after SOI.
pub fn jpeg_with_orientation(img: &DynamicImage, orientation: Option<u16>) -> Vec<u8> {
    let mut jpeg = Vec::new();
    encode(&mut jpeg, img, Format::Jpeg, &EncodeOptions::default()).unwrap();
    assert_eq!(&jpeg[..2], &[0xff, 0xd8]);
    match orientation {
        None => jpeg,
        Some(value) => {
            let mut out = jpeg[..2].to_vec();
            out.extend_from_slice(&app1_segment(value, true));
            out.extend_from_slice(&jpeg[2..]);
            out
        }
    }
}
