//! Property tests for the scanner, the blur and the orientation parser.

mod common;

use common::exif_header;
use gina::imaging::source::{PremultipliedImage, Rgba16Image, SubsampleRatio, YCbCrImage};
use gina::imaging::{Orientation, Scanner, SourceImage, blur, read_orientation};
use image::{GrayImage, RgbImage, RgbaImage};
use proptest::prelude::*;

/// Random canonical RGBA image: fully transparent pixels carry zero colour.
fn rgba_strategy() -> impl Strategy<Value = RgbaImage> {
    (1u32..=12, 1u32..=12).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<[u8; 4]>(), (w * h) as usize).prop_map(move |px| {
            RgbaImage::from_fn(w, h, |x, y| {
                let p = px[(y * w + x) as usize];
                image::Rgba(if p[3] == 0 { [0, 0, 0, 0] } else { p })
            })
        })
    })
}

fn ratio_strategy() -> impl Strategy<Value = SubsampleRatio> {
    prop_oneof![
        Just(SubsampleRatio::Full),
        Just(SubsampleRatio::HalfHorizontal),
        Just(SubsampleRatio::HalfVertical),
        Just(SubsampleRatio::HalfBoth),
    ]
}

/// The same picture in one of several stored layouts.
fn layout(img: &RgbaImage, which: u8, ratio: SubsampleRatio) -> SourceImage {
    let (w, h) = img.dimensions();
    match which % 6 {
        0 => SourceImage::Rgba8(img.clone()),
        1 => SourceImage::PremultipliedRgba8(PremultipliedImage::from_rgba(img)),
        2 => {
            let wide: Rgba16Image = image::ImageBuffer::from_fn(w, h, |x, y| {
                image::Rgba(img.get_pixel(x, y).0.map(|c| c as u16 * 257))
            });
            SourceImage::Rgba16(wide)
        }
        3 => SourceImage::Gray8(GrayImage::from_fn(w, h, |x, y| {
            image::Luma([img.get_pixel(x, y)[0]])
        })),
        4 => SourceImage::Rgb8(RgbImage::from_fn(w, h, |x, y| {
            let [r, g, b, _] = img.get_pixel(x, y).0;
            image::Rgb([r, g, b])
        })),
        _ => {
            let mut ycc = YCbCrImage::new(w, h, ratio);
            for (i, v) in ycc.y.iter_mut().enumerate() {
                *v = img.as_raw()[i * 4];
            }
            for (i, v) in ycc.cb.iter_mut().enumerate() {
                *v = (i * 41 % 256) as u8;
            }
            for (i, v) in ycc.cr.iter_mut().enumerate() {
                *v = (i * 73 % 256) as u8;
            }
            SourceImage::YCbCr(ycc)
        }
    }
}

fn scan(source: &SourceImage, x1: u32, y1: u32, x2: u32, y2: u32) -> Vec<u8> {
    let scanner = Scanner::new(source);
    let mut dst = vec![0u8; ((x2 - x1) * (y2 - y1) * 4) as usize];
    scanner.scan(x1, y1, x2, y2, &mut dst);
    dst
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    /// Scanning two halves of a rectangle gives the same bytes as scanning it whole.
    #[test]
    fn scanner_tiling_is_seamless(
        img in rgba_strategy(),
        which in any::<u8>(),
        ratio in ratio_strategy(),
        split in any::<prop::sample::Index>(),
        vertical in any::<bool>(),
    ) {
        let source = layout(&img, which, ratio);
        let (w, h) = img.dimensions();
        let whole = scan(&source, 0, 0, w, h);

        if vertical {
            let ym = split.index(h as usize + 1) as u32;
            let mut joined = scan(&source, 0, 0, w, ym);
            joined.extend(scan(&source, 0, ym, w, h));
            prop_assert_eq!(joined, whole);
        } else {
            let xm = split.index(w as usize + 1) as u32;
            let left = scan(&source, 0, 0, xm, h);
            let right = scan(&source, xm, 0, w, h);
            let (lw, rw) = (xm as usize * 4, (w - xm) as usize * 4);
            for y in 0..h as usize {
                let row = &whole[y * w as usize * 4..(y + 1) * w as usize * 4];
                prop_assert_eq!(&row[..lw], &left[y * lw..(y + 1) * lw]);
                prop_assert_eq!(&row[lw..], &right[y * rw..(y + 1) * rw]);
            }
        }
    }

    /// Scanned output is canonical: zero alpha always means zero colour.
    #[test]
    fn scanner_output_is_canonical(
        img in rgba_strategy(),
        which in any::<u8>(),
        ratio in ratio_strategy(),
    ) {
        let source = layout(&img, which, ratio);
        let (w, h) = img.dimensions();
        for px in scan(&source, 0, 0, w, h).chunks_exact(4) {
            if px[3] == 0 {
                prop_assert_eq!(px, &[0, 0, 0, 0]);
            }
        }
    }

    /// Blur output is canonical and keeps the input dimensions.
    #[test]
    fn blur_output_is_canonical(img in rgba_strategy(), sigma in 0.1f64..4.0) {
        let out = blur(&SourceImage::Rgba8(img.clone()), sigma);
        prop_assert_eq!(out.dimensions(), img.dimensions());
        for px in out.pixels() {
            if px[3] == 0 {
                prop_assert_eq!(px.0, [0, 0, 0, 0]);
            }
        }
    }

    /// A uniform opaque image survives any blur within one unit per channel.
    #[test]
    fn blur_preserves_uniform_opaque(
        (w, h) in (1u32..=16, 1u32..=16),
        rgb in any::<[u8; 3]>(),
        sigma in 0.1f64..6.0,
    ) {
        let img = RgbaImage::from_pixel(w, h, image::Rgba([rgb[0], rgb[1], rgb[2], 255]));
        let out = blur(&SourceImage::Rgba8(img), sigma);
        for px in out.pixels() {
            prop_assert!(px[0].abs_diff(rgb[0]) <= 1);
            prop_assert!(px[1].abs_diff(rgb[1]) <= 1);
            prop_assert!(px[2].abs_diff(rgb[2]) <= 1);
            prop_assert_eq!(px[3], 255);
        }
    }

    /// Every strict prefix of a valid header reads as unspecified.
    #[test]
    fn truncated_headers_are_unspecified(
        value in 1u16..=8,
        big_endian in any::<bool>(),
        cut in any::<prop::sample::Index>(),
    ) {
        let data = exif_header(value, big_endian);
        // SOI, APP1 marker and size, then 26 payload bytes up to the value.
        let full = 2 + 4 + 26;
        let len = cut.index(full);
        prop_assert_eq!(read_orientation(&data[..len]), Orientation::Unspecified);
        prop_assert_eq!(read_orientation(&data[..full]).value(), value);
    }

    /// Trailing bytes after the tag never change the answer.
    #[test]
    fn trailing_bytes_are_irrelevant(
        value in 1u16..=8,
        big_endian in any::<bool>(),
        tail in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let mut data = exif_header(value, big_endian);
        data.extend_from_slice(&tail);
        prop_assert_eq!(read_orientation(data.as_slice()).value(), value);
    }

    /// Arbitrary bytes never panic and never produce a value outside 0..=8.
    #[test]
    fn arbitrary_bytes_are_safe(data in prop::collection::vec(any::<u8>(), 0..256)) {
        prop_assert!(read_orientation(data.as_slice()).value() <= 8);
    }
}
