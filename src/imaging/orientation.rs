//! EXIF orientation: extraction from a JPEG byte stream and correction.
//!
//! [`read_orientation`] walks the stream front to back exactly once:
//!
//! | Step        | Bytes                          | Rejects                       |
//! |-------------|--------------------------------|-------------------------------|
//! | SOI         | `FF D8`                        | anything else                 |
//! | Segments    | marker, size, payload          | non-`FF` marker, size < 2     |
//! | APP1 header | `"Exif"` + 2 padding bytes     | other header                  |
//! | Byte order  | `MM` / `II` + 2-byte magic     | other mark                    |
//! | IFD0 offset | 4 bytes, skip `offset - 8`     | offset < 8                    |
//! | Tag records | count x 12 bytes               | orientation outside `1..=8`   |
//!
//! Every failure, truncation included, yields [`Orientation::Unspecified`].
//! Absent metadata and malformed metadata are deliberately indistinguishable.
//!
//! Only the first APP1 segment is examined, and the orientation value is
//! assumed to be stored inline as a SHORT in the first two bytes of the
//! record's value field.

use std::fmt;
use std::io::{self, Read};

use image::DynamicImage;

const MARKER_SOI: u16 = 0xffd8;
const MARKER_APP1: u16 = 0xffe1;
const EXIF_HEADER: &[u8; 4] = b"Exif";
const BYTE_ORDER_BE: u16 = 0x4d4d;
const BYTE_ORDER_LE: u16 = 0x4949;
const ORIENTATION_TAG: u16 = 0x0112;

/// EXIF orientation value. Discriminants are the on-disk values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Unspecified = 0,
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    Transpose = 5,
    /// Stored image must be turned 90° clockwise for display.
    Rotate90Cw = 6,
    Transverse = 7,
    /// Stored image must be turned 90° counter-clockwise for display.
    Rotate90Ccw = 8,
}

impl Orientation {
    pub const ALL: [Orientation; 9] = [
        Orientation::Unspecified,
        Orientation::Normal,
        Orientation::FlipHorizontal,
        Orientation::Rotate180,
        Orientation::FlipVertical,
        Orientation::Transpose,
        Orientation::Rotate90Cw,
        Orientation::Transverse,
        Orientation::Rotate90Ccw,
    ];

    /// Map a raw tag value; anything outside `1..=8` is `None`.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1..=8 => Some(Self::ALL[value as usize]),
            _ => None,
        }
    }

    pub fn value(self) -> u16 {
        self as u16
    }

    /// Whether applying this orientation swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90Cw | Self::Transverse | Self::Rotate90Ccw
        )
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unspecified => "unspecified",
            Self::Normal => "normal",
            Self::FlipHorizontal => "flip-horizontal",
            Self::Rotate180 => "rotate-180",
            Self::FlipVertical => "flip-vertical",
            Self::Transpose => "transpose",
            Self::Rotate90Cw => "rotate-90-cw",
            Self::Transverse => "transverse",
            Self::Rotate90Ccw => "rotate-90-ccw",
        };
        write!(f, "{} ({})", self.value(), name)
    }
}

/// Apply the corrective transform for `orientation`.
///
/// `Unspecified` and `Normal` return the image untouched.
pub fn fix_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Unspecified | Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90Cw => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate90Ccw => img.rotate270(),
    }
}

// ---------------------------------------------------------------------------
// Stream parsing
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum ByteOrder {
    Big,
    Little,
}

/// Forward-only reader over the metadata prefix. Every read is all-or-nothing;
/// `None` means the stream ended or failed.
struct ExifStream<R> {
    inner: R,
}

impl<R: Read> ExifStream<R> {
    fn bytes<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).ok()?;
        Some(buf)
    }

    fn u16(&mut self, order: ByteOrder) -> Option<u16> {
        let b = self.bytes::<2>()?;
        Some(match order {
            ByteOrder::Big => u16::from_be_bytes(b),
            ByteOrder::Little => u16::from_le_bytes(b),
        })
    }

    fn u32(&mut self, order: ByteOrder) -> Option<u32> {
        let b = self.bytes::<4>()?;
        Some(match order {
            ByteOrder::Big => u32::from_be_bytes(b),
            ByteOrder::Little => u32::from_le_bytes(b),
        })
    }

    fn skip(&mut self, n: u64) -> Option<()> {
        let copied = io::copy(&mut self.inner.by_ref().take(n), &mut io::sink()).ok()?;
        (copied == n).then_some(())
    }
}

/// Read the EXIF orientation from the start of a JPEG stream.
///
/// Consumes only as much of `r` as needed to reach a verdict. Never fails:
/// anything unexpected is [`Orientation::Unspecified`].
pub fn read_orientation<R: Read>(r: R) -> Orientation {
    parse(&mut ExifStream { inner: r }).unwrap_or_default()
}

fn parse<R: Read>(s: &mut ExifStream<R>) -> Option<Orientation> {
    find_soi(s)?;
    find_app1(s)?;
    find_exif_header(s)?;
    let order = read_byte_order(s)?;
    skip_ifd_offset(s, order)?;
    let count = s.u16(order)?;
    find_orientation_tag(s, order, count)
}

fn find_soi<R: Read>(s: &mut ExifStream<R>) -> Option<()> {
    (s.u16(ByteOrder::Big)? == MARKER_SOI).then_some(())
}

fn find_app1<R: Read>(s: &mut ExifStream<R>) -> Option<()> {
    loop {
        let marker = s.u16(ByteOrder::Big)?;
        let size = s.u16(ByteOrder::Big)?;
        if marker >> 8 != 0xff {
            return None;
        }
        if marker == MARKER_APP1 {
            return Some(());
        }
        if size < 2 {
            return None;
        }
        s.skip(u64::from(size - 2))?;
    }
}

fn find_exif_header<R: Read>(s: &mut ExifStream<R>) -> Option<()> {
    if &s.bytes::<4>()? != EXIF_HEADER {
        return None;
    }
    s.skip(2)
}

fn read_byte_order<R: Read>(s: &mut ExifStream<R>) -> Option<ByteOrder> {
    let order = match s.u16(ByteOrder::Big)? {
        BYTE_ORDER_BE => ByteOrder::Big,
        BYTE_ORDER_LE => ByteOrder::Little,
        _ => return None,
    };
    s.skip(2)?;
    Some(order)
}

fn skip_ifd_offset<R: Read>(s: &mut ExifStream<R>, order: ByteOrder) -> Option<()> {
    let offset = s.u32(order)?;
    if offset < 8 {
        return None;
    }
    s.skip(u64::from(offset - 8))
}

fn find_orientation_tag<R: Read>(
    s: &mut ExifStream<R>,
    order: ByteOrder,
    count: u16,
) -> Option<Orientation> {
    for _ in 0..count {
        if s.u16(order)? != ORIENTATION_TAG {
            s.skip(10)?;
            continue;
        }
        s.skip(6)?;
        return Orientation::from_u16(s.u16(order)?);
    }
    Some(Orientation::Unspecified)
}
