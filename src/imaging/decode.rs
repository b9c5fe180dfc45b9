//! Single-pass decode with concurrent EXIF orientation extraction.
//!
//! With auto-orientation on, the input stream is read exactly once. The
//! decoder pulls bytes through a [`TeeReader`], which forwards a copy of
//! every chunk over a bounded channel to a [`PipeReader`] on a scoped
//! thread running [`read_orientation`]:
//!
//! ```text
//!  source ──► TeeReader ──► FrameDecoder ──► DynamicImage ──► fix_orientation
//!                │                                                ▲
//!                └─ sync_channel(cap) ─► PipeReader ─► orientation ┘
//! ```
//!
//! The orientation thread keeps draining after it has its answer, so a full
//! channel never stalls the decoder. The producer side is closed only once
//! the decoder has returned, whether it succeeded or not.

use std::io::{self, Read};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread;

use image::DynamicImage;
use tracing::debug;

use super::io::ImagingError;
use super::orientation::{Orientation, fix_orientation, read_orientation};

/// Options for [`decode`] and [`super::io::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Apply the EXIF orientation to the decoded image.
    pub auto_orientation: bool,
    /// Chunks the decoder may run ahead of the orientation reader.
    pub pipe_capacity: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            auto_orientation: false,
            pipe_capacity: 16,
        }
    }
}

impl DecodeOptions {
    pub fn auto_orientation(mut self, enabled: bool) -> Self {
        self.auto_orientation = enabled;
        self
    }
}

/// Container decoder seam.
///
/// Implementations may read as much or as little of the stream as they like.
pub trait FrameDecoder {
    fn decode(&self, reader: &mut dyn Read) -> Result<DynamicImage, ImagingError>;
}

impl<F> FrameDecoder for F
where
    F: Fn(&mut dyn Read) -> Result<DynamicImage, ImagingError>,
{
    fn decode(&self, reader: &mut dyn Read) -> Result<DynamicImage, ImagingError> {
        self(reader)
    }
}

/// Decodes any format the `image` crate was built with, guessed from content.
///
/// The codecs need random access, so the stream is buffered in full first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDecoder;

impl FrameDecoder for FormatDecoder {
    fn decode(&self, reader: &mut dyn Read) -> Result<DynamicImage, ImagingError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(image::load_from_memory(&buf)?)
    }
}

// ---------------------------------------------------------------------------
// Tee
// ---------------------------------------------------------------------------

/// Reader that forwards a copy of everything it reads to a [`PipeReader`].
pub struct TeeReader<R> {
    inner: R,
    tx: Option<SyncSender<Vec<u8>>>,
}

/// Consuming end of a [`tee`]. Reports end-of-stream once the tee is closed
/// (or dropped) and every forwarded chunk has been read.
pub struct PipeReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

/// Wrap `inner` so that its bytes are also delivered, in order, to the
/// returned [`PipeReader`]. At most `capacity` chunks are buffered; beyond
/// that, reads through the tee block.
pub fn tee<R: Read>(inner: R, capacity: usize) -> (TeeReader<R>, PipeReader) {
    let (tx, rx) = sync_channel(capacity);
    (
        TeeReader {
            inner,
            tx: Some(tx),
        },
        PipeReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
        },
    )
}

impl<R> TeeReader<R> {
    /// Signal end-of-stream to the pipe. Further reads are not forwarded.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

impl<R: Read> Read for TeeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n > 0
            && let Some(tx) = &self.tx
            && tx.send(buf[..n].to_vec()).is_err()
        {
            // Reader is gone; the join reports why.
            self.tx = None;
        }
        Ok(n)
    }
}

impl Read for PipeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.pos == self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Decode `reader` with [`FormatDecoder`].
pub fn decode<R: Read>(reader: R, options: &DecodeOptions) -> Result<DynamicImage, ImagingError> {
    decode_with(&FormatDecoder, reader, options)
}

/// Decode `reader` with `decoder`, applying the EXIF orientation when
/// `options.auto_orientation` is set.
///
/// A decoder error takes priority over a failure of the orientation reader.
pub fn decode_with<D, R>(
    decoder: &D,
    mut reader: R,
    options: &DecodeOptions,
) -> Result<DynamicImage, ImagingError>
where
    D: FrameDecoder + ?Sized,
    R: Read,
{
    if !options.auto_orientation {
        return decoder.decode(&mut reader);
    }

    let (source, pipe) = tee(reader, options.pipe_capacity);
    let (decoded, drained) = thread::scope(|scope| {
        let task = scope.spawn(move || drain_orientation(pipe));
        // Owned here so a panicking decoder still drops the sender and the
        // drain thread sees end-of-stream before the scope joins it.
        let mut source = source;
        let decoded = decoder.decode(&mut source);
        source.close();
        (decoded, task.join())
    });

    let img = decoded?;
    let orientation = drained.map_err(|_| ImagingError::OrientationTask)??;
    debug!(
        %orientation,
        width = img.width(),
        height = img.height(),
        "decode pipeline joined"
    );
    Ok(fix_orientation(img, orientation))
}

fn drain_orientation(mut pipe: PipeReader) -> io::Result<Orientation> {
    let orientation = read_orientation(&mut pipe);
    io::copy(&mut pipe, &mut io::sink())?;
    Ok(orientation)
}
