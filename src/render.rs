//! Device-facing pixel buffer with an atomic commit/discard protocol.
//!
//! Writes accumulate in a wire buffer and a pending state; nothing reaches
//! the strip until [`RenderState::commit`] sends the whole frame at once.

use log::{debug, log_enabled, trace, Level};

use crate::error::{Error, Result};
use crate::pixel::Pixel;
use crate::protocol::{self, CONTROL_BYTE};
use crate::transport::{self, Transport};

pub struct RenderState<T: Transport> {
    transport: T,
    pixel_count: usize,
    committed: Vec<Pixel>,
    pending: Vec<Pixel>,
    buffer: Vec<u8>,
    cursor: usize,
}

impl<T: Transport> RenderState<T> {
    /// Create a render state with every pixel black. `pixel_count` must be non-zero.
    pub fn new(transport: T, pixel_count: usize) -> Result<Self> {
        if pixel_count == 0 {
            return Err(Error::NoPixels);
        }
        Ok(RenderState {
            transport,
            pixel_count,
            committed: vec![Pixel::default(); pixel_count],
            pending: vec![Pixel::default(); pixel_count],
            buffer: Vec::with_capacity(pixel_count * protocol::BYTES_PER_PIXEL + 1),
            cursor: 0,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.pixel_count
    }

    /// Last state physically rendered.
    pub fn committed(&self) -> &[Pixel] {
        &self.committed
    }

    /// State under construction.
    pub fn pending(&self) -> &[Pixel] {
        &self.pending
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes waiting to be committed, without the control byte.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of sequential writes still possible before the cursor hits the end.
    pub fn remaining(&self) -> usize {
        self.pixel_count - self.cursor
    }

    /// Rewind the cursor and empty the wire buffer. Pixel states are untouched.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.buffer.clear();
    }

    /// Write a pixel at the cursor and advance it. O(1).
    pub fn write_next(&mut self, pixel: Pixel) -> Result<()> {
        if self.cursor == self.pixel_count {
            return Err(Error::Range {
                position: self.cursor,
                max: self.pixel_count - 1,
            });
        }
        protocol::push_pixel(&mut self.buffer, &pixel);
        self.pending[self.cursor] = pixel;
        self.cursor += 1;
        Ok(())
    }

    /// Write a pixel at an explicit position.
    ///
    /// Rebuilds the whole wire buffer from the pending state, so this costs
    /// O(pixel count) per call; prefer [`write_next`](Self::write_next) when
    /// writing in strip order. The cursor is not moved.
    pub fn write_at(&mut self, pixel: Pixel, position: usize) -> Result<()> {
        if position >= self.pixel_count {
            return Err(Error::OutOfRange {
                position,
                pixel_count: self.pixel_count,
            });
        }
        self.pending[position] = pixel;
        protocol::encode_pixels(&mut self.buffer, &self.pending);
        Ok(())
    }

    /// Send the buffered pixels plus the control byte to the strip.
    ///
    /// On transport failure nothing changes and the commit may be retried.
    pub fn commit(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Err(Error::EmptyBuffer);
        }

        let payload_len = self.buffer.len();
        self.buffer.push(CONTROL_BYTE);

        if log_enabled!(Level::Trace) {
            trace!("frame: {}", protocol::hex_dump(&self.buffer));
        }

        if let Err(e) = transport::send(&mut self.transport, &self.buffer) {
            self.buffer.truncate(payload_len);
            return Err(Error::Transport(e));
        }

        debug!("committed {} pixels", payload_len / protocol::BYTES_PER_PIXEL);

        self.clear();
        self.committed.copy_from_slice(&self.pending);
        Ok(())
    }

    /// Drop uncommitted writes and return the pending state to the committed one.
    pub fn discard(&mut self) {
        self.clear();
        self.pending.copy_from_slice(&self.committed);
    }

    /// Write `pixels` sequentially from the cursor, ignoring any beyond the
    /// strip length. Fails up front, without writing, if they do not fit.
    pub fn write_all(&mut self, pixels: &[Pixel]) -> Result<()> {
        let count = pixels.len().min(self.pixel_count);
        if count > self.remaining() {
            return Err(Error::Range {
                position: self.pixel_count,
                max: self.pixel_count - 1,
            });
        }
        for pixel in &pixels[..count] {
            self.write_next(*pixel)?;
        }
        Ok(())
    }

    /// Clear, write one frame and commit it. Empty frames commit nothing.
    pub fn render_frame(&mut self, frame: &[Pixel]) -> Result<()> {
        self.clear();
        if frame.is_empty() {
            return Ok(());
        }
        self.write_all(frame)?;
        self.commit()
    }

    /// Send a bare control byte so the strip stops whatever it is showing.
    /// Buffer and pixel states are untouched.
    pub fn halt(&mut self) -> Result<()> {
        transport::send(&mut self.transport, &[CONTROL_BYTE]).map_err(Error::Transport)
    }
}
