//! A buffered, limit-aware decoder over a raw byte source.
//!
//! `DecodeStream` owns the byte source for a replication session. Every
//! primitive takes a checksum accumulator and feeds it exactly the bytes it
//! consumes; pass `&mut NoChecksum` when a read must not be accumulated.
//!
//! # Read-limit windows
//!
//! `set_limit(n)` opens a window of `n` bytes (0 disables enforcement) and
//! resets the consumed counter. A read that would cross the window consumes
//! the bytes up to the boundary and then fails with `Error::LimitExceeded`,
//! which keeps the source cursor consistent with the declared event length.
//!
//! # Packet continuation
//!
//! A field longer than the window is split by the server across consecutive
//! packets, each continuation prefixed by a 3-byte length and a 1-byte
//! sequence number. `read_split_bytes` stitches such a field back together
//! and re-derives the window so that reads after the field stay in bounds.

use crate::bitmap::ColumnBitmap;
use crate::checksum::{Checksum, NoChecksum};
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};
use tracing::trace;

/// Default internal buffer size (512 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 512 * 1024;

/// Length of a packet continuation header: 3-byte length + 1-byte sequence.
pub const PACKET_HEADER_LEN: usize = 4;

/// Byte order used to compose a fixed-width integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// A buffered decoder with read-limit windows and checksum accumulation.
pub struct DecodeStream<R: Read> {
    source: R,
    buffer: Box<[u8]>,
    head: usize,
    tail: usize,
    consumed: usize,
    limit: usize,
    /// Bytes the window grew by to cover the tail of a continuation packet.
    extension: usize,
    position: u64,
}

impl<R: Read> DecodeStream<R> {
    /// Creates a stream with the default 512 KiB buffer.
    pub fn new(source: R) -> Self {
        Self::with_capacity(source, DEFAULT_BUFFER_SIZE)
    }

    /// Creates a stream with an explicit buffer size (at least one byte).
    pub fn with_capacity(source: R, capacity: usize) -> Self {
        Self {
            source,
            buffer: vec![0u8; capacity.max(1)].into_boxed_slice(),
            head: 0,
            tail: 0,
            consumed: 0,
            limit: 0,
            extension: 0,
            position: 0,
        }
    }

    /// Drops buffered bytes and clears the window.
    ///
    /// Use this after the caller has repositioned the source itself.
    pub fn reset_stream(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.consumed = 0;
        self.limit = 0;
        self.extension = 0;
        self.position = 0;
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    //--- Read-limit window ---

    /// Opens a fresh window of `limit` bytes; 0 means unbounded.
    pub fn set_limit(&mut self, limit: usize) {
        self.consumed = 0;
        self.limit = limit;
        self.extension = 0;
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes consumed since the window was opened.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Total bytes taken from the source since creation or the last
    /// `reset_stream`, continuation headers included. Never decreases.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left in the active window, or the buffered byte count when no
    /// window is active.
    pub fn available_in_window(&self) -> usize {
        if self.limit > 0 {
            self.window_end() - self.consumed
        } else {
            self.tail - self.head
        }
    }

    pub fn has_more(&self) -> bool {
        self.head < self.tail || self.available_in_window() > 0
    }

    /// Returns `Ok(true)` when the buffer is empty and the source reports a
    /// clean end of data. Never touches the window.
    pub fn is_exhausted(&mut self) -> Result<bool> {
        if self.head < self.tail {
            return Ok(false);
        }
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(0) => return Ok(true),
                Ok(n) => {
                    self.head = 0;
                    self.tail = n;
                    return Ok(false);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    //--- Primitives ---

    /// Reads one byte.
    pub fn read_u8<C: Checksum + ?Sized>(&mut self, checksum: &mut C) -> Result<u8> {
        if let Some(available) = self.overflow(1) {
            return Err(Error::limit_exceeded(self.window_end(), 1, available));
        }
        if self.head >= self.tail {
            self.fill()?;
        }
        let byte = self.buffer[self.head];
        self.head += 1;
        self.consumed += 1;
        checksum.update_byte(byte);
        Ok(byte)
    }

    /// Reads an unsigned integer of 1 to 4 bytes.
    pub fn read_uint<C: Checksum + ?Sized>(
        &mut self,
        len: usize,
        endian: Endian,
        checksum: &mut C,
    ) -> Result<u32> {
        if !(1..=4).contains(&len) {
            return Err(Error::invalid_event(format!(
                "integer width {len} outside 1..=4"
            )));
        }
        let mut bytes = [0u8; 4];
        self.read_into(&mut bytes[..len], checksum)?;
        Ok(compose(&bytes[..len], endian) as u32)
    }

    /// Reads an unsigned integer of 1 to 8 bytes.
    pub fn read_uint64<C: Checksum + ?Sized>(
        &mut self,
        len: usize,
        endian: Endian,
        checksum: &mut C,
    ) -> Result<u64> {
        if !(1..=8).contains(&len) {
            return Err(Error::invalid_event(format!(
                "integer width {len} outside 1..=8"
            )));
        }
        let mut bytes = [0u8; 8];
        self.read_into(&mut bytes[..len], checksum)?;
        Ok(compose(&bytes[..len], endian))
    }

    /// Reads a little-endian signed integer of 1 to 4 bytes, sign-extending
    /// from the top bit of the last byte.
    pub fn read_signed_int<C: Checksum + ?Sized>(
        &mut self,
        len: usize,
        checksum: &mut C,
    ) -> Result<i32> {
        let value = self.read_uint(len, Endian::Little, checksum)?;
        Ok(sign_extend(value as u64, len, 4) as u32 as i32)
    }

    /// Reads a little-endian signed integer of 1 to 8 bytes, sign-extending
    /// from the top bit of the last byte.
    pub fn read_signed_long<C: Checksum + ?Sized>(
        &mut self,
        len: usize,
        checksum: &mut C,
    ) -> Result<i64> {
        let value = self.read_uint64(len, Endian::Little, checksum)?;
        Ok(sign_extend(value, len, 8) as i64)
    }

    /// Reads exactly `len` bytes.
    pub fn read_bytes<C: Checksum + ?Sized>(
        &mut self,
        len: usize,
        checksum: &mut C,
    ) -> Result<Vec<u8>> {
        if let Some(available) = self.overflow(len) {
            return Err(self.overrun(len, available, checksum));
        }
        let mut out = Vec::with_capacity(len.min(self.buffer.len()));
        self.append_out(&mut out, len, checksum)?;
        self.consumed += len;
        Ok(out)
    }

    /// Reads a bitmap of `bit_len` significant bits from `ceil(bit_len / 8)`
    /// bytes. Big-endian bitmaps have their bytes reversed first.
    pub fn read_bits<C: Checksum + ?Sized>(
        &mut self,
        bit_len: usize,
        endian: Endian,
        checksum: &mut C,
    ) -> Result<ColumnBitmap> {
        let mut bytes = self.read_bytes(bit_len.div_ceil(8), checksum)?;
        if endian == Endian::Big {
            bytes.reverse();
        }
        Ok(ColumnBitmap::from_bytes(bit_len, bytes))
    }

    /// Reads a length-encoded integer. `Ok(None)` is the NULL marker (0xFB).
    pub fn read_length_encoded_int<C: Checksum + ?Sized>(
        &mut self,
        checksum: &mut C,
    ) -> Result<Option<u64>> {
        let prefix = self.read_u8(checksum)?;
        match prefix {
            0..=250 => Ok(Some(prefix as u64)),
            251 => Ok(None),
            252 => Ok(Some(self.read_uint64(2, Endian::Little, checksum)?)),
            253 => Ok(Some(self.read_uint64(3, Endian::Little, checksum)?)),
            254 => Ok(Some(self.read_uint64(8, Endian::Little, checksum)?)),
            _ => Err(Error::MalformedLengthPrefix { prefix }),
        }
    }

    /// Reads a length-encoded byte string. `Ok(None)` is the NULL marker.
    ///
    /// Strings are returned as raw bytes; their character set depends on the
    /// column and is the codec's concern.
    pub fn read_length_encoded_string<C: Checksum + ?Sized>(
        &mut self,
        checksum: &mut C,
    ) -> Result<Option<Vec<u8>>> {
        match self.read_length_encoded_int(checksum)? {
            Some(len) => {
                let len = usize::try_from(len).map_err(|_| {
                    Error::invalid_event(format!("string length {len} does not fit in memory"))
                })?;
                self.read_fixed_string(len, checksum).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Reads bytes up to a zero terminator, which is consumed but not returned.
    pub fn read_null_terminated_string<C: Checksum + ?Sized>(
        &mut self,
        checksum: &mut C,
    ) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(128);
        loop {
            match self.read_u8(checksum)? {
                0 => return Ok(out),
                b => out.push(b),
            }
        }
    }

    /// Reads a string of exactly `len` bytes.
    pub fn read_fixed_string<C: Checksum + ?Sized>(
        &mut self,
        len: usize,
        checksum: &mut C,
    ) -> Result<Vec<u8>> {
        self.read_bytes(len, checksum)
    }

    /// Skips `len` bytes, absorbing each one into the checksum.
    pub fn skip<C: Checksum + ?Sized>(&mut self, len: usize, checksum: &mut C) -> Result<()> {
        if let Some(available) = self.overflow(len) {
            return Err(self.overrun(len, available, checksum));
        }
        self.discard(len, checksum)?;
        self.consumed += len;
        Ok(())
    }

    /// Reads a field of `total` bytes that may continue past the window into
    /// follow-up packets.
    ///
    /// Continuation headers are neither accumulated nor counted; payload bytes
    /// are. After each continuation the window is re-derived to cover the rest
    /// of that packet, growing past the original limit when the rest is longer.
    pub fn read_split_bytes<C: Checksum + ?Sized>(
        &mut self,
        total: usize,
        checksum: &mut C,
    ) -> Result<Vec<u8>> {
        if self.overflow(total).is_none() {
            return self.read_bytes(total, checksum);
        }

        let mut out = Vec::with_capacity(total.min(self.buffer.len()));
        let in_window = self.window_end() - self.consumed;
        self.append_out(&mut out, in_window, checksum)?;
        self.consumed = self.window_end();

        while out.len() < total {
            let mut header = [0u8; PACKET_HEADER_LEN];
            self.copy_out(&mut header, &mut NoChecksum)?;
            let packet_len = compose(&header[..3], Endian::Little) as usize;
            if packet_len == 0 {
                return Err(Error::invalid_event(format!(
                    "empty continuation packet with {} bytes outstanding",
                    total - out.len()
                )));
            }

            let chunk = (total - out.len()).min(packet_len);
            self.append_out(&mut out, chunk, checksum)?;

            // The window now ends where this packet ends.
            let rest = packet_len - chunk;
            let end = self.window_end();
            if rest > end {
                self.extension += rest - end;
            }
            self.consumed = self.window_end() - rest;
            trace!(
                sequence = header[3],
                packet_len,
                chunk,
                "reassembled continuation packet"
            );
        }
        Ok(out)
    }

    //--- Internals ---

    #[inline]
    fn window_end(&self) -> usize {
        self.limit + self.extension
    }

    /// Returns the bytes left in the window if `requested` would cross it.
    #[inline]
    fn overflow(&self, requested: usize) -> Option<usize> {
        if self.limit == 0 {
            return None;
        }
        let end = self.window_end();
        match self.consumed.checked_add(requested) {
            Some(needed) if needed <= end => None,
            _ => Some(end - self.consumed),
        }
    }

    fn read_into<C: Checksum + ?Sized>(&mut self, dst: &mut [u8], checksum: &mut C) -> Result<()> {
        let requested = dst.len();
        if let Some(available) = self.overflow(requested) {
            self.copy_out(&mut dst[..available], checksum)?;
            self.consumed += available;
            return Err(Error::limit_exceeded(self.window_end(), requested, available));
        }
        self.copy_out(dst, checksum)?;
        self.consumed += requested;
        Ok(())
    }

    /// Copies `dst.len()` bytes out of the buffer, refilling as needed.
    /// Does not touch the window counter.
    fn copy_out<C: Checksum + ?Sized>(&mut self, dst: &mut [u8], checksum: &mut C) -> Result<()> {
        let mut index = 0;
        while index < dst.len() {
            if self.head >= self.tail {
                self.fill()?;
            }
            let n = (self.tail - self.head).min(dst.len() - index);
            let chunk = &self.buffer[self.head..self.head + n];
            dst[index..index + n].copy_from_slice(chunk);
            checksum.update(chunk);
            self.head += n;
            self.position += n as u64;
            index += n;
        }
        Ok(())
    }

    /// Appends `len` bytes to `out`, growing it one refill at a time so a
    /// corrupt length cannot force a single huge allocation.
    fn append_out<C: Checksum + ?Sized>(
        &mut self,
        out: &mut Vec<u8>,
        len: usize,
        checksum: &mut C,
    ) -> Result<()> {
        let mut remaining = len;
        while remaining > 0 {
            if self.head >= self.tail {
                self.fill()?;
            }
            let n = (self.tail - self.head).min(remaining);
            let chunk = &self.buffer[self.head..self.head + n];
            out.extend_from_slice(chunk);
            checksum.update(chunk);
            self.head += n;
            self.position += n as u64;
            remaining -= n;
        }
        Ok(())
    }

    /// Consumes the rest of the window and builds the overflow error.
    fn overrun<C: Checksum + ?Sized>(
        &mut self,
        requested: usize,
        available: usize,
        checksum: &mut C,
    ) -> Error {
        if let Err(e) = self.discard(available, checksum) {
            return e;
        }
        self.consumed += available;
        Error::limit_exceeded(self.window_end(), requested, available)
    }

    /// Drops `len` bytes, absorbing only what is consumed in each refill round.
    fn discard<C: Checksum + ?Sized>(&mut self, len: usize, checksum: &mut C) -> Result<()> {
        let mut remaining = len;
        while remaining > 0 {
            if self.head >= self.tail {
                self.fill()?;
            }
            let n = (self.tail - self.head).min(remaining);
            checksum.update(&self.buffer[self.head..self.head + n]);
            self.head += n;
            self.position += n as u64;
            remaining -= n;
        }
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        loop {
            match self.source.read(&mut self.buffer) {
                Ok(0) => return Err(Error::EndOfStream),
                Ok(n) => {
                    self.head = 0;
                    self.tail = n;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read> std::fmt::Debug for DecodeStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeStream")
            .field("capacity", &self.buffer.len())
            .field("buffered", &(self.tail - self.head))
            .field("consumed", &self.consumed)
            .field("limit", &self.limit)
            .field("extension", &self.extension)
            .finish()
    }
}

fn compose(bytes: &[u8], endian: Endian) -> u64 {
    match endian {
        Endian::Little => bytes
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64),
        Endian::Big => bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64),
    }
}

/// Fills the bytes above `len` up to `width` with 0xFF when the top bit of
/// the last byte is set.
fn sign_extend(value: u64, len: usize, width: usize) -> u64 {
    let negative = value & (0x80 << ((len - 1) * 8)) != 0;
    if negative && len < width {
        value | (!0u64 << (len * 8))
    } else {
        value
    }
}
