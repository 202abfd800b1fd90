#![allow(dead_code)]

//! Builds wire-format binlog events for tests.

use binlogstream::{Checksum, Crc32, EventHeader, EventType};

pub const SERVER_ID: u32 = 7;
pub const TIMESTAMP: u32 = 1_700_000_000;

/// Marks the last rows event of a statement.
pub const STMT_END_F: u16 = 0x0001;

/// Body of a rows event, up to (and excluding) the checksum trailer.
#[derive(Debug, Clone)]
pub struct RowsBody {
    event_type: EventType,
    table_id: u64,
    flags: u16,
    extra_info: Vec<u8>,
    column_count: usize,
    bitmaps: Vec<Vec<u8>>,
    images: Vec<Vec<u8>>,
}

impl RowsBody {
    pub fn new(event_type: EventType, table_id: u64, column_count: usize) -> Self {
        Self {
            event_type,
            table_id,
            flags: STMT_END_F,
            extra_info: Vec::new(),
            column_count,
            bitmaps: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn extra_info(mut self, extra_info: &[u8]) -> Self {
        self.extra_info = extra_info.to_vec();
        self
    }

    /// Adds a column bitmap covering every column.
    pub fn all_columns(self) -> Self {
        let bytes = vec![0xFF; self.column_count.div_ceil(8)];
        self.bitmap(&bytes)
    }

    pub fn bitmap(mut self, bytes: &[u8]) -> Self {
        self.bitmaps.push(bytes.to_vec());
        self
    }

    pub fn image(mut self, image: Vec<u8>) -> Self {
        self.images.push(image);
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.table_id.to_le_bytes()[..6]);
        out.extend_from_slice(&self.flags.to_le_bytes());
        if self.event_type.has_extra_info() {
            out.extend_from_slice(&((self.extra_info.len() + 2) as u16).to_le_bytes());
            out.extend_from_slice(&self.extra_info);
        }
        put_length_encoded(&mut out, self.column_count as u64);
        for bitmap in &self.bitmaps {
            out.extend_from_slice(bitmap);
        }
        for image in &self.images {
            out.extend_from_slice(image);
        }
        out
    }

    /// The complete event, CRC32 trailer included.
    pub fn event(&self) -> Vec<u8> {
        event(self.event_type.code(), &self.encode(), true)
    }
}

pub fn put_length_encoded(out: &mut Vec<u8>, value: u64) {
    match value {
        0..=250 => out.push(value as u8),
        251..=0xFFFF => {
            out.push(0xFC);
            out.extend_from_slice(&(value as u16).to_le_bytes());
        }
        0x1_0000..=0xFF_FFFF => {
            out.push(0xFD);
            out.extend_from_slice(&value.to_le_bytes()[..3]);
        }
        _ => {
            out.push(0xFE);
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
}

pub fn header(event_type: u8, event_length: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(EventHeader::SIZE);
    out.extend_from_slice(&TIMESTAMP.to_le_bytes());
    out.push(event_type);
    out.extend_from_slice(&SERVER_ID.to_le_bytes());
    out.extend_from_slice(&(event_length as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Header plus body, followed by a CRC32 trailer over both when `crc` is set.
pub fn event(event_type: u8, body: &[u8], crc: bool) -> Vec<u8> {
    let trailer = if crc { 4 } else { 0 };
    let mut out = header(event_type, EventHeader::SIZE + body.len() + trailer);
    out.extend_from_slice(body);
    if crc {
        let value = crc32(&out);
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn intvar(kind: u8, value: u64) -> Vec<u8> {
    let mut body = vec![kind];
    body.extend_from_slice(&value.to_le_bytes());
    event(EventType::Intvar.code(), &body, true)
}

/// An event whose body was cut after `first_len` bytes, the rest arriving in
/// continuation packets of at most `packet_len` bytes.
///
/// The header announces only the first part, the way a server does when it
/// splits an oversized event. The trailer covers the whole logical event.
pub fn split_event(event_type: u8, body: &[u8], first_len: usize, packet_len: usize) -> Vec<u8> {
    let head = header(event_type, EventHeader::SIZE + first_len);
    let mut logical = head.clone();
    logical.extend_from_slice(body);
    let mut payload = body.to_vec();
    payload.extend_from_slice(&crc32(&logical).to_le_bytes());

    let mut out = head;
    out.extend_from_slice(&payload[..first_len]);
    for (sequence, chunk) in payload[first_len..].chunks(packet_len).enumerate() {
        out.extend_from_slice(&(chunk.len() as u32).to_le_bytes()[..3]);
        out.push(sequence as u8 + 1);
        out.extend_from_slice(chunk);
    }
    out
}

pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.value()
}
