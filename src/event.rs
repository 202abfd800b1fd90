//! Event header, event type codes and the decoded event model.

use crate::bitmap::ColumnBitmap;
use crate::checksum::Checksum;
use crate::error::{Error, Result};
use crate::stream::{DecodeStream, Endian};
use std::io::Read;

/// Binlog event type codes the decoder knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventType {
    Query,
    Rotate,
    Intvar,
    FormatDescription,
    Xid,
    TableMap,
    WriteRowsV1,
    UpdateRowsV1,
    DeleteRowsV1,
    Heartbeat,
    WriteRowsV2,
    UpdateRowsV2,
    DeleteRowsV2,
    Gtid,
    Other(u8),
}

impl EventType {
    pub fn from_u8(code: u8) -> Self {
        match code {
            2 => Self::Query,
            4 => Self::Rotate,
            5 => Self::Intvar,
            15 => Self::FormatDescription,
            16 => Self::Xid,
            19 => Self::TableMap,
            23 => Self::WriteRowsV1,
            24 => Self::UpdateRowsV1,
            25 => Self::DeleteRowsV1,
            27 => Self::Heartbeat,
            30 => Self::WriteRowsV2,
            31 => Self::UpdateRowsV2,
            32 => Self::DeleteRowsV2,
            33 => Self::Gtid,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Query => 2,
            Self::Rotate => 4,
            Self::Intvar => 5,
            Self::FormatDescription => 15,
            Self::Xid => 16,
            Self::TableMap => 19,
            Self::WriteRowsV1 => 23,
            Self::UpdateRowsV1 => 24,
            Self::DeleteRowsV1 => 25,
            Self::Heartbeat => 27,
            Self::WriteRowsV2 => 30,
            Self::UpdateRowsV2 => 31,
            Self::DeleteRowsV2 => 32,
            Self::Gtid => 33,
            Self::Other(code) => code,
        }
    }

    pub fn is_row_event(self) -> bool {
        matches!(
            self,
            Self::WriteRowsV1
                | Self::UpdateRowsV1
                | Self::DeleteRowsV1
                | Self::WriteRowsV2
                | Self::UpdateRowsV2
                | Self::DeleteRowsV2
        )
    }

    /// v2 row events carry an extra-info block after the reserved flags.
    pub fn has_extra_info(self) -> bool {
        matches!(
            self,
            Self::WriteRowsV2 | Self::UpdateRowsV2 | Self::DeleteRowsV2
        )
    }
}

/// The fixed 19-byte header in front of every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventHeader {
    pub timestamp: u32,
    pub event_type: u8,
    pub server_id: u32,
    /// Total event length, header and trailer included.
    pub event_length: u32,
    pub next_position: u32,
    pub flags: u16,
}

impl EventHeader {
    pub const SIZE: usize = 19;

    /// Reads a header, absorbing it into `checksum`.
    pub fn read<R: Read, C: Checksum + ?Sized>(
        stream: &mut DecodeStream<R>,
        checksum: &mut C,
    ) -> Result<Self> {
        Ok(Self {
            timestamp: stream.read_uint(4, Endian::Little, checksum)?,
            event_type: stream.read_u8(checksum)?,
            server_id: stream.read_uint(4, Endian::Little, checksum)?,
            event_length: stream.read_uint(4, Endian::Little, checksum)?,
            next_position: stream.read_uint(4, Endian::Little, checksum)?,
            flags: stream.read_uint(2, Endian::Little, checksum)? as u16,
        })
    }

    pub fn kind(&self) -> EventType {
        EventType::from_u8(self.event_type)
    }

    /// Length of everything after the header.
    pub fn body_len(&self) -> Result<usize> {
        (self.event_length as usize)
            .checked_sub(Self::SIZE)
            .ok_or_else(|| {
                Error::invalid_event(format!(
                    "event length {} is shorter than the {}-byte header",
                    self.event_length,
                    Self::SIZE
                ))
            })
    }
}

/// A column value as produced by a `RowCodec`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    Text(String),
}

/// One row image: the values of the columns selected by a bitmap.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Row {
    pub values: Vec<ColumnValue>,
}

impl Row {
    pub fn new(values: Vec<ColumnValue>) -> Self {
        Self { values }
    }
}

/// Before and after images of one updated row.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowPair {
    pub before: Row,
    pub after: Row,
}

/// Rows inserted into a table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteRowsEvent {
    pub header: EventHeader,
    pub table_id: u64,
    pub database: String,
    pub table: String,
    pub reserved: u16,
    pub extra_info: Vec<u8>,
    pub column_count: usize,
    pub columns: ColumnBitmap,
    pub rows: Vec<Row>,
}

/// Rows deleted from a table. Same layout as a write event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeleteRowsEvent {
    pub header: EventHeader,
    pub table_id: u64,
    pub database: String,
    pub table: String,
    pub reserved: u16,
    pub extra_info: Vec<u8>,
    pub column_count: usize,
    pub columns: ColumnBitmap,
    pub rows: Vec<Row>,
}

/// Rows updated in a table, as before/after pairs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UpdateRowsEvent {
    pub header: EventHeader,
    pub table_id: u64,
    pub database: String,
    pub table: String,
    pub reserved: u16,
    pub extra_info: Vec<u8>,
    pub column_count: usize,
    pub columns_before: ColumnBitmap,
    pub columns_after: ColumnBitmap,
    pub rows: Vec<RowPair>,
}

/// Value for the next auto-increment or `LAST_INSERT_ID()`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntvarEvent {
    pub header: EventHeader,
    /// 1 = `LAST_INSERT_ID`, 2 = `INSERT_ID`.
    pub kind: u8,
    pub value: u64,
}

impl IntvarEvent {
    pub const LAST_INSERT_ID: u8 = 1;
    pub const INSERT_ID: u8 = 2;
}

/// A fully decoded event.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinlogEvent {
    WriteRows(WriteRowsEvent),
    UpdateRows(UpdateRowsEvent),
    DeleteRows(DeleteRowsEvent),
    Intvar(IntvarEvent),
}

impl BinlogEvent {
    pub fn header(&self) -> &EventHeader {
        match self {
            Self::WriteRows(e) => &e.header,
            Self::UpdateRows(e) => &e.header,
            Self::DeleteRows(e) => &e.header,
            Self::Intvar(e) => &e.header,
        }
    }

    pub fn table_id(&self) -> Option<u64> {
        match self {
            Self::WriteRows(e) => Some(e.table_id),
            Self::UpdateRows(e) => Some(e.table_id),
            Self::DeleteRows(e) => Some(e.table_id),
            Self::Intvar(_) => None,
        }
    }
}
