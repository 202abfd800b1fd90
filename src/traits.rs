//! Collaborator traits for the decoder.
//!
//! The decoder never owns schema knowledge or value decoding. It asks a
//! `TableRegistry` for table metadata, an optional `RowFilter` whether an
//! event is worth decoding, a `RowCodec` to turn row bytes into values, and
//! hands finished events to an `EventListener`.

use crate::bitmap::ColumnBitmap;
use crate::checksum::Checksum;
use crate::error::Result;
use crate::event::{BinlogEvent, EventHeader, Row};
use crate::stream::DecodeStream;
use std::collections::HashMap;
use std::io::Read;

/// Column layout of one table, as announced by a table map event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableMetadata {
    pub table_id: u64,
    pub database: String,
    pub table: String,
    /// Server column type codes, one per column.
    pub column_types: Vec<u8>,
    /// Per-column type metadata (lengths, precision), one per column.
    pub column_metadata: Vec<u16>,
}

impl TableMetadata {
    pub fn new(
        table_id: u64,
        database: impl Into<String>,
        table: impl Into<String>,
        column_types: Vec<u8>,
    ) -> Self {
        let column_metadata = vec![0; column_types.len()];
        Self {
            table_id,
            database: database.into(),
            table: table.into(),
            column_types,
            column_metadata,
        }
    }

    pub fn with_metadata(mut self, column_metadata: Vec<u16>) -> Self {
        self.column_metadata = column_metadata;
        self
    }

    pub fn column_count(&self) -> usize {
        self.column_types.len()
    }
}

/// Source of table metadata keyed by table id.
pub trait TableRegistry {
    fn lookup(&self, table_id: u64) -> Option<&TableMetadata>;
}

impl TableRegistry for HashMap<u64, TableMetadata> {
    fn lookup(&self, table_id: u64) -> Option<&TableMetadata> {
        self.get(&table_id)
    }
}

/// Decides whether a row event should be decoded at all.
///
/// Rejected events are skipped over without decoding their rows.
pub trait RowFilter {
    fn accepts(
        &self,
        header: &EventHeader,
        registry: &dyn TableRegistry,
        table: &TableMetadata,
    ) -> bool;
}

impl<F> RowFilter for F
where
    F: Fn(&EventHeader, &dyn TableRegistry, &TableMetadata) -> bool,
{
    fn accepts(
        &self,
        header: &EventHeader,
        registry: &dyn TableRegistry,
        table: &TableMetadata,
    ) -> bool {
        self(header, registry, table)
    }
}

/// Decodes one row image from the stream's current position.
///
/// Implementations must read through `stream` with the supplied checksum so
/// that the event trailer validates, and must consume exactly the bytes of
/// one row image.
pub trait RowCodec<R: Read> {
    fn decode_row(
        &self,
        stream: &mut DecodeStream<R>,
        checksum: &mut dyn Checksum,
        table: &TableMetadata,
        columns: &ColumnBitmap,
    ) -> Result<Row>;
}

/// Receives decoded events, exactly once each.
pub trait EventListener {
    fn on_event(&mut self, event: BinlogEvent);
}

impl<F: FnMut(BinlogEvent)> EventListener for F {
    fn on_event(&mut self, event: BinlogEvent) {
        self(event)
    }
}
