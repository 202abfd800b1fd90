//! # binlogstream
//!
//! A streaming decoder for MySQL binary replication log events.
//!
//! ## Overview
//!
//! `binlogstream` turns the raw byte stream a replication client receives
//! into structured row mutation events. The decoding core is
//! [`DecodeStream`], a buffered byte source that:
//!
//! * decodes every primitive field (fixed and length-encoded integers,
//!   strings, bitmaps);
//! * feeds every consumed byte into a running [`Checksum`];
//! * enforces a per-event read-limit window;
//! * reassembles fields that the server split across continuation packets.
//!
//! Row events are decoded on top of it with the help of caller-supplied
//! collaborators: a [`TableRegistry`] for table metadata, an optional
//! [`RowFilter`], and a [`RowCodec`] for column values.
//!
//! ## Quick Start
//!
//! ```rust
//! use binlogstream::*;
//! use std::collections::HashMap;
//! use std::io::Cursor;
//!
//! /// Reads every selected column as a little-endian 4-byte integer.
//! struct IntCodec;
//!
//! impl<R: std::io::Read> RowCodec<R> for IntCodec {
//!     fn decode_row(
//!         &self,
//!         stream: &mut DecodeStream<R>,
//!         checksum: &mut dyn Checksum,
//!         _table: &TableMetadata,
//!         columns: &ColumnBitmap,
//!     ) -> Result<Row> {
//!         let mut values = Vec::with_capacity(columns.count_ones());
//!         for _ in columns.iter_set() {
//!             values.push(ColumnValue::Int(stream.read_signed_int(4, checksum)? as i64));
//!         }
//!         Ok(Row::new(values))
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mut registry: HashMap<u64, TableMetadata> = HashMap::new();
//!     registry.insert(1, TableMetadata::new(1, "shop", "orders", vec![3]));
//!
//!     let config = DecoderConfig::default().with_checksum(ChecksumKind::None);
//!     let mut parser = BinlogParser::with_config(Cursor::new(Vec::new()), registry, IntCodec, config);
//!
//!     parser.process_all(&mut |event: BinlogEvent| {
//!         println!("event for table {:?}", event.table_id());
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! * **`checksum`**: running checksum accumulators and strict/lenient validation
//! * **`stream`**: the buffered, limit-aware primitive decoder
//! * **`rows`**: the shared write/update/delete row event algorithm
//! * **`parser`**: the event-type dispatch map and the session loop

pub mod bitmap;
pub mod checksum;
pub mod config;
pub mod error;
pub mod event;
pub mod parser;
pub mod rows;
pub mod stream;
pub mod traits;

// Re-export the main public API for user convenience.
pub use bitmap::ColumnBitmap;
pub use checksum::{Checksum, ChecksumKind, NoChecksum, ValidationMode};
pub use config::DecoderConfig;
pub use error::{Error, Result};
pub use event::{
    BinlogEvent, ColumnValue, DeleteRowsEvent, EventHeader, EventType, IntvarEvent, Row, RowPair,
    UpdateRowsEvent, WriteRowsEvent,
};
pub use parser::{BinlogParser, DecodeContext, DecodeFn, EventDecoders, Events};
pub use stream::{DecodeStream, Endian};
pub use traits::{EventListener, RowCodec, RowFilter, TableMetadata, TableRegistry};

#[cfg(feature = "crc32")]
pub use checksum::Crc32;
