#![allow(dead_code)]

//! A small row codec covering three column types.

use binlogstream::{
    Checksum, ColumnBitmap, ColumnValue, DecodeStream, Endian, Error, Result, Row, RowCodec,
    TableMetadata,
};
use std::io::Read;

pub const LONG: u8 = 3;
pub const VARCHAR: u8 = 15;
pub const BLOB: u8 = 252;

/// Reads a null bitmap over the selected columns, then each non-null value.
///
/// LONG is a 4-byte signed int, VARCHAR a 1-byte length and text, BLOB a
/// 2-byte length and bytes that may continue into follow-up packets.
pub struct TestCodec;

impl<R: Read> RowCodec<R> for TestCodec {
    fn decode_row(
        &self,
        stream: &mut DecodeStream<R>,
        checksum: &mut dyn Checksum,
        table: &TableMetadata,
        columns: &ColumnBitmap,
    ) -> Result<Row> {
        let present = columns.count_ones();
        let nulls = stream.read_bits(present, Endian::Little, checksum)?;
        let mut values = Vec::with_capacity(present);
        for (slot, column) in columns.iter_set().enumerate() {
            if nulls.get(slot) {
                values.push(ColumnValue::Null);
                continue;
            }
            let value = match table.column_types.get(column).copied() {
                Some(LONG) => ColumnValue::Int(stream.read_signed_int(4, checksum)? as i64),
                Some(VARCHAR) => {
                    let len = stream.read_uint(1, Endian::Little, checksum)? as usize;
                    let text = stream.read_fixed_string(len, checksum)?;
                    ColumnValue::Text(String::from_utf8_lossy(&text).into_owned())
                }
                Some(BLOB) => {
                    let len = stream.read_uint(2, Endian::Little, checksum)? as usize;
                    ColumnValue::Bytes(stream.read_split_bytes(len, checksum)?)
                }
                other => {
                    return Err(Error::invalid_event(format!(
                        "unsupported column type {other:?}"
                    )))
                }
            };
            values.push(value);
        }
        Ok(Row::new(values))
    }
}

/// Encodes one row image: a single null-bitmap byte and the cells.
pub fn image(nulls: u8, cells: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![nulls];
    for cell in cells {
        out.extend_from_slice(cell);
    }
    out
}

pub fn long(value: i32) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

pub fn varchar(text: &str) -> Vec<u8> {
    let mut out = vec![text.len() as u8];
    out.extend_from_slice(text.as_bytes());
    out
}

pub fn blob(bytes: &[u8]) -> Vec<u8> {
    let mut out = (bytes.len() as u16).to_le_bytes().to_vec();
    out.extend_from_slice(bytes);
    out
}
