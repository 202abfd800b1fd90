//! Row mutation events: write, update and delete.
//!
//! All three share one layout: a 6-byte table id, reserved flags, an
//! extra-info block (v2 only), a length-encoded column count and one or two
//! column bitmaps, followed by row images until only the checksum trailer is
//! left in the event window.

use crate::bitmap::ColumnBitmap;
use crate::checksum::Checksum;
use crate::error::{Error, Result};
use crate::event::{
    BinlogEvent, DeleteRowsEvent, EventHeader, Row, RowPair, UpdateRowsEvent, WriteRowsEvent,
};
use crate::parser::DecodeContext;
use crate::stream::{DecodeStream, Endian};
use crate::traits::{RowCodec, RowFilter, TableMetadata, TableRegistry};
use std::io::Read;
use tracing::debug;

/// Fields shared by every row event, read before the bitmaps.
struct RowsPrefix<'t> {
    table_id: u64,
    table: &'t TableMetadata,
    reserved: u16,
    extra_info: Vec<u8>,
    column_count: usize,
}

/// Decodes a `WRITE_ROWS` event (v1 or v2).
pub fn decode_write_rows<R: Read>(
    stream: &mut DecodeStream<R>,
    header: &EventHeader,
    ctx: &mut DecodeContext<'_, R>,
) -> Result<Option<BinlogEvent>> {
    let Some((prefix, columns, rows)) = decode_single_image(stream, header, ctx)? else {
        return Ok(None);
    };
    debug!(table_id = prefix.table_id, rows = rows.len(), "decoded write rows event");
    Ok(Some(BinlogEvent::WriteRows(WriteRowsEvent {
        header: *header,
        table_id: prefix.table_id,
        database: prefix.table.database.clone(),
        table: prefix.table.table.clone(),
        reserved: prefix.reserved,
        extra_info: prefix.extra_info,
        column_count: prefix.column_count,
        columns,
        rows,
    })))
}

/// Decodes a `DELETE_ROWS` event (v1 or v2).
pub fn decode_delete_rows<R: Read>(
    stream: &mut DecodeStream<R>,
    header: &EventHeader,
    ctx: &mut DecodeContext<'_, R>,
) -> Result<Option<BinlogEvent>> {
    let Some((prefix, columns, rows)) = decode_single_image(stream, header, ctx)? else {
        return Ok(None);
    };
    debug!(table_id = prefix.table_id, rows = rows.len(), "decoded delete rows event");
    Ok(Some(BinlogEvent::DeleteRows(DeleteRowsEvent {
        header: *header,
        table_id: prefix.table_id,
        database: prefix.table.database.clone(),
        table: prefix.table.table.clone(),
        reserved: prefix.reserved,
        extra_info: prefix.extra_info,
        column_count: prefix.column_count,
        columns,
        rows,
    })))
}

/// Decodes an `UPDATE_ROWS` event (v1 or v2).
///
/// Row images alternate before/after; an odd image count means the event
/// is corrupt and is reported as `Error::UnevenRowPairCount`.
pub fn decode_update_rows<R: Read>(
    stream: &mut DecodeStream<R>,
    header: &EventHeader,
    ctx: &mut DecodeContext<'_, R>,
) -> Result<Option<BinlogEvent>> {
    let registry = ctx.registry;
    let codec = ctx.codec;
    let trailer_len = ctx.checksum_kind.trailer_len();
    let checksum: &mut dyn Checksum = &mut *ctx.checksum;

    let Some(prefix) = read_prefix(stream, header, ctx.filter, registry, checksum)? else {
        return Ok(None);
    };
    let columns_before = stream.read_bits(prefix.column_count, Endian::Little, checksum)?;
    let columns_after = stream.read_bits(prefix.column_count, Endian::Little, checksum)?;

    let mut images = Vec::new();
    while stream.available_in_window() > trailer_len {
        let columns = if images.len() % 2 == 0 {
            &columns_before
        } else {
            &columns_after
        };
        images.push(decode_image(stream, codec, checksum, prefix.table, columns)?);
    }
    if images.len() % 2 != 0 {
        return Err(Error::UnevenRowPairCount {
            count: images.len(),
        });
    }

    let mut rows = Vec::with_capacity(images.len() / 2);
    let mut images = images.into_iter();
    while let (Some(before), Some(after)) = (images.next(), images.next()) {
        rows.push(RowPair { before, after });
    }

    ctx.verify_trailer(stream)?;
    debug!(table_id = prefix.table_id, rows = rows.len(), "decoded update rows event");
    Ok(Some(BinlogEvent::UpdateRows(UpdateRowsEvent {
        header: *header,
        table_id: prefix.table_id,
        database: prefix.table.database.clone(),
        table: prefix.table.table.clone(),
        reserved: prefix.reserved,
        extra_info: prefix.extra_info,
        column_count: prefix.column_count,
        columns_before,
        columns_after,
        rows,
    })))
}

/// Shared body of write and delete events: one bitmap, one image per row.
fn decode_single_image<'a, R: Read>(
    stream: &mut DecodeStream<R>,
    header: &EventHeader,
    ctx: &mut DecodeContext<'a, R>,
) -> Result<Option<(RowsPrefix<'a>, ColumnBitmap, Vec<Row>)>> {
    let registry = ctx.registry;
    let codec = ctx.codec;
    let trailer_len = ctx.checksum_kind.trailer_len();
    let checksum: &mut dyn Checksum = &mut *ctx.checksum;

    let Some(prefix) = read_prefix(stream, header, ctx.filter, registry, checksum)? else {
        return Ok(None);
    };
    let columns = stream.read_bits(prefix.column_count, Endian::Little, checksum)?;

    let mut rows = Vec::new();
    while stream.available_in_window() > trailer_len {
        rows.push(decode_image(stream, codec, checksum, prefix.table, &columns)?);
    }

    ctx.verify_trailer(stream)?;
    Ok(Some((prefix, columns, rows)))
}

/// Decodes one row image. A codec that takes no bytes would never reach the
/// trailer, so that is rejected.
fn decode_image<R: Read>(
    stream: &mut DecodeStream<R>,
    codec: &dyn RowCodec<R>,
    checksum: &mut dyn Checksum,
    table: &TableMetadata,
    columns: &ColumnBitmap,
) -> Result<Row> {
    let start = stream.position();
    let row = codec.decode_row(stream, checksum, table, columns)?;
    if stream.position() == start {
        return Err(Error::invalid_event(format!(
            "row codec made no progress on table {}.{}",
            table.database, table.table
        )));
    }
    Ok(row)
}

/// Resolves the table, applies the filter and reads the fixed prefix.
///
/// Returns `Ok(None)` when the filter rejected the event; in that case the
/// rest of the event window has been skipped and the checksum reset.
fn read_prefix<'t, R: Read>(
    stream: &mut DecodeStream<R>,
    header: &EventHeader,
    filter: Option<&dyn RowFilter>,
    registry: &'t dyn TableRegistry,
    checksum: &mut dyn Checksum,
) -> Result<Option<RowsPrefix<'t>>> {
    if stream.limit() == 0 {
        return Err(Error::invalid_event(
            "row events must be decoded inside a read-limit window",
        ));
    }

    let table_id = stream.read_uint64(6, Endian::Little, checksum)?;
    let table = registry
        .lookup(table_id)
        .ok_or(Error::UnresolvedTable { table_id })?;

    if let Some(filter) = filter {
        if !filter.accepts(header, registry, table) {
            let remaining = stream.available_in_window();
            stream.skip(remaining, checksum)?;
            checksum.reset();
            debug!(
                table_id,
                database = %table.database,
                table = %table.table,
                skipped = remaining,
                "row event rejected by filter"
            );
            return Ok(None);
        }
    }

    let reserved = stream.read_uint(2, Endian::Little, checksum)? as u16;
    let extra_info = if header.kind().has_extra_info() {
        let len = stream.read_uint(2, Endian::Little, checksum)? as usize;
        if len > 2 {
            stream.read_bytes(len - 2, checksum)?
        } else {
            Vec::new()
        }
    } else {
        Vec::new()
    };

    let column_count = stream
        .read_length_encoded_int(checksum)?
        .ok_or_else(|| Error::invalid_event("row event column count is NULL"))?;
    let column_count = usize::try_from(column_count)
        .map_err(|_| Error::invalid_event(format!("column count {column_count} is too large")))?;

    Ok(Some(RowsPrefix {
        table_id,
        table,
        reserved,
        extra_info,
        column_count,
    }))
}
