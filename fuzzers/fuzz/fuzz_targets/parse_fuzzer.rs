#![no_main]
use binlogstream::*;
use libfuzzer_sys::fuzz_target;
use std::collections::HashMap;
use std::io::{Cursor, Read};

/// Reads each selected column as a length-encoded string.
struct StringCodec;

impl<R: Read> RowCodec<R> for StringCodec {
    fn decode_row(
        &self,
        stream: &mut DecodeStream<R>,
        checksum: &mut dyn Checksum,
        _table: &TableMetadata,
        columns: &ColumnBitmap,
    ) -> Result<Row> {
        let mut values = Vec::new();
        for _ in columns.iter_set() {
            values.push(match stream.read_length_encoded_string(checksum)? {
                Some(bytes) => ColumnValue::Bytes(bytes),
                None => ColumnValue::Null,
            });
        }
        Ok(Row::new(values))
    }
}

fuzz_target!(|data: &[u8]| {
    let mut registry: HashMap<u64, TableMetadata> = HashMap::new();
    registry.insert(1, TableMetadata::new(1, "db", "t", vec![15, 15]));

    for validation in [ValidationMode::Strict, ValidationMode::Lenient] {
        let config = DecoderConfig::default()
            .with_buffer_size(64)
            .with_validation(validation);
        let mut parser =
            BinlogParser::with_config(Cursor::new(data), registry.clone(), StringCodec, config);
        let _ = parser.process_all(&mut |_event: BinlogEvent| {});
    }
});
