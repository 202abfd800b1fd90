#![cfg(feature = "serde")]

use binlogstream::*;

#[test]
fn config_accepts_partial_json() {
    let config: DecoderConfig = serde_json::from_str(r#"{ "validation": "Lenient" }"#).unwrap();
    assert_eq!(config.validation, ValidationMode::Lenient);
    assert_eq!(config.checksum, ChecksumKind::default());
    assert_eq!(config.buffer_size, DecoderConfig::default().buffer_size);
}

#[test]
fn decoded_event_serializes_to_json() {
    let event = BinlogEvent::WriteRows(WriteRowsEvent {
        header: EventHeader {
            event_type: EventType::WriteRowsV2.code(),
            event_length: 64,
            ..EventHeader::default()
        },
        table_id: 42,
        database: "shop".into(),
        table: "orders".into(),
        reserved: 1,
        extra_info: Vec::new(),
        column_count: 2,
        columns: ColumnBitmap::all(2),
        rows: vec![Row::new(vec![
            ColumnValue::Int(7),
            ColumnValue::Text("pen".into()),
        ])],
    });

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["WriteRows"]["table"], "orders");
    assert_eq!(json["WriteRows"]["rows"][0]["values"][0]["Int"], 7);

    let back: BinlogEvent = serde_json::from_value(json).unwrap();
    assert_eq!(back, event);
}
