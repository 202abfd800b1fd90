#![allow(dead_code)]

use super::event_builder::{self, RowsBody};
use super::test_codec::{image, long, varchar};
use binlogstream::{EventType, IntvarEvent};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A binlog written to a temporary file, plus a seeded generator for its
/// contents.
pub struct BinlogFile {
    _temp_file: NamedTempFile,
    path: PathBuf,
    rng: StdRng,
}

/// Rows expected from a generated session, one entry per write event.
pub type ExpectedRows = Vec<Vec<(i32, String)>>;

impl BinlogFile {
    pub fn new() -> Self {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();
        let rng = StdRng::seed_from_u64(0x0B10_6C5E);
        Self {
            _temp_file: temp_file,
            path,
            rng,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, bytes: &[u8]) {
        fs::write(&self.path, bytes).unwrap();
    }

    pub fn reader(&self) -> BufReader<File> {
        BufReader::new(File::open(&self.path).unwrap())
    }

    /// Writes `events` write-rows events into `table_id` (a LONG, VARCHAR
    /// table), with an intvar and an unregistered query event between them.
    pub fn write_random_session(&mut self, table_id: u64, events: usize) -> ExpectedRows {
        let mut data = Vec::new();
        let mut expected = Vec::with_capacity(events);
        for _ in 0..events {
            let id: i32 = self.rng.gen();
            data.extend(event_builder::intvar(IntvarEvent::INSERT_ID, id as u64));
            data.extend(event_builder::event(EventType::Query.code(), b"BEGIN", true));

            let mut body = RowsBody::new(EventType::WriteRowsV2, table_id, 2).all_columns();
            let mut rows = Vec::new();
            for offset in 0..self.rng.gen_range(1..6) {
                let len = self.rng.gen_range(0..40);
                let text: String = (0..len)
                    .map(|_| self.rng.gen_range(b'a'..=b'z') as char)
                    .collect();
                let row_id = id.wrapping_add(offset);
                body = body.image(image(0, &[long(row_id), varchar(&text)]));
                rows.push((row_id, text));
            }
            data.extend(body.event());
            expected.push(rows);
        }
        self.write(&data);
        expected
    }

    pub fn corrupt_byte(&self, offset: usize) {
        let mut data = fs::read(&self.path).unwrap();
        data[offset] ^= 1;
        fs::write(&self.path, data).unwrap();
    }

    pub fn truncate_last_bytes(&self, n: usize) {
        let data = fs::read(&self.path).unwrap();
        let new_len = data.len().saturating_sub(n);
        fs::write(&self.path, &data[..new_len]).unwrap();
    }
}

impl Default for BinlogFile {
    fn default() -> Self {
        Self::new()
    }
}
