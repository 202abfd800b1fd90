//! Column bitmaps as carried by row events.

/// A fixed-size set of column ordinals.
///
/// Bit `i` lives in byte `i / 8` at position `i % 8` (least significant bit
/// first), which is how the server lays out "columns present" and null
/// bitmaps.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnBitmap {
    len: usize,
    bytes: Vec<u8>,
}

impl ColumnBitmap {
    /// Builds a bitmap of `len` bits from raw bytes.
    ///
    /// Bits past `len` in the final byte are cleared so that equality and
    /// `count_ones` only see significant bits.
    pub fn from_bytes(len: usize, mut bytes: Vec<u8>) -> Self {
        bytes.resize(len.div_ceil(8), 0);
        if len % 8 != 0 {
            if let Some(last) = bytes.last_mut() {
                *last &= (1u8 << (len % 8)) - 1;
            }
        }
        Self { len, bytes }
    }

    /// A bitmap with every column selected.
    pub fn all(len: usize) -> Self {
        Self::from_bytes(len, vec![0xFF; len.div_ceil(8)])
    }

    /// Number of columns the bitmap describes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether column `index` is selected. Out-of-range indexes are never set.
    pub fn get(&self, index: usize) -> bool {
        index < self.len && self.bytes[index / 8] & (1 << (index % 8)) != 0
    }

    pub fn set(&mut self, index: usize) {
        if index < self.len {
            self.bytes[index / 8] |= 1 << (index % 8);
        }
    }

    /// Number of selected columns.
    pub fn count_ones(&self) -> usize {
        self.bytes.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Selected column ordinals in ascending order.
    pub fn iter_set(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
