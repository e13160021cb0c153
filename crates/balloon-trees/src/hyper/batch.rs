//! The batch node: a packed subtree of the hyper tree, the unit of storage
//! below a tree's cache height limit.
//!
//! A tile covers up to [`TILE_HEIGHT`] levels and is addressed in heap
//! order: slot 0 is the tile's own root, and slot `i`'s children are
//! `2i+1` and `2i+2`. Each slot is empty, an interior digest, or a
//! shortcut leaf carrying the `(key, value)` pair it stands in for.

use balloon_crypto::Digest;

use crate::error::TreeError;

/// `cache_height_limit` must be a multiple of this.
pub const TILE_HEIGHT: u32 = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileSlot {
    Empty,
    Digest(Digest),
    Shortcut { key: Vec<u8>, value: u64 },
}

#[derive(Clone, Debug)]
pub struct Tile {
    slots: Vec<TileSlot>,
}

impl Tile {
    /// An empty tile spanning `span` levels below its own root. `span` is
    /// `TILE_HEIGHT` everywhere except the bottommost tile, when the cache
    /// height limit itself is smaller than `TILE_HEIGHT`.
    pub fn empty(span: u32) -> Self {
        let slot_count = (1usize << (span + 1)) - 1;
        Tile { slots: vec![TileSlot::Empty; slot_count] }
    }

    pub fn get(&self, idx: usize) -> &TileSlot {
        &self.slots[idx]
    }

    pub fn set(&mut self, idx: usize, slot: TileSlot) {
        self.slots[idx] = slot;
    }

    pub fn left(idx: usize) -> usize {
        2 * idx + 1
    }

    pub fn right(idx: usize) -> usize {
        2 * idx + 2
    }

    /// Whether slot `idx` is a leaf of this tile. Its children, were the
    /// subtree to continue, would belong to a separate, deeper tile.
    pub fn is_tile_leaf(&self, idx: usize) -> bool {
        Self::left(idx) >= self.slots.len()
    }

    /// Packs this tile as a 31-bit occupancy bitmap, a 31-bit shortcut
    /// bitmap, and the payload of every occupied slot in index order: a
    /// digest for an interior slot, or a key followed by an 8-byte value
    /// for a shortcut leaf.
    pub fn encode(&self) -> Vec<u8> {
        let mut occupied: u32 = 0;
        let mut shortcut: u32 = 0;
        let mut payload = Vec::new();
        for (i, slot) in self.slots.iter().enumerate() {
            match slot {
                TileSlot::Empty => {}
                TileSlot::Digest(d) => {
                    occupied |= 1 << i;
                    payload.extend_from_slice(d.as_bytes());
                }
                TileSlot::Shortcut { key, value } => {
                    occupied |= 1 << i;
                    shortcut |= 1 << i;
                    payload.extend_from_slice(key);
                    payload.extend_from_slice(&value.to_be_bytes());
                }
            }
        }
        let mut buf = Vec::with_capacity(8 + payload.len());
        buf.extend_from_slice(&occupied.to_be_bytes());
        buf.extend_from_slice(&shortcut.to_be_bytes());
        buf.extend_from_slice(&payload);
        buf
    }

    /// Unpacks a tile of `span` levels whose shortcut keys are `key_len`
    /// bytes wide.
    pub fn decode(bytes: &[u8], span: u32, key_len: usize) -> Result<Self, TreeError> {
        if bytes.len() < 8 {
            return Err(TreeError::Invariant(format!(
                "tile record is {} bytes, expected at least 8",
                bytes.len()
            )));
        }
        let occupied = u32::from_be_bytes(bytes[0..4].try_into().expect("checked length"));
        let shortcut = u32::from_be_bytes(bytes[4..8].try_into().expect("checked length"));
        let slot_count = (1usize << (span + 1)) - 1;
        let mut slots = vec![TileSlot::Empty; slot_count];
        let mut cursor = 8;
        for (i, slot) in slots.iter_mut().enumerate() {
            if occupied & (1 << i) == 0 {
                continue;
            }
            if shortcut & (1 << i) != 0 {
                let end = cursor + key_len + 8;
                let record = bytes
                    .get(cursor..end)
                    .ok_or_else(|| TreeError::Invariant(format!("tile record truncated at slot {i}")))?;
                let (key_bytes, value_bytes) = record.split_at(key_len);
                *slot = TileSlot::Shortcut {
                    key: key_bytes.to_vec(),
                    value: u64::from_be_bytes(value_bytes.try_into().expect("checked length")),
                };
                cursor = end;
            } else {
                let end = cursor + key_len;
                let record = bytes
                    .get(cursor..end)
                    .ok_or_else(|| TreeError::Invariant(format!("tile record truncated at slot {i}")))?;
                *slot = TileSlot::Digest(Digest::from_bytes(record.to_vec()));
                cursor = end;
            }
        }
        Ok(Tile { slots })
    }
}
