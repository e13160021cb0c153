use std::ops::Range;

/// A node of the history tree: a half-open range of leaf indices
/// `[index, index + 2^height)`.
///
/// Unlike the hyper tree, history positions are never salted into a hash:
/// the tree is a plain append-only Merkle tree over consecutively inserted
/// leaves (see `DESIGN.md`). Position is used only as a storage/cache key
/// here, via [`HistoryPosition::encode`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct HistoryPosition {
    pub index: u64,
    pub height: u16,
}

impl HistoryPosition {
    pub fn leaf(version: u64) -> Self {
        HistoryPosition {
            index: version,
            height: 0,
        }
    }

    pub fn is_leaf(self) -> bool {
        self.height == 0
    }

    /// The parent position one level up.
    pub fn parent(self) -> Self {
        HistoryPosition {
            index: self.index & !(1u64 << self.height),
            height: self.height + 1,
        }
    }

    pub fn left_child(self) -> Self {
        debug_assert!(self.height > 0);
        HistoryPosition {
            index: self.index,
            height: self.height - 1,
        }
    }

    pub fn right_child(self) -> Self {
        debug_assert!(self.height > 0);
        HistoryPosition {
            index: self.index + (1u64 << (self.height - 1)),
            height: self.height - 1,
        }
    }

    pub fn children(self) -> (Self, Self) {
        (self.left_child(), self.right_child())
    }

    /// The half-open range of leaf indices this position covers.
    pub fn covers(self) -> Range<u64> {
        self.index..(self.index + (1u64 << self.height))
    }

    /// Whether every leaf this position covers has been inserted by
    /// `version`, i.e. the node's digest will never change again.
    pub fn is_frozen_at(self, version: u64) -> bool {
        self.index + (1u64 << self.height) - 1 <= version
    }

    /// Whether at least the first leaf this position covers has been
    /// inserted by `version` — the position has *some* digest, though it
    /// may still be partial.
    pub fn exists_at(self, version: u64) -> bool {
        self.index <= version
    }

    /// The smallest height `h` such that `(0, h)` covers every index in
    /// `[0, max_index]`. The root position for a tree holding versions
    /// `0..=max_index`.
    pub fn root_height(max_index: u64) -> u16 {
        if max_index == 0 {
            0
        } else {
            (u64::BITS - max_index.leading_zeros()) as u16
        }
    }

    pub fn root(max_index: u64) -> Self {
        HistoryPosition {
            index: 0,
            height: Self::root_height(max_index),
        }
    }

    /// The canonical 10-byte encoding used as a store/cache key: an 8-byte
    /// big-endian index followed by a 2-byte big-endian height.
    pub fn encode(self) -> [u8; 10] {
        let mut buf = [0u8; 10];
        buf[0..8].copy_from_slice(&self.index.to_be_bytes());
        buf[8..10].copy_from_slice(&self.height.to_be_bytes());
        buf
    }
}

/// The canonical decomposition of `[0, length)` into maximal frozen
/// subtrees ("balanced roots"), ordered left to right (tallest first).
///
/// Grounded on `forrest::log::node::Node::broots_for_len` — the bit
/// decomposition of `length` gives exactly this set of complete subtrees.
pub fn broots(length: u64) -> Vec<HistoryPosition> {
    let mut result = Vec::new();
    let mut offset = 0u64;
    for h in (0..64).rev() {
        if (length >> h) & 1 == 1 {
            result.push(HistoryPosition {
                index: offset,
                height: h as u16,
            });
            offset += 1u64 << h;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_height_matches_worked_examples() {
        // Root height for the first ten versions inserted.
        assert_eq!(HistoryPosition::root_height(0), 0);
        assert_eq!(HistoryPosition::root_height(1), 1);
        assert_eq!(HistoryPosition::root_height(2), 2);
        assert_eq!(HistoryPosition::root_height(3), 2);
        assert_eq!(HistoryPosition::root_height(4), 3);
        assert_eq!(HistoryPosition::root_height(7), 3);
        assert_eq!(HistoryPosition::root_height(8), 4);
        assert_eq!(HistoryPosition::root_height(9), 4);
    }

    #[test]
    fn parent_child_round_trip() {
        let pos = HistoryPosition { index: 4, height: 2 };
        let (l, r) = pos.children();
        assert_eq!(l.parent(), pos);
        assert_eq!(r.parent(), pos);
    }

    #[test]
    fn broots_decomposes_by_set_bits() {
        assert_eq!(
            broots(9),
            vec![
                HistoryPosition { index: 0, height: 3 },
                HistoryPosition { index: 8, height: 0 },
            ]
        );
        assert_eq!(
            broots(10),
            vec![
                HistoryPosition { index: 0, height: 3 },
                HistoryPosition { index: 8, height: 1 },
            ]
        );
        assert_eq!(broots(4), vec![HistoryPosition { index: 0, height: 2 }]);
    }

    #[test]
    fn frozen_and_exists_predicates() {
        let pos = HistoryPosition { index: 2, height: 1 }; // covers [2, 4)
        assert!(pos.exists_at(2) && !pos.is_frozen_at(2));
        assert!(pos.exists_at(3) && pos.is_frozen_at(3));
    }
}
