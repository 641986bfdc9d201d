//! The finger table: `M = 160` entries, entry `i` pointing to the node that
//! succeeds `address_id + 2^i (mod 2^160)`.

use serde::Serialize;

use crate::identifier::{Identifier, M};

#[derive(Debug, Clone, Serialize)]
pub struct FingerEntry {
    /// The ring position this slot is responsible for, i.e. `jump(self, i+1)`.
    pub start: Identifier,
    /// The node currently believed to own `start`. `None` until resolved.
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FingerTable {
    entries: Vec<FingerEntry>,
}

impl FingerTable {
    /// A fresh table with every start computed but every address unknown.
    pub fn new(self_address: &str) -> Self {
        let entries = (0..M)
            .map(|i| FingerEntry {
                start: Identifier::jump(self_address, i + 1),
                address: None,
            })
            .collect();
        FingerTable { entries }
    }

    /// Every entry pointed at `self_address`, as used by `create` to
    /// bootstrap a solo ring.
    pub fn new_solo(self_address: &str) -> Self {
        let mut table = Self::new(self_address);
        for entry in &mut table.entries {
            entry.address = Some(self_address.to_string());
        }
        table
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn start(&self, index: usize) -> Identifier {
        self.entries[index].start
    }

    pub fn address(&self, index: usize) -> Option<&str> {
        self.entries[index].address.as_deref()
    }

    pub fn set(&mut self, index: usize, address: Option<String>) {
        self.entries[index].address = address;
    }

    pub fn entries(&self) -> &[FingerEntry] {
        &self.entries
    }

    /// Scans from index `M-1` down to `1`, as `closest_preceding_node`
    /// requires (index 0 is the direct successor and handled separately
    /// by the caller). Returns the first non-empty finger whose address
    /// lies strictly between `self` and `target`.
    pub fn closest_preceding(&self, self_pos: Identifier, target: Identifier) -> Option<&str> {
        for entry in self.entries[1..].iter().rev() {
            if let Some(address) = entry.address.as_deref() {
                let finger_pos = Identifier::hash(address);
                if Identifier::between(self_pos, finger_pos, target, false) {
                    return Some(address);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_m_entries_all_unknown() {
        let table = FingerTable::new("127.0.0.1:3410");
        assert_eq!(table.len(), M);
        assert!(table.address(0).is_none());
    }

    #[test]
    fn solo_table_points_everywhere_at_self() {
        let table = FingerTable::new_solo("127.0.0.1:3410");
        for i in 0..M {
            assert_eq!(table.address(i), Some("127.0.0.1:3410"));
        }
    }

    #[test]
    fn starts_match_jump() {
        let addr = "127.0.0.1:3410";
        let table = FingerTable::new(addr);
        for i in 0..M {
            assert_eq!(table.start(i), Identifier::jump(addr, i + 1));
        }
    }
}

