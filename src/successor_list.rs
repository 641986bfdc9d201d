//! The successor list: the next `len` clockwise neighbours. `successors[0]`
//! is authoritative; the rest are failover candidates used by
//! `stabilize`'s promotion step when the primary successor dies. `len` is
//! set per node at construction time (see `Config::successor_list_len`),
//! not baked in as a compile-time constant.

/// Default successor-list length, used when nothing overrides it.
pub const DEFAULT_LEN: usize = 3;

#[derive(Debug, Clone)]
pub struct SuccessorList {
    entries: Vec<Option<String>>,
}

impl SuccessorList {
    pub fn empty(len: usize) -> Self {
        SuccessorList {
            entries: vec![None; len.max(1)],
        }
    }

    /// Every slot pointing at `self_address`, used by `create` to bootstrap
    /// a solo ring.
    pub fn new_solo(self_address: &str, len: usize) -> Self {
        SuccessorList {
            entries: vec![Some(self_address.to_string()); len.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn primary(&self) -> Option<&str> {
        self.entries[0].as_deref()
    }

    pub fn set_primary(&mut self, address: Option<String>) {
        self.entries[0] = address;
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries[index].as_deref()
    }

    pub fn set(&mut self, index: usize, address: Option<String>) {
        self.entries[index] = address;
    }

    /// Shifts the reply from `successors[0].GetSuccessors()` into slots
    /// `1..len`, keeping slot 0 untouched.
    pub fn absorb_reply(&mut self, reply: &[String]) {
        for i in 1..self.entries.len() {
            self.entries[i] = reply.get(i - 1).cloned();
        }
    }

    /// Promotes the list one slot left and falls back to `self` if the
    /// primary was empty.
    pub fn promote(&mut self, self_address: &str) {
        let last = self.entries.len() - 1;
        for i in 0..last {
            self.entries[i] = self.entries[i + 1].take();
        }
        self.entries[last] = None;
        if self.entries[0].is_none() {
            self.entries[0] = Some(self_address.to_string());
        }
    }

    /// Candidates in order, skipping empty slots, for
    /// `get_client_for_closest_successor`-style fail-over.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| e.as_deref())
    }

    pub fn as_wire(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.clone().unwrap_or_default())
            .collect()
    }

    pub fn from_wire(addresses: &[String]) -> Self {
        let entries = addresses
            .iter()
            .map(|addr| if addr.is_empty() { None } else { Some(addr.clone()) })
            .collect();
        SuccessorList { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solo_ring_all_point_to_self() {
        let list = SuccessorList::new_solo("127.0.0.1:3410", 3);
        assert_eq!(list.primary(), Some("127.0.0.1:3410"));
        assert_eq!(list.get(1), Some("127.0.0.1:3410"));
        assert_eq!(list.get(2), Some("127.0.0.1:3410"));
    }

    #[test]
    fn promote_shifts_left_and_clears_tail() {
        let mut list = SuccessorList::empty(3);
        list.set(0, Some("a".into()));
        list.set(1, Some("b".into()));
        list.set(2, Some("c".into()));
        list.promote("self");
        assert_eq!(list.get(0), Some("b"));
        assert_eq!(list.get(1), Some("c"));
        assert_eq!(list.get(2), None);
    }

    #[test]
    fn promote_falls_back_to_self_when_primary_empty() {
        let mut list = SuccessorList::empty(3);
        list.promote("127.0.0.1:3410");
        assert_eq!(list.get(0), Some("127.0.0.1:3410"));
    }

    #[test]
    fn absorb_reply_keeps_primary_unchanged() {
        let mut list = SuccessorList::new_solo("self", 3);
        list.absorb_reply(&["b".to_string(), "c".to_string()]);
        assert_eq!(list.get(0), Some("self"));
        assert_eq!(list.get(1), Some("b"));
        assert_eq!(list.get(2), Some("c"));
    }

    #[test]
    fn respects_a_non_default_length() {
        let list = SuccessorList::new_solo("127.0.0.1:3410", 5);
        assert_eq!(list.len(), 5);
        assert_eq!(list.get(4), Some("127.0.0.1:3410"));
    }
}
