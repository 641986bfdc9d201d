//! The node record: the sole shared mutable resource, guarded field-by-field
//! the way the teacher's `ChordService` is. A single record-wide lock would
//! also be correct, but each field here is read and written independently
//! by different tasks (the RPC handlers, the maintenance loop), so
//! per-field locks avoid serializing unrelated operations.

use std::sync::{Arc, Mutex};

use crate::bucket::Bucket;
use crate::finger_table::FingerTable;
use crate::identifier::Identifier;
use crate::successor_list::SuccessorList;

#[derive(Clone)]
pub struct NodeState {
    /// Canonicalised `host:port` of this node. Immutable after construction.
    pub address: String,
    /// `hash(address)`, cached since it's read on every RPC.
    pub pos: Identifier,
    pub predecessor: Arc<Mutex<Option<String>>>,
    pub successors: Arc<Mutex<SuccessorList>>,
    pub finger_table: Arc<Mutex<FingerTable>>,
    pub next_finger: Arc<Mutex<usize>>,
    pub bucket: Arc<Mutex<Bucket>>,
}

impl NodeState {
    /// Bootstraps a solo ring: predecessor empty, successors and every
    /// finger pointing at self. `successor_list_len` sets how many
    /// failover successors this node tracks (see `Config::successor_list_len`).
    pub fn create(address: String, successor_list_len: usize) -> Self {
        let pos = Identifier::hash(&address);
        NodeState {
            finger_table: Arc::new(Mutex::new(FingerTable::new_solo(&address))),
            successors: Arc::new(Mutex::new(SuccessorList::new_solo(&address, successor_list_len))),
            predecessor: Arc::new(Mutex::new(None)),
            next_finger: Arc::new(Mutex::new(0)),
            bucket: Arc::new(Mutex::new(Bucket::new())),
            pos,
            address,
        }
    }

    /// Joins via a known successor: predecessor empty, only `successors[0]`
    /// known, other fingers/successors empty until stabilization fills them
    /// in.
    pub fn join(address: String, successor_address: String, successor_list_len: usize) -> Self {
        let pos = Identifier::hash(&address);
        let mut successors = SuccessorList::empty(successor_list_len);
        successors.set_primary(Some(successor_address.clone()));

        let mut finger_table = FingerTable::new(&address);
        finger_table.set(0, Some(successor_address));

        NodeState {
            finger_table: Arc::new(Mutex::new(finger_table)),
            successors: Arc::new(Mutex::new(successors)),
            predecessor: Arc::new(Mutex::new(None)),
            next_finger: Arc::new(Mutex::new(0)),
            bucket: Arc::new(Mutex::new(Bucket::new())),
            pos,
            address,
        }
    }

    pub fn successor_address(&self) -> Option<String> {
        self.successors.lock().unwrap().primary().map(|s| s.to_string())
    }

    pub fn predecessor_address(&self) -> Option<String> {
        self.predecessor.lock().unwrap().clone()
    }
}
