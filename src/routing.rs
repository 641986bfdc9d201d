//! The routing engine: `closest_preceding_node`, the server-side helper used
//! inside the `FindSuccessor` handler, and `find`, the iterative
//! caller-side driver used by the shell, `fix_fingers` and the `Join` RPC
//! handler.

use std::time::Duration;

use log::{debug, warn};

use crate::error::NodeError;
use crate::identifier::Identifier;
use crate::rpc::client;
use crate::state::NodeState;

/// Hard cap on `find`'s hop count: a safety valve against routing
/// pathologies (a corrupted or cyclic finger table), not the expected case
/// — healthy fingers give O(log N) hops.
pub const MAX_HOPS: u32 = 32;

/// Scans the finger table from `M-1` down to `1` for the furthest jump
/// that does not overshoot `target`; falls back to `successors[0]` if
/// none qualifies.
pub fn closest_preceding_node(state: &NodeState, target: Identifier) -> Option<String> {
    let finger_table = state.finger_table.lock().unwrap();
    if let Some(address) = finger_table.closest_preceding(state.pos, target) {
        return Some(address.to_string());
    }
    drop(finger_table);
    state.successor_address()
}

/// One hop of `FindSuccessor`, the logic behind the RPC handler. Kept
/// separate from the handler so the `Join` code path and tests can
/// exercise it without going over the wire.
pub fn find_successor_locally(state: &NodeState, target: Identifier) -> (Option<String>, bool) {
    if let Some(successor) = state.successor_address() {
        let successor_pos = Identifier::hash(&successor);
        if Identifier::between(state.pos, target, successor_pos, true) {
            return (Some(successor), true);
        }
    }
    (closest_preceding_node(state, target), false)
}

/// The iterative `find` driver: starts at `successors[0]` and hops via
/// `FindSuccessor` RPCs, capped at `MAX_HOPS`, until a hop signals `found`.
pub async fn find(state: &NodeState, target: Identifier, rpc_timeout: Duration) -> Result<String, NodeError> {
    let mut cursor = state
        .successor_address()
        .ok_or(NodeError::RoutingExhausted)?;
    let mut hops_remaining = MAX_HOPS;

    loop {
        if hops_remaining == 0 {
            warn!("find exhausted {} hops looking for {:?}", MAX_HOPS, target);
            return Err(NodeError::RoutingExhausted);
        }

        let (next, found) = if cursor == state.address {
            find_successor_locally(state, target)
        } else {
            let (address, found) = client::find_successor(&cursor, &target, rpc_timeout).await?;
            (Some(address), found)
        };

        hops_remaining -= 1;
        let next = next.ok_or(NodeError::RoutingExhausted)?;
        debug!("find hop: cursor={} -> next={} found={}", cursor, next, found);

        if found {
            return Ok(next);
        }
        cursor = next;
    }
}
