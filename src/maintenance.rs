//! The maintenance loop: `check_predecessor`, `stabilize` and `fix_fingers`
//! run sequentially, once per tick. Each is best-effort: a failed RPC is
//! logged and the tick completes rather than aborting, since a dead peer
//! is an expected, recoverable condition rather than a bug.

use std::time::Duration;

use log::{debug, info, warn};

use crate::config::Config;
use crate::identifier::Identifier;
use crate::rpc::client;
use crate::state::NodeState;

/// Probes the predecessor; clears it on failure. Never touches the
/// successor list.
pub async fn check_predecessor(state: &NodeState, rpc_timeout: Duration) {
    let predecessor = state.predecessor_address();
    let Some(predecessor) = predecessor else {
        return;
    };

    if client::ping(&predecessor, rpc_timeout).await.is_err() {
        warn!("predecessor {predecessor} failed to respond to ping, clearing it");
        *state.predecessor.lock().unwrap() = None;
    }
}

/// Repairs the successor list and predecessor, then notifies the (possibly
/// updated) successor of our presence.
pub async fn stabilize(state: &NodeState, rpc_timeout: Duration) {
    let successor = match state.successor_address() {
        Some(successor) => successor,
        None => {
            warn!("stabilize: no successor known, skipping tick");
            return;
        }
    };

    match client::get_successors(&successor, rpc_timeout).await {
        Ok(reply) => {
            state.successors.lock().unwrap().absorb_reply(&reply);
        }
        Err(err) => {
            warn!("stabilize: successor {successor} unreachable ({err}), promoting successor list");
            let mut successors = state.successors.lock().unwrap();
            successors.promote(&state.address);
            let new_primary = successors.primary().map(|s| s.to_string());
            drop(successors);
            if let Some(new_primary) = new_primary {
                state.finger_table.lock().unwrap().set(0, Some(new_primary));
            }
        }
    }

    let successor = match state.successor_address() {
        Some(successor) => successor,
        None => return,
    };

    // When `successor == self` (a solo ring, or one shrunk back to it by a
    // prior promotion), asking over RPC for our own predecessor is just our
    // own `predecessor` field — read it locally instead of self-dialing.
    // This path is what lets a solo node discover a node that joined via it
    // and promote that node to successor; skipping it here would leave a
    // freshly-joined node unreachable until some other node's stabilize
    // happened to route through it first.
    let candidate = if successor == state.address {
        state.predecessor_address()
    } else {
        match client::get_predecessor(&successor, rpc_timeout).await {
            Ok(candidate) => candidate,
            Err(err) => {
                warn!("stabilize: get_predecessor on {successor} failed: {err}");
                None
            }
        }
    };

    if let Some(candidate) = candidate {
        let successor_pos = Identifier::hash(&successor);
        let candidate_pos = Identifier::hash(&candidate);
        if Identifier::between(state.pos, candidate_pos, successor_pos, false) {
            debug!("stabilize: closer successor found, {successor} -> {candidate}");
            state.successors.lock().unwrap().set_primary(Some(candidate.clone()));
            state.finger_table.lock().unwrap().set(0, Some(candidate));
        }
    }

    let successor = match state.successor_address() {
        Some(successor) => successor,
        None => return,
    };
    if successor != state.address {
        if let Err(err) = client::notify(&successor, &state.address, rpc_timeout).await {
            warn!("stabilize: notify on {successor} failed: {err}");
        }
    }
}

/// `Notify` RPC handler logic, shared between the gRPC handler and tests.
pub fn handle_notify(state: &NodeState, peer: &str) {
    let peer_pos = Identifier::hash(peer);
    let mut predecessor = state.predecessor.lock().unwrap();
    let should_update = match predecessor.as_deref() {
        None => true,
        Some(current) => {
            let current_pos = Identifier::hash(current);
            Identifier::between(current_pos, peer_pos, state.pos, false)
        }
    };
    if should_update {
        *predecessor = Some(peer.to_string());
    }
}

/// Advances `next_finger`, resolves its target via `find`, and fast-fills
/// subsequent slots the resolved address also covers.
pub async fn fix_fingers(state: &NodeState, rpc_timeout: Duration) {
    let index = {
        let mut next_finger = state.next_finger.lock().unwrap();
        *next_finger = (*next_finger + 1) % crate::identifier::M;
        *next_finger
    };

    let target = state.finger_table.lock().unwrap().start(index);

    match crate::routing::find(state, target, rpc_timeout).await {
        Ok(address) => {
            let current = state.finger_table.lock().unwrap().address(index).map(|s| s.to_string());
            if current.as_deref() != Some(address.as_str()) {
                debug!("fix_fingers: slot {index} -> {address}");
                state.finger_table.lock().unwrap().set(index, Some(address.clone()));
            }

            let mut k = index + 1;
            while k < crate::identifier::M {
                let slot_start = state.finger_table.lock().unwrap().start(k);
                if Identifier::between(state.pos, slot_start, Identifier::hash(&address), false) {
                    state.finger_table.lock().unwrap().set(k, Some(address.clone()));
                    k += 1;
                } else {
                    break;
                }
            }
        }
        Err(err) => warn!("fix_fingers: failed to resolve slot {index}: {err}"),
    }
}

/// Runs the three maintenance tasks in order, once. The public tick loop
/// below calls this on a fixed period; tests call it directly to drive
/// deterministic rounds instead of waiting on real timers.
pub async fn tick(state: &NodeState, config: &Config) {
    let timeout = Duration::from_millis(config.rpc_timeout_ms);
    check_predecessor(state, timeout).await;
    stabilize(state, timeout).await;
    fix_fingers(state, timeout).await;
}

/// Spawns the 1 Hz (by default) maintenance ticker. Runs until the process
/// exits; there is no graceful shutdown, peers detect departure via RPC
/// failure.
pub async fn run(state: NodeState, config: Config) {
    info!(
        "maintenance loop starting (stabilize={}ms, fix_fingers={}ms, check_predecessor={}ms)",
        config.stabilize_interval_ms, config.fix_fingers_interval_ms, config.check_predecessor_interval_ms
    );
    let tick_period = Duration::from_millis(
        config
            .stabilize_interval_ms
            .min(config.fix_fingers_interval_ms)
            .min(config.check_predecessor_interval_ms),
    );
    let mut interval = tokio::time::interval(tick_period);
    loop {
        interval.tick().await;
        tick(&state, &config).await;
    }
}
