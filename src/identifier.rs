//! 160-bit ring arithmetic: SHA-1 hashing, modular jumps and arc membership.
//!
//! These are pure functions with no I/O. `Identifier` wraps the 20-byte
//! big-endian SHA-1 digest and implements addition modulo 2^160 by hand,
//! since no integer type in the standard library is wide enough to hold it.

use std::fmt;

use serde::Serialize;
use sha1::{Digest, Sha1};

/// Number of bits in the ring (the SHA-1 digest width). The finger table is
/// exactly this many entries wide; mixing a different hash width in would
/// desynchronize finger indices between peers.
pub const M: usize = 160;
const BYTES: usize = M / 8;

/// A 160-bit identifier on the Chord ring, compared and added modulo 2^160.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Identifier([u8; BYTES]);

impl Identifier {
    pub const ZERO: Identifier = Identifier([0u8; BYTES]);

    pub fn from_be_bytes(bytes: [u8; BYTES]) -> Self {
        Identifier(bytes)
    }

    pub fn to_be_bytes(&self) -> [u8; BYTES] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// `hash(s)`: SHA-1 of the UTF-8 bytes of `s`, big-endian.
    pub fn hash(s: &str) -> Identifier {
        Self::hash_bytes(s.as_bytes())
    }

    pub fn hash_bytes(bytes: &[u8]) -> Identifier {
        let mut hasher = Sha1::new();
        hasher.update(bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; BYTES];
        out.copy_from_slice(&digest);
        Identifier(out)
    }

    /// Adds 2^exp (mod 2^160). `exp` in `[0, M)`; `exp >= M` wraps to 0 and
    /// adding 2^0..2^(M-1) never overflows silently since all arithmetic
    /// here is performed modulo 2^160 by construction (truncating carry).
    pub fn add_pow2(&self, exp: u32) -> Identifier {
        if exp as usize >= M {
            return *self;
        }
        let byte_index = BYTES - 1 - (exp as usize / 8);
        let bit_index = exp as usize % 8;
        let addend = 1u8 << bit_index;

        let mut out = self.0;
        let mut carry = addend;
        let mut i = byte_index as isize;
        while i >= 0 && carry != 0 {
            let (sum, overflow) = out[i as usize].overflowing_add(carry);
            out[i as usize] = sum;
            carry = if overflow { 1 } else { 0 };
            i -= 1;
        }
        Identifier(out)
    }

    /// `jump(address, i)` = `(hash(address) + 2^(i-1)) mod 2^160` for `i in [1, M]`.
    /// Note the `i - 1` exponent: `jump(_, 1)` is the immediate next identifier,
    /// `jump(_, M)` is the antipode. An off-by-one here produces a finger
    /// table that routes sub-optimally without being obviously wrong, so
    /// this indexing must match exactly across peers.
    pub fn jump(address: &str, i: usize) -> Identifier {
        assert!((1..=M).contains(&i), "finger index out of range: {i}");
        Self::hash(address).add_pow2((i - 1) as u32)
    }

    /// `between(start, x, end, inclusive)`: true iff `x` lies strictly after
    /// `start` and before `end` going clockwise, optionally including `end`.
    /// When `start == end` the arc is the whole ring minus `start`.
    pub fn between(start: Identifier, x: Identifier, end: Identifier, inclusive: bool) -> bool {
        if start == end {
            return if inclusive { true } else { x != start };
        }
        if start < end {
            (x > start && x < end) || (inclusive && x == end)
        } else {
            // the arc wraps around the origin
            (x > start || x < end) || (inclusive && x == end)
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self)
    }
}
