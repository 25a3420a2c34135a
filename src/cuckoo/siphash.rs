//! SipHash-2-4 edge generation
//!
//! Every candidate edge of the implicit bipartite graph is a pure function of
//! a 128-bit SipHash key and an edge nonce. The key is derived once from the
//! header; endpoints are `siphash24(2*nonce + side)` masked to the node range.
//! No state is kept between calls.

use sha2::{Digest, Sha256};

/// SipHash state for edge generation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SipHasher {
    k0: u64,
    k1: u64,
}

impl SipHasher {
    /// Derive the edge-generation key from a header.
    ///
    /// SHA-256 over the raw header bytes; the first 16 digest bytes become
    /// the two little-endian SipHash key words.
    pub fn from_header(header: &[u8]) -> Self {
        let digest = Sha256::digest(header);

        let k0 = u64::from_le_bytes(digest[0..8].try_into().unwrap());
        let k1 = u64::from_le_bytes(digest[8..16].try_into().unwrap());
        Self { k0, k1 }
    }

    /// Raw node id as used by the trimming kernels (no side bit).
    ///
    /// `side` selects the U (0) or V (1) endpoint function; `node_mask` is
    /// `HALFSIZE - 1` for the configured graph size.
    #[inline]
    pub fn node(&self, nonce: u64, side: u64, node_mask: u64) -> u64 {
        self.siphash24(2 * nonce + side) & node_mask
    }

    /// Side-tagged endpoint as used by the cycle finder.
    ///
    /// U endpoints are even, V endpoints odd, which keeps the two halves of
    /// the graph disjoint and frees node 0 as the cuckoo nil sentinel.
    #[inline]
    pub fn endpoint(&self, nonce: u64, side: u64, node_mask: u64) -> u64 {
        (self.node(nonce, side, node_mask) << 1) | side
    }

    /// SipHash-2-4 over a single 64-bit block.
    ///
    /// Not the RFC construction: the input is absorbed directly, with no
    /// length-padding block.
    fn siphash24(&self, input: u64) -> u64 {
        let mut v0 = 0x736f6d6570736575u64 ^ self.k0;
        let mut v1 = 0x646f72616e646f6du64 ^ self.k1;
        let mut v2 = 0x6c7967656e657261u64 ^ self.k0;
        let mut v3 = 0x7465646279746573u64 ^ self.k1;

        v3 ^= input;
        for _ in 0..2 {
            sipround(&mut v0, &mut v1, &mut v2, &mut v3);
        }

        v0 ^= input;
        v2 ^= 0xff;
        for _ in 0..4 {
            sipround(&mut v0, &mut v1, &mut v2, &mut v3);
        }

        v0 ^ v1 ^ v2 ^ v3
    }
}

/// Single round of SipHash
#[inline]
fn sipround(v0: &mut u64, v1: &mut u64, v2: &mut u64, v3: &mut u64) {
    *v0 = v0.wrapping_add(*v1);
    *v1 = v1.rotate_left(13);
    *v1 ^= *v0;
    *v0 = v0.rotate_left(32);

    *v2 = v2.wrapping_add(*v3);
    *v3 = v3.rotate_left(16);
    *v3 ^= *v2;

    *v0 = v0.wrapping_add(*v3);
    *v3 = v3.rotate_left(21);
    *v3 ^= *v0;

    *v2 = v2.wrapping_add(*v1);
    *v1 = v1.rotate_left(17);
    *v1 ^= *v2;
    *v2 = v2.rotate_left(32);
}
