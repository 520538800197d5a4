// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! 32-bit checksum keying the duplicate-purchase ledger.
//!
//! The ledger only needs a cheap, stable key per order id. Collisions are
//! possible and tolerated: two distinct order ids that collide mean the
//! second purchase is silently not tracked, an accepted false negative.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a over the UTF-8 bytes of `input`.
pub fn checksum32(input: &str) -> u32 {
	let mut hash = FNV_OFFSET_BASIS;
	for byte in input.as_bytes() {
		hash ^= u32::from(*byte);
		hash = hash.wrapping_mul(FNV_PRIME);
	}
	hash
}
