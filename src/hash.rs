// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! SuperFastHash, reproduced bit for bit.
//!
//! This hash decides where records land inside the on-disk hash chunks, so
//! it is load-bearing for compatibility with existing databases: a single
//! differing bit and every lookup misses. The reference implementation reads
//! unaligned 16-bit halfwords and mixes tail bytes through *signed* char
//! arithmetic; both quirks are preserved here. Halfwords are assembled
//! bytewise (little-endian), which also keeps the code correct on
//! strict-alignment targets.
//!
//! # References
//!
//! - Paul Hsieh, "Hash functions", the original SuperFastHash write-up:
//!   <http://www.azillionmonkeys.com/qed/hash.html>

/// Hash a byte string to 32 bits. Empty input hashes to 0.
pub fn superfasthash(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }

    let mut hash = data.len() as u32;
    let mut chunks = data.chunks_exact(4);

    for quad in &mut chunks {
        let lo = u32::from(u16::from_le_bytes([quad[0], quad[1]]));
        let hi = u32::from(u16::from_le_bytes([quad[2], quad[3]]));
        hash = hash.wrapping_add(lo);
        let tmp = (hi << 11) ^ hash;
        hash = (hash << 16) ^ tmp;
        hash = hash.wrapping_add(hash >> 11);
    }

    // Tail bytes. The reference reads these through a signed char pointer,
    // so single bytes are sign-extended before they are mixed in.
    let rem = chunks.remainder();
    match rem.len() {
        3 => {
            hash = hash.wrapping_add(u32::from(u16::from_le_bytes([rem[0], rem[1]])));
            hash ^= hash << 16;
            hash ^= (i32::from(rem[2] as i8) << 18) as u32;
            hash = hash.wrapping_add(hash >> 11);
        }
        2 => {
            hash = hash.wrapping_add(u32::from(u16::from_le_bytes([rem[0], rem[1]])));
            hash ^= hash << 11;
            hash = hash.wrapping_add(hash >> 17);
        }
        1 => {
            hash = hash.wrapping_add(i32::from(rem[0] as i8) as u32);
            hash ^= hash << 10;
            hash = hash.wrapping_add(hash >> 1);
        }
        _ => {}
    }

    // Final avalanche.
    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 4;
    hash = hash.wrapping_add(hash >> 17);
    hash ^= hash << 25;
    hash = hash.wrapping_add(hash >> 6);

    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_zero() {
        assert_eq!(superfasthash(b""), 0);
    }

    #[test]
    fn deterministic() {
        let key = b"approximate string retrieval";
        assert_eq!(superfasthash(key), superfasthash(key));
    }

    #[test]
    fn all_tail_lengths_covered() {
        // One input per remainder class; they must all produce distinct,
        // nonzero values.
        let inputs: [&[u8]; 4] = [b"abcd", b"abcde", b"abcdef", b"abcdefg"];
        let hashes: Vec<u32> = inputs.iter().map(|k| superfasthash(k)).collect();
        for (i, a) in hashes.iter().enumerate() {
            assert_ne!(*a, 0);
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn length_participates_in_the_hash() {
        // The hash seeds with the input length, so a zero byte appended to
        // an input changes the result even though the prefix is identical.
        assert_ne!(superfasthash(b"ab\0"), superfasthash(b"ab"));
    }

    #[test]
    fn high_bit_bytes_mix_via_sign_extension() {
        // Tail bytes >= 0x80 exercise the signed-char path; make sure they
        // neither panic nor collapse to the low-bit-only result.
        assert_ne!(superfasthash(&[0xff]), superfasthash(&[0x7f]));
        assert_ne!(superfasthash(&[0x01, 0x02, 0xff]), superfasthash(&[0x01, 0x02, 0x7f]));
    }
}
