//! Slot assignment and the secret hash-chain that seeds it.
//!
//! Time is quantized to `block_interval` seconds; the witness assigned to a
//! given slot is read off the already-shuffled `active_witnesses` order
//! maintenance last computed. The order itself is reshuffled once per
//! maintenance interval by [`ShuffleRng`], a BLAKE3 counter-mode
//! bit-extraction RNG standing in for the SHA256 counter-mode generator the
//! original witness scheduler used — same rejection-sampling shape, BLAKE3
//! instead of SHA256 to match this workspace's single hash choice.

use forge_chain::model::WitnessId;
use forge_core::Timestamp;
use forge_crypto::hash::{hash_many, Digest};

/// Counter-mode bit extractor: hashes `seed || counter` into a 256-bit
/// block and serves bits out of it one at a time, re-hashing with an
/// incremented counter whenever the block is exhausted.
pub struct ShuffleRng {
    seed: Digest,
    counter: u64,
    current_value: Digest,
    offset: u8,
}

impl ShuffleRng {
    pub fn new(seed: Digest) -> Self {
        let mut rng = ShuffleRng {
            seed,
            counter: 0,
            current_value: [0u8; 32],
            offset: 0,
        };
        rng.reset_current_value();
        rng
    }

    fn reset_current_value(&mut self) {
        self.current_value = hash_many(&[&self.seed, &self.counter.to_le_bytes()]);
    }

    /// Extracts `count` bits (`count` <= 64) from the stream, re-hashing as
    /// needed. Bits are taken LSB-first out of the current 256-bit block,
    /// treated as four little-endian 64-bit words.
    fn get_bits(&mut self, count: u8) -> u64 {
        let mut result: u64 = 0;
        let mut mask: u64 = 1;
        for _ in 0..count {
            let word_idx = ((self.offset >> 6) & 3) as usize;
            let bit_idx = self.offset & 0x3f;
            let word = u64::from_le_bytes(
                self.current_value[word_idx * 8..word_idx * 8 + 8]
                    .try_into()
                    .expect("8-byte slice"),
            );
            if word & (1u64 << bit_idx) != 0 {
                result |= mask;
            }
            mask <<= 1;
            self.offset = self.offset.wrapping_add(1);
            if self.offset == 0 {
                self.counter += 1;
                self.reset_current_value();
            }
        }
        result
    }

    /// A uniformly-distributed value in `[0, bound)` via rejection sampling:
    /// draws exactly as many bits as `bound` needs and retries on overflow,
    /// so the probability of needing a second draw is always < 1/2.
    pub fn gen_below(&mut self, bound: u64) -> u64 {
        if bound <= 1 {
            return 0;
        }
        let bitcount = 64 - bound.leading_zeros() as u8;
        loop {
            let candidate = self.get_bits(bitcount);
            if candidate < bound {
                return candidate;
            }
        }
    }
}

/// Derives the next secret in a witness's reveal chain: `H(secret_key ||
/// last_secret)`. Called twice in a row to produce both `previous_secret`
/// (the reveal) and the secret whose hash becomes the new commitment.
pub fn derive_secret(secret_key: &Digest, last_secret: &Digest) -> Digest {
    hash_many(&[secret_key, last_secret])
}

/// The slot index for wall-clock time `now`, quantized to `block_interval`.
pub fn slot_for_time(now: Timestamp, block_interval_secs: u32) -> u64 {
    now.unix_secs() as u64 / u64::from(block_interval_secs)
}

/// The witness assigned to `slot`, reading off the already-shuffled active
/// set; `slot mod N` per spec §4.5.
pub fn witness_for_slot(active_witnesses: &[WitnessId], slot: u64) -> Option<WitnessId> {
    if active_witnesses.is_empty() {
        return None;
    }
    Some(active_witnesses[(slot % active_witnesses.len() as u64) as usize])
}

/// The next wall-clock instant at which `witness_id` is due to produce,
/// strictly after `now`. `None` if `witness_id` isn't in the active set.
pub fn next_generation_time(
    witness_id: WitnessId,
    active_witnesses: &[WitnessId],
    now: Timestamp,
    block_interval_secs: u32,
) -> Option<Timestamp> {
    let n = active_witnesses.len() as u64;
    if n == 0 {
        return None;
    }
    let mut slot = (now.unix_secs() as u64 + 1) / u64::from(block_interval_secs);
    for _ in 0..n {
        if active_witnesses[(slot % n) as usize] == witness_id {
            return Some(Timestamp::from_unix_secs(
                (slot * u64::from(block_interval_secs)) as i64,
            ));
        }
        slot += 1;
    }
    None
}

/// Fisher-Yates-style reshuffle of `ids` seeded by `random`, matching
/// `update_active_delegates`'s in-place swap loop: `ids[i]` trades places
/// with a position drawn from the remaining unshuffled tail.
pub fn shuffle(ids: &mut [WitnessId], random_seed: Digest) {
    let mut rng = ShuffleRng::new(random_seed);
    let len = ids.len();
    for i in 0..len {
        let remaining = (len - i) as u64;
        let j = i + rng.gen_below(remaining) as usize;
        ids.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gen_below_never_meets_or_exceeds_bound() {
        let mut rng = ShuffleRng::new([7u8; 32]);
        for _ in 0..500 {
            assert!(rng.gen_below(37) < 37);
        }
    }

    #[test]
    fn gen_below_one_is_always_zero() {
        let mut rng = ShuffleRng::new([1u8; 32]);
        assert_eq!(rng.gen_below(0), 0);
        assert_eq!(rng.gen_below(1), 0);
    }

    #[test]
    fn same_seed_reproduces_the_same_stream() {
        let mut a = ShuffleRng::new([9u8; 32]);
        let mut b = ShuffleRng::new([9u8; 32]);
        for _ in 0..20 {
            assert_eq!(a.gen_below(1000), b.gen_below(1000));
        }
    }

    #[test]
    fn slot_assignment_wraps_modulo_active_set_size() {
        let ids: Vec<WitnessId> = (0..5).map(WitnessId::new).collect();
        assert_eq!(witness_for_slot(&ids, 0), Some(ids[0]));
        assert_eq!(witness_for_slot(&ids, 5), Some(ids[0]));
        assert_eq!(witness_for_slot(&ids, 7), Some(ids[2]));
    }

    #[test]
    fn next_generation_time_finds_the_witness_own_slot() {
        let ids: Vec<WitnessId> = (0..3).map(WitnessId::new).collect();
        let now = Timestamp::from_unix_secs(10);
        let next = next_generation_time(ids[1], &ids, now, 5).unwrap();
        // slot = (11)/5 = 2 -> witness index 2 % 3 = 2 (ids[2]); advance to
        // slot 3 -> index 0 (ids[0]); slot 4 -> index 1 (ids[1]) -> t = 20.
        assert_eq!(next.unix_secs() % 5, 0);
        assert!(next.unix_secs() > now.unix_secs());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut ids: Vec<WitnessId> = (0..10).map(WitnessId::new).collect();
        let original = ids.clone();
        shuffle(&mut ids, [42u8; 32]);
        let mut sorted = ids.clone();
        sorted.sort_by_key(|id| id.instance);
        let mut original_sorted = original.clone();
        original_sorted.sort_by_key(|id| id.instance);
        assert_eq!(sorted, original_sorted);
    }

    #[test]
    fn deriving_a_secret_is_deterministic_and_key_dependent() {
        let a = derive_secret(&[1u8; 32], &[2u8; 32]);
        let b = derive_secret(&[1u8; 32], &[2u8; 32]);
        let c = derive_secret(&[9u8; 32], &[2u8; 32]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
