use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Number of shards, one per possible first octet.
pub const SHARDS: usize = 256;

/// Bytes per shard: one bit for each 24-bit suffix `o1.o2.o3`.
pub const SHARD_BYTES: usize = (1 << 24) / 8;

/// A bitset over the whole IPv4 space, split by first octet into
/// independently locked shards.
///
/// The full 512 MiB is allocated on construction regardless of input size.
/// `vec![0; n]` goes through the zeroed allocator, so pages for shards that
/// never see an address are not touched.
pub struct BitMatrix {
    shards: Box<[Mutex<Box<[u8]>>]>,
    unique: AtomicU64,
}

impl BitMatrix {
    pub fn new() -> Self {
        let shards: Vec<_> = (0..SHARDS)
            .map(|_| Mutex::new(vec![0u8; SHARD_BYTES].into_boxed_slice()))
            .collect();
        Self {
            shards: shards.into_boxed_slice(),
            unique: AtomicU64::new(0),
        }
    }

    #[inline]
    fn locate(address: u32) -> (usize, usize, u8) {
        let shard = (address >> 24) as usize;
        let residual = address & 0x00FF_FFFF;
        let byte = (residual >> 3) as usize;
        let mask = 1u8 << (residual & 7);
        (shard, byte, mask)
    }

    /// Marks `address` as seen.
    ///
    /// Returns `true` iff this call flipped the bit from 0 to 1, in which case
    /// the unique counter has been incremented exactly once.
    #[inline]
    pub fn test_and_set(&self, address: u32) -> bool {
        let (shard, byte, mask) = Self::locate(address);
        let mut bits = self.shards[shard].lock();
        let slot = &mut bits[byte];
        if *slot & mask != 0 {
            return false;
        }
        *slot |= mask;
        self.unique.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub fn contains(&self, address: u32) -> bool {
        let (shard, byte, mask) = Self::locate(address);
        self.shards[shard].lock()[byte] & mask != 0
    }

    /// Number of addresses newly marked so far.
    #[inline]
    pub fn unique(&self) -> u64 {
        self.unique.load(Ordering::Acquire)
    }

    /// Counts the set bits across every shard. Always equal to
    /// [`BitMatrix::unique`] once writers are done.
    pub fn population(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .lock()
                    .iter()
                    .map(|byte| byte.count_ones() as u64)
                    .sum::<u64>()
            })
            .sum()
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::thread;

    #[test]
    fn first_set_reports_new() {
        let matrix = BitMatrix::new();
        assert!(matrix.test_and_set(0x0A00_0001));
        assert!(!matrix.test_and_set(0x0A00_0001));
        assert!(matrix.test_and_set(0x0A00_0002));
        assert_eq!(matrix.unique(), 2);
    }

    #[test]
    fn extreme_shards() {
        let matrix = BitMatrix::new();
        assert!(matrix.test_and_set(0));
        assert!(matrix.test_and_set(u32::MAX));
        assert!(matrix.contains(0));
        assert!(matrix.contains(u32::MAX));
        assert!(!matrix.contains(1));
        assert!(!matrix.contains(0xFFFF_FFFE));
        assert_eq!(matrix.unique(), 2);
        assert_eq!(matrix.population(), 2);
    }

    #[test]
    fn same_suffix_different_shards() {
        let matrix = BitMatrix::new();
        for octet0 in 0..=255u32 {
            assert!(matrix.test_and_set(octet0 << 24 | 0x0001_0203));
        }
        assert_eq!(matrix.unique(), 256);
        assert!(!matrix.contains(0x0001_0204));
    }

    #[test]
    fn population_matches_counter() {
        let matrix = BitMatrix::new();
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let octet0 = rng.gen::<u8>() as u32;
            matrix.test_and_set(octet0 << 24 | rng.gen_range(0..4096));
        }
        assert_eq!(matrix.population(), matrix.unique());
    }

    #[test]
    fn concurrent_writers_count_once() {
        let matrix = BitMatrix::new();
        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for address in 0..50_000u32 {
                        matrix.test_and_set(address.rotate_right(7));
                    }
                });
            }
        });
        assert_eq!(matrix.unique(), 50_000);
        assert_eq!(matrix.population(), 50_000);
    }
}
