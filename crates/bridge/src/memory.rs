//! Guest heap: a linear byte buffer with explicit allocate/release.
//!
//! Addresses are 32-bit byte offsets into the buffer. Address 0 is never
//! handed out, so callers can rely on every granted region having a non-zero
//! address. Released blocks go on a free list and are reused first-fit.

use hashbrown::HashMap;

/// First valid heap address. Offsets below this are never allocated, which
/// keeps address 0 (and a small guard zone) permanently invalid.
const HEAP_BASE: u32 = 8;

/// Largest single allocation the heap will grant.
const MAX_ALLOC: u32 = 1 << 30;

/// Ceiling on total heap size. Keeps every granted address well inside
/// `u32` range, so growth can never wrap around and alias a live region.
const MAX_HEAP: u32 = 1 << 31;

/// A granted heap region: address plus requested length in bytes.
///
/// Regions are plain data so they can cross the boundary as a pair of
/// integers, but within the host they travel as a unit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Region {
    pub addr: u32,
    pub len: u32,
}

struct Block {
    /// Length the caller asked for
    len: u32,
    /// Bytes actually reserved (zero-length requests still reserve one byte
    /// so every region has a distinct address)
    cap: u32,
}

/// Linear guest memory with a first-fit free list
pub struct GuestMemory {
    bytes: Vec<u8>,
    /// (addr, cap) of released blocks
    free: Vec<(u32, u32)>,
    live: HashMap<u32, Block>,
    limit: u32,
}

impl GuestMemory {
    pub fn new() -> Self {
        Self::with_limit(MAX_HEAP)
    }

    /// Heap with a custom total-size ceiling
    pub fn with_limit(limit: u32) -> Self {
        Self {
            bytes: vec![0; HEAP_BASE as usize],
            free: Vec::new(),
            live: HashMap::new(),
            limit,
        }
    }

    /// Allocate a region of `len` bytes. Returns `None` when the request
    /// cannot be satisfied. A zero-length request still yields a distinct
    /// non-zero address.
    pub fn allocate(&mut self, len: u32) -> Option<Region> {
        if len > MAX_ALLOC {
            return None;
        }
        let cap = len.max(1);

        // First fit over released blocks
        for i in 0..self.free.len() {
            let (addr, free_cap) = self.free[i];
            if free_cap >= cap {
                let leftover = free_cap - cap;
                if leftover > 0 {
                    self.free[i] = (addr + cap, leftover);
                } else {
                    self.free.swap_remove(i);
                }
                self.live.insert(addr, Block { len, cap });
                return Some(Region { addr, len });
            }
        }

        // Grow the buffer, refusing growth past the heap ceiling
        let end = self.bytes.len() as u64 + cap as u64;
        if end > self.limit as u64 {
            return None;
        }
        let addr = self.bytes.len() as u32;
        self.bytes.resize(end as usize, 0);
        self.live.insert(addr, Block { len, cap });
        Some(Region { addr, len })
    }

    /// Release a region. The length must match what was granted; releasing
    /// an address that is not live is a caller bug and panics.
    pub fn release(&mut self, region: Region) {
        let block = self
            .live
            .remove(&region.addr)
            .expect("released address should be live");
        debug_assert_eq!(
            block.len, region.len,
            "release length does not match grant"
        );
        self.free.push((region.addr, block.cap));
    }

    /// Copy bytes into a live region. The data must fit the region.
    pub fn write(&mut self, region: Region, data: &[u8]) -> Result<(), MemoryError> {
        self.check(region)?;
        if data.len() > region.len as usize {
            return Err(MemoryError::OutOfBounds(region));
        }
        let start = region.addr as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Borrow the bytes of a live region.
    pub fn read(&self, region: Region) -> Result<&[u8], MemoryError> {
        self.check(region)?;
        let start = region.addr as usize;
        Ok(&self.bytes[start..start + region.len as usize])
    }

    fn check(&self, region: Region) -> Result<(), MemoryError> {
        match self.live.get(&region.addr) {
            Some(block) if block.len == region.len => Ok(()),
            Some(_) => Err(MemoryError::OutOfBounds(region)),
            None => Err(MemoryError::NotLive(region)),
        }
    }

    /// Number of live regions, for diagnostics
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl Default for GuestMemory {
    fn default() -> Self {
        Self::new()
    }
}

/// Access to a region that is not live or does not fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    NotLive(Region),
    OutOfBounds(Region),
}

impl std::fmt::Display for MemoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryError::NotLive(r) => {
                write!(f, "region at address {} (len {}) is not live", r.addr, r.len)
            }
            MemoryError::OutOfBounds(r) => {
                write!(f, "access outside region at address {} (len {})", r.addr, r.len)
            }
        }
    }
}

impl std::error::Error for MemoryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_never_zero() {
        let mut mem = GuestMemory::new();
        for len in [0u32, 1, 17, 0] {
            let region = mem.allocate(len).unwrap();
            assert_ne!(region.addr, 0);
        }
    }

    #[test]
    fn zero_length_regions_are_distinct() {
        let mut mem = GuestMemory::new();
        let a = mem.allocate(0).unwrap();
        let b = mem.allocate(0).unwrap();
        assert_ne!(a.addr, b.addr);
    }

    #[test]
    fn round_trips_bytes() {
        let mut mem = GuestMemory::new();
        let region = mem.allocate(5).unwrap();
        mem.write(region, b"hello").unwrap();
        assert_eq!(mem.read(region).unwrap(), b"hello");
    }

    #[test]
    fn adjacent_regions_do_not_clobber() {
        let mut mem = GuestMemory::new();
        let a = mem.allocate(3).unwrap();
        let b = mem.allocate(3).unwrap();
        mem.write(a, b"aaa").unwrap();
        mem.write(b, b"bbb").unwrap();
        assert_eq!(mem.read(a).unwrap(), b"aaa");
        assert_eq!(mem.read(b).unwrap(), b"bbb");
    }

    #[test]
    fn released_blocks_are_reused() {
        let mut mem = GuestMemory::new();
        let a = mem.allocate(16).unwrap();
        mem.release(a);
        let b = mem.allocate(8).unwrap();
        assert_eq!(b.addr, a.addr);
    }

    #[test]
    fn oversized_requests_are_refused() {
        let mut mem = GuestMemory::new();
        assert!(mem.allocate(MAX_ALLOC + 1).is_none());
    }

    #[test]
    fn growth_stops_at_the_heap_ceiling() {
        let mut mem = GuestMemory::with_limit(64);
        let a = mem.allocate(32).unwrap();
        assert!(mem.allocate(40).is_none());
        mem.release(a);
        // released space is still usable once growth is exhausted
        let b = mem.allocate(30).unwrap();
        assert_eq!(b.addr, a.addr);
    }

    #[test]
    fn read_after_release_is_rejected() {
        let mut mem = GuestMemory::new();
        let region = mem.allocate(4).unwrap();
        mem.release(region);
        assert_eq!(mem.read(region), Err(MemoryError::NotLive(region)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "release length does not match grant")]
    fn mismatched_release_length_is_flagged() {
        let mut mem = GuestMemory::new();
        let region = mem.allocate(4).unwrap();
        mem.release(Region {
            addr: region.addr,
            len: 3,
        });
    }

    #[test]
    #[should_panic(expected = "released address should be live")]
    fn double_release_panics() {
        let mut mem = GuestMemory::new();
        let region = mem.allocate(4).unwrap();
        mem.release(region);
        mem.release(region);
    }

    #[test]
    fn live_count_tracks_grants() {
        let mut mem = GuestMemory::new();
        let a = mem.allocate(1).unwrap();
        let b = mem.allocate(1).unwrap();
        assert_eq!(mem.live_count(), 2);
        mem.release(a);
        mem.release(b);
        assert_eq!(mem.live_count(), 0);
    }
}
