//! Transient scratch allocation
//!
//! Uploads flow through a size-classed slab pool so that steady-state
//! drawing performs no heap allocation. Block sizes round up to powers of
//! sixteen; freed blocks return to a bucket keyed by `log2(size) >> 2`.

use bytemuck::Pod;

const BUCKET_COUNT: usize = 8;
const MAX_POOLED: usize = 1 << 28;

/// Smallest power of sixteen that holds `n` bytes.
fn next_pow16(n: usize) -> usize {
    let mut size = 16;
    while size <= MAX_POOLED {
        if n <= size {
            return size;
        }
        size *= 16;
    }
    n
}

fn bucket(size: usize) -> Option<usize> {
    let index = (size.trailing_zeros() >> 2) as usize;
    (size.is_power_of_two() && index < BUCKET_COUNT).then_some(index)
}

/// A scratch block leased from the pool
///
/// Backed by `u64` storage so casts down to any scalar slice type are
/// alignment-safe.
#[derive(Debug, Default)]
pub struct ScratchBuf {
    block: Vec<u64>,
    len: usize,
}

impl ScratchBuf {
    /// Valid bytes, `len` of the original request.
    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.block)[..self.len]
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.block)[..self.len]
    }

    /// The valid region viewed as a typed slice.
    pub fn as_slice<T: Pod>(&self) -> &[T] {
        &bytemuck::cast_slice(&self.block)[..self.len / std::mem::size_of::<T>()]
    }

    pub fn as_slice_mut<T: Pod>(&mut self) -> &mut [T] {
        &mut bytemuck::cast_slice_mut(&mut self.block)[..self.len / std::mem::size_of::<T>()]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Size-classed pool of scratch blocks
#[derive(Debug, Default)]
pub struct ScratchPool {
    buckets: [Vec<Vec<u64>>; BUCKET_COUNT],
}

impl ScratchPool {
    pub fn new() -> ScratchPool {
        ScratchPool::default()
    }

    /// Lease a block of at least `byte_len` bytes. The valid length of the
    /// returned buffer is exactly `byte_len`.
    pub fn alloc(&mut self, byte_len: usize) -> ScratchBuf {
        let size = next_pow16(byte_len.max(1));
        let words = size / 8;
        let block = match bucket(size).and_then(|i| self.buckets[i].pop()) {
            Some(block) => block,
            None => vec![0u64; words],
        };
        ScratchBuf {
            block,
            len: byte_len,
        }
    }

    /// Return a block to its bucket. Oversized blocks are dropped.
    pub fn free(&mut self, buf: ScratchBuf) {
        let size = buf.block.len() * 8;
        if let Some(index) = bucket(size) {
            self.buckets[index].push(buf.block);
        }
    }
}

/// Types whose instances can be recycled through an [`ObjectPool`]
pub trait Recycle: Default {
    /// Reset to a fresh state while keeping allocated storage.
    fn recycle(&mut self);
}

/// Free list of recycled descriptor structs
#[derive(Debug)]
pub struct ObjectPool<T: Recycle> {
    free: Vec<T>,
}

impl<T: Recycle> Default for ObjectPool<T> {
    fn default() -> Self {
        ObjectPool { free: Vec::new() }
    }
}

impl<T: Recycle> ObjectPool<T> {
    pub fn acquire(&mut self) -> T {
        self.free.pop().unwrap_or_default()
    }

    pub fn release(&mut self, mut item: T) {
        item.recycle();
        self.free.push(item);
    }
}
