//! Single-producer/single-consumer queue of variable-length byte chunks.
//!
//! Every chunk is stored contiguously. The arena is over-allocated by the
//! maximum chunk size so a chunk starting near the end simply runs into the
//! trailing area instead of wrapping; the cursors still wrap at `capacity`.
//! Chunk lengths live in a separate table indexed by the chunk's start offset.
//!
//! `head == tail` means empty, and the producer never advances `head` onto
//! `tail`, so one slot is always reserved. A chunk of length 0 still occupies
//! one slot so it stays visible to the consumer.
//!
//! Both halves are allocation-free and never block, so they can be used on
//! the audio thread.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Errors from chunk queue operations. None of them carry heap data.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkQueueError {
    #[error("No space for a {requested} byte chunk ({available} available)")]
    NoSpace { requested: usize, available: usize },

    #[error("Queue is empty")]
    Empty,

    #[error("Buffer of {provided} bytes cannot hold a {needed} byte chunk")]
    BufferTooSmall { needed: usize, provided: usize },

    #[error("Chunk is {actual} bytes, tried to advance by {expected}")]
    ChunkSizeMismatch { expected: usize, actual: usize },
}

struct Shared {
    arena: Box<[UnsafeCell<u8>]>,
    sizes: Box<[AtomicUsize]>,
    capacity: usize,
    max_chunk: usize,
    /// Written only by the producer.
    head: CachePadded<AtomicUsize>,
    /// Written only by the consumer.
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: the arena region between `tail` and `head` belongs to the consumer,
// the rest to the producer. Each side only touches its own region and hands
// it over with a release store on its cursor.
unsafe impl Sync for Shared {}

impl Shared {
    #[inline]
    fn free_slots(&self, head: usize, tail: usize) -> usize {
        if tail > head {
            tail - head - 1
        } else {
            tail + self.capacity - head - 1
        }
    }

    #[inline]
    fn arena_ptr(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.arena.as_ptr())
    }

    #[inline]
    fn advance(&self, position: usize, len: usize) -> usize {
        (position + len.max(1)) % self.capacity
    }
}

/// Create a queue whose largest chunk may use all usable space.
///
/// `capacity` includes the reserved slot, so `chunk_queue(17)` holds 16 bytes.
pub fn chunk_queue(capacity: usize) -> (ChunkProducer, ChunkConsumer) {
    chunk_queue_with_max_chunk(capacity, capacity.saturating_sub(1))
}

/// Create a queue with an explicit upper bound on chunk size.
///
/// `capacity` is raised to at least 2 and `max_chunk` is clamped to
/// `1..capacity`.
pub fn chunk_queue_with_max_chunk(
    capacity: usize,
    max_chunk: usize,
) -> (ChunkProducer, ChunkConsumer) {
    let capacity = capacity.max(2);
    let max_chunk = max_chunk.clamp(1, capacity - 1);

    let shared = Arc::new(Shared {
        arena: (0..capacity + max_chunk).map(|_| UnsafeCell::new(0)).collect(),
        sizes: (0..capacity).map(|_| AtomicUsize::new(0)).collect(),
        capacity,
        max_chunk,
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
    });

    (
        ChunkProducer {
            shared: Arc::clone(&shared),
        },
        ChunkConsumer { shared },
    )
}

/// Writing half of a chunk queue.
pub struct ChunkProducer {
    shared: Arc<Shared>,
}

impl ChunkProducer {
    /// Largest chunk that can be written right now.
    #[inline]
    pub fn write_available(&self) -> usize {
        let head = self.shared.head.load(Ordering::Relaxed);
        let tail = self.shared.tail.load(Ordering::Acquire);
        self.shared
            .free_slots(head, tail)
            .min(self.shared.max_chunk)
    }

    /// Copy `data` in as one chunk and publish it.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ChunkQueueError> {
        self.write_pointer(data.len())?.copy_from_slice(data);
        self.write_advance(data.len())
    }

    /// Contiguous space for a chunk of `len` bytes, for in-place writing.
    ///
    /// Nothing is visible to the consumer until [`write_advance`](Self::write_advance).
    pub fn write_pointer(&mut self, len: usize) -> Result<&mut [u8], ChunkQueueError> {
        self.check_space(len)?;
        let head = self.shared.head.load(Ordering::Relaxed);
        // SAFETY: `head + len <= capacity + max_chunk` (arena length) and the
        // range is in the producer's region, checked above.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.shared.arena_ptr().add(head), len) })
    }

    /// Publish the `len` bytes written through [`write_pointer`](Self::write_pointer).
    pub fn write_advance(&mut self, len: usize) -> Result<(), ChunkQueueError> {
        self.check_space(len)?;
        let head = self.shared.head.load(Ordering::Relaxed);
        self.shared.sizes[head].store(len, Ordering::Relaxed);
        self.shared
            .head
            .store(self.shared.advance(head, len), Ordering::Release);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn max_chunk_size(&self) -> usize {
        self.shared.max_chunk
    }

    #[inline]
    fn check_space(&self, len: usize) -> Result<(), ChunkQueueError> {
        let available = self.write_available();
        if len > available || available == 0 {
            return Err(ChunkQueueError::NoSpace {
                requested: len,
                available,
            });
        }
        Ok(())
    }
}

/// Reading half of a chunk queue.
pub struct ChunkConsumer {
    shared: Arc<Shared>,
}

impl ChunkConsumer {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shared.head.load(Ordering::Acquire) == self.shared.tail.load(Ordering::Relaxed)
    }

    /// Length of the oldest unread chunk, or 0 if the queue is empty.
    #[inline]
    pub fn read_available(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        let tail = self.shared.tail.load(Ordering::Relaxed);
        self.shared.sizes[tail].load(Ordering::Relaxed)
    }

    /// Copy the oldest chunk into `buf` and release it. Returns its length.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, ChunkQueueError> {
        let chunk = self.read_pointer().ok_or(ChunkQueueError::Empty)?;
        let len = chunk.len();
        if buf.len() < len {
            return Err(ChunkQueueError::BufferTooSmall {
                needed: len,
                provided: buf.len(),
            });
        }
        buf[..len].copy_from_slice(chunk);
        self.read_advance(len)?;
        Ok(len)
    }

    /// The oldest chunk, in place. Release it with [`read_advance`](Self::read_advance).
    pub fn read_pointer(&self) -> Option<&[u8]> {
        if self.is_empty() {
            return None;
        }
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let len = self.shared.sizes[tail].load(Ordering::Relaxed);
        // SAFETY: the acquire load in `is_empty` makes the producer's writes
        // to this chunk visible, and the producer does not touch it again
        // until `tail` moves past it.
        Some(unsafe { std::slice::from_raw_parts(self.shared.arena_ptr().add(tail), len) })
    }

    /// Release the oldest chunk. `len` must be its exact length.
    pub fn read_advance(&mut self, len: usize) -> Result<(), ChunkQueueError> {
        if self.is_empty() {
            return Err(ChunkQueueError::Empty);
        }
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let actual = self.shared.sizes[tail].load(Ordering::Relaxed);
        if actual != len {
            return Err(ChunkQueueError::ChunkSizeMismatch {
                expected: len,
                actual,
            });
        }
        self.shared
            .tail
            .store(self.shared.advance(tail, len), Ordering::Release);
        Ok(())
    }

    /// Hand the oldest chunk to `f` in place, then release it.
    pub fn consume<R>(&mut self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let chunk = self.read_pointer()?;
        let len = chunk.len();
        let result = f(chunk);
        self.read_advance(len).ok()?;
        Some(result)
    }

    /// Release every queued chunk without looking at it. Returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let mut dropped = 0;
        while self.consume(|_| ()).is_some() {
            dropped += 1;
        }
        dropped
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}
