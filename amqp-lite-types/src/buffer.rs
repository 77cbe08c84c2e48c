//! A byte buffer with independent read and write cursors

use bytes::{Bytes, BytesMut};

use crate::Error;

/// A region of bytes with four offsets `start <= read <= write <= end`.
///
/// Bytes between `read` and `write` are available to read ([`len`](Self::len)),
/// bytes between `write` and `end` are available to write ([`size`](Self::size)).
/// Encoders call [`validate`](Self::validate) before touching the writable region
/// and [`append`](Self::append) afterwards, decoders do the same with
/// [`complete`](Self::complete).
///
/// Cursor movements that would break the offset invariant are programming errors
/// and panic.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteBuffer {
    buffer: Vec<u8>,
    start: usize,
    read: usize,
    write: usize,
    end: usize,
    auto_grow: bool,
}

impl std::fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("start", &self.start)
            .field("read", &self.read)
            .field("write", &self.write)
            .field("end", &self.end)
            .field("auto_grow", &self.auto_grow)
            .finish()
    }
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new(0, true)
    }
}

impl ByteBuffer {
    /// Creates an empty buffer with the given capacity
    pub fn new(capacity: usize, auto_grow: bool) -> Self {
        Self {
            buffer: vec![0; capacity],
            start: 0,
            read: 0,
            write: 0,
            end: capacity,
            auto_grow,
        }
    }

    /// Wraps existing bytes as a fixed buffer whose content is readable
    pub fn wrap(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            buffer: bytes,
            start: 0,
            read: 0,
            write: len,
            end: len,
            auto_grow: false,
        }
    }

    /// Wraps a window `[offset, offset + capacity)` of `buffer` whose first `count`
    /// bytes are readable
    ///
    /// # Panics
    ///
    /// Panics if the window does not fit in `buffer` or `count > capacity`
    pub fn with_window(
        buffer: Vec<u8>,
        offset: usize,
        count: usize,
        capacity: usize,
        auto_grow: bool,
    ) -> Self {
        assert!(count <= capacity, "count exceeds capacity");
        assert!(offset + capacity <= buffer.len(), "window exceeds buffer");
        Self {
            buffer,
            start: offset,
            read: offset,
            write: offset + count,
            end: offset + capacity,
            auto_grow,
        }
    }

    /// Number of bytes available to read
    pub fn len(&self) -> usize {
        self.write - self.read
    }

    /// Whether there is nothing left to read
    pub fn is_empty(&self) -> bool {
        self.write == self.read
    }

    /// Number of bytes available to write
    pub fn size(&self) -> usize {
        self.end - self.write
    }

    /// Total size of the window
    pub fn capacity(&self) -> usize {
        self.end - self.start
    }

    /// Absolute position of the read cursor in the backing array
    pub fn offset(&self) -> usize {
        self.read
    }

    /// Absolute position of the write cursor in the backing array
    pub fn write_pos(&self) -> usize {
        self.write
    }

    /// Whether the buffer grows on write overflow
    pub fn auto_grow(&self) -> bool {
        self.auto_grow
    }

    /// The readable bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[self.read..self.write]
    }

    /// The writable region
    pub fn writable(&mut self) -> &mut [u8] {
        &mut self.buffer[self.write..self.end]
    }

    /// The whole backing array, ignoring cursors
    pub fn backing(&self) -> &[u8] {
        &self.buffer
    }

    /// Checks that `size` bytes can be written (`for_write`) or read.
    ///
    /// A write that does not fit grows an auto-growing buffer, otherwise
    /// [`Error::BufferTooSmall`] is returned.
    pub fn validate(&mut self, for_write: bool, size: usize) -> Result<(), Error> {
        if for_write {
            if self.size() < size {
                if !self.auto_grow {
                    return Err(Error::BufferTooSmall {
                        requested: size,
                        available: self.size(),
                    });
                }
                self.grow(size);
            }
        } else if self.len() < size {
            return Err(Error::BufferTooSmall {
                requested: size,
                available: self.len(),
            });
        }
        Ok(())
    }

    /// Advances the write cursor after `size` bytes were written
    pub fn append(&mut self, size: usize) {
        assert!(self.write + size <= self.end, "append beyond end");
        self.write += size;
    }

    /// Advances the read cursor after `size` bytes were consumed
    pub fn complete(&mut self, size: usize) {
        assert!(self.read + size <= self.write, "complete beyond write");
        self.read += size;
    }

    /// Moves the read cursor to an absolute position
    pub fn seek(&mut self, position: usize) {
        assert!(
            position >= self.start && position <= self.write,
            "seek outside of readable window"
        );
        self.read = position;
    }

    /// Retracts the write cursor by `size` bytes
    pub fn shrink(&mut self, size: usize) {
        assert!(self.write - self.read >= size, "shrink beyond read");
        self.write -= size;
    }

    /// Rewinds both cursors to the start of the window
    pub fn reset(&mut self) {
        self.read = self.start;
        self.write = self.start;
    }

    /// Sets the read cursor to `offset` and the write cursor to `offset + length`
    pub fn adjust_position(&mut self, offset: usize, length: usize) {
        assert!(offset >= self.start, "offset before start");
        assert!(offset + length <= self.end, "length beyond end");
        self.read = offset;
        self.write = offset + length;
    }

    /// Copies `src` into the buffer
    pub fn put_slice(&mut self, src: &[u8]) -> Result<(), Error> {
        self.validate(true, src.len())?;
        self.writable()[..src.len()].copy_from_slice(src);
        self.append(src.len());
        Ok(())
    }

    /// Copies the first `dst.len()` readable bytes into `dst`
    pub fn take_slice(&mut self, dst: &mut [u8]) -> Result<(), Error> {
        self.validate(false, dst.len())?;
        dst.copy_from_slice(&self.as_slice()[..dst.len()]);
        self.complete(dst.len());
        Ok(())
    }

    /// Consumes `count` readable bytes and returns them as a new buffer
    pub fn split_to(&mut self, count: usize) -> Result<ByteBuffer, Error> {
        self.validate(false, count)?;
        let bytes = self.as_slice()[..count].to_vec();
        self.complete(count);
        Ok(ByteBuffer::wrap(bytes))
    }

    /// Unread content is moved to offset 0 of the new array
    fn grow(&mut self, size: usize) {
        let len = self.len();
        let capacity = std::cmp::max(self.capacity() * 2, len + size);
        let mut buffer = vec![0; capacity];
        buffer[..len].copy_from_slice(self.as_slice());
        self.buffer = buffer;
        self.start = 0;
        self.read = 0;
        self.write = len;
        self.end = capacity;
    }
}

impl From<ByteBuffer> for Bytes {
    fn from(value: ByteBuffer) -> Self {
        let (read, write) = (value.read, value.write);
        Bytes::from(value.buffer).slice(read..write)
    }
}

impl From<Bytes> for ByteBuffer {
    fn from(value: Bytes) -> Self {
        ByteBuffer::wrap(value.to_vec())
    }
}

impl From<BytesMut> for ByteBuffer {
    fn from(value: BytesMut) -> Self {
        ByteBuffer::wrap(value.to_vec())
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}
