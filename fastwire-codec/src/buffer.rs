//! Fixed-capacity byte window with independent read and write cursors.
//!
//! [`ByteBuffer`] lets one-byte-at-a-time stream reads be layered over
//! bursty datagram receives: a transport adapter writes a whole datagram in,
//! and the codec drains it byte by byte. The invariant `0 <= read <= write
//! <= capacity` always holds.

use fastwire_core::{DecodeError, EncodeError};

/// Fixed-capacity byte buffer with separate read and write cursors.
///
/// Single-owner: one buffer belongs to exactly one transport adapter and is
/// never shared across threads.
#[derive(Debug)]
pub struct ByteBuffer {
    data: Vec<u8>,
    read: usize,
    write: usize,
}

impl ByteBuffer {
    /// Allocates a buffer of the given capacity with both cursors at zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read: 0,
            write: 0,
        }
    }

    /// Returns the buffer capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.write - self.read
    }

    /// Returns true if unread bytes remain.
    #[must_use]
    pub const fn has_remaining(&self) -> bool {
        self.read < self.write
    }

    /// Reads the next byte, advancing the read cursor.
    ///
    /// # Errors
    /// Returns [`DecodeError::BufferUnderflow`] when no unread bytes remain;
    /// the caller must refill first.
    pub fn get(&mut self) -> Result<u8, DecodeError> {
        if self.read >= self.write {
            return Err(DecodeError::BufferUnderflow);
        }
        let byte = self.data[self.read];
        self.read += 1;
        Ok(byte)
    }

    /// Appends bytes at the write cursor.
    ///
    /// # Errors
    /// Returns [`EncodeError::BufferOverflow`] if the write would exceed
    /// capacity. The buffer is left unchanged; an oversized write signals a
    /// malformed or oversized datagram and is fatal at this layer, never
    /// truncated.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        let needed = self.write + bytes.len();
        if needed > self.data.len() {
            return Err(EncodeError::BufferOverflow {
                needed,
                capacity: self.data.len(),
            });
        }
        self.data[self.write..needed].copy_from_slice(bytes);
        self.write = needed;
        Ok(())
    }

    /// Resets both cursors to zero, discarding any unread content.
    ///
    /// Callers must fully drain the buffer before flipping.
    pub fn flip(&mut self) {
        self.read = 0;
        self.write = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_advances_read_cursor() {
        let mut buf = ByteBuffer::new(8);
        buf.write_bytes(&[1, 2, 3]).unwrap();

        assert_eq!(buf.remaining(), 3);
        assert_eq!(buf.get().unwrap(), 1);
        assert_eq!(buf.get().unwrap(), 2);
        assert_eq!(buf.get().unwrap(), 3);
        assert!(!buf.has_remaining());
    }

    #[test]
    fn test_get_underflow() {
        let mut buf = ByteBuffer::new(4);
        assert_eq!(buf.get(), Err(DecodeError::BufferUnderflow));

        buf.write_bytes(&[9]).unwrap();
        assert_eq!(buf.get().unwrap(), 9);
        assert_eq!(buf.get(), Err(DecodeError::BufferUnderflow));
    }

    #[test]
    fn test_write_overflow_leaves_state_unchanged() {
        let mut buf = ByteBuffer::new(4);
        buf.write_bytes(&[1, 2]).unwrap();

        let err = buf.write_bytes(&[3, 4, 5]).unwrap_err();
        assert_eq!(
            err,
            EncodeError::BufferOverflow {
                needed: 5,
                capacity: 4
            }
        );

        // cursors untouched by the failed write
        assert_eq!(buf.remaining(), 2);
        assert_eq!(buf.get().unwrap(), 1);
        assert_eq!(buf.get().unwrap(), 2);
        assert!(!buf.has_remaining());
    }

    #[test]
    fn test_flip_discards_unread() {
        let mut buf = ByteBuffer::new(4);
        buf.write_bytes(&[1, 2, 3, 4]).unwrap();
        assert_eq!(buf.get().unwrap(), 1);

        buf.flip();
        assert!(!buf.has_remaining());
        buf.write_bytes(&[7]).unwrap();
        assert_eq!(buf.get().unwrap(), 7);
    }

    #[test]
    fn test_exact_capacity_write() {
        let mut buf = ByteBuffer::new(3);
        buf.write_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(buf.remaining(), 3);
        assert!(buf.write_bytes(&[4]).is_err());
    }
}
