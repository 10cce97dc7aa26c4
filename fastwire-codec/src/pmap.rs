//! Presence map handling.
//!
//! The presence map is one stop-bit-terminated byte group at the front of a
//! FAST message. Its bits, seven per byte in most-significant-first order,
//! gate fields in template declaration order: bit 0 says whether an explicit
//! template id follows, then one bit per optional or stateful field.

use fastwire_core::DecodeError;

/// A decoded presence map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceMap {
    bits: Vec<bool>,
}

impl PresenceMap {
    /// Decodes a presence map from a byte slice.
    ///
    /// # Errors
    /// Returns [`DecodeError::UnexpectedEof`] if the slice ends before a
    /// terminal byte.
    pub fn decode(data: &[u8], offset: &mut usize) -> Result<Self, DecodeError> {
        let mut bits = Vec::new();

        loop {
            if *offset >= data.len() {
                return Err(DecodeError::UnexpectedEof);
            }
            let byte = data[*offset];
            *offset += 1;

            for i in (0..7).rev() {
                bits.push((byte >> i) & 1 == 1);
            }

            if byte & 0x80 != 0 {
                break;
            }
        }

        Ok(Self { bits })
    }

    /// Returns the number of decoded bits (always a multiple of seven).
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if the map carries no bits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns a cursor consuming bits from the front of the map.
    #[must_use]
    pub fn reader(&self) -> PresenceMapReader<'_> {
        PresenceMapReader {
            map: self,
            position: 0,
        }
    }
}

/// Cursor over a [`PresenceMap`], yielding one bit per call in order.
#[derive(Debug)]
pub struct PresenceMapReader<'a> {
    map: &'a PresenceMap,
    position: usize,
}

impl PresenceMapReader<'_> {
    /// Consumes and returns the next presence bit.
    ///
    /// # Errors
    /// Returns [`DecodeError::PresenceMapExhausted`] when read past the
    /// decoded bit count, so a template/wire mismatch surfaces here rather
    /// than as a silent `false`.
    pub fn read_bit(&mut self) -> Result<bool, DecodeError> {
        match self.map.bits.get(self.position) {
            Some(&bit) => {
                self.position += 1;
                Ok(bit)
            }
            None => Err(DecodeError::PresenceMapExhausted {
                bits: self.map.bits.len(),
            }),
        }
    }

    /// Returns the number of bits consumed so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

/// Builder collecting presence bits in field declaration order.
#[derive(Debug, Default)]
pub struct PresenceMapBuilder {
    bits: Vec<bool>,
}

impl PresenceMapBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one presence bit.
    pub fn push(&mut self, present: bool) {
        self.bits.push(present);
    }

    /// Returns the number of bits collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if no bits have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Encodes the collected bits as a stop-bit byte group.
    ///
    /// Bits pack seven per byte, most significant first, padded with zeros;
    /// the final byte carries the stop bit. No bits encode as the single
    /// terminal byte `0x80`.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        if self.bits.is_empty() {
            return vec![0x80];
        }

        let mut result = Vec::with_capacity(self.bits.len().div_ceil(7));
        let mut bit_index = 0;

        while bit_index < self.bits.len() {
            let mut byte: u8 = 0;
            for i in (0..7).rev() {
                if bit_index < self.bits.len() && self.bits[bit_index] {
                    byte |= 1 << i;
                }
                bit_index += 1;
            }
            if bit_index >= self.bits.len() {
                byte |= 0x80;
            }
            result.push(byte);
        }

        result
    }
}
