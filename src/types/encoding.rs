//! Deterministic binary codec for persisted host records.
//!
//! Every node must write byte-identical records for code metadata, contract
//! metadata and history entries, so the format is fixed and little-endian.
//!
//! # Binary Format
//!
//! - Integers: little-endian, fixed-width
//! - `usize`: encoded as `u64`
//! - `Vec<T>`/`String`: 8-byte length prefix followed by elements
//! - `Option<T>`: 1-byte tag (0 = None, 1 = Some) followed by value if present
//! - Arrays `[T; N]`: elements back to back without a length prefix
//!
//! Store keys do not use this codec: numeric key segments are big-endian so
//! that ordered iteration follows numeric order (see `core::keys`).

use host_derive::Error;

/// Sink for writing encoded bytes.
///
/// Implemented by byte buffers and hashers so records can be hashed without
/// an intermediate buffer.
pub trait EncodeSink {
    fn write(&mut self, bytes: &[u8]);
}

/// Counts encoded bytes without allocating.
#[derive(Default)]
struct SizeCounter {
    len: usize,
}

impl EncodeSink for SizeCounter {
    fn write(&mut self, bytes: &[u8]) {
        self.len += bytes.len();
    }
}

impl EncodeSink for Vec<u8> {
    fn write(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

/// Types that can be written in the binary format.
pub trait Encode {
    fn encode<S: EncodeSink>(&self, out: &mut S);

    /// Serializes into a buffer allocated with the exact encoded size.
    fn to_bytes(&self) -> Vec<u8> {
        let mut counter = SizeCounter::default();
        self.encode(&mut counter);

        let mut out = Vec::with_capacity(counter.len);
        self.encode(&mut out);
        out
    }
}

/// Errors raised while decoding a record.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid value")]
    InvalidValue,
    #[error("length prefix exceeds limit")]
    LengthOverflow,
}

/// Types that can be read back from the binary format.
pub trait Decode: Sized {
    /// Decodes a value and advances `input` past the consumed bytes.
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decodes a value that must span all of `data`.
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let mut input = data;
        let value = Self::decode(&mut input)?;
        if !input.is_empty() {
            return Err(DecodeError::InvalidValue);
        }
        Ok(value)
    }
}

fn read_bytes<'a>(input: &mut &'a [u8], n: usize) -> Result<&'a [u8], DecodeError> {
    if input.len() < n {
        return Err(DecodeError::UnexpectedEof);
    }
    let (bytes, rest) = input.split_at(n);
    *input = rest;
    Ok(bytes)
}

fn read_array<const N: usize>(input: &mut &[u8]) -> Result<[u8; N], DecodeError> {
    let mut buf = [0u8; N];
    buf.copy_from_slice(read_bytes(input, N)?);
    Ok(buf)
}

impl Encode for u8 {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&[*self]);
    }
}

impl Decode for u8 {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(read_bytes(input, 1)?[0])
    }
}

macro_rules! impl_int {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode<S: EncodeSink>(&self, out: &mut S) {
                    out.write(&self.to_le_bytes());
                }
            }

            impl Decode for $t {
                fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
                    Ok(<$t>::from_le_bytes(read_array(input)?))
                }
            }
        )*
    };
}

impl_int!(u64, u128);

impl Encode for usize {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        (*self as u64).encode(out);
    }
}

impl Decode for usize {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let v = u64::decode(input)?;
        usize::try_from(v).map_err(|_| DecodeError::LengthOverflow)
    }
}

/// Upper bound on decoded collection lengths.
const MAX_VEC_LEN: usize = 4 * 1024 * 1024;

impl<T: Encode> Encode for Vec<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        for item in self {
            item.encode(out);
        }
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = usize::decode(input)?;
        if len > MAX_VEC_LEN {
            return Err(DecodeError::LengthOverflow);
        }
        // Every element takes at least one byte, so a length beyond the
        // remaining input is corrupt and must not drive the allocation.
        if len > input.len() {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut vec = Vec::with_capacity(len);
        for _ in 0..len {
            vec.push(T::decode(input)?);
        }
        Ok(vec)
    }
}

impl Encode for String {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        self.len().encode(out);
        out.write(self.as_bytes());
    }
}

impl Decode for String {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let len = usize::decode(input)?;
        if len > MAX_VEC_LEN {
            return Err(DecodeError::LengthOverflow);
        }
        let bytes = read_bytes(input, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidValue)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        match self {
            None => 0u8.encode(out),
            Some(v) => {
                1u8.encode(out);
                v.encode(out);
            }
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(input)? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(input)?)),
            _ => Err(DecodeError::InvalidValue),
        }
    }
}

impl<const N: usize> Encode for [u8; N] {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(self);
    }
}

impl<const N: usize> Decode for [u8; N] {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        read_array(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_bytes_preallocates_exact_capacity() {
        let data: Vec<u8> = vec![1, 2, 3, 4, 5];
        let bytes = data.to_bytes();
        assert_eq!(bytes.len(), 8 + 5);
        assert_eq!(bytes.capacity(), bytes.len());
    }

    #[test]
    fn integers_are_little_endian() {
        assert_eq!(0x0102u64.to_bytes(), vec![2, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(u128::from_bytes(&7u128.to_bytes()), Ok(7));
    }

    #[test]
    fn vec_length_beyond_input_is_rejected_before_allocating() {
        let mut bytes = 1000u64.to_bytes();
        bytes.extend_from_slice(&[1, 2, 3]);
        assert_eq!(
            Vec::<u8>::from_bytes(&bytes),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn vec_length_overflow() {
        let bytes = ((MAX_VEC_LEN as u64) + 1).to_bytes();
        assert_eq!(
            Vec::<u8>::from_bytes(&bytes),
            Err(DecodeError::LengthOverflow)
        );
    }

    #[test]
    fn string_rejects_invalid_utf8() {
        let mut bytes = 2u64.to_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert_eq!(String::from_bytes(&bytes), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn option_roundtrip_keeps_tag() {
        let some: Option<u64> = Some(513);
        assert_eq!(some.to_bytes(), vec![1, 1, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(Option::<u64>::from_bytes(&[0]), Ok(None));
        assert_eq!(
            Option::<u64>::from_bytes(&[2]),
            Err(DecodeError::InvalidValue)
        );
    }

    #[test]
    fn from_bytes_rejects_trailing_data() {
        assert_eq!(u8::from_bytes(&[1, 2]), Err(DecodeError::InvalidValue));
    }

    #[test]
    fn truncated_input_reports_eof() {
        assert_eq!(u64::from_bytes(&[1, 2]), Err(DecodeError::UnexpectedEof));
    }
}
