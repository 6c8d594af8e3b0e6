//! # graphsync codec
//!
//! Value model, CBOR encoding and framing for graphsync.
//!
//! This crate provides:
//! - [`Value`], the closed set of property values a register can hold
//! - CBOR encoding/decoding of any serde type ([`to_cbor`], [`from_cbor`])
//! - Length-prefixed framing ([`encode_frame`], [`FrameDecoder`])
//!
//! Decoding is the validation boundary of the system: a payload that does
//! not fit the [`Value`] model fails here with a descriptive error.
//!
//! ## Usage
//!
//! ```
//! use graphsync_codec::{from_cbor, to_cbor, Value};
//!
//! let value = Value::from("buy milk");
//! let bytes = to_cbor(&value).unwrap();
//!
//! let decoded: Value = from_cbor(&bytes).unwrap();
//! assert_eq!(value, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod frame;
mod value;

pub use error::{CodecError, CodecResult};
pub use frame::{
    encode_frame, FrameDecoder, DEFAULT_MAX_FRAME_LEN, DEFAULT_MAX_STATE_FRAME_LEN,
    FRAME_HEADER_LEN,
};
pub use value::Value;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode any serializable value to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the value refuses to serialize (e.g. a NaN float).
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::ser::into_writer(value, &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

/// Decode a value from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR or do not match the
/// shape of `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

/// Trait for types that can be encoded to CBOR.
pub trait Encode {
    /// Encode this value to CBOR bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for types that can be decoded from CBOR.
pub trait Decode: Sized {
    /// Decode this value from CBOR bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

impl Encode for Value {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        to_cbor(self)
    }
}

impl Decode for Value {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        from_cbor(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn roundtrip_nested() {
        let mut todo = BTreeMap::new();
        todo.insert("text".to_string(), Value::from("write tests"));
        todo.insert("completed".to_string(), Value::Bool(false));
        todo.insert("priority".to_string(), Value::Integer(-3));
        todo.insert("weight".to_string(), Value::Float(0.25));
        todo.insert(
            "tags".to_string(),
            Value::Array(vec![Value::from("home"), Value::Null]),
        );
        let value = Value::Map(todo);

        let bytes = value.encode().unwrap();
        assert_eq!(Value::decode(&bytes).unwrap(), value);
    }

    #[test]
    fn cbor_null_is_value_null() {
        // 0xf6 is CBOR null
        assert_eq!(from_cbor::<Value>(&[0xf6]).unwrap(), Value::Null);
        assert_eq!(to_cbor(&Value::Null).unwrap(), vec![0xf6]);
    }

    #[test]
    fn rejects_byte_strings() {
        // 0x43 = byte string of length 3
        let err = from_cbor::<Value>(&[0x43, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, CodecError::DecodingFailed { .. }));
    }

    #[test]
    fn rejects_integer_map_keys() {
        // {1: 2}
        assert!(from_cbor::<Value>(&[0xa1, 0x01, 0x02]).is_err());
    }

    #[test]
    fn rejects_nan() {
        // 0xf9 0x7e 0x00 = half-precision NaN
        assert!(from_cbor::<Value>(&[0xf9, 0x7e, 0x00]).is_err());
        assert!(to_cbor(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn rejects_truncated_input() {
        // text of length 5 with only 2 bytes present
        assert!(from_cbor::<Value>(&[0x65, b'h', b'e']).is_err());
    }
}
