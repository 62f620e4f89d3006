//! Wire - ノード間のバイト列表現
//!
//! Every message is a flat sequence of fields written in a fixed order.
//! Field order is the compatibility contract with peers on older protocol
//! versions: new fields are only ever appended, and retired fields keep their
//! slot (see `PersistJobRequest` for the reserved background flag).

pub mod stream;

pub use self::stream::{StreamInput, StreamOutput};

use bytes::Bytes;

use crate::domain::errors::CodecError;

/// Serializes `self` onto an output stream.
///
/// Fails only when a length does not fit the vint frame.
pub trait Writeable {
    fn write_to(&self, out: &mut StreamOutput) -> Result<(), CodecError>;
}

/// Deserializes a value, consuming exactly the bytes its `Writeable` impl wrote.
pub trait Readable: Sized {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self, CodecError>;
}

/// Encodes one whole message.
pub fn encode<T: Writeable + ?Sized>(value: &T) -> Result<Bytes, CodecError> {
    let mut out = StreamOutput::new();
    value.write_to(&mut out)?;
    Ok(out.freeze())
}

/// Decodes one whole message. Bytes left over after the message are an error.
pub fn decode<T: Readable>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut input = StreamInput::new(bytes);
    let value = T::read_from(&mut input)?;
    match input.remaining() {
        0 => Ok(value),
        n => Err(CodecError::TrailingBytes(n)),
    }
}
