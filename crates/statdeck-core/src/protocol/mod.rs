//! Protocol module containing message types, the line codec, and framing.

pub mod codec;
pub mod framing;
pub mod messages;

pub use codec::{decode_message, encode_message, DecodeError, EncodeError};
pub use framing::{LineDecoder, DEFAULT_MAX_LINE_BYTES};
pub use messages::*;
