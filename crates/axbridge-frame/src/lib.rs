//! Chrome native-messaging framing.
//!
//! Every message on the extension's stdio pipe is framed as:
//! - A 4-byte little-endian payload length
//! - Exactly that many bytes of UTF-8 JSON
//!
//! Frames are capped at 1 MiB in both directions. No partial reads, no
//! buffer management in user code.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, HEADER_SIZE, MAX_FRAME_SIZE};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
