use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use serde_json::Value;

use crate::codec::{decode_frame, peek_length, Frame, FrameConfig, HEADER_SIZE};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached on a
    /// frame boundary and `Err(FrameError::Truncated { .. })` when EOF cuts a
    /// frame short.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.config.max_payload_size)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(self.eof_error());
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next frame and decode it as JSON.
    ///
    /// A zero-length frame yields `{}`.
    pub fn read_message(&mut self) -> Result<Value> {
        let frame = self.read_frame()?;
        let message = frame.to_json()?;
        tracing::trace!(size = frame.payload.len(), "decoded inbound message");
        Ok(message)
    }

    fn eof_error(&self) -> FrameError {
        if self.buf.is_empty() {
            return FrameError::ConnectionClosed;
        }
        let expected = match peek_length(&self.buf) {
            Some(len) => HEADER_SIZE + len,
            None => HEADER_SIZE,
        };
        FrameError::Truncated {
            expected,
            got: self.buf.len(),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};
    use serde_json::json;

    use super::*;
    use crate::codec::{encode_frame, MAX_FRAME_SIZE};

    fn wire_for(messages: &[Value]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        for message in messages {
            encode_frame(&serde_json::to_vec(message).unwrap(), &mut wire).unwrap();
        }
        wire.to_vec()
    }

    #[test]
    fn read_single_message() {
        let wire = wire_for(&[json!({"id": "1", "status": "ok"})]);

        let mut reader = FrameReader::new(Cursor::new(wire));
        let message = reader.read_message().unwrap();

        assert_eq!(message, json!({"id": "1", "status": "ok"}));
    }

    #[test]
    fn read_multiple_messages_in_order() {
        let wire = wire_for(&[
            json!({"action": "PING", "timestamp": 1}),
            json!({"id": "2"}),
            json!({"event": "tab_changed"}),
        ]);

        let mut reader = FrameReader::new(Cursor::new(wire));

        assert_eq!(reader.read_message().unwrap()["action"], "PING");
        assert_eq!(reader.read_message().unwrap()["id"], "2");
        assert_eq!(reader.read_message().unwrap()["event"], "tab_changed");
        assert!(reader.read_message().unwrap_err().is_eof());
    }

    #[test]
    fn read_message_with_large_payload() {
        let text = "x".repeat(512 * 1024);
        let wire = wire_for(&[json!({ "id": "9", "text": text })]);

        let mut reader = FrameReader::new(Cursor::new(wire));
        let message = reader.read_message().unwrap();

        assert_eq!(message["text"].as_str().unwrap().len(), 512 * 1024);
    }

    #[test]
    fn partial_read_handling() {
        let wire = wire_for(&[json!({"id": "4", "slow": true})]);

        let byte_reader = ByteByByteReader {
            bytes: wire,
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let message = reader.read_message().unwrap();
        assert_eq!(message, json!({"id": "4", "slow": true}));
    }

    #[test]
    fn zero_length_frame_is_empty_object() {
        let mut wire = BytesMut::new();
        wire.put_u32_le(0);

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        assert_eq!(reader.read_message().unwrap(), json!({}));
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn short_read_in_header_is_truncated() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x10, 0x00]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                expected: HEADER_SIZE,
                got: 2
            }
        ));
    }

    #[test]
    fn short_read_in_payload_is_truncated() {
        let mut partial = BytesMut::new();
        partial.put_u32_le(16);
        partial.put_slice(b"{\"only\":");

        let mut reader = FrameReader::new(Cursor::new(partial.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                expected: 20,
                got: 12
            }
        ));
    }

    #[test]
    fn oversized_frame_rejected_before_payload_is_read() {
        let mut wire = BytesMut::new();
        wire.put_u32_le((MAX_FRAME_SIZE + 1) as u32);

        let counting = CountingReader {
            inner: Cursor::new(wire.to_vec()),
            reads: 0,
        };
        let mut reader = FrameReader::new(counting);
        let err = reader.read_frame().unwrap_err();

        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert_eq!(reader.get_ref().reads, 1);
    }

    #[test]
    fn configured_limit_applies() {
        let wire = wire_for(&[json!({"text": "more than sixteen bytes"})]);
        let cfg = FrameConfig {
            max_payload_size: 16,
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { max: 16, .. }));
    }

    #[test]
    fn invalid_json_is_protocol_error() {
        let mut wire = BytesMut::new();
        encode_frame(b"{broken", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let err = reader.read_message().unwrap_err();
        assert!(matches!(err, FrameError::Json(_)));
        assert!(!err.is_eof());
    }

    #[test]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer
            .write_message(&json!({"action": "PONG", "timestamp": 5}))
            .unwrap();
        let message = reader.read_message().unwrap();

        assert_eq!(message, json!({"action": "PONG", "timestamp": 5}));
    }

    #[test]
    fn interrupted_read_retries() {
        let wire = wire_for(&[json!({"ok": true})]);

        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(wire),
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_message().unwrap(), json!({"ok": true}));
    }

    #[test]
    fn io_error_propagates() {
        let mut framed = FrameReader::new(BrokenReader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        reads: usize,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.reads += 1;
            self.inner.read(buf)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
