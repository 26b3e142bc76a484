//! Accumulator for raw channel output.

use bytes::BytesMut;

/// Buffer for reply data read off the wire.
///
/// Output is ANSI-stripped on the way in; device CLIs decorate pagination
/// and prompts with escape sequences that would otherwise confuse the reply
/// grammars.
#[derive(Debug, Default)]
pub struct ReplyBuffer {
    buffer: BytesMut,
}

impl ReplyBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Append new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let cleaned = strip_ansi_escapes::strip(data);
        self.buffer.extend_from_slice(&cleaned);
    }

    /// Whether no data is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffered byte count.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Take the buffered contents as text (lossy UTF-8), leaving the buffer
    /// empty.
    pub fn take_string(&mut self) -> String {
        let taken = self.buffer.split();
        String::from_utf8_lossy(&taken).into_owned()
    }

    /// Discard buffered data.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
