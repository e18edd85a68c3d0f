//! Character-at-a-time decoding of engine output.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::engine::UnitSource;
use crate::error::{Error, Result};

/// Decodes UTF-8 characters one at a time from an async byte reader.
///
/// Partially received multi-byte sequences are kept on the reader itself, so
/// dropping a pending [`CharReader::next_char`] future (for example when a
/// turn is cancelled) never loses bytes. Invalid sequences decode to
/// `U+FFFD`.
#[derive(Debug)]
pub struct CharReader<R> {
    inner: R,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> CharReader<R> {
    /// Wraps a byte reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::with_capacity(4),
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> R {
        self.inner
    }

    /// Reads the next character, or `None` once the reader is exhausted.
    pub async fn next_char(&mut self) -> Result<Option<char>> {
        loop {
            if let Some(ch) = self.decode_pending() {
                return Ok(Some(ch));
            }
            match self.inner.read_u8().await {
                Ok(byte) => self.pending.push(byte),
                Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                    // Truncated sequence at end of stream.
                    self.pending.clear();
                    return Ok(Some(char::REPLACEMENT_CHARACTER));
                }
                Err(err) => return Err(Error::io("failed to read engine output", err)),
            }
        }
    }

    fn decode_pending(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            return None;
        }
        match std::str::from_utf8(&self.pending) {
            Ok(s) => {
                let ch = s.chars().next();
                self.pending.clear();
                ch
            }
            Err(err) if err.error_len().is_none() => None,
            Err(_) => {
                // The prefix was a valid incomplete sequence, so only the
                // newest byte broke it; that byte may start a new character.
                let last = if self.pending.len() > 1 {
                    self.pending.pop()
                } else {
                    None
                };
                self.pending.clear();
                self.pending.extend(last);
                Some(char::REPLACEMENT_CHARACTER)
            }
        }
    }
}

#[async_trait::async_trait]
impl<R: AsyncRead + Unpin + Send> UnitSource for CharReader<R> {
    async fn read_unit(&mut self) -> Result<Option<char>> {
        self.next_char().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect<R: AsyncRead + Unpin>(reader: &mut CharReader<R>) -> String {
        let mut out = String::new();
        while let Some(ch) = reader.next_char().await.unwrap() {
            out.push(ch);
        }
        out
    }

    #[tokio::test]
    async fn reads_ascii_then_eof() {
        let mut reader = CharReader::new(&b"hi\n"[..]);
        assert_eq!(reader.next_char().await.unwrap(), Some('h'));
        assert_eq!(reader.next_char().await.unwrap(), Some('i'));
        assert_eq!(reader.next_char().await.unwrap(), Some('\n'));
        assert_eq!(reader.next_char().await.unwrap(), None);
        assert_eq!(reader.next_char().await.unwrap(), None);
    }

    #[tokio::test]
    async fn multibyte_split_across_reads() {
        let bytes = "héllo ✓".as_bytes();
        let (head, tail) = bytes.split_at(2);
        let (mid, rest) = tail.split_at(6);
        let mock = tokio_test::io::Builder::new()
            .read(head)
            .read(mid)
            .read(rest)
            .build();
        let mut reader = CharReader::new(mock);
        assert_eq!(collect(&mut reader).await, "héllo ✓");
    }

    #[tokio::test]
    async fn invalid_bytes_become_replacement() {
        let mut reader = CharReader::new(&[b'a', 0xff, b'b'][..]);
        assert_eq!(collect(&mut reader).await, "a\u{fffd}b");
    }

    #[tokio::test]
    async fn broken_sequence_keeps_following_ascii() {
        // 0xE2 starts a three-byte sequence; 'x' interrupts it.
        let mut reader = CharReader::new(&[0xe2, b'x', b'y'][..]);
        assert_eq!(collect(&mut reader).await, "\u{fffd}xy");
    }

    #[tokio::test]
    async fn truncated_sequence_at_eof() {
        let mut reader = CharReader::new(&[b'o', b'k', 0xe2, 0x9c][..]);
        assert_eq!(collect(&mut reader).await, "ok\u{fffd}");
    }
}
