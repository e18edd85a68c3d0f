//! Sentinel-delimited response framing.
//!
//! In interactive mode the engine prints the next turn's role label once it
//! has finished generating, and only then waits for input. That label is the
//! only end-of-response signal the engine gives, so the parser treats it as
//! the frame boundary. Generated text that happens to contain the label
//! verbatim ends the response early; anchoring the sentinel to the start of
//! a line narrows that window but cannot close it.

use tokio_util::sync::CancellationToken;

use crate::engine::UnitSource;
use crate::error::{Error, Result};
use crate::observability::{
    STREAM_DISCARDED_UNITS, STREAM_INTERRUPTS, STREAM_TERMINATIONS, STREAM_UNITS,
};
use crate::render::Renderer;

/// The label the engine prints when it is ready for the next user turn.
pub const DEFAULT_SENTINEL: &str = "User: ";

/// Reads one response at a time from a [`UnitSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStream {
    sentinel: String,
    anchored: bool,
}

impl ResponseStream {
    /// Creates a parser for the default `"User: "` sentinel.
    pub fn new() -> Self {
        Self::with_sentinel(DEFAULT_SENTINEL)
    }

    /// Creates a parser for a custom sentinel.
    ///
    /// # Panics
    ///
    /// Panics if `sentinel` is empty.
    pub fn with_sentinel(sentinel: impl Into<String>) -> Self {
        let sentinel = sentinel.into();
        assert!(!sentinel.is_empty(), "sentinel must not be empty");
        Self {
            sentinel,
            anchored: false,
        }
    }

    /// Only accept the sentinel at the start of the output or after a newline.
    pub fn anchored(mut self, anchored: bool) -> Self {
        self.anchored = anchored;
        self
    }

    /// Returns the sentinel.
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Returns whether the sentinel must start a line.
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    /// Reads units until the sentinel, echoing them to `renderer`.
    ///
    /// Returns the response with the sentinel removed and surrounding
    /// whitespace trimmed. No unit past the sentinel is read. Units that
    /// could still turn out to be the start of the sentinel are held back
    /// from the renderer until that is decided, so the sentinel itself is
    /// never echoed.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamTerminated`] if the source closes first.
    /// - [`Error::Abort`] if `cancel` fires; checked before every unit.
    pub async fn read_response<S: UnitSource + ?Sized>(
        &self,
        source: &mut S,
        renderer: &mut dyn Renderer,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut buffer = String::new();
        let mut echoed = 0;
        loop {
            let unit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    STREAM_INTERRUPTS.click();
                    return Err(Error::abort("response interrupted"));
                }
                unit = source.read_unit() => unit?,
            };
            let Some(ch) = unit else {
                STREAM_TERMINATIONS.click();
                if echoed < buffer.len() {
                    renderer.print_text(&buffer[echoed..]);
                }
                return Err(Error::stream_terminated(
                    "engine closed its output before finishing the response",
                ));
            };
            STREAM_UNITS.click();
            buffer.push(ch);

            if self.is_complete(&buffer) {
                buffer.truncate(buffer.len() - self.sentinel.len());
                if echoed < buffer.len() {
                    renderer.print_text(&buffer[echoed..]);
                }
                return Ok(buffer.trim().to_string());
            }

            let safe = buffer.len() - self.held_back(&buffer);
            if safe > echoed {
                renderer.print_text(&buffer[echoed..safe]);
                echoed = safe;
            }
        }
    }

    /// Discards output left over from an interrupted response.
    ///
    /// Reads until the sentinel closing that response has been consumed, no
    /// matter how long the engine pauses, so the next prompt is never paired
    /// with a stale answer. Returns the number of units discarded.
    ///
    /// # Errors
    ///
    /// - [`Error::StreamTerminated`] if the source closes first.
    /// - [`Error::Abort`] if `cancel` fires; the drain must then be retried.
    pub async fn discard_pending<S: UnitSource + ?Sized>(
        &self,
        source: &mut S,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut tail = String::new();
        let mut discarded = 0;
        loop {
            let unit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    STREAM_INTERRUPTS.click();
                    return Err(Error::abort("resynchronization interrupted"));
                }
                unit = source.read_unit() => unit?,
            };
            let Some(ch) = unit else {
                STREAM_TERMINATIONS.click();
                return Err(Error::stream_terminated(
                    "engine closed its output while discarding an interrupted response",
                ));
            };
            discarded += 1;
            STREAM_DISCARDED_UNITS.click();
            tail.push(ch);
            if self.is_complete(&tail) {
                break;
            }
            let keep = self.sentinel.len() + 1;
            if tail.len() > keep * 4 {
                let mut cut = tail.len() - keep;
                while !tail.is_char_boundary(cut) {
                    cut -= 1;
                }
                tail.drain(..cut);
            }
        }
        tracing::debug!(discarded, "discarded leftover engine output");
        Ok(discarded)
    }

    fn is_complete(&self, buffer: &str) -> bool {
        let Some(prefix) = buffer.strip_suffix(self.sentinel.as_str()) else {
            return false;
        };
        !self.anchored || prefix.is_empty() || prefix.ends_with('\n')
    }

    /// Length of the longest proper prefix of the sentinel that ends `buffer`.
    fn held_back(&self, buffer: &str) -> usize {
        (1..self.sentinel.len())
            .rev()
            .filter(|&len| self.sentinel.is_char_boundary(len))
            .find(|&len| buffer.ends_with(&self.sentinel[..len]))
            .unwrap_or(0)
    }
}

impl Default for ResponseStream {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::engine::CharReader;

    #[derive(Default)]
    struct Capture {
        text: Vec<String>,
    }

    impl Renderer for Capture {
        fn print_text(&mut self, text: &str) {
            self.text.push(text.to_string());
        }
        fn finish_response(&mut self) {}
        fn print_error(&mut self, _: &str) {}
        fn print_info(&mut self, _: &str) {}
    }

    impl Capture {
        fn echoed(&self) -> String {
            self.text.concat()
        }
    }

    #[tokio::test]
    async fn strips_sentinel_and_stops() {
        let mut source = CharReader::new(&b"Hello there\nUser: unread"[..]);
        let mut capture = Capture::default();
        let response = ResponseStream::new()
            .read_response(&mut source, &mut capture, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, "Hello there");
        assert_eq!(capture.echoed(), "Hello there\n");
        assert_eq!(source.into_inner(), b"unread");
    }

    #[tokio::test]
    async fn trims_surrounding_whitespace() {
        let mut source = CharReader::new(&b"  \n Sure thing. \n\nUser: "[..]);
        let response = ResponseStream::new()
            .read_response(&mut source, &mut Capture::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, "Sure thing.");
    }

    #[tokio::test]
    async fn partial_sentinel_is_echoed_once_disproved() {
        let mut source = CharReader::new(&b"Use Users: wisely\nUser: "[..]);
        let mut capture = Capture::default();
        let response = ResponseStream::new()
            .read_response(&mut source, &mut capture, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, "Use Users: wisely");
        assert_eq!(capture.echoed(), "Use Users: wisely\n");
    }

    #[tokio::test]
    async fn echo_streams_before_completion() {
        let mock = tokio_test::io::Builder::new()
            .read(b"abc")
            .read(b"def\nUser: ")
            .build();
        let mut source = CharReader::new(mock);
        let mut capture = Capture::default();
        ResponseStream::new()
            .read_response(&mut source, &mut capture, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(capture.text.first().map(String::as_str), Some("a"));
        assert_eq!(capture.echoed(), "abcdef\n");
    }

    #[tokio::test]
    async fn unanchored_sentinel_matches_mid_line() {
        // Accepted limitation: the sentinel inside generated text ends the turn.
        let mut source = CharReader::new(&b"Label User: rest\nUser: "[..]);
        let response = ResponseStream::new()
            .read_response(&mut source, &mut Capture::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, "Label");
    }

    #[tokio::test]
    async fn anchored_sentinel_requires_line_start() {
        let mut source = CharReader::new(&b"Label User: rest\nUser: "[..]);
        let mut capture = Capture::default();
        let response = ResponseStream::new()
            .anchored(true)
            .read_response(&mut source, &mut capture, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response, "Label User: rest");
        assert_eq!(capture.echoed(), "Label User: rest\n");
    }

    #[tokio::test]
    async fn early_eof_is_stream_termination() {
        let mut source = CharReader::new(&b"half an answ"[..]);
        let mut capture = Capture::default();
        let err = ResponseStream::new()
            .read_response(&mut source, &mut capture, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_stream_terminated());
        assert_eq!(capture.echoed(), "half an answ");
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_reading() {
        let mut source = CharReader::new(&b"Hello\nUser: "[..]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = ResponseStream::new()
            .read_response(&mut source, &mut Capture::default(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_abort());
        assert_eq!(source.into_inner(), b"Hello\nUser: ");
    }

    #[tokio::test]
    async fn cancel_interrupts_a_stalled_read() {
        let (client, _server) = tokio::io::duplex(64);
        let mut source = CharReader::new(client);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = ResponseStream::new()
            .read_response(&mut source, &mut Capture::default(), &cancel)
            .await
            .unwrap_err();
        assert!(err.is_abort());
    }

    #[tokio::test]
    async fn discard_stops_at_sentinel() {
        let mut source = CharReader::new(&b"rest of an old answer\nUser: next"[..]);
        let discarded = ResponseStream::new()
            .discard_pending(&mut source, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(discarded, "rest of an old answer\nUser: ".len());
        assert_eq!(source.into_inner(), b"next");
    }

    #[tokio::test]
    async fn discard_waits_through_a_silent_engine() {
        let (client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            tokio::io::AsyncWriteExt::write_all(&mut server, b"late answer\nUser: ")
                .await
                .unwrap();
            server
        });
        let mut source = CharReader::new(client);
        let discarded = ResponseStream::new()
            .discard_pending(&mut source, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(discarded, "late answer\nUser: ".len());
    }

    #[tokio::test]
    async fn discard_reports_closed_engine() {
        let mut source = CharReader::new(&b"trailing"[..]);
        let err = ResponseStream::new()
            .discard_pending(&mut source, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_stream_terminated());
    }

    #[tokio::test]
    async fn discard_is_interruptible() {
        let (client, _server) = tokio::io::duplex(64);
        let mut source = CharReader::new(client);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let err = ResponseStream::new()
            .discard_pending(&mut source, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_abort());
    }

    #[test]
    fn held_back_tracks_sentinel_prefix() {
        let stream = ResponseStream::new();
        assert_eq!(stream.held_back("abc"), 0);
        assert_eq!(stream.held_back("abc\nU"), 1);
        assert_eq!(stream.held_back("abc\nUser:"), 5);
        assert_eq!(stream.held_back("UU"), 1);
    }
}
