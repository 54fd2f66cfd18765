//! SSE parser for streaming chat completions.
//!
//! Converts a raw byte stream into text deltas. Handles `data:` lines,
//! `data: [DONE]`, blank separator lines, and lines split across network
//! packets.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::stream::Stream;

use super::LlmError;

/// Raw streaming chunk shape shared by OpenAI-compatible providers.
#[derive(Debug, serde::Deserialize)]
struct StreamChunkRaw {
    choices: Vec<StreamChoiceRaw>,
}

#[derive(Debug, serde::Deserialize)]
struct StreamChoiceRaw {
    delta: DeltaRaw,
}

#[derive(Debug, serde::Deserialize)]
struct DeltaRaw {
    #[serde(default)]
    content: Option<String>,
}

/// Adapter from raw SSE bytes to assistant text deltas. `data: [DONE]` ends
/// the stream.
///
/// Packets are accumulated as bytes and decoded one `\n`-terminated line at
/// a time, so a multi-byte UTF-8 character split across packets is
/// reassembled before decoding rather than rejected.
pub struct SseTokenStream {
    inner: Pin<Box<dyn Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send>>,
    buffer: BytesMut,
    done: bool,
}

impl SseTokenStream {
    pub fn new(
        byte_stream: impl Stream<Item = std::result::Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: BytesMut::new(),
            done: false,
        }
    }
}

impl Stream for SseTokenStream {
    type Item = super::Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        loop {
            match try_parse_line(&mut this.buffer) {
                Some(ParsedLine::Delta(delta)) => return Poll::Ready(Some(Ok(delta))),
                Some(ParsedLine::Done) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Some(ParsedLine::Invalid(e)) => return Poll::Ready(Some(Err(e))),
                None => {}
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(LlmError::Network(e.to_string()))));
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

enum ParsedLine {
    Delta(String),
    Done,
    Invalid(LlmError),
}

/// Extract and parse the next complete SSE line, if one is buffered.
/// Splitting at `\n` is UTF-8 safe (it is never a continuation byte), so a
/// complete line either decodes cleanly or is genuinely invalid.
fn try_parse_line(buffer: &mut BytesMut) -> Option<ParsedLine> {
    loop {
        let newline_pos = buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes = buffer.split_to(newline_pos + 1);

        let line = match std::str::from_utf8(&line_bytes[..newline_pos]) {
            Ok(line) => line.trim(),
            Err(e) => {
                return Some(ParsedLine::Invalid(LlmError::Parse(format!(
                    "invalid UTF-8 in stream: {}",
                    e
                ))));
            }
        };

        // blank lines separate SSE events
        if line.is_empty() {
            continue;
        }

        if let Some(data) = line.strip_prefix("data: ") {
            let data = data.trim();
            if data == "[DONE]" {
                return Some(ParsedLine::Done);
            }

            match serde_json::from_str::<StreamChunkRaw>(data) {
                Ok(raw) => {
                    let delta = raw
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content)
                        .unwrap_or_default();
                    return Some(ParsedLine::Delta(delta));
                }
                Err(e) => {
                    return Some(ParsedLine::Invalid(LlmError::Parse(format!(
                        "failed to parse stream chunk: {} (data: {})",
                        e,
                        &data[..data.len().min(200)]
                    ))));
                }
            }
        }

        // skip non-data lines ("event:", "id:", "retry:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn sse_bytes(lines: &[&str]) -> Vec<std::result::Result<Bytes, reqwest::Error>> {
        lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{}\n", line))))
            .collect()
    }

    #[tokio::test]
    async fn test_parse_tokens_until_done() {
        let data = sse_bytes(&[
            r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#,
            "",
            r#"data: {"choices":[{"delta":{"content":" world"}}]}"#,
            "",
            "data: [DONE]",
        ]);

        let mut stream = SseTokenStream::new(futures_util::stream::iter(data));
        assert_eq!(stream.next().await.unwrap().unwrap(), "Hello");
        assert_eq!(stream.next().await.unwrap().unwrap(), " world");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_line_split_across_packets() {
        let data = vec![
            Ok(Bytes::from(r#"data: {"choices":[{"del"#)),
            Ok(Bytes::from(
                "ta\":{\"content\":\"joined\"}}]}\n\ndata: [DONE]\n",
            )),
        ];

        let mut stream = SseTokenStream::new(futures_util::stream::iter(data));
        assert_eq!(stream.next().await.unwrap().unwrap(), "joined");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_packets() {
        // "π" is 0xCF 0x80; cut between its two bytes
        let raw = "data: {\"choices\":[{\"delta\":{\"content\":\"2\u{3c0}r\"}}]}\n\ndata: [DONE]\n"
            .as_bytes()
            .to_vec();
        let cut = raw.iter().position(|&b| b == 0xCF).unwrap() + 1;
        let data = vec![
            Ok(Bytes::copy_from_slice(&raw[..cut])),
            Ok(Bytes::copy_from_slice(&raw[cut..])),
        ];

        let mut stream = SseTokenStream::new(futures_util::stream::iter(data));
        assert_eq!(stream.next().await.unwrap().unwrap(), "2\u{3c0}r");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_delta_yields_empty_string() {
        let data = sse_bytes(&[r#"data: {"choices":[{"delta":{}}]}"#, "", "data: [DONE]"]);

        let mut stream = SseTokenStream::new(futures_util::stream::iter(data));
        assert_eq!(stream.next().await.unwrap().unwrap(), "");
        assert!(stream.next().await.is_none());
    }
}
