use std::fmt::Display;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{RagError, Result};
use crate::generate::ResponseShape;

/// Lazily decoded answer fragments; ends on the completion flag or when the body closes.
pub type FragmentStream = Pin<Box<dyn Stream<Item = String> + Send>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamChunk {
    pub text: String,
    pub done: bool,
}

#[derive(Deserialize)]
struct FlatChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatContent>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: String,
}

/// Decodes one stream line. A line carrying an `error` field is reported as
/// [`RagError::Backend`].
pub fn decode_line(line: &str, shape: ResponseShape) -> Result<StreamChunk> {
    let decode_err = |e: serde_json::Error| RagError::Decode(format!("stream line: {e}"));
    let (chunk, error) = match shape {
        ResponseShape::Flat => {
            let c = serde_json::from_str::<FlatChunk>(line).map_err(decode_err)?;
            (
                StreamChunk {
                    text: c.response,
                    done: c.done,
                },
                c.error,
            )
        }
        ResponseShape::Chat => {
            let c = serde_json::from_str::<ChatChunk>(line).map_err(decode_err)?;
            (
                StreamChunk {
                    text: c.message.map(|m| m.content).unwrap_or_default(),
                    done: c.done,
                },
                c.error,
            )
        }
    };
    match error {
        Some(message) => Err(RagError::Backend(message)),
        None => Ok(chunk),
    }
}

/// Turns a newline-delimited JSON byte stream into text fragments.
///
/// Bytes are only pulled from `body` when the consumer asks for the next fragment.
pub fn decode_stream<S, E>(body: S, shape: ResponseShape) -> FragmentStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    let decoder = LineDecoder {
        body,
        buf: Vec::new(),
        shape,
        finished: false,
    };
    Box::pin(stream::unfold(decoder, |mut decoder| async move {
        decoder.next_fragment().await.map(|fragment| (fragment, decoder))
    }))
}

struct LineDecoder<S> {
    body: S,
    buf: Vec<u8>,
    shape: ResponseShape,
    finished: bool,
}

impl<S, E> LineDecoder<S>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
    E: Display,
{
    async fn next_fragment(&mut self) -> Option<String> {
        loop {
            if self.finished {
                return None;
            }
            if let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = self.buf.drain(..=pos).collect();
                if let Some(fragment) = self.handle_line(&line[..pos]) {
                    return Some(fragment);
                }
                continue;
            }
            match self.body.next().await {
                Some(Ok(bytes)) => self.buf.extend_from_slice(&bytes),
                Some(Err(err)) => {
                    warn!(error = %err, "generation stream interrupted");
                    self.finished = true;
                    return None;
                }
                None => {
                    let rest = std::mem::take(&mut self.buf);
                    let fragment = self.handle_line(&rest);
                    self.finished = true;
                    return fragment;
                }
            }
        }
    }

    fn handle_line(&mut self, raw: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match decode_line(line, self.shape) {
            Ok(chunk) => {
                if chunk.done {
                    debug!("generation stream completed");
                    self.finished = true;
                }
                (!chunk.text.is_empty()).then_some(chunk.text)
            }
            Err(RagError::Backend(message)) => {
                warn!(error = %message, "backend failed mid-stream, answer is truncated");
                self.finished = true;
                None
            }
            Err(err) => {
                warn!(error = %err, line = %line, "skipping undecodable stream line");
                None
            }
        }
    }
}
