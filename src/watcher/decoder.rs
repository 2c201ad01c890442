//! Incremental decoding of concatenated JSON values.
//!
//! The daemon writes event records back to back, with or without whitespace
//! between them, and chunk boundaries fall anywhere. Bytes are buffered until
//! a complete value is available.

use std::marker::PhantomData;

use bytes::{Buf, BytesMut};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;

use crate::daemon::{DaemonError, ResponseBody};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed JSON record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Error reading stream: {0}")]
    Body(#[from] DaemonError),
}

pub struct JsonStreamDecoder<T> {
    body: ResponseBody,
    buf: BytesMut,
    eof: bool,
    _value: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> JsonStreamDecoder<T> {
    pub fn new(body: ResponseBody) -> Self {
        Self {
            body,
            buf: BytesMut::new(),
            eof: false,
            _value: PhantomData,
        }
    }

    /// Next value of the stream, `Ok(None)` once the stream ended cleanly
    /// between two values.
    pub async fn next(&mut self) -> Result<Option<T>, DecodeError> {
        let mut parse = true;
        let mut awaiting_close = false;
        loop {
            if parse {
                let parsed = {
                    let mut values =
                        serde_json::Deserializer::from_slice(&self.buf).into_iter::<T>();
                    values
                        .next()
                        .map(|value| value.map(|value| (value, values.byte_offset())))
                };

                match parsed {
                    Some(Ok((value, consumed))) => {
                        self.buf.advance(consumed);
                        return Ok(Some(value));
                    }
                    // Partial value, wait for the rest.
                    Some(Err(e)) if e.is_eof() && !self.eof => {
                        awaiting_close = starts_container(&self.buf);
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        // Only whitespace left.
                        self.buf.clear();
                        if self.eof {
                            return Ok(None);
                        }
                    }
                }
            }

            match self.body.next().await {
                Some(chunk) => {
                    let chunk = chunk?;
                    // An object or array only completes on a closing bracket,
                    // so a partial one is not re-parsed until one arrives.
                    parse = !awaiting_close || chunk.iter().any(|&b| matches!(b, b'}' | b']'));
                    self.buf.extend_from_slice(&chunk);
                }
                None => {
                    self.eof = true;
                    parse = true;
                }
            }
        }
    }
}

fn starts_container(buf: &[u8]) -> bool {
    matches!(
        buf.iter().copied().find(|b| !b.is_ascii_whitespace()),
        Some(b'{' | b'[')
    )
}
