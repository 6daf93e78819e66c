use std::collections::VecDeque;
use std::fmt::Display;

use encoding_rs::{Decoder, UTF_8};
use folio_core::ProgressMessage;
use folio_logging::{folio_debug, folio_warn};
use futures_util::{Stream, StreamExt};

const RECORD_TERMINATOR: &str = "\n\n";
const DATA_PREFIX: &str = "data:";

/// Incremental splitter for a server-sent event body.
///
/// Network chunks are appended to an internal buffer; only segments closed by a
/// blank line are returned, so a record split across reads is held back until
/// its terminator arrives. Multi-byte characters split across chunks are
/// reassembled by the streaming UTF-8 decoder.
pub struct SseDecoder {
    text: Decoder,
    buffer: String,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self {
            text: UTF_8.new_decoder_without_bom_handling(),
            buffer: String::new(),
        }
    }

    /// Feeds one chunk and returns the payloads of every record it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk, false);
        self.drain_records()
    }

    /// Flushes the decoder at end of stream. Returns any unterminated tail,
    /// which is never treated as a record.
    pub fn finish(&mut self) -> Option<String> {
        self.decode(&[], true);
        let tail = std::mem::take(&mut self.buffer);
        if tail.trim().is_empty() {
            None
        } else {
            Some(tail)
        }
    }

    fn decode(&mut self, chunk: &[u8], last: bool) {
        let needed = self
            .text
            .max_utf8_buffer_length(chunk.len())
            .unwrap_or(chunk.len() * 3 + 4);
        self.buffer.reserve(needed);
        let (_, _, had_errors) = self.text.decode_to_string(chunk, &mut self.buffer, last);
        if had_errors {
            folio_debug!("Replaced malformed UTF-8 in progress stream");
        }
        if self.buffer.contains('\r') {
            // A trailing '\r' may still pair with the next chunk's '\n'.
            let keep_cr = !last && self.buffer.ends_with('\r');
            let mut normalized = self.buffer.replace("\r\n", "\n");
            if keep_cr {
                normalized.pop();
            }
            normalized = normalized.replace('\r', "\n");
            if keep_cr {
                normalized.push('\r');
            }
            self.buffer = normalized;
        }
    }

    fn drain_records(&mut self) -> Vec<String> {
        let mut records = Vec::new();
        while let Some(end) = self.buffer.find(RECORD_TERMINATOR) {
            let segment: String = self.buffer.drain(..end + RECORD_TERMINATOR.len()).collect();
            if let Some(payload) = record_payload(&segment[..end]) {
                records.push(payload);
            }
        }
        records
    }
}

/// Joins the `data:` lines of one segment. Comment and other field lines are
/// framing and carry no payload.
fn record_payload(segment: &str) -> Option<String> {
    let mut data_lines = segment.lines().filter_map(|line| {
        line.strip_prefix(DATA_PREFIX)
            .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
    });
    let first = data_lines.next()?;
    let mut payload = first.to_string();
    for line in data_lines {
        payload.push('\n');
        payload.push_str(line);
    }
    Some(payload)
}

/// Parses a record payload; a malformed record is logged and skipped.
pub fn parse_record(payload: &str) -> Option<ProgressMessage> {
    match serde_json::from_str(payload) {
        Ok(message) => Some(message),
        Err(err) => {
            folio_warn!(
                "Skipping malformed progress record ({}): {:.120}",
                err,
                payload
            );
            None
        }
    }
}

/// Pulls decoded progress messages out of a chunked response body.
///
/// One reader per stream; it is exhausted once the body ends.
pub struct ProgressReader<S> {
    body: S,
    decoder: SseDecoder,
    ready: VecDeque<ProgressMessage>,
    ended: bool,
}

impl<S, B, E> ProgressReader<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    pub fn new(body: S) -> Self {
        Self {
            body,
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            ended: false,
        }
    }

    /// Next message in arrival order; `None` once the transport closed.
    pub async fn next_message(&mut self) -> Option<Result<ProgressMessage, E>> {
        loop {
            if let Some(message) = self.ready.pop_front() {
                return Some(Ok(message));
            }
            if self.ended {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => {
                    let parsed = self
                        .decoder
                        .push(chunk.as_ref())
                        .into_iter()
                        .filter_map(|payload| parse_record(&payload));
                    self.ready.extend(parsed);
                }
                Some(Err(err)) => {
                    self.ended = true;
                    return Some(Err(err));
                }
                None => {
                    self.ended = true;
                    if let Some(tail) = self.decoder.finish() {
                        folio_debug!(
                            "Discarding {} bytes of unterminated progress record",
                            tail.len()
                        );
                    }
                }
            }
        }
    }
}
