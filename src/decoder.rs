//! Newline-delimited JSON decoding for streamed replies.
//!
//! This module turns the raw byte stream of a message submission into a
//! stream of [`StreamEvent`]s. Reads may split records anywhere, including in
//! the middle of a UTF-8 sequence, so the decoder buffers bytes and only
//! decodes lines once their terminating newline has arrived.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_MALFORMED_RECORDS, STREAM_TRUNCATED_RECORDS};
use crate::{Error, Result, StreamEvent};

/// A boxed stream of response body bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Longest record, in bytes, the decoder buffers before giving up on it.
pub const MAX_LINE_BYTES: usize = 1 << 20;

/// Bytes of an oversized record kept in its error.
const PREVIEW_BYTES: usize = 64;

/// Incremental line framer for newline-delimited JSON.
///
/// Every complete line pushed through the decoder yields at most one item:
/// blank lines yield nothing, well-formed records yield an event, and
/// undecodable records yield [`Error::MalformedRecord`]. A record longer than
/// the line limit is reported once as malformed and dropped up to its newline.
#[derive(Debug)]
pub struct LineDecoder {
    buffer: Vec<u8>,
    max_line: usize,
    discarding: bool,
}

impl LineDecoder {
    /// Creates an empty decoder limited to [`MAX_LINE_BYTES`] per record.
    pub fn new() -> Self {
        Self::with_max_line_len(MAX_LINE_BYTES)
    }

    /// Creates an empty decoder limited to `max_line` bytes per record.
    pub fn with_max_line_len(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            discarding: false,
        }
    }

    /// Appends `bytes` and decodes every line completed by them.
    ///
    /// Only `bytes` is scanned for newlines; the buffered fragment is known
    /// to hold none.
    pub fn push(&mut self, mut bytes: &[u8]) -> Vec<Result<StreamEvent>> {
        let mut items = Vec::new();
        while let Some(newline) = bytes.iter().position(|b| *b == b'\n') {
            let line = &bytes[..newline];
            bytes = &bytes[newline + 1..];
            if std::mem::take(&mut self.discarding) {
                continue;
            }
            if self.buffer.len() + line.len() > self.max_line {
                items.push(Err(self.oversized(line)));
            } else if self.buffer.is_empty() {
                items.extend(decode_line(line));
            } else {
                self.buffer.extend_from_slice(line);
                let line = std::mem::take(&mut self.buffer);
                items.extend(decode_line(&line));
            }
        }
        if self.discarding {
            return items;
        }
        if self.buffer.len() + bytes.len() > self.max_line {
            items.push(Err(self.oversized(bytes)));
            self.discarding = true;
        } else {
            self.buffer.extend_from_slice(bytes);
        }
        items
    }

    /// Drops the buffered fragment and reports the record it began as too long.
    fn oversized(&mut self, rest: &[u8]) -> Error {
        let len = self.buffer.len() + rest.len();
        let preview: Vec<u8> = self
            .buffer
            .iter()
            .chain(rest)
            .take(PREVIEW_BYTES)
            .copied()
            .collect();
        self.buffer = Vec::new();
        let preview = String::from_utf8_lossy(&preview).into_owned();
        STREAM_MALFORMED_RECORDS.click();
        tracing::warn!(
            bytes = len,
            limit = self.max_line,
            line = %preview,
            "skipping oversized record"
        );
        Error::malformed_record(
            format!("record exceeds {} bytes", self.max_line),
            preview,
            None,
        )
    }

    /// Ends decoding, discarding any unterminated trailing fragment.
    ///
    /// Returns [`Error::TruncatedRecord`] when the discarded fragment held
    /// anything other than whitespace. An oversized record cut off by the end
    /// of the stream was already reported and yields nothing more.
    pub fn finish(&mut self) -> Option<Error> {
        if std::mem::take(&mut self.discarding) {
            self.buffer.clear();
            return None;
        }
        let fragment = std::mem::take(&mut self.buffer);
        if fragment.trim_ascii().is_empty() {
            return None;
        }
        STREAM_TRUNCATED_RECORDS.click();
        tracing::warn!(
            bytes = fragment.len(),
            "discarding unterminated record at end of stream"
        );
        Some(Error::truncated_record(
            "stream ended before the final record's newline",
            fragment.len(),
        ))
    }

    /// Number of bytes waiting for a newline.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes one line (without its newline) into an event.
fn decode_line(line: &[u8]) -> Option<Result<StreamEvent>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(e) => {
            STREAM_MALFORMED_RECORDS.click();
            let lossy = String::from_utf8_lossy(line).into_owned();
            tracing::warn!(line = %lossy, "skipping record with invalid UTF-8: {e}");
            return Some(Err(Error::malformed_record(
                format!("invalid UTF-8: {e}"),
                lossy,
                Some(Box::new(e)),
            )));
        }
    };
    match serde_json::from_str::<StreamEvent>(text) {
        Ok(event) => Some(Ok(event)),
        Err(e) => {
            STREAM_MALFORMED_RECORDS.click();
            tracing::warn!(line = %text, "skipping undecodable record: {e}");
            Some(Err(Error::malformed_record(
                format!("invalid record: {e}"),
                text,
                Some(Box::new(e)),
            )))
        }
    }
}

/// Process a stream of bytes into a stream of reply events.
///
/// The returned stream is pull-based: each poll reads from `byte_stream` only
/// when no decoded event is waiting. Malformed records surface as
/// [`Error::MalformedRecord`] items and decoding continues after them. A read
/// failure surfaces once and ends the stream. At end of stream an
/// unterminated fragment surfaces as [`Error::TruncatedRecord`].
pub fn process_ndjson<S>(byte_stream: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let state = (byte_stream, LineDecoder::new(), VecDeque::new(), false);

    stream::unfold(
        state,
        |(mut stream, mut decoder, mut pending, mut finished)| async move {
            loop {
                // Drain events decoded by an earlier read first
                if let Some(item) = pending.pop_front() {
                    return Some((item, (stream, decoder, pending, finished)));
                }
                if finished {
                    return None;
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        pending.extend(decoder.push(&bytes));
                    }
                    Some(Err(e)) => {
                        finished = true;
                        return Some((Err(e), (stream, decoder, pending, finished)));
                    }
                    None => {
                        finished = true;
                        if let Some(err) = decoder.finish() {
                            return Some((Err(err), (stream, decoder, pending, finished)));
                        }
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_STREAM: &[u8] = b"{\"type\":\"chunk\",\"data\":\"Hi\"}\n{\"type\":\"chunk\",\"data\":\" there\"}\n{\"type\":\"done\",\"session_id\":\"abc123\"}\n";

    fn byte_stream(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
    }

    async fn collect(chunks: Vec<Vec<u8>>) -> Vec<Result<StreamEvent>> {
        process_ndjson(byte_stream(chunks)).collect().await
    }

    fn events(items: Vec<Result<StreamEvent>>) -> Vec<StreamEvent> {
        items.into_iter().filter_map(|item| item.ok()).collect()
    }

    #[tokio::test]
    async fn single_read() {
        let items = collect(vec![HELLO_STREAM.to_vec()]).await;
        assert_eq!(
            events(items),
            vec![
                StreamEvent::chunk("Hi"),
                StreamEvent::chunk(" there"),
                StreamEvent::done("abc123"),
            ]
        );
    }

    #[tokio::test]
    async fn every_split_point_matches_single_read() {
        let expected = events(collect(vec![HELLO_STREAM.to_vec()]).await);
        for split in 0..=HELLO_STREAM.len() {
            let (head, tail) = HELLO_STREAM.split_at(split);
            let items = collect(vec![head.to_vec(), tail.to_vec()]).await;
            assert!(items.iter().all(|item| item.is_ok()), "split at {split}");
            assert_eq!(events(items), expected, "split at {split}");
        }
    }

    #[tokio::test]
    async fn one_byte_at_a_time() {
        let expected = events(collect(vec![HELLO_STREAM.to_vec()]).await);
        let chunks = HELLO_STREAM.iter().map(|b| vec![*b]).collect();
        assert_eq!(events(collect(chunks).await), expected);
    }

    #[tokio::test]
    async fn multibyte_text_split_mid_code_point() {
        let record = "{\"type\":\"chunk\",\"data\":\"caf\u{e9} \u{1f600}\"}\n".as_bytes();
        let emoji_start = record.iter().position(|b| *b == 0xF0).unwrap();
        let items = collect(vec![
            record[..emoji_start + 2].to_vec(),
            record[emoji_start + 2..].to_vec(),
        ])
        .await;
        assert_eq!(events(items), vec![StreamEvent::chunk("caf\u{e9} \u{1f600}")]);
    }

    #[tokio::test]
    async fn blank_lines_and_crlf_are_tolerated() {
        let data = b"\n\r\n{\"type\":\"chunk\",\"data\":\"a\"}\r\n   \n{\"type\":\"done\",\"session_id\":1}\n";
        let items = collect(vec![data.to_vec()]).await;
        assert_eq!(
            events(items),
            vec![StreamEvent::chunk("a"), StreamEvent::done("1")]
        );
    }

    #[tokio::test]
    async fn malformed_line_is_skipped_and_decoding_continues() {
        let data = b"{\"type\":\"chunk\",\"data\":\"a\"}\n{not json\n{\"type\":\"chunk\",\"data\":\"b\"}\n";
        let items = collect(vec![data.to_vec()]).await;
        assert_eq!(items.len(), 3);
        assert!(matches!(
            &items[1],
            Err(Error::MalformedRecord { line, .. }) if line == "{not json"
        ));
        assert_eq!(
            events(items),
            vec![StreamEvent::chunk("a"), StreamEvent::chunk("b")]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_malformed() {
        let items = collect(vec![b"\xff\xfe\n{\"type\":\"chunk\",\"data\":\"ok\"}\n".to_vec()]).await;
        assert!(matches!(&items[0], Err(Error::MalformedRecord { .. })));
        assert_eq!(events(items), vec![StreamEvent::chunk("ok")]);
    }

    #[tokio::test]
    async fn unknown_type_passes_through_as_unknown() {
        let items = collect(vec![b"{\"type\":\"heartbeat\"}\n".to_vec()]).await;
        assert_eq!(events(items), vec![StreamEvent::Unknown]);
    }

    #[tokio::test]
    async fn unterminated_tail_is_discarded_and_reported() {
        let data = b"{\"type\":\"chunk\",\"data\":\"a\"}\n{\"type\":\"done\",\"session_id\":\"s1\"}";
        let items = collect(vec![data.to_vec()]).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Ok(StreamEvent::Chunk { .. })));
        assert!(matches!(
            items[1],
            Err(Error::TruncatedRecord { bytes, .. }) if bytes == 33
        ));
    }

    #[tokio::test]
    async fn whitespace_tail_is_dropped_silently() {
        let items = collect(vec![b"{\"type\":\"chunk\",\"data\":\"a\"}\n  \r".to_vec()]).await;
        assert_eq!(items.len(), 1);
        assert!(items[0].is_ok());
    }

    #[tokio::test]
    async fn read_failure_ends_the_stream() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"{\"type\":\"chunk\",\"data\":\"par")),
            Ok(Bytes::from_static(b"tial\"}\n{\"type\":\"chu")),
            Err(Error::streaming("connection reset", None)),
            Ok(Bytes::from_static(b"nk\",\"data\":\"never\"}\n")),
        ];
        let items: Vec<_> = process_ndjson(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().ok(), Some(&StreamEvent::chunk("partial")));
        assert!(matches!(items[1], Err(Error::Streaming { .. })));
    }

    #[test]
    fn line_decoder_retains_fragment() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"{\"type\":\"chunk\"").is_empty());
        assert_eq!(decoder.buffered_len(), 15);
        let items = decoder.push(b",\"data\":\"x\"}\n{\"ty");
        assert_eq!(items.len(), 1);
        assert_eq!(decoder.buffered_len(), 4);
        assert!(decoder.finish().is_some());
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn oversized_line_is_reported_and_decoding_resumes() {
        let mut decoder = LineDecoder::with_max_line_len(32);
        let long = format!("{{\"type\":\"chunk\",\"data\":\"{}\"}}\n", "x".repeat(40));
        let data = format!("{long}{{\"type\":\"chunk\",\"data\":\"ok\"}}\n");
        let items = decoder.push(data.as_bytes());
        assert_eq!(items.len(), 2);
        assert!(matches!(
            &items[0],
            Err(Error::MalformedRecord { message, line, .. })
                if message == "record exceeds 32 bytes" && line.starts_with("{\"type\"")
        ));
        assert_eq!(items[1].as_ref().ok(), Some(&StreamEvent::chunk("ok")));
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn oversized_line_across_reads_is_reported_once() {
        let mut decoder = LineDecoder::with_max_line_len(16);
        let mut errors = 0;
        let mut events = Vec::new();
        for _ in 0..10 {
            for item in decoder.push(b"xxxxxxxx") {
                assert!(matches!(item, Err(Error::MalformedRecord { .. })));
                errors += 1;
            }
            assert!(decoder.buffered_len() <= 16);
        }
        for item in decoder.push(b"xx\n{\"type\":\"done\",\"session_id\":7}\n") {
            events.push(item.unwrap());
        }
        assert_eq!(errors, 1);
        assert_eq!(events, vec![StreamEvent::done("7")]);
    }

    #[test]
    fn oversized_tail_at_end_of_stream_is_not_reported_twice() {
        let mut decoder = LineDecoder::with_max_line_len(4);
        let items = decoder.push(b"abcdefgh");
        assert_eq!(items.len(), 1);
        assert!(decoder.finish().is_none());
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn line_at_the_limit_is_decoded() {
        let record = b"{\"type\":\"chunk\",\"data\":\"a\"}";
        let mut decoder = LineDecoder::with_max_line_len(record.len());
        assert!(decoder.push(&record[..10]).is_empty());
        let items = decoder.push(&[&record[10..], b"\n".as_slice()].concat());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().ok(), Some(&StreamEvent::chunk("a")));
    }
}
