//! Applying decoded reply events to a transcript.
//!
//! A [`PendingStream`] exists for exactly one submission. It owns the handle
//! to the assistant entry being written, remembers which session identity is
//! bound, and turns each event into transcript and renderer updates.

use crate::Error;
use crate::observability::{SESSION_IDENTITY_MISMATCHES, STREAM_EVENTS};
use crate::render::Renderer;
use crate::transcript::{OpenEntry, Transcript};
use crate::types::{SessionId, StreamEvent};

/// Summary of one consumed reply.
#[derive(Debug, Clone, Default)]
pub struct ReplyOutcome {
    /// The identity bound by this reply, if the transcript was unbound.
    pub bound_session: Option<SessionId>,
    /// Whether a `done` record arrived.
    pub completed: bool,
    /// Number of chunk records applied.
    pub chunks: usize,
    /// Length in bytes of the assistant text this reply produced.
    pub text_len: usize,
    /// Non-fatal problems met while decoding.
    pub diagnostics: Vec<Error>,
}

/// Per-request state of a reply being streamed in.
#[derive(Debug)]
pub struct PendingStream {
    entry: Option<OpenEntry>,
    bound: Option<SessionId>,
    outcome: ReplyOutcome,
}

impl PendingStream {
    /// Starts a reply for a transcript bound to `bound`, if any.
    pub fn new(bound: Option<SessionId>) -> Self {
        Self {
            entry: None,
            bound,
            outcome: ReplyOutcome::default(),
        }
    }

    /// Applies one event.
    ///
    /// Returns the session identity to bind when this is the first `done`
    /// seen by an unbound transcript.
    pub fn apply(
        &mut self,
        event: StreamEvent,
        transcript: &mut Transcript,
        renderer: &mut dyn Renderer,
    ) -> Option<SessionId> {
        STREAM_EVENTS.click();
        match event {
            StreamEvent::Chunk { data } => {
                let entry = self.open_entry(transcript, renderer);
                let text = transcript.extend(entry, &data);
                self.outcome.text_len = text.len();
                self.outcome.chunks += 1;
                renderer.print_text(&data);
                None
            }
            StreamEvent::Done { session_id } => {
                self.outcome.completed = true;
                // A reply without chunks still leaves one (empty) assistant entry.
                self.open_entry(transcript, renderer);
                if let Some(bound) = &self.bound {
                    if *bound != session_id {
                        SESSION_IDENTITY_MISMATCHES.click();
                        tracing::warn!(
                            bound = %bound,
                            received = %session_id,
                            "ignoring session identity that differs from the bound one"
                        );
                    }
                    return None;
                }
                self.bound = Some(session_id.clone());
                self.outcome.bound_session = Some(session_id.clone());
                Some(session_id)
            }
            StreamEvent::Unknown => {
                tracing::debug!("ignoring unknown reply record");
                None
            }
        }
    }

    /// Records a non-fatal decoding problem.
    pub fn note(&mut self, diagnostic: Error) {
        self.outcome.diagnostics.push(diagnostic);
    }

    /// Returns true once the assistant entry exists.
    pub fn has_open_entry(&self) -> bool {
        self.entry.is_some()
    }

    /// Ends the reply, releasing the assistant entry.
    pub fn finish(self) -> ReplyOutcome {
        self.outcome
    }

    fn open_entry(
        &mut self,
        transcript: &mut Transcript,
        renderer: &mut dyn Renderer,
    ) -> &OpenEntry {
        self.entry.get_or_insert_with(|| {
            renderer.start_reply();
            transcript.open_assistant()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    #[derive(Default)]
    struct Recorder {
        starts: usize,
        texts: Vec<String>,
    }

    impl Renderer for Recorder {
        fn start_reply(&mut self) {
            self.starts += 1;
        }

        fn print_text(&mut self, text: &str) {
            self.texts.push(text.to_string());
        }

        fn print_error(&mut self, _: &str) {}

        fn print_info(&mut self, _: &str) {}

        fn finish_response(&mut self) {}
    }

    #[test]
    fn chunks_concatenate_into_one_entry() {
        let mut transcript = Transcript::new();
        transcript.push_user("Hello");
        let mut renderer = Recorder::default();
        let mut pending = PendingStream::new(None);

        let texts = ["t1", "t2", "", "t3"];
        for (i, text) in texts.iter().enumerate() {
            assert_eq!(
                pending.apply(StreamEvent::chunk(*text), &mut transcript, &mut renderer),
                None
            );
            assert!(pending.has_open_entry());
            assert_eq!(transcript.len(), 2, "after chunk {i}");
        }
        let bound = pending.apply(StreamEvent::done("s1"), &mut transcript, &mut renderer);
        assert_eq!(bound, Some(SessionId::new("s1")));

        let outcome = pending.finish();
        assert_eq!(transcript.entries()[1].role, MessageRole::Assistant);
        assert_eq!(transcript.entries()[1].text, "t1t2t3");
        assert_eq!(renderer.starts, 1);
        assert_eq!(renderer.texts, vec!["t1", "t2", "", "t3"]);
        assert_eq!(outcome.chunks, 4);
        assert_eq!(outcome.text_len, 6);
        assert!(outcome.completed);
    }

    #[test]
    fn entry_is_not_created_before_first_chunk() {
        let mut transcript = Transcript::new();
        let mut renderer = Recorder::default();
        let mut pending = PendingStream::new(None);
        pending.apply(StreamEvent::Unknown, &mut transcript, &mut renderer);
        assert!(!pending.has_open_entry());
        assert!(transcript.is_empty());
        pending.apply(StreamEvent::chunk("x"), &mut transcript, &mut renderer);
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn done_without_chunks_leaves_empty_entry() {
        let mut transcript = Transcript::new();
        let mut renderer = Recorder::default();
        let mut pending = PendingStream::new(Some(SessionId::new("s1")));
        assert_eq!(
            pending.apply(StreamEvent::done("s1"), &mut transcript, &mut renderer),
            None
        );
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.entries()[0].text, "");
        assert!(pending.finish().completed);
    }

    #[test]
    fn second_done_with_other_id_does_not_rebind() {
        let mut transcript = Transcript::new();
        let mut renderer = Recorder::default();
        let mut pending = PendingStream::new(None);
        assert_eq!(
            pending.apply(StreamEvent::done("s1"), &mut transcript, &mut renderer),
            Some(SessionId::new("s1"))
        );
        assert_eq!(
            pending.apply(StreamEvent::done("s2"), &mut transcript, &mut renderer),
            None
        );
        let outcome = pending.finish();
        assert_eq!(outcome.bound_session, Some(SessionId::new("s1")));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn bound_transcript_ignores_done_identity() {
        let mut transcript = Transcript::new();
        let mut renderer = Recorder::default();
        let mut pending = PendingStream::new(Some(SessionId::new("s1")));
        pending.apply(StreamEvent::chunk("a"), &mut transcript, &mut renderer);
        assert_eq!(
            pending.apply(StreamEvent::done("other"), &mut transcript, &mut renderer),
            None
        );
        assert_eq!(pending.finish().bound_session, None);
    }
}
