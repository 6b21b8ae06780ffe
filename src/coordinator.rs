//! Session lifecycle and reply consumption.
//!
//! The [`SessionCoordinator`] owns everything the terminal shows: the
//! transcript of the conversation being viewed, its session binding, the
//! sidebar and the menu. Renderers only ever see projections of this state.
//!
//! Rename and delete are split into a synchronous `begin_*` half that updates
//! local state and a `finish_*` half that applies the service's answer, so a
//! caller can keep several of them in flight; whichever finishes last wins.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::backend::ChatBackend;
use crate::decoder::process_ndjson;
use crate::error::{Error, Result};
use crate::menu::{MenuAction, MenuCommand, MenuState};
use crate::observability::{
    SESSION_BINDS, SESSION_DELETE_ERRORS, SESSION_DELETES, SESSION_EXPORTS,
    SESSION_RENAME_ROLLBACKS, SESSION_RENAMES, STREAM_ABORTS, STREAM_DURATION, STREAM_ERRORS,
};
use crate::render::{Renderer, SidebarView};
use crate::reply::{PendingStream, ReplyOutcome};
use crate::session_list::{SessionEntry, SessionList};
use crate::transcript::Transcript;
use crate::types::{
    ChatRequest, DeleteOutcome, ExportFormat, RenameRequest, SessionId, SessionRecord,
};

/// Title label of a conversation that has no session yet.
pub const NEW_CHAT_TITLE: &str = "New chat";

/// Longest title the service accepts, in characters.
pub const MAX_TITLE_CHARS: usize = 50;

/// Whether the viewed transcript belongs to a saved session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionBinding {
    /// No reply has completed yet.
    #[default]
    Unbound,
    /// Replies are stored under this session.
    Bound(SessionId),
}

impl SessionBinding {
    /// The bound session, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            SessionBinding::Bound(id) => Some(id),
            SessionBinding::Unbound => None,
        }
    }

    /// Returns true once a session is bound.
    pub fn is_bound(&self) -> bool {
        matches!(self, SessionBinding::Bound(_))
    }
}

/// Cancels the reply currently streaming in, from any thread.
///
/// Cloned handles share the same slot. Aborting when nothing is in flight
/// does nothing.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    token: Arc<Mutex<Option<CancellationToken>>>,
}

impl AbortHandle {
    /// Aborts the in-flight reply. Returns false if there was none.
    pub fn abort(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns true while a reply is in flight.
    pub fn is_active(&self) -> bool {
        self.slot().is_some()
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.slot() = Some(token.clone());
        token
    }

    fn disarm(&self) {
        self.slot().take();
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        match self.token.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Asks the user to confirm a destructive action.
pub trait Confirm {
    /// Shows `prompt` and returns the user's answer.
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Result of a rename request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The service accepted the new title.
    Renamed,
    /// The title was already current; nothing was sent.
    Unchanged,
}

/// A rename shown optimistically and awaiting the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRename {
    id: SessionId,
    title: String,
}

impl PendingRename {
    /// The session being renamed.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The requested title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The body to send to the service.
    pub fn request(&self) -> RenameRequest {
        RenameRequest::new(self.title.clone())
    }
}

/// A confirmed delete awaiting the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    id: SessionId,
}

impl PendingDelete {
    /// The session being deleted.
    pub fn id(&self) -> &SessionId {
        &self.id
    }
}

/// The file name a session export is saved under.
pub fn export_file_name(id: &SessionId, format: ExportFormat) -> String {
    let stem: String = id
        .as_str()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    format!("chat-session-{stem}.{}", format.extension())
}

/// The prompt shown before deleting a session.
pub fn delete_prompt(entry: &SessionEntry) -> String {
    format!(
        "Are you sure you want to delete the session:\n\n\"{}\" (ID: {})\n\nThis action cannot be undone.",
        entry.display_title(),
        entry.id
    )
}

/// Drives one chat view against a [`ChatBackend`].
pub struct SessionCoordinator<B: ChatBackend> {
    backend: B,
    binding: SessionBinding,
    transcript: Transcript,
    sessions: SessionList,
    menu: MenuState,
    abort: AbortHandle,
    export_dir: PathBuf,
}

impl<B: ChatBackend> SessionCoordinator<B> {
    /// Creates a coordinator showing a new, unbound conversation.
    ///
    /// Exports are written to the current directory.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            binding: SessionBinding::Unbound,
            transcript: Transcript::new(),
            sessions: SessionList::new(),
            menu: MenuState::Closed,
            abort: AbortHandle::default(),
            export_dir: PathBuf::from("."),
        }
    }

    /// Writes exports to `dir` instead of the current directory.
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// The backend requests go to.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The binding of the viewed transcript.
    pub fn binding(&self) -> &SessionBinding {
        &self.binding
    }

    /// The viewed transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The sidebar.
    pub fn sessions(&self) -> &SessionList {
        &self.sessions
    }

    /// The menu state.
    pub fn menu(&self) -> &MenuState {
        &self.menu
    }

    /// The directory exports are written to.
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// A handle that aborts the reply streaming in.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// The title label of the viewed conversation.
    pub fn current_title(&self) -> &str {
        match &self.binding {
            SessionBinding::Bound(id) => self
                .sessions
                .get(id)
                .map(SessionEntry::display_title)
                .unwrap_or(id.as_str()),
            SessionBinding::Unbound => NEW_CHAT_TITLE,
        }
    }

    /// The state the sidebar is drawn from.
    pub fn sidebar(&self) -> SidebarView<'_> {
        SidebarView {
            sessions: &self.sessions,
            current: self.binding.session_id(),
            menu: &self.menu,
        }
    }

    /// The session menu actions apply to: the one whose menu is open, else
    /// the one being viewed.
    pub fn menu_target(&self) -> Option<&SessionId> {
        self.menu
            .open_session()
            .or_else(|| self.binding.session_id())
    }

    /// Submits a user message and streams the reply into the transcript.
    ///
    /// Blank input is rejected before anything changes. Otherwise the user
    /// entry is appended and kept whatever happens to the request. A reply
    /// cut short by a read failure or an abort keeps the text received so far.
    pub async fn submit(
        &mut self,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<ReplyOutcome> {
        let message = text.trim();
        if message.is_empty() {
            return Err(Error::validation(
                "message must not be empty",
                Some("message".to_string()),
            ));
        }

        self.transcript.push_user(message);
        let request = ChatRequest::new(message, self.binding.session_id().cloned());
        let token = self.abort.arm();
        let start = Instant::now();
        let result = self.stream_reply(&request, &token, renderer).await;
        self.abort.disarm();
        STREAM_DURATION.add(start.elapsed().as_secs_f64());
        result
    }

    async fn stream_reply(
        &mut self,
        request: &ChatRequest,
        token: &CancellationToken,
        renderer: &mut dyn Renderer,
    ) -> Result<ReplyOutcome> {
        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            body = self.backend.send_message(request) => Some(body),
        };
        let body = match sent {
            Some(Ok(body)) => body,
            Some(Err(err)) => {
                STREAM_ERRORS.click();
                renderer.print_error(&err.to_string());
                return Err(err);
            }
            None => return Err(Self::aborted(renderer)),
        };

        let mut events = Box::pin(process_ndjson(body));
        let mut pending = PendingStream::new(self.binding.session_id().cloned());
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                event = events.next() => Some(event),
            };
            match next {
                Some(Some(Ok(event))) => {
                    if let Some(id) = pending.apply(event, &mut self.transcript, renderer) {
                        self.bind_session(id, renderer);
                    }
                }
                Some(Some(Err(err))) if err.is_stream_recoverable() => pending.note(err),
                Some(Some(Err(err))) => {
                    STREAM_ERRORS.click();
                    renderer.finish_response();
                    renderer.print_error(&err.to_string());
                    return Err(err);
                }
                Some(None) => break,
                None => return Err(Self::aborted(renderer)),
            }
        }

        renderer.finish_response();
        let outcome = pending.finish();
        tracing::debug!(
            chunks = outcome.chunks,
            text_len = outcome.text_len,
            completed = outcome.completed,
            diagnostics = outcome.diagnostics.len(),
            "reply finished"
        );
        Ok(outcome)
    }

    fn aborted(renderer: &mut dyn Renderer) -> Error {
        STREAM_ABORTS.click();
        renderer.print_interrupted();
        Error::abort("reply interrupted")
    }

    /// Binds the viewed transcript to `id` and lists it first in the sidebar.
    ///
    /// Returns false, changing nothing, when a session is already bound.
    pub fn bind_session(&mut self, id: SessionId, renderer: &mut dyn Renderer) -> bool {
        if self.binding.is_bound() {
            return false;
        }
        SESSION_BINDS.click();
        tracing::info!(session = %id, "conversation saved as new session");
        self.sessions.insert_front(id.clone());
        self.binding = SessionBinding::Bound(id);
        renderer.show_title(self.current_title());
        renderer.render_sidebar(self.sidebar());
        true
    }

    /// Replaces the view with a new, unbound conversation.
    pub fn navigate_new(&mut self, renderer: &mut dyn Renderer) {
        self.binding = SessionBinding::Unbound;
        self.transcript = Transcript::new();
        renderer.show_title(self.current_title());
        renderer.render_transcript(&self.transcript);
    }

    /// Replaces the view with a saved session.
    pub async fn open_session(
        &mut self,
        id: &SessionId,
        renderer: &mut dyn Renderer,
    ) -> Result<()> {
        let record = self.backend.load_session(id).await?;
        self.show_record(id, record, renderer);
        Ok(())
    }

    fn show_record(&mut self, id: &SessionId, record: SessionRecord, renderer: &mut dyn Renderer) {
        if !self.sessions.contains(id) {
            self.sessions.insert_front(id.clone());
            if let Some(title) = record.title.as_deref().filter(|t| !t.trim().is_empty()) {
                self.sessions.commit_rename(id, title);
            }
        }
        self.transcript = Transcript::from_record(&record);
        self.binding = SessionBinding::Bound(id.clone());
        tracing::debug!(session = %id, messages = self.transcript.len(), "opened session");
        renderer.show_title(self.current_title());
        renderer.render_transcript(&self.transcript);
        renderer.render_sidebar(self.sidebar());
    }

    /// Reloads the sidebar from the service. Returns the number of sessions.
    pub async fn refresh_sessions(&mut self, renderer: &mut dyn Renderer) -> Result<usize> {
        let summaries = self.backend.list_sessions().await?;
        self.sessions = SessionList::from_summaries(summaries);
        if let Some(id) = self.binding.session_id() {
            self.sessions.insert_front(id.clone());
        }
        if let Some(id) = self.menu.open_session() {
            if !self.sessions.contains(id) {
                self.menu = MenuState::Closed;
            }
        }
        renderer.render_sidebar(self.sidebar());
        Ok(self.sessions.len())
    }

    /// Applies a menu command and redraws the sidebar.
    ///
    /// Returns the selected action and the session it targets.
    pub fn menu_command(
        &mut self,
        command: MenuCommand,
        renderer: &mut dyn Renderer,
    ) -> Option<(MenuAction, SessionId)> {
        if let MenuCommand::Toggle(id) = &command {
            if !self.sessions.contains(id) {
                renderer.print_error(&format!("no session with id {id}"));
                return None;
            }
        }
        let selected = self.menu.apply(command);
        renderer.render_sidebar(self.sidebar());
        selected
    }

    /// Validates a rename and shows the new title right away.
    ///
    /// Returns `None` when the title is already current.
    pub fn begin_rename(&mut self, id: &SessionId, title: &str) -> Result<Option<PendingRename>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::validation(
                "title must not be empty",
                Some("title".to_string()),
            ));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(Error::validation(
                format!("title must be at most {MAX_TITLE_CHARS} characters"),
                Some("title".to_string()),
            ));
        }
        let Some(entry) = self.sessions.get(id) else {
            return Err(Error::not_found(
                format!("no session with id {id}"),
                Some(id.to_string()),
            ));
        };
        if entry.title() == title && !entry.is_renaming() {
            return Ok(None);
        }
        self.sessions.begin_rename(id, title);
        Ok(Some(PendingRename {
            id: id.clone(),
            title: title.to_string(),
        }))
    }

    /// Commits or rolls back a rename once the service has answered.
    ///
    /// A rename of a session deleted in the meantime changes nothing.
    pub fn finish_rename(
        &mut self,
        pending: PendingRename,
        result: Result<()>,
        renderer: &mut dyn Renderer,
    ) -> Result<RenameOutcome> {
        let outcome = match result {
            Ok(()) => {
                if self.sessions.commit_rename(&pending.id, &pending.title) {
                    SESSION_RENAMES.click();
                    tracing::info!(session = %pending.id, title = %pending.title, "renamed session");
                }
                Ok(RenameOutcome::Renamed)
            }
            Err(err) => {
                if self.sessions.rollback_rename(&pending.id) {
                    SESSION_RENAME_ROLLBACKS.click();
                }
                tracing::warn!(session = %pending.id, error = %err, "rename failed");
                renderer.print_error(&format!("Failed to rename session: {err}"));
                Err(err)
            }
        };
        if self.binding.session_id() == Some(&pending.id) {
            renderer.show_title(self.current_title());
        }
        renderer.render_sidebar(self.sidebar());
        outcome
    }

    /// Renames a session, showing the new title while the request runs.
    pub async fn rename(
        &mut self,
        id: &SessionId,
        title: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<RenameOutcome> {
        let Some(pending) = self.begin_rename(id, title)? else {
            return Ok(RenameOutcome::Unchanged);
        };
        renderer.render_sidebar(self.sidebar());
        let result = self
            .backend
            .rename_session(pending.id(), &pending.request())
            .await;
        self.finish_rename(pending, result, renderer)
    }

    /// Asks for confirmation of a delete.
    ///
    /// Returns `None` when the user declines.
    pub fn begin_delete<C: Confirm + ?Sized>(
        &mut self,
        id: &SessionId,
        confirm: &mut C,
    ) -> Result<Option<PendingDelete>> {
        let Some(entry) = self.sessions.get(id) else {
            return Err(Error::not_found(
                format!("no session with id {id}"),
                Some(id.to_string()),
            ));
        };
        if !confirm.confirm(&delete_prompt(entry)) {
            return Ok(None);
        }
        Ok(Some(PendingDelete { id: id.clone() }))
    }

    /// Applies the service's answer to a delete.
    ///
    /// A session the service no longer knows counts as deleted. Deleting the
    /// viewed session moves the view to a new conversation.
    pub fn finish_delete(
        &mut self,
        pending: PendingDelete,
        result: Result<DeleteOutcome>,
        renderer: &mut dyn Renderer,
    ) -> Result<DeleteOutcome> {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) if err.is_not_found() => DeleteOutcome::AlreadyGone,
            Err(err) => {
                SESSION_DELETE_ERRORS.click();
                tracing::warn!(session = %pending.id, error = %err, "delete failed");
                renderer.print_error(&format!("Failed to delete session: {err}"));
                return Err(err);
            }
        };
        SESSION_DELETES.click();
        tracing::info!(session = %pending.id, ?outcome, "deleted session");
        self.sessions.remove(&pending.id);
        if self.menu.is_open_for(&pending.id) {
            self.menu = MenuState::Closed;
        }
        if self.binding.session_id() == Some(&pending.id) {
            self.navigate_new(renderer);
        }
        renderer.render_sidebar(self.sidebar());
        Ok(outcome)
    }

    /// Deletes a session after confirmation.
    ///
    /// Returns `None` when the user declines.
    pub async fn delete<C: Confirm + ?Sized>(
        &mut self,
        id: &SessionId,
        confirm: &mut C,
        renderer: &mut dyn Renderer,
    ) -> Result<Option<DeleteOutcome>> {
        let Some(pending) = self.begin_delete(id, confirm)? else {
            return Ok(None);
        };
        let result = self.backend.delete_session(pending.id()).await;
        self.finish_delete(pending, result, renderer).map(Some)
    }

    /// Downloads a session export into the export directory.
    ///
    /// Returns the path of the written file.
    pub async fn export(&self, id: &SessionId, format: ExportFormat) -> Result<PathBuf> {
        let body = self.backend.export_session(id, format).await?;
        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|e| {
                Error::io(
                    format!("failed to create {}", self.export_dir.display()),
                    e,
                )
            })?;
        let path = self.export_dir.join(export_file_name(id, format));
        tokio::fs::write(&path, &body)
            .await
            .map_err(|e| Error::io(format!("failed to write {}", path.display()), e))?;
        SESSION_EXPORTS.click();
        tracing::info!(session = %id, path = %path.display(), bytes = body.len(), "exported session");
        Ok(path)
    }
}
