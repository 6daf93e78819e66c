use serde::{Deserialize, Serialize};

use crate::citation::Citation;

/// Scope key the backend uses for cross-document conversations.
pub const RESEARCH_SCOPE_KEY: &str = "research";

/// What a conversation is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Document(String),
    Research,
}

impl Scope {
    /// Parses the scope key used on the wire and on the command line.
    pub fn from_key(key: &str) -> Self {
        if key == RESEARCH_SCOPE_KEY {
            Scope::Research
        } else {
            Scope::Document(key.to_string())
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Scope::Document(id) => id,
            Scope::Research => RESEARCH_SCOPE_KEY,
        }
    }

    pub fn document_id(&self) -> Option<&str> {
        match self {
            Scope::Document(id) => Some(id),
            Scope::Research => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Backend record for feedback; assistant turns only.
    pub record_id: Option<String>,
    pub citations: Vec<Citation>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            record_id: None,
            citations: Vec::new(),
        }
    }
}

/// Listing entry for a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(rename = "conv_id")]
    pub conversation_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub last_message_preview: String,
}

/// A returned answer, already decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub conversation_id: String,
    pub text: String,
    pub record_id: String,
    pub citations: Vec<Citation>,
    pub verification_status: String,
}

/// Bumped whenever local turns are thrown away; responses carry the epoch they
/// were requested under and are dropped if it moved on.
pub type Epoch = u64;

/// Identifies one in-flight submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTicket {
    pub epoch: Epoch,
    pub turn: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitTurn {
    pub ticket: TurnTicket,
    pub scope: Scope,
    pub question: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("no scope selected")]
    NoScope,
    #[error("question is empty")]
    EmptyQuestion,
    #[error("a question is already awaiting its answer")]
    TurnInFlight,
}

/// Ties question/answer turns of one scope to a durable conversation id that
/// the backend only mints with the first answer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionCorrelator {
    scope: Option<Scope>,
    epoch: Epoch,
    conversation_id: Option<String>,
    turns: Vec<Turn>,
    sessions: Vec<SessionSummary>,
    in_flight: Option<TurnTicket>,
    next_turn: u64,
    error: Option<String>,
}

impl SessionCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to `scope` with an empty, identifier-less session. The returned
    /// epoch tags the session-list fetch for the new scope.
    pub fn select_scope(&mut self, scope: Scope) -> Epoch {
        self.scope = Some(scope);
        self.sessions.clear();
        self.reset_local()
    }

    /// Stores the scope's session list, most recent first. Returns the session to
    /// hydrate when nothing has been asked yet in this epoch.
    pub fn sessions_loaded(
        &mut self,
        epoch: Epoch,
        mut sessions: Vec<SessionSummary>,
    ) -> Option<String> {
        if epoch != self.epoch {
            return None;
        }
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.sessions = sessions;
        if self.conversation_id.is_none() && self.turns.is_empty() && self.in_flight.is_none() {
            self.sessions.first().map(|s| s.conversation_id.clone())
        } else {
            None
        }
    }

    /// Opens a stored session of the current scope; local turns are dropped
    /// until its history arrives.
    pub fn open_session(&mut self, conversation_id: &str) -> Epoch {
        let epoch = self.reset_local();
        self.conversation_id = Some(conversation_id.to_string());
        epoch
    }

    /// Hydrates prior turns. Ignored when stale or when the user already started
    /// a new exchange in this epoch.
    pub fn conversation_loaded(
        &mut self,
        epoch: Epoch,
        conversation_id: &str,
        turns: Vec<Turn>,
    ) -> bool {
        if epoch != self.epoch || !self.turns.is_empty() || self.in_flight.is_some() {
            return false;
        }
        if let Some(current) = &self.conversation_id {
            if current != conversation_id {
                return false;
            }
        }
        self.conversation_id = Some(conversation_id.to_string());
        self.turns = turns;
        true
    }

    /// Appends the user's turn optimistically and returns what to send.
    pub fn begin_turn(&mut self, question: &str) -> Result<SubmitTurn, SessionError> {
        let scope = self.scope.clone().ok_or(SessionError::NoScope)?;
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }
        if self.in_flight.is_some() {
            return Err(SessionError::TurnInFlight);
        }
        self.next_turn += 1;
        let ticket = TurnTicket {
            epoch: self.epoch,
            turn: self.next_turn,
        };
        self.in_flight = Some(ticket);
        self.error = None;
        self.turns.push(Turn::user(question));
        Ok(SubmitTurn {
            ticket,
            scope,
            question: question.to_string(),
            conversation_id: self.conversation_id.clone(),
        })
    }

    /// Shows why a question was not sent as the inline error.
    pub fn reject_question(&mut self, err: &SessionError) {
        self.error = Some(err.to_string());
    }

    pub fn answer_received(&mut self, ticket: TurnTicket, answer: Answer) -> bool {
        if self.in_flight != Some(ticket) {
            return false;
        }
        self.in_flight = None;
        if self.conversation_id.is_none() && !answer.conversation_id.is_empty() {
            self.conversation_id = Some(answer.conversation_id.clone());
            if !self
                .sessions
                .iter()
                .any(|s| s.conversation_id == answer.conversation_id)
            {
                let title = self
                    .turns
                    .iter()
                    .find(|t| t.role == Role::User)
                    .map(|t| t.content.clone())
                    .unwrap_or_default();
                self.sessions.insert(
                    0,
                    SessionSummary {
                        conversation_id: answer.conversation_id.clone(),
                        title,
                        ..SessionSummary::default()
                    },
                );
            }
        }
        self.turns.push(Turn {
            role: Role::Assistant,
            content: answer.text,
            record_id: Some(answer.record_id).filter(|id| !id.is_empty()),
            citations: answer.citations,
        });
        true
    }

    /// The user's turn stays in place without an answer.
    pub fn answer_failed(&mut self, ticket: TurnTicket, reason: impl Into<String>) -> bool {
        if self.in_flight != Some(ticket) {
            return false;
        }
        self.in_flight = None;
        self.error = Some(reason.into());
        true
    }

    pub fn request_failed(&mut self, epoch: Epoch, reason: impl Into<String>) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.error = Some(reason.into());
        true
    }

    /// Clears local turns and the identifier; server history is untouched.
    pub fn start_new_session(&mut self) -> Epoch {
        self.reset_local()
    }

    pub fn session_deleted(&mut self, conversation_id: &str) -> bool {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.conversation_id != conversation_id);
        let was_active = self.conversation_id.as_deref() == Some(conversation_id);
        if was_active {
            self.reset_local();
        }
        was_active || before != self.sessions.len()
    }

    pub fn dismiss_error(&mut self) -> bool {
        self.error.take().is_some()
    }

    pub fn scope(&self) -> Option<&Scope> {
        self.scope.as_ref()
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn sessions(&self) -> &[SessionSummary] {
        &self.sessions
    }

    pub fn awaiting_answer(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn reset_local(&mut self) -> Epoch {
        self.epoch += 1;
        self.conversation_id = None;
        self.turns.clear();
        self.in_flight = None;
        self.error = None;
        self.epoch
    }
}
