//! The in-progress tutoring session: case state, transcript, and debrief.
//!
//! `CaseSession` owns the only copy of the active case and drives every
//! change through the `ApiClient`. The server decides the case phase,
//! the session just mirrors whatever state comes back.
//!
//! Network operations are tagged with a `Ticket`. A case that is
//! successfully started or resumed, or a reset, moves the session to a
//! new epoch and anything still in flight from an older epoch is dropped
//! when it lands. A start that fails leaves the epoch alone so requests
//! for the case still on screen are handled normally. Within an epoch
//! the case state is only replaced by a response newer than the one
//! last applied.
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Result, bail};
use uuid::Uuid;

use super::models::{
    AgeBracket, CaseComplexity, CaseImage, CasePhase, CasePresentation, CaseResponse, CaseSeverity,
    CaseState, Debrief, LearnerLevel, Message, StartCaseRequest, VisitType,
};
use crate::client::ApiClient;

#[derive(Debug, Clone, Default)]
pub struct StartCaseOptions {
    pub level: LearnerLevel,
    pub condition_key: Option<String>,
    pub time_constraint: Option<u32>,
    pub visit_type: VisitType,
    pub visit_age_months: Option<u32>,
    /// Generate the patient from a teaching framework instead of a
    /// fixed case
    pub dynamic: bool,
    pub severity: Option<CaseSeverity>,
    pub age_bracket: Option<AgeBracket>,
    pub presentation: Option<CasePresentation>,
    pub complexity: Option<CaseComplexity>,
}

impl StartCaseOptions {
    pub fn new(level: LearnerLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn condition(mut self, condition_key: &str) -> Self {
        self.condition_key = Some(condition_key.to_string());
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.dynamic = true;
        self
    }
}

impl From<StartCaseOptions> for StartCaseRequest {
    fn from(opts: StartCaseOptions) -> Self {
        StartCaseRequest {
            learner_level: opts.level,
            condition_key: opts.condition_key,
            time_constraint: opts.time_constraint,
            visit_type: opts.visit_type,
            visit_age_months: opts.visit_age_months,
            severity: opts.severity,
            age_bracket: opts.age_bracket,
            presentation: opts.presentation,
            complexity: opts.complexity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    epoch: u64,
    seq: u64,
}

/// Everything the UI reads from a session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub case_state: Option<CaseState>,
    pub messages: Vec<Message>,
    pub debrief: Option<Debrief>,
    pub error: Option<String>,
    pub teaching_moment: Option<String>,
    pub hint_offered: bool,
    pub images: Vec<CaseImage>,
    in_flight: usize,
    epoch: u64,
    // Sequence of the request that opened the current epoch
    epoch_opened_by: u64,
    issued_seq: u64,
    applied_seq: u64,
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    fn next_ticket(&mut self) -> Ticket {
        self.issued_seq += 1;
        Ticket {
            epoch: self.epoch,
            seq: self.issued_seq,
        }
    }

    /// Start a new epoch opened by request `seq`, orphaning every
    /// request still in flight.
    fn begin_epoch(&mut self, seq: u64) {
        self.epoch += 1;
        self.epoch_opened_by = seq;
        self.applied_seq = 0;
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    /// Whether a start or resume issued with `ticket` may replace the
    /// active case. A newer start or a reset since then wins.
    fn may_open_case(&self, ticket: Ticket) -> bool {
        ticket.seq > self.epoch_opened_by
    }

    /// Move to a new epoch for the case opened by `ticket` and apply
    /// its response.
    fn open_case(&mut self, ticket: Ticket, resp: &CaseResponse) {
        self.begin_epoch(ticket.seq);
        self.apply_response(ticket, resp);
    }

    /// Apply the state-bearing parts of a response. Returns `false`
    /// when a newer response has already been applied.
    fn apply_response(&mut self, ticket: Ticket, resp: &CaseResponse) -> bool {
        if ticket.seq <= self.applied_seq {
            tracing::warn!(
                "Ignoring case state from request {} after request {} was applied",
                ticket.seq,
                self.applied_seq
            );
            return false;
        }
        self.applied_seq = ticket.seq;
        self.case_state = Some(resp.case_state.clone());
        self.teaching_moment = resp.teaching_moment.clone();
        self.hint_offered = resp.hint_offered;
        self.images = resp.images.clone();
        true
    }

    fn clear(&mut self) {
        self.case_state = None;
        self.messages = Vec::new();
        self.debrief = None;
        self.error = None;
        self.teaching_moment = None;
        self.hint_offered = false;
        self.images = Vec::new();
    }
}

/// Copy of `messages` with the message `id` marked as failed.
fn mark_failed(messages: &[Message], id: Uuid) -> Vec<Message> {
    messages
        .iter()
        .map(|m| {
            if m.id == id {
                Message {
                    failed: true,
                    ..m.clone()
                }
            } else {
                m.clone()
            }
        })
        .collect()
}

/// Raises the loading flag for as long as it lives.
struct LoadingGuard {
    state: Arc<RwLock<SessionState>>,
}

impl LoadingGuard {
    fn acquire(state: &Arc<RwLock<SessionState>>) -> Self {
        state.write().unwrap().in_flight += 1;
        Self {
            state: Arc::clone(state),
        }
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

#[derive(Clone)]
pub struct CaseSession {
    client: Arc<ApiClient>,
    state: Arc<RwLock<SessionState>>,
}

impl CaseSession {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(SessionState::default())),
        }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.read().unwrap().clone()
    }

    pub fn case_state(&self) -> Option<CaseState> {
        self.state.read().unwrap().case_state.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.read().unwrap().messages.clone()
    }

    pub fn debrief(&self) -> Option<Debrief> {
        self.state.read().unwrap().debrief.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().unwrap().error.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().unwrap().is_loading()
    }

    pub fn teaching_moment(&self) -> Option<String> {
        self.state.read().unwrap().teaching_moment.clone()
    }

    pub fn hint_offered(&self) -> bool {
        self.state.read().unwrap().hint_offered
    }

    pub fn images(&self) -> Vec<CaseImage> {
        self.state.read().unwrap().images.clone()
    }

    fn record_error(&self, ticket: Ticket, err: &impl ToString) {
        let mut state = self.state.write().unwrap();
        if state.is_current(ticket) {
            state.error = Some(err.to_string());
        }
    }

    /// Begin a new case. The transcript is replaced by the tutor's
    /// opening message.
    pub async fn start_case(&self, options: StartCaseOptions) -> Result<()> {
        let _loading = LoadingGuard::acquire(&self.state);
        let ticket = {
            let mut state = self.state.write().unwrap();
            state.debrief = None;
            state.next_ticket()
        };

        let dynamic = options.dynamic;
        let request = StartCaseRequest::from(options);
        let result = if dynamic {
            self.client.start_dynamic_case(&request).await
        } else {
            self.client.start_case(&request).await
        };
        match result {
            Ok(resp) => {
                let mut state = self.state.write().unwrap();
                if !state.may_open_case(ticket) {
                    tracing::warn!("Dropping start of case {}, superseded", resp.case_state.session_id);
                    return Ok(());
                }
                let opening = Message::tutor(
                    &resp.case_state.session_id,
                    &resp.message,
                    resp.case_state.phase,
                );
                tracing::info!(
                    "Started case {} in phase {}",
                    resp.case_state.session_id,
                    resp.case_state.phase
                );
                state.open_case(ticket, &resp);
                state.messages = vec![opening];
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to start case: {}", e);
                self.record_error(ticket, &e);
                Err(e.into())
            }
        }
    }

    /// Send the learner's message. It shows up in the transcript right
    /// away and stays there, marked failed, if the server never gets it.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let _loading = LoadingGuard::acquire(&self.state);
        let (ticket, case_state, learner_id) = {
            let mut state = self.state.write().unwrap();
            let Some(case_state) = state.case_state.clone() else {
                bail!("No active case");
            };
            let msg = Message::learner(&case_state.session_id, text, case_state.phase);
            let id = msg.id;
            state.messages.push(msg);
            (state.next_ticket(), case_state, id)
        };

        match self.client.send_case_message(text, &case_state).await {
            Ok(resp) => {
                let mut state = self.state.write().unwrap();
                if !state.is_current(ticket) {
                    tracing::warn!("Dropping reply for case {}, superseded", case_state.session_id);
                    return Ok(());
                }
                let reply = Message::tutor(
                    &resp.case_state.session_id,
                    &resp.message,
                    resp.case_state.phase,
                );
                state.apply_response(ticket, &resp);
                state.messages.push(reply);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to send message: {}", e);
                let mut state = self.state.write().unwrap();
                if state.is_current(ticket) {
                    state.messages = mark_failed(&state.messages, learner_id);
                    state.error = Some(e.to_string());
                }
                Err(e.into())
            }
        }
    }

    /// Finish the case and fetch the debrief.
    pub async fn end_case(&self) -> Result<()> {
        let _loading = LoadingGuard::acquire(&self.state);
        let (ticket, case_state) = {
            let mut state = self.state.write().unwrap();
            let Some(case_state) = state.case_state.clone() else {
                bail!("No active case");
            };
            (state.next_ticket(), case_state)
        };

        match self.client.get_debrief(&case_state).await {
            Ok(resp) => {
                let mut state = self.state.write().unwrap();
                if !state.is_current(ticket) {
                    tracing::warn!("Dropping debrief for case {}, superseded", case_state.session_id);
                    return Ok(());
                }
                let closing =
                    Message::tutor(&resp.case_state.session_id, &resp.message, CasePhase::Complete);
                state.apply_response(ticket, &resp);
                if let Some(debrief) = resp.debrief {
                    state.debrief = Some(debrief);
                }
                state.messages.push(closing);
                tracing::info!("Completed case {}", case_state.session_id);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to get debrief: {}", e);
                self.record_error(ticket, &e);
                Err(e.into())
            }
        }
    }

    /// Pick up a case left unfinished, rebuilding the transcript from
    /// the server's conversation log.
    pub async fn resume_case(&self, session_id: &str) -> Result<()> {
        let _loading = LoadingGuard::acquire(&self.state);
        let ticket = {
            let mut state = self.state.write().unwrap();
            state.debrief = None;
            state.next_ticket()
        };

        match self.client.get_case(session_id).await {
            Ok(resp) => {
                let mut state = self.state.write().unwrap();
                if !state.may_open_case(ticket) {
                    tracing::warn!("Dropping resume of case {}, superseded", session_id);
                    return Ok(());
                }
                let case = &resp.case_state;
                let mut messages: Vec<Message> = case
                    .conversation
                    .iter()
                    .map(|turn| Message::new(&case.session_id, turn.role, &turn.content, case.phase))
                    .collect();
                if messages.is_empty() {
                    messages.push(Message::tutor(&case.session_id, &resp.message, case.phase));
                }
                state.open_case(ticket, &resp);
                state.messages = messages;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to resume case {}: {}", session_id, e);
                self.record_error(ticket, &e);
                Err(e.into())
            }
        }
    }

    /// Forget the current case. Responses still in flight are dropped
    /// when they arrive.
    pub fn reset_case(&self) {
        let mut state = self.state.write().unwrap();
        state.clear();
        let seq = state.issued_seq;
        state.begin_epoch(seq);
    }

    pub fn clear_error(&self) {
        self.state.write().unwrap().error = None;
    }
}
