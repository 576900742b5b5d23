use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::client::AnalysisService;
use crate::analysis::types::AnalysisResult;
use crate::error::{AnalysisError, SubmitError};

use super::file::SelectedFile;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Uploading,
    Ready,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

pub const UPLOAD_CANCELLED: &str = "The upload was cancelled before the service answered.";

/// Ticket for the one outstanding request, returned by `begin_submit`.
#[derive(Debug)]
pub struct PendingUpload {
    id: Uuid,
    file: SelectedFile,
    selection: u64,
}

impl PendingUpload {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }
}

/// Lifecycle of one dashboard analysis: Idle -> Uploading -> Ready | Failed.
///
/// Fields only change through the transition methods below.
#[derive(Debug, Default)]
pub struct UploadSession {
    status: SessionStatus,
    selected_file: Option<SelectedFile>,
    // Bumped on every selection so a finishing upload only clears the file it sent.
    selection: u64,
    last_result: Option<AnalysisResult>,
    last_error: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    in_flight: Option<Uuid>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    /// The last successful result, only while `Ready`.
    pub fn last_result(&self) -> Option<&AnalysisResult> {
        match self.status {
            SessionStatus::Ready => self.last_result.as_ref(),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self.status {
            SessionStatus::Failed => self.last_error.as_deref(),
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            SessionStatus::Ready => self.completed_at,
            _ => None,
        }
    }

    pub fn is_request_outstanding(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Records the file for the next `submit`. `None` leaves the session as is.
    pub fn select_file(&mut self, file: Option<SelectedFile>) {
        let Some(file) = file else {
            return;
        };
        tracing::debug!(file = file.name(), bytes = file.len(), "dataset selected");
        self.selected_file = Some(file);
        self.selection += 1;
    }

    /// Validates and enters `Uploading`; the caller then performs the request
    /// and hands the outcome to [`UploadSession::complete`].
    pub fn begin_submit(&mut self) -> Result<PendingUpload, SubmitError> {
        if self.in_flight.is_some() {
            return Err(SubmitError::AlreadyInFlight);
        }
        let file = self
            .selected_file
            .clone()
            .ok_or(SubmitError::NoFileSelected)?;

        let id = Uuid::new_v4();
        self.in_flight = Some(id);
        self.status = SessionStatus::Uploading;
        self.last_error = None;
        tracing::debug!(upload_id = %id, file = file.name(), "session uploading");
        Ok(PendingUpload {
            id,
            file,
            selection: self.selection,
        })
    }

    /// Applies the outcome of a request started by `begin_submit`.
    ///
    /// Returns `false` when the outcome was discarded because the session was
    /// reset while the request was running, or the ticket is not the one
    /// outstanding.
    pub fn complete(
        &mut self,
        pending: PendingUpload,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> bool {
        if self.in_flight != Some(pending.id) {
            tracing::debug!(upload_id = %pending.id, "ignoring completion for unknown upload");
            return false;
        }
        self.in_flight = None;
        if self.status != SessionStatus::Uploading {
            tracing::debug!(upload_id = %pending.id, "discarding completion after reset");
            return false;
        }

        match outcome {
            Ok(result) => {
                self.status = SessionStatus::Ready;
                self.last_result = Some(result);
                self.last_error = None;
                self.completed_at = Some(Utc::now());
                if self.selection == pending.selection {
                    self.selected_file = None;
                }
            }
            Err(err) => {
                self.status = SessionStatus::Failed;
                self.last_error = Some(err.to_string());
            }
        }
        tracing::debug!(upload_id = %pending.id, status = self.status.as_str(), "session settled");
        true
    }

    /// Releases the ticket of a request whose outcome will never arrive,
    /// because the caller stopped waiting for it.
    ///
    /// An `Uploading` session becomes `Failed`; after a reset it stays `Idle`.
    /// Returns `false` when `id` is not the outstanding ticket.
    pub fn abandon(&mut self, id: Uuid) -> bool {
        if self.in_flight != Some(id) {
            return false;
        }
        self.in_flight = None;
        if self.status == SessionStatus::Uploading {
            self.status = SessionStatus::Failed;
            self.last_error = Some(UPLOAD_CANCELLED.to_string());
        }
        tracing::debug!(upload_id = %id, status = self.status.as_str(), "upload abandoned");
        true
    }

    /// Runs one full submission against `service`: one request, no retry.
    pub async fn submit<S: AnalysisService>(
        &mut self,
        service: &S,
    ) -> Result<SessionStatus, SubmitError> {
        let pending = self.begin_submit()?;
        let mut guard = AbandonOnDrop {
            session: self,
            id: Some(pending.id),
        };
        let outcome = service.analyze(pending.file()).await;
        guard.id = None;
        guard.session.complete(pending, outcome);
        Ok(guard.session.status)
    }

    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
        self.selected_file = None;
        self.last_result = None;
        self.last_error = None;
        self.completed_at = None;
    }
}

// Releases the ticket if `submit` is dropped while awaiting the service.
struct AbandonOnDrop<'a> {
    session: &'a mut UploadSession,
    id: Option<Uuid>,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.session.abandon(id);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::analysis::types::SummaryStats;

    /// Replays canned outcomes in order and counts requests.
    #[derive(Default)]
    pub(crate) struct ScriptedService {
        outcomes: Mutex<VecDeque<Result<AnalysisResult, AnalysisError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        pub(crate) fn with(outcomes: Vec<Result<AnalysisResult, AnalysisError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AnalysisService for ScriptedService {
        async fn analyze(&self, _file: &SelectedFile) -> Result<AnalysisResult, AnalysisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.outcomes.lock().expect("outcomes").pop_front();
            next.unwrap_or_else(|| Err(AnalysisError::Transport("no scripted outcome".to_string())))
        }
    }

    /// Never answers.
    pub(crate) struct StalledService;

    impl AnalysisService for StalledService {
        async fn analyze(&self, _file: &SelectedFile) -> Result<AnalysisResult, AnalysisError> {
            std::future::pending().await
        }
    }

    pub(crate) fn flowrate_result() -> AnalysisResult {
        let mut result = AnalysisResult::empty();
        result.record_count = 10;
        result.summary_stats.insert(
            "Flowrate".to_string(),
            SummaryStats {
                average: 42.5,
                min: 10.0,
                max: 90.0,
                median: 40.0,
                stddev: None,
            },
        );
        result
    }

    fn csv() -> SelectedFile {
        SelectedFile::new("equipment.csv", b"Type,Flowrate\nPump,10\n".to_vec())
    }

    #[test]
    fn select_file_keeps_status_and_ignores_none() {
        let mut session = UploadSession::new();
        session.select_file(None);
        assert!(session.selected_file().is_none());
        session.select_file(Some(csv()));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.selected_file().map(|f| f.name()), Some("equipment.csv"));
    }

    #[tokio::test]
    async fn submit_without_file_signals_and_stays_idle() {
        let service = ScriptedService::default();
        let mut session = UploadSession::new();
        let err = session.submit(&service).await.expect_err("should reject");
        assert_eq!(err, SubmitError::NoFileSelected);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn successful_submit_becomes_ready_and_clears_file() {
        let service = ScriptedService::with(vec![Ok(flowrate_result())]);
        let mut session = UploadSession::new();
        session.select_file(Some(csv()));
        let status = session.submit(&service).await.expect("submit");
        assert_eq!(status, SessionStatus::Ready);
        assert_eq!(service.calls(), 1);
        assert!(session.selected_file().is_none());
        assert_eq!(session.last_result().map(|r| r.record_count), Some(10));
        assert!(session.last_error().is_none());
        assert!(session.completed_at().is_some());
    }

    #[test]
    fn second_begin_while_uploading_is_rejected() {
        let mut session = UploadSession::new();
        session.select_file(Some(csv()));
        let pending = session.begin_submit().expect("begin");
        assert_eq!(session.status(), SessionStatus::Uploading);
        assert_eq!(
            session.begin_submit().expect_err("should reject"),
            SubmitError::AlreadyInFlight
        );
        assert_eq!(session.status(), SessionStatus::Uploading);
        assert!(session.complete(pending, Ok(flowrate_result())));
        assert_eq!(session.status(), SessionStatus::Ready);
    }

    #[test]
    fn each_failure_kind_gets_a_distinct_message() {
        let failures = vec![
            AnalysisError::Transport("connection refused".to_string()),
            AnalysisError::Service {
                status: 400,
                message: "Error processing CSV".to_string(),
            },
            AnalysisError::MalformedResponse("missing required key record_count".to_string()),
        ];
        let mut messages = Vec::new();
        for failure in failures {
            let mut session = UploadSession::new();
            session.select_file(Some(csv()));
            let pending = session.begin_submit().expect("begin");
            session.complete(pending, Err(failure));
            assert_eq!(session.status(), SessionStatus::Failed);
            assert!(session.last_result().is_none());
            messages.push(session.last_error().expect("error").to_string());
        }
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn reselecting_during_upload_survives_success() {
        let mut session = UploadSession::new();
        session.select_file(Some(csv()));
        let pending = session.begin_submit().expect("begin");
        session.select_file(Some(SelectedFile::new("next.csv", b"A\n1\n".to_vec())));
        assert_eq!(pending.file().name(), "equipment.csv");
        session.complete(pending, Ok(flowrate_result()));
        assert_eq!(session.selected_file().map(|f| f.name()), Some("next.csv"));
    }

    #[test]
    fn reset_during_upload_discards_late_outcome_but_keeps_exclusivity() {
        let mut session = UploadSession::new();
        session.select_file(Some(csv()));
        let pending = session.begin_submit().expect("begin");
        session.reset();
        assert_eq!(session.status(), SessionStatus::Idle);

        session.select_file(Some(csv()));
        assert_eq!(
            session.begin_submit().expect_err("should reject"),
            SubmitError::AlreadyInFlight
        );

        assert!(!session.complete(pending, Ok(flowrate_result())));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.last_result().is_none());
        assert!(!session.is_request_outstanding());
        assert!(session.begin_submit().is_ok());
    }

    #[test]
    fn abandoned_upload_fails_and_can_be_retried() {
        let mut session = UploadSession::new();
        session.select_file(Some(csv()));
        let pending = session.begin_submit().expect("begin");
        assert!(session.abandon(pending.id()));
        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.last_error(), Some(UPLOAD_CANCELLED));
        assert!(!session.is_request_outstanding());
        assert_eq!(session.selected_file().map(|f| f.name()), Some("equipment.csv"));

        assert!(!session.complete(pending, Ok(flowrate_result())));
        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(session.begin_submit().is_ok());
    }

    #[test]
    fn abandon_after_reset_stays_idle() {
        let mut session = UploadSession::new();
        session.select_file(Some(csv()));
        let pending = session.begin_submit().expect("begin");
        session.reset();
        assert!(session.abandon(pending.id()));
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.last_error().is_none());
        assert!(!session.abandon(pending.id()));
    }

    #[tokio::test]
    async fn dropped_submit_releases_the_session() {
        let service = ScriptedService::with(vec![Ok(flowrate_result())]);
        let mut session = UploadSession::new();
        session.select_file(Some(csv()));
        tokio::select! {
            biased;
            _ = session.submit(&StalledService) => panic!("stalled service answered"),
            _ = tokio::task::yield_now() => {}
        }
        assert_eq!(session.status(), SessionStatus::Failed);
        assert!(!session.is_request_outstanding());

        let status = session.submit(&service).await.expect("retry");
        assert_eq!(status, SessionStatus::Ready);
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn foreign_ticket_is_ignored() {
        let mut a = UploadSession::new();
        let mut b = UploadSession::new();
        a.select_file(Some(csv()));
        b.select_file(Some(csv()));
        let from_a = a.begin_submit().expect("begin a");
        let _from_b = b.begin_submit().expect("begin b");
        assert!(!b.complete(from_a, Ok(flowrate_result())));
        assert_eq!(b.status(), SessionStatus::Uploading);
    }

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Select,
        Begin,
        FinishOk,
        FinishErr,
        Reset,
    }

    /// Reference model of the transition table.
    #[derive(Clone, Copy, Debug, Default)]
    struct Model {
        status: SessionStatus,
        has_file: bool,
        in_flight: bool,
        reselected: bool,
    }

    #[test]
    fn every_short_call_sequence_follows_the_transition_table() {
        const OPS: [Op; 5] = [Op::Select, Op::Begin, Op::FinishOk, Op::FinishErr, Op::Reset];
        let depth = 5;
        let total = OPS.len().pow(depth);
        for mut code in 0..total {
            let mut seq = Vec::with_capacity(depth as usize);
            for _ in 0..depth {
                seq.push(OPS[code % OPS.len()]);
                code /= OPS.len();
            }

            let mut session = UploadSession::new();
            let mut pending: Option<PendingUpload> = None;
            let mut model = Model::default();

            for op in &seq {
                match op {
                    Op::Select => {
                        session.select_file(Some(csv()));
                        model.has_file = true;
                        model.reselected = model.in_flight;
                    }
                    Op::Begin => {
                        let got = session.begin_submit();
                        if model.in_flight {
                            assert_eq!(got.expect_err("busy"), SubmitError::AlreadyInFlight);
                        } else if !model.has_file {
                            assert_eq!(got.expect_err("no file"), SubmitError::NoFileSelected);
                        } else {
                            pending = Some(got.expect("begin"));
                            model.status = SessionStatus::Uploading;
                            model.in_flight = true;
                            model.reselected = false;
                        }
                    }
                    Op::FinishOk | Op::FinishErr => {
                        if let Some(p) = pending.take() {
                            let outcome = match op {
                                Op::FinishOk => Ok(flowrate_result()),
                                _ => Err(AnalysisError::Transport("down".to_string())),
                            };
                            session.complete(p, outcome);
                            if model.status == SessionStatus::Uploading {
                                if matches!(op, Op::FinishOk) {
                                    model.status = SessionStatus::Ready;
                                    if !model.reselected {
                                        model.has_file = false;
                                    }
                                } else {
                                    model.status = SessionStatus::Failed;
                                }
                            }
                            model.in_flight = false;
                        }
                    }
                    Op::Reset => {
                        session.reset();
                        model.status = SessionStatus::Idle;
                        model.has_file = false;
                    }
                }
                assert_eq!(session.status(), model.status, "{seq:?}");
                assert_eq!(session.selected_file().is_some(), model.has_file, "{seq:?}");
                assert!(
                    !(session.last_result().is_some() && session.last_error().is_some()),
                    "{seq:?}"
                );
                assert_eq!(
                    session.last_result().is_some(),
                    model.status == SessionStatus::Ready,
                    "{seq:?}"
                );
                assert_eq!(
                    session.last_error().is_some(),
                    model.status == SessionStatus::Failed,
                    "{seq:?}"
                );
            }
        }
    }
}
