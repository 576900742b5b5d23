use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::analysis::client::AnalysisService;
use crate::error::{PreferencesError, SubmitError};
use crate::prefs::settings::{DisplaySettings, PreferenceBackend, PreferenceStore, Preferences};
use crate::session::controller::{SessionStatus, UploadSession};
use crate::session::file::SelectedFile;
use crate::view::builder::build_view_model_with;
use crate::view::types::{ViewModel, ViewOptions};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFileInfo {
    pub name: String,
    pub bytes: usize,
    pub sha256: String,
}

/// Everything the presentation layer needs for status-driven rendering.
///
/// `view` is only present while `Ready`, `error` only while `Failed`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub selected_file: Option<SelectedFileInfo>,
    pub error: Option<String>,
    pub view: Option<ViewModel>,
    pub completed_at_utc: Option<String>,
}

/// Single source of truth shared by every dashboard page.
pub struct Dashboard<S, B> {
    service: S,
    session: Mutex<UploadSession>,
    prefs: Mutex<PreferenceStore<B>>,
    view_options: ViewOptions,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct AbandonOnDrop<'a> {
    session: &'a Mutex<UploadSession>,
    id: Option<Uuid>,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            locked(self.session).abandon(id);
        }
    }
}

impl<S: AnalysisService, B: PreferenceBackend> Dashboard<S, B> {
    /// Loads and applies the stored preferences once, at session start.
    pub fn new(service: S, backend: B) -> Self {
        let mut store = PreferenceStore::new(backend);
        let loaded = store.load();
        store.apply(loaded);
        Self {
            service,
            session: Mutex::new(UploadSession::new()),
            prefs: Mutex::new(store),
            view_options: ViewOptions::default(),
        }
    }

    pub fn with_view_options(mut self, options: ViewOptions) -> Self {
        self.view_options = options;
        self
    }

    pub fn select_file(&self, file: Option<SelectedFile>) {
        locked(&self.session).select_file(file);
    }

    /// Issues at most one request; the session lock is not held while it runs.
    ///
    /// Dropping the returned future before it resolves leaves the session
    /// `Failed` (or `Idle` after a reset) and ready for the next submit.
    pub async fn submit(&self) -> Result<SessionStatus, SubmitError> {
        let pending = locked(&self.session).begin_submit()?;
        let mut guard = AbandonOnDrop {
            session: &self.session,
            id: Some(pending.id()),
        };
        let outcome = self.service.analyze(pending.file()).await;
        guard.id = None;
        let mut session = locked(&self.session);
        session.complete(pending, outcome);
        Ok(session.status())
    }

    pub fn reset(&self) {
        locked(&self.session).reset();
    }

    pub fn status(&self) -> SessionStatus {
        locked(&self.session).status()
    }

    pub fn view_model(&self) -> Option<ViewModel> {
        locked(&self.session)
            .last_result()
            .map(|result| build_view_model_with(result, &self.view_options))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = locked(&self.session);
        SessionSnapshot {
            status: session.status(),
            selected_file: session.selected_file().map(|f| SelectedFileInfo {
                name: f.name().to_string(),
                bytes: f.len(),
                sha256: f.sha256(),
            }),
            error: session.last_error().map(str::to_string),
            view: session
                .last_result()
                .map(|result| build_view_model_with(result, &self.view_options)),
            completed_at_utc: session.completed_at().map(|t| t.to_rfc3339()),
        }
    }

    pub fn preferences(&self) -> Preferences {
        locked(&self.prefs).current()
    }

    pub fn display(&self) -> DisplaySettings {
        locked(&self.prefs).display()
    }

    /// Applies unsaved changes so the UI can show them before saving.
    pub fn preview_preferences(&self, prefs: Preferences) -> DisplaySettings {
        let mut store = locked(&self.prefs);
        store.apply(prefs);
        store.display()
    }

    pub fn save_preferences(&self, prefs: Preferences) -> Result<DisplaySettings, PreferencesError> {
        let mut store = locked(&self.prefs);
        store.save(&prefs)?;
        store.apply(prefs);
        Ok(store.display())
    }

    pub fn stored_preferences(&self) -> Preferences {
        locked(&self.prefs).load()
    }
}
