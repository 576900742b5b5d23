//! Client core for the equipment dataset dashboard.
//!
//! An [`session::controller::UploadSession`] drives one analysis attempt
//! against an [`analysis::client::AnalysisService`]; the returned
//! [`analysis::types::AnalysisResult`] is turned into a
//! [`view::types::ViewModel`] for KPI cards, charts and the preview table.
//! Display preferences live in [`prefs::settings`].

pub mod analysis;
pub mod commands;
pub mod config;
pub mod error;
pub mod prefs;
pub mod session;
pub mod util;
pub mod view;

pub use analysis::client::{AnalysisService, HttpAnalysisClient};
pub use analysis::types::{AnalysisResult, SummaryStats};
pub use commands::dashboard::{Dashboard, SessionSnapshot};
pub use error::{AnalysisError, FileError, PreferencesError, SubmitError};
pub use prefs::settings::{Preferences, Theme};
pub use session::controller::{SessionStatus, UploadSession};
pub use session::file::SelectedFile;
pub use view::builder::{build_view_model, build_view_model_with};
pub use view::types::ViewModel;
