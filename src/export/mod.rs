//! Asynchronous export jobs
//!
//! An export is submitted with a filter, polled until the remote system reports
//! a terminal status, and then downloaded with an authenticated request.
//!
//! ## Key Components
//!
//! - [`ExportJobController`] - Owns one job and drives its lifecycle
//! - [`ExportBackend`] - Remote start/status/download operations, injected per export kind
//! - [`Clock`] - Time source for polling and progress animation
//! - [`ExportFilter`] - Opaque request body, built from the typed filters
//!
//! ## Example
//!
//! ```rust,ignore
//! use siplah_export::export::{ControllerOptions, ExportFilter, ExportJobController};
//!
//! let controller = ExportJobController::new(backend, token, ControllerOptions::default());
//! controller.start(ExportFilter::all()).await?;
//!
//! let job = controller.wait_until_settled().await;
//! if job.status.is_terminal() {
//!     let file = controller.download().await?;
//! }
//! ```

mod clock;
mod controller;
mod error;
mod filter;
mod kind;
mod progress;
mod traits;
mod types;

pub use clock::{Clock, TokioClock};
pub use controller::{
    ControllerOptions, DEFAULT_ANIMATION_DURATION, DEFAULT_FRAME_INTERVAL, DEFAULT_POLL_INTERVAL,
    ExportJobController,
};
pub use error::{BackendError, ExportError, JobError};
pub use filter::{BillsFilter, ExportFilter, FilterError, OrdersFilter, PaymentsFilter, ProviderFilter};
pub use kind::ExportKind;
pub use progress::ProgressAnimator;
pub use traits::ExportBackend;
pub use types::{
    AuthToken, DownloadedFile, ExportAccepted, ExportFile, ExportJob, ExportStatus, JobId,
    RemoteStatus, StatusReport,
};
