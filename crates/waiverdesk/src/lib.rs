//! `waiverdesk` - Collect, render and deliver signed liability waivers
//!
//! This library validates a guest's form, captures their signature, renders
//! the signed waiver to PDF, uploads it, records the submission and sends a
//! confirmation. Confirmations that cannot be delivered are kept in a local
//! queue and resent later.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod signature;
pub mod storage;
pub mod submission;
pub mod validate;

pub use artifact::{ArtifactStore, ArtifactUploader, RetryPolicy, StoreError};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use notify::{NotificationPayload, Notifier, NotifyOutcome, PendingQueue};
pub use pipeline::{SubmissionPipeline, SubmissionReceipt, SubmitError};
pub use record::{RecordError, RecordStore};
pub use render::{DocumentRenderer, RenderedDocument};
pub use signature::{SignatureImage, SignaturePad};
pub use storage::{QueueStats, SqliteQueue};
pub use submission::{CompleteSubmission, FormId, FormInput, Submission};
pub use validate::{ValidationReport, Validator};
