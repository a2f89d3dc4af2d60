//! The submission pipeline.
//!
//! One submission moves strictly forward: validate, capture the signature,
//! render, upload, record, notify. Each stage is awaited before the next
//! starts. Nothing touches the network until the form and signature are
//! both complete, and nothing reaches the record store or notifier until
//! the waiver has a public address.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactUploader, HttpArtifactStore, StoreError};
use crate::config::Config;
use crate::error::Result;
use crate::http::build_client;
use crate::notify::{HttpNotificationTransport, Notifier, NotifyOutcome, PendingQueue};
use crate::record::{AirtableRecordStore, CreatedRecord, RecordError, RecordStore};
use crate::render::{DocumentRenderer, RenderError, RenderedDocument, WaiverTemplate};
use crate::signature::SignaturePad;
use crate::submission::{FormId, FormInput, Submission};
use crate::validate::{ValidationReport, Validator};

/// Why a submission did not complete.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Required fields are missing or malformed.
    #[error(transparent)]
    Validation(#[from] ValidationReport),

    /// Nothing was drawn on the signature pad.
    #[error("a signature is required")]
    EmptySignature,

    /// The waiver could not be turned into a PDF.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The waiver could not be uploaded.
    #[error("waiver upload failed: {source}")]
    Upload {
        /// Where the rendered waiver was saved locally, if it could be.
        local_copy: Option<PathBuf>,
        /// The storage failure.
        #[source]
        source: StoreError,
    },

    /// The record store refused the submission after the upload succeeded.
    #[error("saving the record failed: {source} (uploaded waiver: {artifact_url})")]
    Record {
        /// Address of the uploaded waiver, which is left in place.
        artifact_url: String,
        /// The record store failure.
        #[source]
        source: RecordError,
    },
}

impl SubmitError {
    /// Whether the guest can fix this by editing the form.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::EmptySignature)
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    /// Form identifier.
    pub form_id: FormId,
    /// Public address of the uploaded waiver.
    pub artifact_url: String,
    /// BLAKE3 digest of the uploaded waiver.
    pub document_digest: String,
    /// Identifier of the created record.
    pub record_id: String,
    /// How the notification went.
    pub notification: NotifyOutcome,
}

impl SubmissionReceipt {
    /// One-line message for the guest.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut message = format!("Waiver {} submitted.", self.form_id);
        if self.notification.success {
            message.push_str(" A confirmation email has been sent.");
        } else if self.notification.is_pending() {
            message.push_str(" The confirmation email is pending and will be retried.");
        } else {
            message.push_str(" The confirmation email could not be sent.");
        }
        message
    }
}

/// Runs submissions through every stage.
#[derive(Clone)]
pub struct SubmissionPipeline {
    validator: Validator,
    renderer: DocumentRenderer,
    uploader: ArtifactUploader,
    records: Arc<dyn RecordStore>,
    notifier: Notifier,
    fallback_dir: Option<PathBuf>,
}

impl std::fmt::Debug for SubmissionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionPipeline")
            .field("uploader", &self.uploader)
            .field("notifier", &self.notifier)
            .field("fallback_dir", &self.fallback_dir)
            .finish_non_exhaustive()
    }
}

impl SubmissionPipeline {
    /// Assemble a pipeline from explicit collaborators.
    #[must_use]
    pub fn new(
        renderer: DocumentRenderer,
        uploader: ArtifactUploader,
        records: Arc<dyn RecordStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            validator: Validator::for_template(renderer.template()),
            renderer,
            uploader,
            records,
            notifier,
            fallback_dir: None,
        }
    }

    /// Save waivers that fail to upload into `dir`.
    #[must_use]
    pub fn with_fallback_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    /// Build the HTTP-backed pipeline described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any store is not fully configured.
    pub fn from_config(config: &Config, queue: Arc<dyn PendingQueue>) -> Result<Self> {
        let artifacts = config.artifact_settings()?;
        let records = config.record_settings()?;
        let client = build_client(config.http_timeout())?;

        let store = HttpArtifactStore::new(
            client.clone(),
            &artifacts.base_url,
            artifacts.bucket,
            artifacts.api_key,
        );
        let uploader = ArtifactUploader::new(
            Arc::new(store),
            artifacts.prefix,
            artifacts.max_upload_bytes,
            artifacts.retry,
        );
        let record_store = AirtableRecordStore::new(
            client,
            &records.base_url,
            &records.base_id,
            &records.table,
            records.api_key,
        )?;
        let renderer = DocumentRenderer::new(config.layout.clone(), WaiverTemplate::default())
            .map_err(|e| crate::Error::config_validation(format!("layout: {e}")))?;

        Ok(Self::new(
            renderer,
            uploader,
            Arc::new(record_store),
            build_notifier(config, queue)?,
        )
        .with_fallback_dir(config.fallback_dir()))
    }

    /// The notifier, for running resend sweeps.
    #[must_use]
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Validate the form and render the waiver without sending anything.
    ///
    /// # Errors
    ///
    /// See [`prepare_document`].
    pub fn prepare(
        &self,
        form: &FormInput,
        pad: &SignaturePad,
        at: DateTime<Utc>,
    ) -> std::result::Result<(Submission, RenderedDocument), SubmitError> {
        prepare_document(&self.validator, &self.renderer, form, pad, at)
    }

    /// Run a submission through every stage.
    ///
    /// # Errors
    ///
    /// See [`SubmitError`]. A notification failure is not an error.
    pub async fn submit(
        &self,
        form: &FormInput,
        pad: &SignaturePad,
    ) -> std::result::Result<SubmissionReceipt, SubmitError> {
        self.submit_at(form, pad, Utc::now()).await
    }

    /// [`submit`](Self::submit) with an explicit submission time.
    ///
    /// # Errors
    ///
    /// See [`SubmitError`].
    pub async fn submit_at(
        &self,
        form: &FormInput,
        pad: &SignaturePad,
        at: DateTime<Utc>,
    ) -> std::result::Result<SubmissionReceipt, SubmitError> {
        let (submission, document) = self.prepare(form, pad, at)?;
        let form_id = submission.form_id.clone();

        let artifact_url = match self
            .uploader
            .upload(&document.filename, document.content_type(), &document.bytes)
            .await
        {
            Ok(url) => url,
            Err(source) => {
                let local_copy = self.save_fallback(&document).await;
                return Err(SubmitError::Upload { local_copy, source });
            }
        };

        let complete = submission.complete(artifact_url);
        let record: CreatedRecord = match self.records.insert(&complete).await {
            Ok(record) => record,
            Err(source) => {
                warn!(
                    form_id = %form_id,
                    artifact_url = %complete.artifact_url,
                    error = %source,
                    "Record failed after upload; waiver left in storage"
                );
                return Err(SubmitError::Record {
                    artifact_url: complete.artifact_url,
                    source,
                });
            }
        };

        let notification = self.notifier.send(&complete).await;
        info!(
            form_id = %form_id,
            record_id = %record.id,
            notified = notification.success,
            "Submission complete"
        );

        Ok(SubmissionReceipt {
            form_id,
            artifact_url: complete.artifact_url,
            document_digest: document.digest,
            record_id: record.id,
            notification,
        })
    }

    async fn save_fallback(&self, document: &RenderedDocument) -> Option<PathBuf> {
        let dir = self.fallback_dir.as_ref()?;
        let path = dir.join(&document.filename);
        let write = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, &document.bytes).await
        };
        match write.await {
            Ok(()) => {
                warn!(path = %path.display(), "Upload failed; waiver saved locally");
                Some(path)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not save waiver locally");
                None
            }
        }
    }
}

/// Validate `form`, check the signature and render the waiver.
///
/// This is everything a submission does before its first network call.
///
/// # Errors
///
/// Returns [`SubmitError::Validation`] or [`SubmitError::EmptySignature`]
/// for a form the guest must fix, or [`SubmitError::Render`] if the PDF
/// cannot be written.
pub fn prepare_document(
    validator: &Validator,
    renderer: &DocumentRenderer,
    form: &FormInput,
    pad: &SignaturePad,
    at: DateTime<Utc>,
) -> std::result::Result<(Submission, RenderedDocument), SubmitError> {
    let fields = validator.validate(form)?;
    if pad.is_empty() {
        return Err(SubmitError::EmptySignature);
    }
    let signature = pad.to_image().encode();
    let submission = Submission::create(fields, at);
    let document = renderer.render(&submission, &signature)?;
    debug!(
        form_id = %submission.form_id,
        pages = document.page_count,
        digest = %document.digest,
        "Prepared submission"
    );
    Ok((submission, document))
}

/// Build the HTTP-backed notifier described by `config`.
///
/// # Errors
///
/// Returns a configuration error if the endpoint is not configured.
pub fn build_notifier(config: &Config, queue: Arc<dyn PendingQueue>) -> Result<Notifier> {
    let settings = config.notify_settings()?;
    let client = build_client(config.http_timeout())?;
    let transport = HttpNotificationTransport::new(client, settings.endpoint_url);
    Ok(Notifier::new(Arc::new(transport), queue)
        .with_recipient(settings.recipient)
        .with_max_age(config.queue_max_age()))
}
