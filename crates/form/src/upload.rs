//! Attachment upload seam — the only point where the dispatcher performs
//! I/O.
//!
//! The collaborator that actually stores bytes is injected behind
//! [`AttachmentUploader`]; this module owns the guard rails: capability
//! gating, epoch-tagged check-then-apply, and revert-on-failure semantics
//! that never touch unrelated path bindings.

use serde_json::json;
use tracing::debug;

use crate::render::EditorContext;
use crate::store::{Epoch, ValueStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResponse {
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload is unavailable outside an attached-record session")]
    NotPermitted,
    #[error("attachment collaborator rejected the payload: {0}")]
    Rejected(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// External attachment-upload collaborator: accepts a byte payload plus
/// declared content type, returns the stored `{contentType, url}`.
pub trait AttachmentUploader {
    fn upload(&self, bytes: &[u8], content_type: &str) -> Result<UploadResponse, UploadError>;
}

/// Run an upload for the File/Blob element at `path` and apply the result.
///
/// `issued_epoch` is the store epoch captured when the user triggered the
/// upload. If the session was retargeted while the collaborator ran, the
/// result is discarded rather than applied to a now-stale value tree. On
/// collaborator failure the field keeps its prior manual-entry state and
/// the error is returned for inline surfacing.
pub fn apply_upload(
    store: &mut ValueStore,
    path: &str,
    bytes: &[u8],
    declared_content_type: &str,
    uploader: &dyn AttachmentUploader,
    ctx: &EditorContext,
    issued_epoch: Epoch,
) -> Result<(), UploadError> {
    if !ctx.can_upload() {
        return Err(UploadError::NotPermitted);
    }

    let response = uploader.upload(bytes, declared_content_type)?;

    if store.epoch() != issued_epoch {
        debug!(path, issued_epoch, current = store.epoch(), "discarding stale upload result");
        return Ok(());
    }

    store.set(
        path,
        json!({
            "contentType": response.content_type,
            "value": response.url,
        }),
    );
    Ok(())
}
