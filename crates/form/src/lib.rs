pub mod debounce;
pub mod field;
pub mod list;
pub mod render;
pub mod store;
pub mod upload;
pub mod validate;

pub use debounce::{Autosave, Debouncer};
pub use field::{Control, Diagnostic, ReferenceKey, ReferenceValue, RenderedField};
pub use list::{ListError, ListWindow, ITEM_HEIGHT_ESTIMATE, OVERSCAN, VIRTUALIZE_THRESHOLD};
pub use render::{render_nodes, EditorContext};
pub use store::{Epoch, SubscriptionId, ValueStore};
pub use upload::{apply_upload, AttachmentUploader, UploadError, UploadResponse};
pub use validate::{validate_save, IssueKind, Severity, ValidationIssue};
