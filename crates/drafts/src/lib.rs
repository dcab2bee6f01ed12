pub mod record;
pub mod store;

pub use record::DraftRecord;
pub use store::{DraftError, DraftRepository, DraftStorage, FileStorage, MemoryStorage};
