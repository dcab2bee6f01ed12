pub mod categories;
pub mod engine;

pub use categories::{Category, CATEGORIES, UNCATEGORIZED};
pub use engine::{classify_id, classify_submodels, ClassifiedNode, SemanticRegistry};
