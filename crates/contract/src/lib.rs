pub mod model;
pub mod path;
pub mod qualifiers;
pub mod resolver;
pub mod schema;

pub use model::{DefinitionNode, EntityType, ModelType};
pub use path::{ElementPath, resolve_at_path};
pub use qualifiers::{AllowedRange, Cardinality};
pub use resolver::{ContractParseError, ResolvedContract, UnresolvedNode, resolve_contract};
pub use schema::{NamingRule, UiSchema};
