pub mod builder;

pub use builder::{
    build_outline, Completion, HealthSignal, OutlineNode, OutlineTarget, Severity,
};
