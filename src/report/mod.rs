//! Report consumers: the JSON document and the incremental console report.

pub mod console;
pub mod document;
pub mod style;

pub use console::{StaticTarget, StreamingRenderer, TargetBackend};
pub use document::DocumentFormatter;
pub use style::Style;
