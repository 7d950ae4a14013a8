pub mod analysis;
pub mod api_extractor;
pub mod discovery;
pub mod endpoint;
pub mod graph_builder;
pub mod path_resolver;
pub mod report;
pub mod selector_audit;
pub mod selector_patch;

pub use analysis::*;
pub use api_extractor::*;
pub use discovery::*;
pub use endpoint::*;
pub use graph_builder::*;
pub use path_resolver::*;
pub use report::*;
pub use selector_audit::*;
pub use selector_patch::*;
