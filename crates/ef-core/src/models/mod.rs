pub mod api;
pub mod diagnostics;
pub mod location;
pub mod node_id;
pub mod report;
pub mod selector;
pub mod usage;

pub use api::*;
pub use diagnostics::*;
pub use location::*;
pub use node_id::*;
pub use report::*;
pub use selector::*;
pub use usage::*;
