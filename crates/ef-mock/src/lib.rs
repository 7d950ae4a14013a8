//! Mock fixture synthesis: route interception rules, response bodies,
//! telemetry blocking and third-party SDK stubs derived from the endpoint
//! inventory.

pub mod output;
pub mod route;
pub mod schema;
pub mod stubs;
pub mod synthesizer;

pub use output::{glob_to_regex, render_playwright, MockFormat};
pub use route::{MockRoute, MockSet, RouteAction, RouteKind};
pub use schema::{FieldType, ResourceSchema};
pub use stubs::IntegrationStub;
pub use synthesizer::{EndpointOverride, MockConfig, MockSynthesizer};
