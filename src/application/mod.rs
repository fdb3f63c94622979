// Application layer - request validation and orchestration over the
// reference-data store. The CLI and the HTTP API both go through
// `EstimateService`.

pub mod error;
pub mod service;
pub mod validation;

pub use error::*;
pub use service::*;
pub use validation::*;
