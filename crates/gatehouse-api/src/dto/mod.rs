//! Request and response data transfer objects.

pub mod request;
pub mod response;

pub use request::IssueEmulationRequest;
pub use response::{ActionResponse, CurrentEmulationResponse, EmulationStartedResponse};
