//! Public types for the Huginn API.

mod completion;
mod envelope;

pub use completion::{Completion, CompletionRequest, ProviderResult, Routing, Usage};
pub use envelope::{Confirmation, Envelope, ErrorBody, ErrorEnvelope};
