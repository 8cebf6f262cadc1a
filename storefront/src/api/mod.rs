// REST collaborator: query assembly, the HTTP client and the wizard submitter.

pub mod client;
pub mod query;
pub mod submitter;

pub use client::{ApiClient, ApiError};
pub use query::{ListQuery, Sort};
pub use submitter::{RestSubmitter, SubmitTarget};
