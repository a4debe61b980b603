//! Remote clients: prompt-to-diagram submission and registry listing.
//!
//! Each client layers validation/shape-checking over a transport capability
//! trait; the production transports speak HTTP via `reqwest`, tests
//! substitute scripted transports.

pub mod generation;
pub mod registry;

pub use generation::{
    Attachment, GenerationClient, GenerationRequest, GenerationTransport,
    HttpGenerationTransport, SubmissionError, SubmitError, ValidationError,
};
pub use registry::{FetchError, HttpRegistryTransport, RegistryClient, RegistryEntry, RegistryTransport};
