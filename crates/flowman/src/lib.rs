#![forbid(unsafe_code)]

//! `flowman` is the headless core of a BPMN diagram studio: the diagram
//! session lifecycle and its export pipeline.
//!
//! It owns the in-memory diagram model, converts between interchange formats
//! (BPMN XML ⇄ rendered PNG via an intermediate SVG), and coordinates
//! asynchronous prompt-to-diagram submissions and registry listings against a
//! remote generation service — while keeping session state consistent under
//! overlapping asynchronous operations.
//!
//! The graphical modeling engine is an external collaborator behind the
//! [`EditingSurface`] trait; [`HeadlessSurface`] is a GUI-free reference
//! implementation that keeps the whole pipeline testable.

pub mod client;
pub mod export;
pub mod session;

pub use flowman_core::{
    DiagramDocument, DiagramModelHolder, EditingSurface, HeadlessSurface, ImportError,
    InitializationError, MarkupExportOptions, SurfaceError,
};

pub use client::{
    Attachment, FetchError, GenerationClient, GenerationRequest, GenerationTransport,
    RegistryClient, RegistryEntry, RegistryTransport, SubmissionError, SubmitError,
    ValidationError,
};
pub use export::{RasterOptions, RenderError};
pub use session::{
    ExportArtifacts, SessionController, SessionOptions, SessionStatus, StatusKind,
};
