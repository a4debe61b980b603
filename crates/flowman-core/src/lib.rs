#![forbid(unsafe_code)]

//! Headless BPMN diagram session model.
//!
//! Design goals:
//! - one canonical diagram document per session, replaced wholesale on import
//! - the graphical engine is a capability trait ([`EditingSurface`]), never a
//!   concrete dependency; any engine honoring the contract is substitutable
//! - runtime-agnostic async APIs (no specific executor required)

pub mod document;
pub mod headless;
pub mod holder;
pub mod surface;

pub use document::DiagramDocument;
pub use headless::HeadlessSurface;
pub use holder::{DiagramModelHolder, ImportError, InitializationError};
pub use surface::{EditingSurface, MarkupExportOptions, SurfaceError};
