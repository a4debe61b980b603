//! Capability interface over the graphical diagram engine.
//!
//! The engine has a stateful, mutable-instance lifecycle (construct → import →
//! export* → destroy). Everything the session needs from it is expressed here,
//! so any engine honoring this contract is substitutable.

use async_trait::async_trait;

/// Options for [`EditingSurface::export_markup`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupExportOptions {
    /// Pretty-print the serialized markup.
    pub format: bool,
}

impl MarkupExportOptions {
    /// Formatted output, the variant used for user-facing downloads.
    pub fn formatted() -> Self {
        Self { format: true }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SurfaceError {
    #[error("malformed diagram markup: {message}")]
    MalformedMarkup { message: String },

    #[error("markup export failed: {message}")]
    MarkupExport { message: String },

    #[error("vector export failed: {message}")]
    VectorExport { message: String },

    #[error("the editing surface was destroyed")]
    Destroyed,
}

/// The diagram rendering/editing engine, seen from the session core.
///
/// The instance is a session-scoped singleton: created once at session start,
/// destroyed exactly once when the session ends. Import/export are never
/// invoked concurrently with teardown.
#[async_trait]
pub trait EditingSurface: Send + Sync {
    /// Loads `markup` into the surface, replacing whatever was displayed.
    /// On failure the previously displayed diagram is left untouched.
    async fn import_markup(&self, markup: &str) -> Result<(), SurfaceError>;

    /// Serializes the currently displayed diagram back to markup.
    async fn export_markup(&self, options: MarkupExportOptions) -> Result<String, SurfaceError>;

    /// Renders the currently displayed diagram to an SVG image.
    async fn export_vector_image(&self) -> Result<String, SurfaceError>;

    /// Releases the engine. Idempotent; all later operations fail.
    fn destroy(&self);
}
