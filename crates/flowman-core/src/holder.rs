//! Owner of the session's current diagram document.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::document::DiagramDocument;
use crate::surface::{EditingSurface, SurfaceError};

/// The built-in default document was rejected by the editing surface.
///
/// This is a programmer error: the default ships with the crate and must
/// always import. It is logged and surfaced, never swallowed.
#[derive(Debug, thiserror::Error)]
#[error("failed to initialize the editing surface: {source}")]
pub struct InitializationError {
    #[from]
    source: SurfaceError,
}

/// User- or registry-supplied markup was rejected by the editing surface.
/// The previously current document stays both displayed and recorded.
#[derive(Debug, thiserror::Error)]
#[error("diagram import rejected: {source}")]
pub struct ImportError {
    #[from]
    source: SurfaceError,
}

/// Holds the canonical current [`DiagramDocument`] and keeps it in lockstep
/// with what the editing surface displays.
///
/// The holder performs no recovery: a failed `replace` leaves the previous
/// document current, and the caller decides what to tell the user.
pub struct DiagramModelHolder {
    surface: Arc<dyn EditingSurface>,
    current: Mutex<DiagramDocument>,
}

impl DiagramModelHolder {
    pub fn new(surface: Arc<dyn EditingSurface>) -> Self {
        Self {
            surface,
            current: Mutex::new(DiagramDocument::starter()),
        }
    }

    /// Loads the default document into the surface and records it as current.
    pub async fn initialize(&self, default: DiagramDocument) -> Result<(), InitializationError> {
        self.surface
            .import_markup(default.as_str())
            .await
            .map_err(|source| {
                tracing::error!(%source, "built-in default diagram was rejected");
                InitializationError { source }
            })?;
        *self.lock() = default;
        Ok(())
    }

    /// Imports `doc` into the surface; on success it becomes current.
    pub async fn replace(&self, doc: DiagramDocument) -> Result<(), ImportError> {
        self.surface.import_markup(doc.as_str()).await?;
        *self.lock() = doc;
        Ok(())
    }

    /// Read-only snapshot of the last successfully imported document.
    pub fn current_document(&self) -> DiagramDocument {
        self.lock().clone()
    }

    /// The session-scoped surface singleton. Shared with the format
    /// converter; nothing else imports or exports through it.
    pub fn surface(&self) -> &Arc<dyn EditingSurface> {
        &self.surface
    }

    fn lock(&self) -> MutexGuard<'_, DiagramDocument> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
