//! The diagram session controller.
//!
//! Owns the UI-facing session state — loading flags, status banner, registry
//! listing, submission form — and wires it to the model holder and the two
//! remote clients. Every recoverable failure is converted to a status banner
//! at the action boundary; nothing here crashes the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use flowman_core::{DiagramDocument, DiagramModelHolder, EditingSurface, InitializationError};
use tokio::task::JoinHandle;
use url::Url;

use crate::client::{
    Attachment, GenerationClient, GenerationRequest, HttpGenerationTransport,
    HttpRegistryTransport, RegistryClient, RegistryEntry,
};
use crate::export::{self, RasterOptions};

pub const DEFAULT_GENERATION_ENDPOINT: &str =
    "https://n8n.flowman.dev/webhook/diagram-generation";
pub const DEFAULT_REGISTRY_ENDPOINT: &str = "https://n8n.flowman.dev/webhook/diagram-registry";

/// Status banners clear themselves after this long unless superseded first.
const DEFAULT_STATUS_CLEAR_AFTER: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub generation_endpoint: Url,
    pub registry_endpoint: Url,
    pub status_clear_after: Duration,
    pub raster: RasterOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            generation_endpoint: Url::parse(DEFAULT_GENERATION_ENDPOINT)
                .expect("default generation endpoint must be a valid URL"),
            registry_endpoint: Url::parse(DEFAULT_REGISTRY_ENDPOINT)
                .expect("default registry endpoint must be a valid URL"),
            status_clear_after: DEFAULT_STATUS_CLEAR_AFTER,
            raster: RasterOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

/// Transient, single-slot user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub kind: StatusKind,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
struct SubmissionForm {
    prompt: String,
    contact: String,
    attachment: Option<Attachment>,
}

/// Outcome of the combined export action. The two artifacts are produced by
/// independent attempts: one failing leaves the other's bytes intact.
#[derive(Debug)]
pub struct ExportArtifacts {
    pub document: Option<Vec<u8>>,
    pub image: Option<Vec<u8>>,
}

#[derive(Default)]
struct StatusSlot {
    current: Option<SessionStatus>,
    /// Monotonic stamp; a pending clear only fires if the slot still holds
    /// the status it was scheduled for.
    epoch: u64,
    timer: Option<JoinHandle<()>>,
}

struct SessionInner {
    holder: DiagramModelHolder,
    generation: GenerationClient,
    registry: RegistryClient,
    raster: RasterOptions,
    status_clear_after: Duration,
    listing: Mutex<Vec<RegistryEntry>>,
    form: Mutex<SubmissionForm>,
    status: Mutex<StatusSlot>,
    submitting: AtomicBool,
    fetching: AtomicBool,
}

/// Orchestrates one diagram session: lifecycle, imports, exports, and the
/// two remote flows. Not `Clone`: dropping the controller tears the session
/// down, destroying the editing surface exactly once.
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    /// Production wiring: HTTP transports against the configured endpoints.
    pub fn new(surface: Arc<dyn EditingSurface>, options: SessionOptions) -> Self {
        let http = reqwest::Client::new();
        let generation = GenerationClient::new(Arc::new(HttpGenerationTransport::new(
            http.clone(),
            options.generation_endpoint.clone(),
        )));
        let registry = RegistryClient::new(Arc::new(HttpRegistryTransport::new(
            http,
            options.registry_endpoint.clone(),
        )));
        Self::with_clients(surface, generation, registry, &options)
    }

    /// Wiring seam for tests and alternative transports.
    pub fn with_clients(
        surface: Arc<dyn EditingSurface>,
        generation: GenerationClient,
        registry: RegistryClient,
        options: &SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                holder: DiagramModelHolder::new(surface),
                generation,
                registry,
                raster: options.raster.clone(),
                status_clear_after: options.status_clear_after,
                listing: Mutex::new(Vec::new()),
                form: Mutex::new(SubmissionForm::default()),
                status: Mutex::new(StatusSlot::default()),
                submitting: AtomicBool::new(false),
                fetching: AtomicBool::new(false),
            }),
        }
    }

    /// Starts the session: loads the built-in default document, then fetches
    /// the registry once. Only the fatal initialization failure escapes.
    pub async fn start(&self) -> Result<(), InitializationError> {
        self.inner
            .holder
            .initialize(DiagramDocument::starter())
            .await?;
        self.set_status(StatusKind::Success, "BPMN editor initialized");
        self.refresh_registry().await;
        Ok(())
    }

    // ---- form state --------------------------------------------------------

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        lock(&self.inner.form).prompt = prompt.into();
    }

    pub fn set_contact(&self, contact: impl Into<String>) {
        lock(&self.inner.form).contact = contact.into();
    }

    pub fn attach_file(&self, attachment: Attachment) {
        lock(&self.inner.form).attachment = Some(attachment);
    }

    pub fn clear_attachment(&self) {
        lock(&self.inner.form).attachment = None;
    }

    pub fn prompt(&self) -> String {
        lock(&self.inner.form).prompt.clone()
    }

    pub fn contact(&self) -> String {
        lock(&self.inner.form).contact.clone()
    }

    pub fn attachment(&self) -> Option<Attachment> {
        lock(&self.inner.form).attachment.clone()
    }

    // ---- observable state --------------------------------------------------

    pub fn status(&self) -> Option<SessionStatus> {
        lock(&self.inner.status).current.clone()
    }

    pub fn listing(&self) -> Vec<RegistryEntry> {
        lock(&self.inner.listing).clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.inner.submitting.load(Ordering::Acquire)
    }

    pub fn is_fetching(&self) -> bool {
        self.inner.fetching.load(Ordering::Acquire)
    }

    pub fn current_document(&self) -> DiagramDocument {
        self.inner.holder.current_document()
    }

    // ---- submission lifecycle ----------------------------------------------

    /// Submits the current form. A submit while one is already in flight is
    /// a no-op; there is never more than one outstanding submission.
    ///
    /// On success the form is cleared; on any failure every field is kept so
    /// the user can retry without retyping.
    pub async fn submit(&self) {
        let Some(_gate) = Gate::enter(&self.inner.submitting) else {
            tracing::debug!("submission already in flight; ignoring");
            return;
        };

        let request = {
            let form = lock(&self.inner.form);
            GenerationRequest {
                prompt: form.prompt.clone(),
                contact: form.contact.clone(),
                attachment: form.attachment.clone(),
            }
        };

        match self.inner.generation.submit(&request).await {
            Ok(()) => {
                *lock(&self.inner.form) = SubmissionForm::default();
                self.set_status(
                    StatusKind::Success,
                    "diagram request submitted; it will appear in the registry once generated",
                );
            }
            Err(err) => {
                tracing::warn!(%err, "diagram generation submission failed");
                self.set_status(StatusKind::Error, format!("could not generate diagram: {err}"));
            }
        }
    }

    // ---- registry lifecycle ------------------------------------------------

    /// Refreshes the registry listing. Re-entrant calls are no-ops. On any
    /// failure the listing is reset to empty, never left partially stale.
    pub async fn refresh_registry(&self) {
        let Some(_gate) = Gate::enter(&self.inner.fetching) else {
            tracing::debug!("registry fetch already in flight; ignoring");
            return;
        };

        match self.inner.registry.list().await {
            Ok(entries) => {
                *lock(&self.inner.listing) = entries;
                self.set_status(StatusKind::Success, "diagram registry refreshed");
            }
            Err(err) => {
                lock(&self.inner.listing).clear();
                tracing::warn!(%err, "registry listing failed");
                self.set_status(
                    StatusKind::Error,
                    format!("could not load diagram registry: {err}"),
                );
            }
        }
    }

    /// Loads a listed diagram into the session (registry-row click path).
    /// Entries without markup fail fast before any import is attempted.
    pub async fn load_entry(&self, index: usize) {
        let entry = lock(&self.inner.listing).get(index).cloned();
        let Some(entry) = entry else {
            self.set_status(StatusKind::Error, "no such registry entry");
            return;
        };
        let Some(document) = entry.document else {
            self.set_status(
                StatusKind::Error,
                "registry entry has no diagram markup to load",
            );
            return;
        };

        match self.inner.holder.replace(document).await {
            Ok(()) => self.set_status(StatusKind::Success, "diagram loaded from registry"),
            Err(err) => {
                tracing::warn!(%err, id = %entry.id, "registry diagram failed to import");
                self.set_status(
                    StatusKind::Error,
                    format!("could not load registry diagram: {err}"),
                );
            }
        }
    }

    // ---- import/export -----------------------------------------------------

    /// Imports user-supplied markup (file-upload path). Last write wins; on
    /// failure the previous document stays current.
    pub async fn import_markup(&self, markup: impl Into<String>) {
        match self.inner.holder.replace(DiagramDocument::new(markup)).await {
            Ok(()) => self.set_status(StatusKind::Success, "BPMN file loaded"),
            Err(err) => {
                tracing::warn!(%err, "markup import failed");
                self.set_status(StatusKind::Error, format!("could not load BPMN file: {err}"));
            }
        }
    }

    /// Exports the current diagram as formatted markup bytes.
    pub async fn export_document(&self) -> Option<Vec<u8>> {
        match export::to_downloadable_xml(self.inner.holder.surface().as_ref()).await {
            Ok(bytes) => {
                self.set_status(StatusKind::Success, "diagram downloaded");
                Some(bytes)
            }
            Err(err) => {
                tracing::warn!(%err, "markup export failed");
                self.set_status(
                    StatusKind::Error,
                    format!("could not export diagram markup: {err}"),
                );
                None
            }
        }
    }

    /// Exports the current diagram as a PNG rendered on a white background.
    pub async fn export_image(&self) -> Option<Vec<u8>> {
        match export::to_raster_image(self.inner.holder.surface().as_ref(), &self.inner.raster)
            .await
        {
            Ok(bytes) => {
                self.set_status(StatusKind::Success, "diagram image exported");
                Some(bytes)
            }
            Err(err) => {
                tracing::warn!(%err, "raster export failed");
                self.set_status(
                    StatusKind::Error,
                    format!("could not render diagram image: {err}"),
                );
                None
            }
        }
    }

    /// Produces both downloadable artifacts. The two attempts are scoped
    /// independently: a raster failure must not suppress a successful markup
    /// export, and vice versa.
    pub async fn export_artifacts(&self) -> ExportArtifacts {
        let document = self.export_document().await;
        let image = self.export_image().await;
        ExportArtifacts { document, image }
    }

    // ---- status ------------------------------------------------------------

    /// Sole writer of the status slot. Replacing a status invalidates any
    /// pending auto-clear and schedules a fresh one.
    fn set_status(&self, kind: StatusKind, message: impl Into<String>) {
        let mut slot = lock(&self.inner.status);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.epoch = slot.epoch.wrapping_add(1);
        slot.current = Some(SessionStatus {
            kind,
            message: message.into(),
        });

        let scheduled_for = slot.epoch;
        let delay = self.inner.status_clear_after;
        let weak = Arc::downgrade(&self.inner);
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut slot = lock(&inner.status);
            if slot.epoch == scheduled_for {
                slot.current = None;
                slot.timer = None;
            }
        }));
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if let Some(timer) = self
            .status
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .timer
            .take()
        {
            timer.abort();
        }
        // Scoped acquisition: the surface singleton is released exactly when
        // the session ends, and no import/export can still be running.
        self.holder.surface().destroy();
    }
}

/// RAII re-entrancy gate over a loading flag: entering flips the flag only
/// if it was clear, and dropping the gate always clears it again.
struct Gate<'a>(&'a AtomicBool);

impl<'a> Gate<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| Self(flag))
    }
}

impl Drop for Gate<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
