//! Session controller behavior with scripted transports and the headless
//! reference surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;

use flowman::client::{
    FetchError, GenerationClient, GenerationRequest, GenerationTransport, RegistryClient,
    RegistryTransport, SubmissionError,
};
use flowman::{
    Attachment, DiagramDocument, EditingSurface, HeadlessSurface, MarkupExportOptions,
    SessionController, SessionOptions, StatusKind, SurfaceError,
};

#[derive(Default)]
struct ScriptedGeneration {
    calls: AtomicUsize,
    fail_with: Option<String>,
    hold: Option<Notify>,
}

impl ScriptedGeneration {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationTransport for ScriptedGeneration {
    async fn post(&self, _request: &GenerationRequest) -> Result<(), SubmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        match &self.fail_with {
            Some(message) => Err(SubmissionError::new(message.clone())),
            None => Ok(()),
        }
    }
}

struct ScriptedRegistry {
    body: std::sync::Mutex<Value>,
}

impl ScriptedRegistry {
    fn new(body: Value) -> Self {
        Self {
            body: std::sync::Mutex::new(body),
        }
    }

    fn set_body(&self, body: Value) {
        *self.body.lock().unwrap() = body;
    }
}

#[async_trait]
impl RegistryTransport for ScriptedRegistry {
    async fn fetch(&self) -> Result<Value, FetchError> {
        Ok(self.body.lock().unwrap().clone())
    }
}

fn controller_with(
    surface: Arc<dyn EditingSurface>,
    generation: Arc<dyn GenerationTransport>,
    registry: Arc<dyn RegistryTransport>,
) -> SessionController {
    SessionController::with_clients(
        surface,
        GenerationClient::new(generation),
        RegistryClient::new(registry),
        &SessionOptions::default(),
    )
}

fn simple_controller(
    generation: Arc<ScriptedGeneration>,
    registry: Arc<ScriptedRegistry>,
) -> SessionController {
    controller_with(Arc::new(HeadlessSurface::new()), generation, registry)
}

fn empty_registry() -> Arc<ScriptedRegistry> {
    Arc::new(ScriptedRegistry::new(json!([])))
}

fn filled_form(controller: &SessionController) {
    controller.set_prompt("an approval process with three steps");
    controller.set_contact("ops@example.com");
    controller.attach_file(Attachment::pdf("process.pdf", b"%PDF-1.7".to_vec()));
}

#[tokio::test]
async fn start_loads_the_starter_document_and_fetches_the_registry() {
    let registry = Arc::new(ScriptedRegistry::new(json!([
        {"id": "first", "extractedXml": "<definitions/>"}
    ])));
    let controller = simple_controller(Arc::new(ScriptedGeneration::default()), registry);

    controller.start().await.unwrap();

    assert_eq!(controller.current_document(), DiagramDocument::starter());
    let listing = controller.listing();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, "first");
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Success);
    assert!(!controller.is_fetching());
}

#[tokio::test]
async fn malformed_import_keeps_the_previous_document() {
    let controller =
        simple_controller(Arc::new(ScriptedGeneration::default()), empty_registry());
    controller.start().await.unwrap();

    controller.import_markup("<this is not bpmn").await;

    assert_eq!(controller.current_document(), DiagramDocument::starter());
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.contains("could not load BPMN file"));
}

#[tokio::test]
async fn empty_prompt_without_attachment_never_reaches_the_transport() {
    let generation = Arc::new(ScriptedGeneration::default());
    let controller = simple_controller(generation.clone(), empty_registry());
    controller.set_contact("ops@example.com");

    controller.submit().await;

    assert_eq!(generation.calls(), 0);
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.contains("prompt"), "was: {}", status.message);
}

#[tokio::test]
async fn missing_contact_is_a_distinct_validation_failure() {
    let generation = Arc::new(ScriptedGeneration::default());
    let controller = simple_controller(generation.clone(), empty_registry());
    controller.set_prompt("an approval process");

    controller.submit().await;

    assert_eq!(generation.calls(), 0);
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(
        status.message.contains("contact address"),
        "was: {}",
        status.message
    );
}

#[tokio::test]
async fn successful_submission_clears_the_form() {
    let generation = Arc::new(ScriptedGeneration::default());
    let controller = simple_controller(generation.clone(), empty_registry());
    filled_form(&controller);

    controller.submit().await;

    assert_eq!(generation.calls(), 1);
    assert_eq!(controller.prompt(), "");
    assert_eq!(controller.contact(), "");
    assert!(controller.attachment().is_none());
    assert!(!controller.is_submitting());
    assert_eq!(controller.status().unwrap().kind, StatusKind::Success);
}

#[tokio::test]
async fn failed_submission_preserves_every_field() {
    let generation = Arc::new(ScriptedGeneration {
        fail_with: Some("generator overloaded".to_string()),
        ..Default::default()
    });
    let controller = simple_controller(generation.clone(), empty_registry());
    filled_form(&controller);

    controller.submit().await;

    assert_eq!(generation.calls(), 1);
    assert_eq!(controller.prompt(), "an approval process with three steps");
    assert_eq!(controller.contact(), "ops@example.com");
    assert!(controller.attachment().is_some());
    assert!(!controller.is_submitting());
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.contains("generator overloaded"));
}

#[tokio::test]
async fn overlapping_submit_is_a_noop_until_the_first_resolves() {
    let generation = Arc::new(ScriptedGeneration {
        hold: Some(Notify::new()),
        ..Default::default()
    });
    let controller = Arc::new(simple_controller(generation.clone(), empty_registry()));
    filled_form(&controller);

    let background = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit().await })
    };
    while generation.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert!(controller.is_submitting());

    // Second submit while the first is parked inside the transport.
    controller.submit().await;
    assert_eq!(generation.calls(), 1);

    generation.hold.as_ref().unwrap().notify_one();
    background.await.unwrap();

    assert_eq!(generation.calls(), 1);
    assert!(!controller.is_submitting());
    assert_eq!(controller.status().unwrap().kind, StatusKind::Success);
}

#[tokio::test]
async fn non_array_registry_body_resets_the_listing_to_empty() {
    let registry = Arc::new(ScriptedRegistry::new(json!([
        {"id": "first", "extractedXml": "<definitions/>"}
    ])));
    let controller = simple_controller(Arc::new(ScriptedGeneration::default()), registry.clone());
    controller.start().await.unwrap();
    assert_eq!(controller.listing().len(), 1);

    registry.set_body(json!({"items": []}));
    controller.refresh_registry().await;

    assert!(controller.listing().is_empty());
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.contains("unexpected format"));
}

#[tokio::test]
async fn repeated_fetches_with_identical_responses_are_idempotent() {
    let registry = Arc::new(ScriptedRegistry::new(json!([
        {"id": "a", "extractedXml": "<definitions/>"},
        {"id": "b"}
    ])));
    let controller = simple_controller(Arc::new(ScriptedGeneration::default()), registry);

    controller.refresh_registry().await;
    let first = controller.listing();
    controller.refresh_registry().await;
    let second = controller.listing();

    assert_eq!(first, second);
}

#[tokio::test]
async fn entry_without_markup_fails_fast_and_leaves_the_model_alone() {
    let registry = Arc::new(ScriptedRegistry::new(json!([{"id": "pending"}])));
    let controller = simple_controller(Arc::new(ScriptedGeneration::default()), registry);
    controller.start().await.unwrap();

    controller.load_entry(0).await;

    assert_eq!(controller.current_document(), DiagramDocument::starter());
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.contains("no diagram markup"));
}

#[tokio::test]
async fn loadable_entry_replaces_the_current_document() {
    let markup = r#"<?xml version="1.0"?><definitions xmlns="http://www.omg.org/spec/BPMN/20100524/MODEL"/>"#;
    let registry = Arc::new(ScriptedRegistry::new(json!([
        {"id": "done", "extractedXml": markup}
    ])));
    let controller = simple_controller(Arc::new(ScriptedGeneration::default()), registry);
    controller.start().await.unwrap();

    controller.load_entry(0).await;

    assert_eq!(controller.current_document(), DiagramDocument::new(markup));
    assert_eq!(controller.status().unwrap().kind, StatusKind::Success);
}

/// Delegates to a real headless surface but lets the vector export be failed
/// on demand, simulating a broken raster path behind a healthy markup path.
struct FlakyVectorSurface {
    inner: HeadlessSurface,
    fail_vector: AtomicBool,
}

impl FlakyVectorSurface {
    fn new() -> Self {
        Self {
            inner: HeadlessSurface::new(),
            fail_vector: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EditingSurface for FlakyVectorSurface {
    async fn import_markup(&self, markup: &str) -> Result<(), SurfaceError> {
        self.inner.import_markup(markup).await
    }

    async fn export_markup(&self, options: MarkupExportOptions) -> Result<String, SurfaceError> {
        self.inner.export_markup(options).await
    }

    async fn export_vector_image(&self) -> Result<String, SurfaceError> {
        if self.fail_vector.load(Ordering::SeqCst) {
            return Err(SurfaceError::VectorExport {
                message: "image decoder unavailable".to_string(),
            });
        }
        self.inner.export_vector_image().await
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}

#[tokio::test]
async fn raster_failure_does_not_suppress_the_markup_export() {
    let surface = Arc::new(FlakyVectorSurface::new());
    let controller = controller_with(
        surface.clone(),
        Arc::new(ScriptedGeneration::default()),
        empty_registry(),
    );
    controller.start().await.unwrap();
    surface.fail_vector.store(true, Ordering::SeqCst);

    let artifacts = controller.export_artifacts().await;

    let document = artifacts.document.expect("markup export must succeed");
    assert!(String::from_utf8(document).unwrap().contains("definitions"));
    assert!(artifacts.image.is_none());
    let status = controller.status().unwrap();
    assert_eq!(status.kind, StatusKind::Error);
    assert!(status.message.contains("could not render diagram image"));
}

#[tokio::test]
async fn both_artifacts_are_produced_when_the_surface_is_healthy() {
    let controller =
        simple_controller(Arc::new(ScriptedGeneration::default()), empty_registry());
    controller.start().await.unwrap();

    let artifacts = controller.export_artifacts().await;

    assert!(artifacts.document.is_some());
    let image = artifacts.image.expect("raster export must succeed");
    assert!(image.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[tokio::test(start_paused = true)]
async fn status_clears_itself_after_the_configured_delay() {
    let controller =
        simple_controller(Arc::new(ScriptedGeneration::default()), empty_registry());
    controller.start().await.unwrap();
    assert!(controller.status().is_some());

    tokio::time::sleep(Duration::from_secs(4)).await;

    assert!(controller.status().is_none());
}

#[tokio::test(start_paused = true)]
async fn a_newer_status_supersedes_the_pending_clear() {
    let controller =
        simple_controller(Arc::new(ScriptedGeneration::default()), empty_registry());
    controller.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    controller.import_markup("<broken").await;
    let superseding = controller.status().unwrap();

    // The first status' clear deadline passes; the newer banner must survive
    // until its own deadline.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(controller.status(), Some(superseding));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(controller.status().is_none());
}

#[tokio::test]
async fn dropping_the_session_destroys_the_surface() {
    let surface = Arc::new(HeadlessSurface::new());
    let controller = controller_with(
        surface.clone(),
        Arc::new(ScriptedGeneration::default()),
        empty_registry(),
    );
    controller.start().await.unwrap();

    drop(controller);

    assert!(matches!(
        surface
            .import_markup(DiagramDocument::starter().as_str())
            .await,
        Err(SurfaceError::Destroyed)
    ));
}
