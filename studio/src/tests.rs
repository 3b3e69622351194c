//! Orchestration tests with fake providers and probers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    BatchState, BriaProvider, Credential, EnhanceInput, EraseInput, Error, FillInput,
    GenerateInput, GenerationRequest, HttpProber, LifestyleTextInput, OperationKind,
    OperationParams, Outcome, PackshotInput, Poller, Prober, Provider, Readiness, Result,
    RetryPolicy, ShadowInput, Studio, ERASE_PROMPT,
};

// ==================== Fakes ====================

#[derive(Debug, Clone)]
struct Submitted {
    kind: OperationKind,
    key: String,
    primary: Option<Vec<u8>>,
    prompt: Option<String>,
    params: OperationParams,
}

struct FakeProvider {
    response: Value,
    rmbg_fails: bool,
    calls: Mutex<Vec<String>>,
    submitted: Mutex<Vec<Submitted>>,
}

impl FakeProvider {
    fn returning(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response,
            rmbg_fails: false,
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }

    fn with_failing_rmbg(response: Value) -> Arc<Self> {
        Arc::new(Self {
            response,
            rmbg_fails: true,
            calls: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn last(&self) -> Submitted {
        self.submitted.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn submit(&self, request: &GenerationRequest) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("submit:{}", request.kind()));
        self.submitted.lock().unwrap().push(Submitted {
            kind: request.kind(),
            key: request.credential().expose().to_string(),
            primary: request.images().primary.clone(),
            prompt: request.text().prompt.clone(),
            params: request.params().clone(),
        });
        Ok(self.response.clone())
    }

    async fn remove_background(
        &self,
        _image: &[u8],
        _credential: &Credential,
        _content_moderation: bool,
    ) -> Result<Value> {
        self.calls.lock().unwrap().push("remove_background".into());
        if self.rmbg_fails {
            return Err(Error::Provider {
                status: 500,
                body: "rmbg down".into(),
            });
        }
        Ok(json!({"result_url": "https://x/rmbg.png"}))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(format!("download:{url}"));
        Ok(b"cutout".to_vec())
    }
}

#[derive(Default)]
struct SetProber {
    ready: Mutex<HashSet<String>>,
}

impl SetProber {
    fn make_ready(&self, url: &str) {
        self.ready.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl Prober for SetProber {
    async fn probe(&self, url: &str) -> Readiness {
        if self.ready.lock().unwrap().contains(url) {
            Readiness::Ready
        } else {
            Readiness::Pending
        }
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        interval: Duration::from_millis(1),
    }
}

fn studio(provider: Arc<FakeProvider>) -> (Studio, Arc<SetProber>) {
    let prober = Arc::new(SetProber::default());
    let studio = Studio::new(provider, Poller::new(prober.clone(), fast_policy()))
        .with_default_credential(Credential::new("default-key"));
    (studio, prober)
}

fn png() -> Option<Vec<u8>> {
    Some(vec![0x89, b'P', b'N', b'G'])
}

// ==================== Credentials ====================

#[tokio::test]
async fn missing_credential_fails_before_any_call() {
    let provider = FakeProvider::returning(json!({"result_url": "https://x/1.png"}));
    let prober = Arc::new(SetProber::default());
    let studio = Studio::new(provider.clone(), Poller::new(prober, fast_policy()));

    let err = studio
        .packshot(
            "s",
            PackshotInput {
                image: png(),
                force_rmbg: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Unauthenticated));
    assert_eq!(err.http_status(), 401);
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn request_key_wins_over_default() {
    let provider = FakeProvider::returning(json!({"result_url": "https://x/1.png"}));
    let (studio, _) = studio(provider.clone());

    let input = GenerateInput {
        prompt: Some("a cat".into()),
        ..Default::default()
    };
    studio.generate("s", input.clone()).await.unwrap();
    assert_eq!(provider.last().key, "default-key");

    let input = GenerateInput {
        api_key: Some("caller-key".into()),
        ..input
    };
    studio.generate("s", input).await.unwrap();
    assert_eq!(provider.last().key, "caller-key");
}

// ==================== Sync Dispatch ====================

#[tokio::test]
async fn sync_generate_applies_style() {
    let provider =
        FakeProvider::returning(json!({"result": [{"urls": ["https://x/3.png", "https://x/4.png"]}]}));
    let (studio, _) = studio(provider.clone());

    let outcome = studio
        .generate(
            "s",
            GenerateInput {
                prompt: Some("a lighthouse".into()),
                style: Some("Oil Painting".into()),
                num_results: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    match outcome {
        Outcome::Ready(set) => {
            assert_eq!(set.urls, vec!["https://x/3.png", "https://x/4.png"]);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let sent = provider.last();
    assert_eq!(sent.kind, OperationKind::Generate);
    assert_eq!(
        sent.prompt.as_deref(),
        Some("Oil Painting style artwork: a lighthouse")
    );
    match sent.params {
        OperationParams::Generate(p) => {
            assert_eq!(p.medium, visionary_bria::Medium::Art);
            assert!(!p.enhance_image);
            assert!(!p.prompt_enhancement);
            assert!(p.content_moderation);
            assert_eq!(p.num_results, 2);
        }
        other => panic!("unexpected params: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_input_makes_no_call() {
    let provider = FakeProvider::returning(json!({"result_url": "https://x/1.png"}));
    let (studio, _) = studio(provider.clone());

    let err = studio
        .generate("s", GenerateInput::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));

    let err = studio
        .fill(
            "s",
            FillInput {
                image: png(),
                prompt: Some("a hat".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 400);

    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn unrecognized_response_is_a_parse_error() {
    let provider = FakeProvider::returning(json!({"foo": "bar"}));
    let (studio, _) = studio(provider);

    let err = studio
        .generate(
            "s",
            GenerateInput {
                prompt: Some("a cat".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnrecognizedResponse));
    assert_eq!(err.http_status(), 502);
}

#[tokio::test]
async fn enhance_returns_prompt() {
    let provider = FakeProvider::returning(json!({"prompt variations": ["a majestic cat"]}));
    let (studio, _) = studio(provider);

    let outcome = studio
        .enhance(
            "s",
            EnhanceInput {
                prompt: Some("cat".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Enhanced("a majestic cat".into()));
}

#[tokio::test]
async fn lifestyle_placement_is_normalized() {
    let provider = FakeProvider::returning(json!({"result": [["https://x/2.png", 42]]}));
    let (studio, _) = studio(provider.clone());

    studio
        .lifestyle_by_text(
            "s",
            LifestyleTextInput {
                image: png(),
                scene_description: Some("on a marble counter".into()),
                placement_type: Some("Manual Placement".into()),
                positions: Some("Upper Left, Bottom Center".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    match provider.last().params {
        OperationParams::Lifestyle(p) => {
            assert_eq!(p.placement, visionary_bria::PlacementType::ManualPlacement);
            assert_eq!(p.positions, vec!["upper_left", "bottom_center"]);
            assert!(p.force_rmbg);
        }
        other => panic!("unexpected params: {other:?}"),
    }
}

// ==================== Background Pre-step ====================

#[tokio::test]
async fn failed_prestep_skips_main_call() {
    let provider = FakeProvider::with_failing_rmbg(json!({"result_url": "https://x/1.png"}));
    let (studio, _) = studio(provider.clone());

    let err = studio
        .packshot(
            "s",
            PackshotInput {
                image: png(),
                force_rmbg: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamDependencyFailed(_)));
    assert_eq!(provider.calls(), vec!["remove_background"]);

    // Shadow removes the background by default.
    let err = studio
        .shadow(
            "s",
            ShadowInput {
                image: png(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamDependencyFailed(_)));
    assert!(!provider.calls().iter().any(|c| c.starts_with("submit")));
}

#[tokio::test]
async fn prestep_output_replaces_primary_image() {
    let provider = FakeProvider::returning(json!({"result_url": "https://x/shadow.png"}));
    let (studio, _) = studio(provider.clone());

    studio
        .shadow(
            "s",
            ShadowInput {
                image: png(),
                shadow_type: Some("Float".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        provider.calls(),
        vec![
            "remove_background",
            "download:https://x/rmbg.png",
            "submit:shadow"
        ]
    );
    let sent = provider.last();
    assert_eq!(sent.primary.as_deref(), Some(&b"cutout"[..]));
    match sent.params {
        OperationParams::Shadow(p) => {
            assert_eq!(p.shadow_type, visionary_bria::ShadowType::Float);
            assert_eq!(p.width, Some(0.0));
            assert_eq!(p.height, Some(70.0));
        }
        other => panic!("unexpected params: {other:?}"),
    }
}

#[tokio::test]
async fn packshot_without_force_skips_prestep() {
    let provider = FakeProvider::returning(json!({"result_url": "https://x/1.png"}));
    let (studio, _) = studio(provider.clone());

    studio
        .packshot(
            "s",
            PackshotInput {
                image: png(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(provider.calls(), vec!["submit:packshot"]);
}

// ==================== Async Dispatch ====================

#[tokio::test]
async fn async_batch_lifecycle() {
    let provider = FakeProvider::returning(json!({
        "urls": ["https://x/a.png", "https://x/b.png", "https://x/a.png"]
    }));
    let (studio, prober) = studio(provider);

    let outcome = studio
        .fill(
            "s1",
            FillInput {
                image: png(),
                mask: png(),
                prompt: Some("a hat".into()),
                sync: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Outcome::Accepted {
            urls: vec!["https://x/a.png".into(), "https://x/b.png".into()]
        }
    );

    let polled = studio.poll("s1", OperationKind::Fill, false).await.unwrap();
    assert!(polled.report.newly_ready.is_empty());
    assert_eq!(polled.batch.state(), BatchState::Submitted);

    prober.make_ready("https://x/b.png");
    let polled = studio.poll("s1", OperationKind::Fill, true).await.unwrap();
    assert_eq!(polled.report.passes, 1);
    assert_eq!(polled.report.newly_ready, vec!["https://x/b.png"]);
    assert_eq!(polled.batch.result(), Some("https://x/b.png"));
    assert_eq!(polled.batch.state(), BatchState::PartiallyReady);

    prober.make_ready("https://x/a.png");
    let polled = studio.poll("s1", OperationKind::Fill, false).await.unwrap();
    assert_eq!(polled.report.newly_ready, vec!["https://x/a.png"]);
    assert_eq!(polled.batch.state(), BatchState::AllReady);

    let again = studio.poll("s1", OperationKind::Fill, true).await.unwrap();
    assert!(again.report.newly_ready.is_empty());
    assert_eq!(again.report.passes, 0);
    assert_eq!(again.batch.ready().len(), 2);

    // Other sessions and features are separate.
    let err = studio.poll("s2", OperationKind::Fill, false).await.unwrap_err();
    assert!(matches!(err, Error::NoPendingBatch(_)));

    studio.abandon("s1", OperationKind::Fill).await.unwrap();
    let err = studio.poll("s1", OperationKind::Fill, false).await.unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn resubmission_replaces_batch() {
    let provider = FakeProvider::returning(json!({"result_urls": ["https://x/new.png"]}));
    let (studio, _) = studio(provider);

    let input = EraseInput {
        image: png(),
        mask: png(),
        sync: Some(false),
        ..Default::default()
    };
    studio.erase("s", input.clone()).await.unwrap();
    studio.erase("s", input).await.unwrap();

    assert_eq!(studio.pending().len().await, 1);
    let polled = studio.poll("s", OperationKind::Erase, false).await.unwrap();
    assert_eq!(polled.batch.submitted(), &["https://x/new.png".to_string()]);
}

#[tokio::test]
async fn concurrent_polls_deliver_each_url_once() {
    let urls: Vec<String> = (0..8).map(|i| format!("https://x/{i}.png")).collect();
    let provider = FakeProvider::returning(json!({ "urls": urls }));
    let (studio, prober) = studio(provider);
    let studio = Arc::new(studio);

    studio
        .generate(
            "s",
            GenerateInput {
                prompt: Some("a cat".into()),
                sync: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    for url in &urls {
        prober.make_ready(url);
    }

    let mut handles = Vec::new();
    for _ in 0..4 {
        let studio = studio.clone();
        handles.push(tokio::spawn(async move {
            studio
                .poll("s", OperationKind::Generate, false)
                .await
                .unwrap()
                .report
                .newly_ready
        }));
    }

    let mut delivered = Vec::new();
    for handle in handles {
        delivered.extend(handle.await.unwrap());
    }
    delivered.sort();
    let mut expected = urls.clone();
    expected.sort();
    assert_eq!(delivered, expected);
}

// ==================== Bria Provider ====================

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn erase_uses_gen_fill_with_fixed_prompt() {
    let seen = Arc::new(Mutex::new(Value::Null));
    let router = Router::new().route(
        "/v1/gen_fill",
        post({
            let seen = seen.clone();
            move |Json(body): Json<Value>| async move {
                *seen.lock().unwrap() = body;
                Json(json!({"result": [["https://x/erased.png", 1, "id"]]}))
            }
        }),
    );
    let base = spawn(router).await;

    let client = visionary_bria::Client::builder()
        .base_url(&base)
        .build()
        .unwrap();
    let provider = Arc::new(BriaProvider::new(client));
    let studio = Studio::new(
        provider,
        Poller::new(Arc::new(SetProber::default()), fast_policy()),
    );

    let outcome = studio
        .erase(
            "s",
            EraseInput {
                api_key: Some("k".into()),
                image: Some(b"img".to_vec()),
                mask: Some(b"mask".to_vec()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    match outcome {
        Outcome::Ready(set) => assert_eq!(set.urls, vec!["https://x/erased.png"]),
        other => panic!("unexpected outcome: {other:?}"),
    }
    let body = seen.lock().unwrap().clone();
    assert_eq!(body["prompt"], ERASE_PROMPT);
    assert_eq!(body["file"], "aW1n");
    assert_eq!(body["mask_file"], "bWFzaw==");
    assert_eq!(body["mask_type"], "manual");
    assert_eq!(body["sync"], true);
}

#[tokio::test]
async fn provider_errors_keep_status() {
    let router = Router::new().route(
        "/v1/prompt_enhancer",
        post(|| async { (StatusCode::UNAUTHORIZED, "bad token") }),
    );
    let base = spawn(router).await;
    let client = visionary_bria::Client::builder()
        .base_url(&base)
        .build()
        .unwrap();
    let studio = Studio::new(
        Arc::new(BriaProvider::new(client)),
        Poller::new(Arc::new(SetProber::default()), fast_policy()),
    )
    .with_default_credential(Credential::new("k"));

    let err = studio
        .enhance(
            "s",
            EnhanceInput {
                prompt: Some("cat".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 401);
    match err {
        Error::CredentialRejected { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn http_prober_only_accepts_200() {
    let router = Router::new()
        .route("/ready.png", get(|| async { "png" }))
        .route(
            "/later.png",
            get(|| async { (StatusCode::NOT_FOUND, "not yet") }),
        )
        .route(
            "/moved.png",
            get(|| async { Redirect::to("/ready.png") }),
        )
        .route(
            "/found.png",
            get(|| async { (StatusCode::FOUND, [("location", "/ready.png")]) }),
        )
        .route(
            "/temporary.png",
            get(|| async { Redirect::temporary("/ready.png") }),
        );
    let base = spawn(router).await;
    let prober = HttpProber::new(Duration::from_secs(2)).unwrap();

    // Redirects are not followed, even to a servable asset.
    for path in ["moved.png", "found.png", "temporary.png"] {
        assert_eq!(
            prober.probe(&format!("{base}/{path}")).await,
            Readiness::Pending,
            "{path}"
        );
    }

    assert_eq!(
        prober.probe(&format!("{base}/ready.png")).await,
        Readiness::Ready
    );
    assert_eq!(
        prober.probe(&format!("{base}/later.png")).await,
        Readiness::Pending
    );
    assert_eq!(
        prober.probe("http://127.0.0.1:1/unreachable.png").await,
        Readiness::Pending
    );
}
