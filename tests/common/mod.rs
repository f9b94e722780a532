use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use tower::ServiceExt;

use securepay::api::router::create_router;
use securepay::config::AppConfig;
use securepay::model::{Classifier, FeatureVector, Label, LoadedModel, ModelEngine, ModelError};
use securepay::AppState;

/// Forest with one tree over the amount:
/// <= 1000 legit, (1000, 10000] fraud, > 10000 legit.
#[allow(dead_code)]
pub const BAND_FOREST: &str = r#"{
    "format_version": 1,
    "name": "amount-band",
    "model": {
        "type": "random_forest",
        "classes": [0, 1],
        "trees": [{
            "children_left":  [1, -1, 3, -1, -1],
            "children_right": [2, -1, 4, -1, -1],
            "feature":        [28, -2, 28, -2, -2],
            "threshold":      [1000.0, -2.0, 10000.0, -2.0, -2.0],
            "value":          [[0, 0], [10, 0], [0, 0], [0, 10], [10, 0]]
        }]
    }
}"#;

/// Returns a fixed label and counts calls.
pub struct CountingClassifier {
    pub label: Label,
    pub calls: AtomicUsize,
}

impl CountingClassifier {
    #[allow(dead_code)]
    pub fn new(label: Label) -> Arc<Self> {
        Arc::new(Self {
            label,
            calls: AtomicUsize::new(0),
        })
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for CountingClassifier {
    fn kind(&self) -> &'static str {
        "counting"
    }

    fn predict(&self, batch: &[FeatureVector]) -> Result<Vec<Label>, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.label; batch.len()])
    }
}

#[allow(dead_code)]
pub fn write_artifact(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("Failed to write artifact");
    path
}

pub fn test_config(model_paths: Vec<PathBuf>) -> AppConfig {
    AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        model_paths,
        session_ttl_secs: 3600,
        analysis_delay_ms: 0,
    }
}

/// App backed by an in-memory classifier.
#[allow(dead_code)]
pub fn app_with_classifier(classifier: Arc<dyn Classifier>) -> axum::Router {
    app_with_config(classifier, test_config(vec![]))
}

/// Same as [`app_with_classifier`] with explicit settings.
#[allow(dead_code)]
pub fn app_with_config(classifier: Arc<dyn Classifier>, config: AppConfig) -> axum::Router {
    let engine = Arc::new(ModelEngine::with_model(LoadedModel::new(classifier, "memory")));
    create_router(AppState::new(config, engine))
}

/// App whose engine loads from the given candidates on first use.
#[allow(dead_code)]
pub fn app_with_candidates(candidates: Vec<PathBuf>) -> axum::Router {
    let engine = Arc::new(ModelEngine::new(candidates.clone()));
    create_router(AppState::new(test_config(candidates), engine))
}

#[allow(dead_code)]
pub async fn send(app: &axum::Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.expect("Request failed")
}

#[allow(dead_code)]
pub async fn get(app: &axum::Router, uri: &str) -> Response<Body> {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

#[allow(dead_code)]
pub async fn post_json(app: &axum::Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

#[allow(dead_code)]
pub async fn post_form(app: &axum::Router, uri: &str, body: String) -> Response<Body> {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
}

#[allow(dead_code)]
pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub async fn body_text(resp: Response<Body>) -> String {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Open a verification session, returning `(session_id, code)`.
#[allow(dead_code)]
pub async fn open_session(app: &axum::Router) -> (String, String) {
    let resp = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let json = body_json(resp).await;
    (
        json["data"]["session_id"].as_str().unwrap().to_string(),
        json["data"]["code"].as_str().unwrap().to_string(),
    )
}
