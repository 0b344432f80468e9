use std::{io::Cursor, sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose, Engine as _};
use mixcaption::{
    client::SYSTEM_PROMPT,
    server::{router, AppState},
    ApiConfig, CaptionError, Captioner, DispatchOptions, OpenAiCaptioner,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const TEST_MODEL: &str = "joycaption-test";
const TEST_KEY: &str = "test-key";

async fn chat_completion(headers: HeaderMap, Json(body): Json<Value>) -> axum::response::Response {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != format!("Bearer {}", TEST_KEY) {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }

    let messages = &body["messages"];
    let prompt = messages[1]["content"][0]["text"].as_str().unwrap_or_default();
    let image_url = messages[1]["content"][1]["image_url"]["url"]
        .as_str()
        .unwrap_or_default();

    if body["model"] != TEST_MODEL
        || messages[0]["content"] != SYSTEM_PROMPT
        || !image_url.starts_with("data:image/png;base64,")
    {
        return (StatusCode::BAD_REQUEST, "unexpected request shape").into_response();
    }
    if prompt.contains("overload") {
        return (StatusCode::SERVICE_UNAVAILABLE, "model overloaded").into_response();
    }

    Json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": format!("  captioned: {}  ", prompt) },
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

/// Local stand-in for an OpenAI compatible captioning server.
async fn spawn_fake_endpoint(models: &'static [&'static str]) -> String {
    let app = Router::new()
        .route(
            "/v1/models",
            get(move || async move {
                let data: Vec<Value> = models
                    .iter()
                    .map(|id| json!({ "id": id, "object": "model" }))
                    .collect();
                Json(json!({ "object": "list", "data": data }))
            }),
        )
        .route("/v1/chat/completions", post(chat_completion));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn api(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        api_key: TEST_KEY.to_string(),
        request_timeout_secs: 10,
        ..ApiConfig::default()
    }
}

fn png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 120, 200]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}

fn app() -> Router {
    router(Arc::new(AppState {
        api: api("http://127.0.0.1:9/v1"),
        options: DispatchOptions {
            per_item_timeout: Duration::from_secs(10),
            ..DispatchOptions::default()
        },
        body_limit: 10 * 1024 * 1024,
    }))
}

const BOUNDARY: &str = "mixcaption-test-boundary";

enum Part<'a> {
    File(&'a str, &'a str, Vec<u8>),
    Text(&'a str, String),
}

fn multipart(parts: Vec<Part>) -> Body {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

fn form_request(uri: &str, parts: Vec<Part>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(multipart(parts))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_connection_reports_first_model() {
    let base = spawn_fake_endpoint(&[TEST_MODEL, "other-model"]).await;
    let captioner = OpenAiCaptioner::new(api(&base)).unwrap();
    assert_eq!(captioner.test_connection().await.unwrap(), TEST_MODEL);
}

#[tokio::test]
async fn test_connection_without_models_fails() {
    let base = spawn_fake_endpoint(&[]).await;
    let captioner = OpenAiCaptioner::new(api(&base)).unwrap();
    let err = captioner.test_connection().await.unwrap_err();
    assert!(matches!(err, CaptionError::NoModel));
}

#[tokio::test]
async fn test_caption_discovers_model_and_trims_reply() {
    let base = spawn_fake_endpoint(&[TEST_MODEL]).await;
    let captioner = OpenAiCaptioner::new(api(&base)).unwrap();
    assert_eq!(captioner.model_id(), None);

    let caption = captioner.caption(&png(), "Describe it.").await.unwrap();
    assert_eq!(caption, "captioned: Describe it.");
    assert_eq!(captioner.model_id(), Some(TEST_MODEL));
}

#[tokio::test]
async fn test_upstream_error_status_is_reported() {
    let base = spawn_fake_endpoint(&[TEST_MODEL]).await;
    let captioner = OpenAiCaptioner::new(api(&base)).unwrap();

    let err = captioner.caption(&png(), "overload please").await.unwrap_err();
    match err {
        CaptionError::Upstream { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "model overloaded");
        }
        other => panic!("expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wrong_key_is_rejected() {
    let base = spawn_fake_endpoint(&[TEST_MODEL]).await;
    let captioner = OpenAiCaptioner::new(ApiConfig {
        api_key: "wrong".into(),
        model: Some(TEST_MODEL.into()),
        ..api(&base)
    })
    .unwrap();

    let err = captioner.caption(&png(), "hi").await.unwrap_err();
    assert!(matches!(err, CaptionError::Upstream { status: 401, .. }));
}

#[tokio::test]
async fn test_index_serves_form() {
    let response = app()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Mix Captioner"));
    assert!(html.contains("/api/batch"));
}

#[tokio::test]
async fn test_batch_endpoint_returns_summary_and_archive() {
    let base = spawn_fake_endpoint(&[TEST_MODEL]).await;
    let prompts = json!([
        { "caption_type": "descriptive", "length": "short", "weight": 2.0 },
        { "caption_type": "casual", "length": "any", "weight": 0 }
    ]);

    let response = app()
        .oneshot(form_request(
            "/api/batch",
            vec![
                Part::File("images", "photos/first.png", png()),
                Part::File("images", "broken.png", b"not an image".to_vec()),
                Part::File("images", "third.jpg", png()),
                Part::Text("prompts", prompts.to_string()),
                Part::Text("api", json!({ "base_url": base, "api_key": TEST_KEY }).to_string()),
                Part::Text("seed", "42".into()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let result = &body["result"];
    assert_eq!(result["total"], 3);
    assert_eq!(result["succeeded"], 2);
    assert_eq!(result["failed"], 1);
    assert_eq!(result["usage_counts"]["0"], 3);
    assert_eq!(result["usage_counts"]["1"], 0);
    assert!(result["artifacts"][0]["label"]
        .as_str()
        .unwrap()
        .ends_with("first.png"));
    assert_eq!(result["artifacts"][1]["content"]["status"], "failed");
    assert_eq!(
        result["artifacts"][2]["content"]["text"],
        "captioned: Write a short detailed description for this image."
    );
    assert!(body["summary"]
        .as_str()
        .unwrap()
        .contains("- **Failed**: 1"));
    assert_eq!(body["archive_name"], "mix_caption_results.zip");

    let archive = general_purpose::STANDARD
        .decode(body["archive_base64"].as_str().unwrap())
        .unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["broken.txt", "first.txt", "third.txt"]);

    let mut text = String::new();
    std::io::Read::read_to_string(&mut zip.by_name("broken.txt").unwrap(), &mut text).unwrap();
    assert!(text.starts_with("Error: invalid image"), "{}", text);
}

#[tokio::test]
async fn test_batch_without_images_is_rejected() {
    let response = app()
        .oneshot(form_request(
            "/api/batch",
            vec![Part::Text(
                "prompts",
                json!([{ "caption_type": "casual", "weight": 1 }]).to_string(),
            )],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "no input");
}

#[tokio::test]
async fn test_batch_with_only_zero_weights_is_rejected() {
    let response = app()
        .oneshot(form_request(
            "/api/batch",
            vec![
                Part::File("images", "a.png", png()),
                Part::Text(
                    "prompts",
                    json!([{ "caption_type": "casual", "weight": 0 }]).to_string(),
                ),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "no usable prompt");
}

#[tokio::test]
async fn test_single_caption_endpoint() {
    let base = spawn_fake_endpoint(&[TEST_MODEL]).await;
    let response = app()
        .oneshot(form_request(
            "/api/caption",
            vec![
                Part::File("image", "cat.png", png()),
                Part::Text(
                    "prompt",
                    json!({ "caption_type": "midjourney", "length": "any" }).to_string(),
                ),
                Part::Text("api", json!({ "base_url": base, "api_key": TEST_KEY }).to_string()),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(
        body["caption"],
        "captioned: Write a MidJourney prompt for this image."
    );
    assert_eq!(body["model"], TEST_MODEL);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_bad_gateway() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/test-connection")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "api_key": TEST_KEY }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
