//! End-to-end tests against mocked providers over a real socket

mod common;

use mockito::Server;
use petcare_models::ModelId;
use serde_json::{Value, json};

const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";
const UPLOAD_PATH: &str = "/upload/v1beta/files";

fn gemini_text(text: &str) -> String {
    json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}).to_string()
}

fn completion(text: &str) -> String {
    json!({"choices": [{"message": {"role": "assistant", "content": text}}]}).to_string()
}

#[tokio::test]
async fn analyze_pet_rotates_past_rate_limited_key() {
    let mut provider = Server::new_async().await;
    let limited = provider
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "k1")
        .with_status(429)
        .with_body(r#"{"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#)
        .expect(1)
        .create_async()
        .await;
    let ok = provider
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "k2")
        .with_status(200)
        .with_body(gemini_text(
            r#"{"species": [{"species": "cat", "percentage": 90}, {"species": "lynx", "percentage": 10}], "breeds": [{"breed": "Maine Coon", "percentage": 80}]}"#,
        ))
        .expect(2)
        .create_async()
        .await;

    let config = common::mock_config(&provider.url());
    let (state, addr) = common::create_test_server(&config, &["k1", "k2"], &[]).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/gemini/analyze-pet?model=gemini-1.5-flash");

    let response = client
        .post(&url)
        .multipart(common::file_form(&[0xff, 0xd8, 0xff], "cat.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["species"][0]["species"], "cat");
    assert_eq!(body["breeds"][0]["breed"], "Maine Coon");

    // The second request starts at the key that worked.
    let response = client
        .post(&url)
        .multipart(common::file_form(&[0xff, 0xd8, 0xff], "cat.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    limited.assert_async().await;
    ok.assert_async().await;

    let gemini = state.registry.get(ModelId::Gemini);
    assert!(matches!(
        gemini.as_ref(),
        petcare_models::providers::Analyzer::Gemini(g) if g.pool().cursor() == 1
    ));
}

#[tokio::test]
async fn all_keys_rate_limited_returns_429() {
    let mut provider = Server::new_async().await;
    provider
        .mock("POST", UPLOAD_PATH)
        .with_status(429)
        .with_body(r#"{"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#)
        .expect(2)
        .create_async()
        .await;

    let config = common::mock_config(&provider.url());
    let (_state, addr) = common::create_test_server(&config, &["k1", "k2"], &[]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/gemini/analyze-audio"))
        .multipart(common::file_form(b"RIFF....", "bark.wav", "audio/wav"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("rate limited"));
}

#[tokio::test]
async fn provider_failure_returns_502() {
    let mut provider = Server::new_async().await;
    provider
        .mock("POST", GENERATE_PATH)
        .with_status(500)
        .with_body(r#"{"error": {"code": 500, "message": "backend exploded", "status": "INTERNAL"}}"#)
        .expect(1)
        .create_async()
        .await;

    let config = common::mock_config(&provider.url());
    let (_state, addr) = common::create_test_server(&config, &["k1", "k2"], &[]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/gemini/analyze-activity"))
        .multipart(common::file_form(&[0x89, b'P', b'N', b'G'], "room.png", "image/png"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("AI provider error"));
    assert!(detail.contains("backend exploded"));
}

#[tokio::test]
async fn activity_is_normalized() {
    let mut provider = Server::new_async().await;
    provider
        .mock("POST", GENERATE_PATH)
        .with_status(200)
        .with_body(gemini_text(
            r#"{"sleep": "420", "meals": 2, "activity": "  Moderate "}"#,
        ))
        .create_async()
        .await;

    let config = common::mock_config(&provider.url());
    let (_state, addr) = common::create_test_server(&config, &["k1"], &[]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/gemini/analyze-activity"))
        .multipart(common::file_form(&[0xff, 0xd8], "frame.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["meals_count"], 2);
    assert_eq!(body["activity"], "Moderate");
}

#[tokio::test]
async fn generate_text_defaults_to_llama() {
    let mut provider = Server::new_async().await;
    let mock = provider
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer hf_one")
        .with_status(200)
        .with_body(completion("Cats nap a lot."))
        .create_async()
        .await;

    let config = common::mock_config(&provider.url());
    let (_state, addr) = common::create_test_server(&config, &[], &["hf_one"]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/gemini/generate-text"))
        .json(&json!({"prompt": "Tell me about cats", "max_new_tokens": 64}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["model"], "llama");
    assert_eq!(body["generated_text"], "Cats nap a lot.");
    mock.assert_async().await;
}

#[tokio::test]
async fn gated_vision_model_returns_503() {
    let mut provider = Server::new_async().await;
    provider
        .mock("POST", "/chat/completions")
        .with_status(403)
        .with_body(r#"{"error": "Access to model is restricted"}"#)
        .create_async()
        .await;

    let config = common::mock_config(&provider.url());
    let (_state, addr) = common::create_test_server(&config, &[], &["hf_one"]).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/api/v1/gemini/analyze-pet?model=llama-vision"))
        .multipart(common::file_form(&[0xff, 0xd8], "dog.jpg", "image/jpeg"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("license"));
}
