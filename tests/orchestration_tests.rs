//! End-to-end behavior of the speech pipeline: fallback ordering, caching,
//! rate limiting, and payload gates.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{
    ScriptedFactory, build_app, delete, full_chain_config, get, get_raw, initialize_agent,
    post_audio, post_json,
};
use voxgate::config::settings::ProviderId;

const STT_URI: &str = "/v1/stt/process?agent_id=agent-1&user_id=user-1";

#[tokio::test]
async fn transcription_uses_the_highest_priority_provider() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 1024]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["provider_used"], "yandex");
    assert_eq!(body["text"], "transcript from yandex");
    assert_eq!(body["cached"], false);
    assert_eq!(body["file_info"]["size_bytes"], 1024);
    assert_eq!(body["file_info"]["mime_type"], "audio/wav");
    assert!(body["processing_time_ms"].is_u64());
    assert_eq!(body["attempts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn fallback_walks_the_chain_in_priority_order() {
    let app = build_app(
        ScriptedFactory::with_failing(&[ProviderId::Yandex, ProviderId::Openai]),
        &ProviderId::ALL,
    );
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 1024]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider_used"], "google");
    let attempts = body["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 3);
    assert_eq!(attempts[0]["provider"], "yandex");
    assert_eq!(attempts[0]["success"], false);
    assert_eq!(attempts[1]["provider"], "openai");
    assert_eq!(attempts[2]["provider"], "google");
    assert_eq!(attempts[2]["success"], true);
}

#[tokio::test]
async fn missing_credentials_are_skipped_not_attempted() {
    let app = build_app(ScriptedFactory::all_succeeding(), &[ProviderId::Google]);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 1024]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider_used"], "google");
    assert_eq!(body["attempts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn exhausted_chain_is_a_bad_gateway_with_the_attempt_log() {
    let app = build_app(
        ScriptedFactory::with_failing(&ProviderId::ALL),
        &ProviderId::ALL,
    );
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 1024]).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "ALL_PROVIDERS_FAILED");
    let attempts = body["details"]["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 3);
    assert!(attempts.iter().all(|a| a["success"] == false));
}

#[tokio::test]
async fn fallback_disabled_stops_the_chain() {
    let app = build_app(
        ScriptedFactory::with_failing(&[ProviderId::Yandex]),
        &ProviderId::ALL,
    );
    let mut config = full_chain_config();
    config["providers"][0]["fallback_enabled"] = json!(false);
    initialize_agent(&app, "agent-1", config).await;

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 1024]).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let attempts = body["details"]["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["provider"], "yandex");
}

#[tokio::test]
async fn explicit_provider_bypasses_the_chain() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let uri = format!("{STT_URI}&provider=google");
    let (status, body) = post_audio(&app, &uri, "audio/wav", vec![0u8; 1024]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider_used"], "google");
}

#[tokio::test]
async fn unconfigured_explicit_provider_is_rejected() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    let mut config = full_chain_config();
    config["providers"].as_array_mut().unwrap().pop(); // drop google
    initialize_agent(&app, "agent-1", config).await;

    let uri = format!("{STT_URI}&provider=google");
    let (status, body) = post_audio(&app, &uri, "audio/wav", vec![0u8; 1024]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn identical_payload_shape_hits_the_cache() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (_, first) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 2048]).await;
    assert_eq!(first["cached"], false);

    let (status, second) = post_audio(&app, STT_URI, "audio/wav", vec![1u8; 2048]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(second["text"], first["text"]);
    assert!(second["attempts"].as_array().unwrap().is_empty());

    let (_, metrics) = get(&app, "/v1/metrics/agent-1").await;
    assert_eq!(metrics["cache_global"]["hits"], 1);
    assert_eq!(metrics["stt_cache_hits"], 1);
}

#[tokio::test]
async fn cache_purge_forces_a_fresh_transcription() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    post_audio(&app, STT_URI, "audio/wav", vec![0u8; 2048]).await;
    let (status, body) = delete(&app, "/v1/cache/agent-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purged"], true);

    let (_, after) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 2048]).await;
    assert_eq!(after["cached"], false);
}

#[tokio::test]
async fn rate_limit_rejects_beyond_the_window_budget() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    let mut config = full_chain_config();
    config["rate_limit_per_minute"] = json!(2);
    config["cache_enabled"] = json!(false);
    initialize_agent(&app, "agent-1", config).await;

    for _ in 0..2 {
        let (status, _) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 64]).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 64]).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "RATE_LIMIT_EXCEEDED");
    assert_eq!(body["details"]["limit"], 2);
    assert_eq!(body["details"]["remaining"], 0);
    assert!(body["details"]["reset_time"].is_string());

    // A different user is unaffected.
    let other = "/v1/stt/process?agent_id=agent-1&user_id=user-2";
    let (status, _) = post_audio(&app, other, "audio/wav", vec![0u8; 64]).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn rate_limit_status_endpoint_is_non_consuming() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    post_audio(&app, STT_URI, "audio/wav", vec![0u8; 64]).await;

    for _ in 0..3 {
        let (status, body) = get(&app, "/v1/rate-limit/agent-1/user-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_requests"], 1);
        assert_eq!(body["limit"], 100);
    }
}

#[tokio::test]
async fn oversized_payloads_are_rejected_at_the_boundary() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    let mut config = full_chain_config();
    config["max_file_size_mb"] = json!(1);
    config["cache_enabled"] = json!(false);
    initialize_agent(&app, "agent-1", config).await;

    // Exactly at the limit passes.
    let (status, _) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 1024 * 1024]).await;
    assert_eq!(status, StatusCode::OK);

    // One byte over does not.
    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 1024 * 1024 + 1]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"], "FILE_TOO_LARGE");
    assert_eq!(body["details"]["limit_bytes"], 1024 * 1024);
}

#[tokio::test]
async fn unsupported_audio_formats_are_rejected() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_audio(&app, STT_URI, "video/mp4", vec![0u8; 64]).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn uninitialized_agent_is_service_unavailable_for_voice() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 64]).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "ORCHESTRATOR_NOT_INITIALIZED");
}

#[tokio::test]
async fn disabled_agent_rejects_voice_input() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    let mut config = full_chain_config();
    config["enabled"] = json!(false);
    initialize_agent(&app, "agent-1", config).await;

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 64]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn synthesis_returns_a_downloadable_url() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_json(
        &app,
        "/v1/tts/synthesize",
        json!({ "agent_id": "agent-1", "user_id": "user-1", "text": "hello" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["provider_used"], "yandex");
    let file_id = body["file_info"]["file_id"].as_str().unwrap();
    let url = body["audio_url"].as_str().unwrap();
    assert!(url.ends_with(&format!("/v1/files/{file_id}")));

    let (status, content_type, bytes) = get_raw(&app, &format!("/v1/files/{file_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("audio/mpeg"));
    assert_eq!(bytes.as_ref(), b"yandex:hello");
}

#[tokio::test]
async fn synthesis_falls_back_like_transcription() {
    let app = build_app(
        ScriptedFactory::with_failing(&[ProviderId::Yandex]),
        &ProviderId::ALL,
    );
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_json(
        &app,
        "/v1/tts/synthesize",
        json!({ "agent_id": "agent-1", "user_id": "user-1", "text": "hello" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider_used"], "openai");
    assert_eq!(body["attempts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn empty_synthesis_text_is_rejected() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;

    let (status, body) = post_json(
        &app,
        "/v1/tts/synthesize",
        json!({ "agent_id": "agent-1", "user_id": "user-1", "text": "" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn reinitialization_replaces_settings_and_handles() {
    let app = build_app(ScriptedFactory::all_succeeding(), &ProviderId::ALL);
    initialize_agent(&app, "agent-1", full_chain_config()).await;
    post_audio(&app, STT_URI, "audio/wav", vec![0u8; 64]).await;

    let mut config = full_chain_config();
    config["providers"] = json!([
        { "provider": "openai", "priority": 1, "stt": {}, "tts": {} }
    ]);
    initialize_agent(&app, "agent-1", config).await;

    let (_, health) = get(&app, "/v1/agents/agent-1/health").await;
    let providers = health["providers"].as_array().unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0]["health"]["state"], "uninitialized");

    let (status, body) = post_audio(&app, STT_URI, "audio/wav", vec![0u8; 4096]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider_used"], "openai");
}
