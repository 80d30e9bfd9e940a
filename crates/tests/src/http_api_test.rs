//! HTTP 接口集成测试
//!
//! 用真实的 HTTP 客户端驱动完整服务栈（内存存储，AI 停用），
//! 覆盖登录、房间管理、历史查询与手动翻译路由。

use std::sync::Arc;

use application::DisabledAiProvider;
use serde_json::json;
use tests::TestEnvironment;

async fn spawn() -> anyhow::Result<TestEnvironment> {
    TestEnvironment::spawn(Arc::new(DisabledAiProvider)).await
}

#[tokio::test]
async fn test_health_endpoint() -> anyhow::Result<()> {
    let env = spawn().await?;

    let response = env.client.get(env.url("/health")).send().await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "ok");
    Ok(())
}

#[tokio::test]
async fn test_login_upserts_and_refreshes_language() -> anyhow::Result<()> {
    let env = spawn().await?;

    let first: serde_json::Value = env
        .client
        .post(env.url("/api/auth/login"))
        .json(&json!({ "username": "alice", "preferred_language": "en" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(first["username"], "alice");
    assert!(!first["token"].as_str().unwrap().is_empty());

    // 再次登录复用同一用户并刷新语言偏好
    let second: serde_json::Value = env
        .client
        .post(env.url("/api/auth/login"))
        .json(&json!({ "username": "alice", "preferred_language": "fr" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(second["user_id"], first["user_id"]);
    assert_eq!(second["preferred_language"], "fr");
    Ok(())
}

#[tokio::test]
async fn test_login_rejects_invalid_username() -> anyhow::Result<()> {
    let env = spawn().await?;

    let response = env
        .client
        .post(env.url("/api/auth/login"))
        .json(&json!({ "username": "bad!name", "preferred_language": "en" }))
        .send()
        .await?;
    assert_eq!(response.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_room_listing_seeds_general() -> anyhow::Result<()> {
    let env = spawn().await?;

    let body: serde_json::Value = env
        .client
        .get(env.url("/api/rooms"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["rooms"][0]["name"], "general");
    Ok(())
}

#[tokio::test]
async fn test_create_room_conflicts_on_case_insensitive_duplicate() -> anyhow::Result<()> {
    let env = spawn().await?;

    let response = env
        .client
        .post(env.url("/api/rooms"))
        .json(&json!({ "room_name": "Rust" }))
        .send()
        .await?;
    assert_eq!(response.status(), 201);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["room"]["name"], "Rust");

    // 大小写不同视为重名
    let duplicate = env
        .client
        .post(env.url("/api/rooms"))
        .json(&json!({ "room_name": "rust" }))
        .send()
        .await?;
    assert_eq!(duplicate.status(), 409);

    // 只有空白的名字在修剪后被拒绝
    let blank = env
        .client
        .post(env.url("/api/rooms"))
        .json(&json!({ "room_name": "   " }))
        .send()
        .await?;
    assert_eq!(blank.status(), 400);
    Ok(())
}

#[tokio::test]
async fn test_history_resolves_reference_and_rejects_unknown() -> anyhow::Result<()> {
    let env = spawn().await?;

    // general 被引用时自动创建，历史为空
    let body: serde_json::Value = env
        .client
        .get(env.url("/api/messages/general"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["count"], 0);

    let response = env
        .client
        .get(env.url("/api/messages/nowhere"))
        .send()
        .await?;
    assert_eq!(response.status(), 404);
    Ok(())
}

#[tokio::test]
async fn test_translate_fails_soft_when_ai_disabled() -> anyhow::Result<()> {
    let env = spawn().await?;

    // AI 停用时翻译退回原文而不是报错
    let body: serde_json::Value = env
        .client
        .post(env.url("/api/translate"))
        .json(&json!({ "text": "hola", "target_language": "fr" }))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["translated_text"], "hola");
    assert_eq!(body["source_language"], "auto");

    let empty = env
        .client
        .post(env.url("/api/translate"))
        .json(&json!({ "text": "   ", "target_language": "fr" }))
        .send()
        .await?;
    assert_eq!(empty.status(), 400);
    Ok(())
}
