//! 消息管线集成测试
//!
//! AI 客户端打到 wiremock 模拟的后端，覆盖从加入房间到广播的完整链路：
//! 语言检测、内容审核、翻译扇出、缓存命中与历史查询。

use std::sync::Arc;

use application::{JoinRoomRequest, ServerEvent};
use domain::{ConnectionId, LanguageCode, UserId, Username};
use infrastructure::OpenAiProvider;
use serde_json::json;
use tests::TestEnvironment;
use tokio::sync::mpsc;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn connect(env: &TestEnvironment) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
    let connection_id = ConnectionId::from(Uuid::new_v4());
    let (tx, rx) = mpsc::unbounded_channel();
    env.state.event_router.register(connection_id, tx).await;
    (connection_id, rx)
}

async fn join(env: &TestEnvironment, connection_id: ConnectionId, name: &str, lang: &str) {
    env.state
        .chat_service
        .join_room(
            connection_id,
            JoinRoomRequest {
                user_id: UserId::from(Uuid::new_v4()),
                username: Username::parse(name).unwrap(),
                room: "general".to_string(),
                preferred_language: LanguageCode::parse(lang).unwrap(),
            },
        )
        .await;
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_send_message_full_pipeline_with_ai_backend() -> anyhow::Result<()> {
    let server = MockServer::start().await;

    // 语言检测（低 max_tokens 的 chat completion）固定返回 es
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "max_tokens": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "es" } }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    // 翻译只会被调用一次：第二条相同消息命中缓存
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "max_tokens": 500 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "hello" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/moderations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "flagged": false, "category_scores": { "harassment": 0.02 } }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = Arc::new(OpenAiProvider::new(server.uri(), "test-key", "gpt-test"));
    let env = TestEnvironment::spawn(provider).await?;

    // 两个语言偏好不同的用户进入同一房间
    let (alice, mut alice_rx) = connect(&env).await;
    let (bob, mut bob_rx) = connect(&env).await;
    join(&env, alice, "alice", "en").await;
    join(&env, bob, "bob", "es").await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    let room = env.state.registry.resolve_room("general").await?;
    env.state.chat_service.send_message(bob, room.id, "hola").await;

    // 双方都收到完整增强后的广播：源语言透传，目标语言来自翻译后端
    for rx in [&mut alice_rx, &mut bob_rx] {
        let events = drain(rx);
        match events.as_slice() {
            [ServerEvent::ReceiveMessage {
                username,
                source_language,
                translations,
                is_flagged,
                ..
            }] => {
                assert_eq!(username, "bob");
                assert_eq!(source_language.as_str(), "es");
                assert!(!is_flagged);
                assert_eq!(translations[&LanguageCode::parse("es")?], "hola");
                assert_eq!(translations[&LanguageCode::parse("en")?], "hello");
            }
            other => panic!("expected a single receive_message, got {other:?}"),
        }
    }

    // 相同文本再次发送仍然广播；翻译调用次数由 mock 的 expect(1) 校验
    env.state.chat_service.send_message(bob, room.id, "hola").await;
    assert_eq!(drain(&mut alice_rx).len(), 1);
    assert_eq!(drain(&mut bob_rx).len(), 1);

    // 两条消息都已持久化，历史接口按时间升序读回
    let body: serde_json::Value = env
        .client
        .get(env.url("/api/messages/general"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["count"], 2);
    assert_eq!(body["messages"][0]["original_text"], "hola");
    assert_eq!(body["messages"][0]["translations"]["en"], "hello");
    Ok(())
}
