//! OpenAI 兼容接口的 AI 服务客户端
//!
//! 语言检测与翻译走 chat completions，内容审核走 moderations。
//! 这里只负责 HTTP 调用并如实上报失败，兜底策略统一在应用层的
//! AiPipeline 处理。

use std::collections::HashMap;

use application::{AiProvider, ProviderError, ProviderModeration};
use async_trait::async_trait;
use domain::LanguageCode;
use serde::{Deserialize, Serialize};

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn chat_completion(
        &self,
        system_prompt: String,
        user_prompt: String,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn detect(&self, text: &str) -> Result<String, ProviderError> {
        self.chat_completion(
            "You are a language detector. Respond with only the ISO 639-1 language code \
             (e.g., 'en', 'es', 'fr')."
                .to_string(),
            format!(
                "Detect the language of this text and respond with only the ISO 639-1 code: {text}"
            ),
            10,
            0.0,
        )
        .await
    }

    async fn moderate(&self, text: &str) -> Result<ProviderModeration, ProviderError> {
        let response = self
            .client
            .post(format!("{}/moderations", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&ModerationRequest { input: text })
            .send()
            .await
            .map_err(|err| ProviderError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let body: ModerationResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        let entry = body
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("no moderation results".to_string()))?;

        Ok(ProviderModeration {
            flagged: entry.flagged,
            category_scores: entry.category_scores,
        })
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        // 指示服务只输出译文本身，不附加任何说明
        self.chat_completion(
            format!(
                "You are a professional translator. Translate the following text from {source} \
                 to {target}. Only return the translated text, nothing else."
            ),
            text.to_string(),
            500,
            0.3,
        )
        .await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationEntry>,
}

#[derive(Debug, Deserialize)]
struct ModerationEntry {
    flagged: bool,
    category_scores: HashMap<String, f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(server.uri(), "test-key", "gpt-test")
    }

    #[tokio::test]
    async fn test_detect_returns_trimmed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-test" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": " es\n" } }]
            })))
            .mount(&server)
            .await;

        let detected = provider(&server).detect("hola mundo").await.unwrap();
        assert_eq!(detected, "es");
    }

    #[tokio::test]
    async fn test_translate_uses_language_pair_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    {
                        "role": "system",
                        "content": "You are a professional translator. Translate the following \
                                    text from es to en. Only return the translated text, nothing else."
                    },
                    { "role": "user", "content": "hola" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "content": "hello" } }]
            })))
            .mount(&server)
            .await;

        let translated = provider(&server)
            .translate(
                "hola",
                &LanguageCode::parse("es").unwrap(),
                &LanguageCode::parse("en").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(translated, "hello");
    }

    #[tokio::test]
    async fn test_moderation_scores_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/moderations"))
            .and(body_partial_json(serde_json::json!({ "input": "some text" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "flagged": true,
                    "category_scores": { "harassment": 0.92, "hate": 0.12 }
                }]
            })))
            .mount(&server)
            .await;

        let moderation = provider(&server).moderate("some text").await.unwrap();
        assert!(moderation.flagged);
        assert_eq!(moderation.category_scores["harassment"], 0.92);
        assert_eq!(moderation.category_scores.len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = provider(&server).detect("hola").await;
        assert!(matches!(result, Err(ProviderError::Request(_))));
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let result = provider(&server).detect("hola").await;
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }
}
