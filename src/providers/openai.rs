//! OpenAI-compatible HTTP client implementing every search capability.
//!
//! - parse: chat completion in JSON mode, decoded into a `ParsedQuery`
//! - embed: `/embeddings` with the configured model
//! - generate: chat completion over a compact digest of the top cards

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::catalog::{Card, Locale};
use crate::config::LlmConfig;
use crate::filter::ParsedQuery;
use crate::providers::{AnswerGenerator, Embedder, ProviderError, QueryParser};

const PARSER_PROMPT: &str = r#"You translate trading card search requests into JSON.
Reply with a single JSON object:
{
  "filters": {
    "name": string, "category": "Pokemon" | "Trainer", "stage": string,
    "rarity": string, "set": string, "types": [string],
    "hp_gte": number, "hp_lte": number,
    "attack_damage_gte": number, "attack_damage_lte": number,
    "retreat_lte": number, "weakness_type": string, "has_ability": boolean
  },
  "semantic_query": string | null
}
Only include filters the request states explicitly. Put descriptive or
thematic wording (appearance, mood, play style) in "semantic_query", or null
if nothing is left after extracting filters."#;

const ANSWER_PROMPT: &str = "You are a helpful trading card expert. Answer the user's request \
using only the cards provided. Mention cards by name. Be brief.";

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
    dimensions: usize,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, dimensions: usize) -> Result<Self, ProviderError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingApiKey(config.api_key_env.clone()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            dimensions,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<Value>().await?)
    }

    async fn chat(&self, system: &str, user: &str, json_mode: bool) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.chat_model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });
        if json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }

        let resp = self.post("/chat/completions", &body).await?;
        chat_content(&resp)
    }
}

#[async_trait]
impl QueryParser for OpenAiClient {
    async fn parse(&self, text: &str, locale: Locale) -> Result<ParsedQuery, ProviderError> {
        let user = format!("Language: {}\nRequest: {}", locale, text);
        let content = self.chat(PARSER_PROMPT, &user, true).await?;
        parse_query_content(&content)
    }
}

#[async_trait]
impl Embedder for OpenAiClient {
    async fn embed(&self, text: &str, _locale: Locale) -> Result<Vec<f32>, ProviderError> {
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });
        let resp = self.post("/embeddings", &body).await?;
        let embedding = extract_embedding(&resp)?;
        if embedding.len() != self.dimensions {
            return Err(ProviderError::Malformed(format!(
                "embedding has {} dimensions, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiClient {
    async fn generate(
        &self,
        query: &str,
        cards: &[Card],
        locale: Locale,
    ) -> Result<String, ProviderError> {
        let user = format!(
            "Language: {}\nRequest: {}\nCards: {}",
            locale,
            query,
            digest_cards(cards, locale)
        );
        self.chat(ANSWER_PROMPT, &user, false).await
    }
}

fn chat_content(resp: &Value) -> Result<String, ProviderError> {
    resp.pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .map(|s| s.to_owned())
        .ok_or_else(|| ProviderError::Malformed("chat response has no message content".to_string()))
}

fn parse_query_content(content: &str) -> Result<ParsedQuery, ProviderError> {
    let parsed: ParsedQuery = serde_json::from_str(content.trim())
        .map_err(|e| ProviderError::Malformed(format!("query parser output: {}", e)))?;
    Ok(parsed.normalized())
}

fn extract_embedding(resp: &Value) -> Result<Vec<f32>, ProviderError> {
    let values = resp
        .pointer("/data/0/embedding")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ProviderError::Malformed("embedding response has no data".to_string()))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| ProviderError::Malformed("non-numeric embedding value".to_string()))
        })
        .collect()
}

/// Compact, localized JSON summary of cards for the answer prompt.
fn digest_cards(cards: &[Card], locale: Locale) -> String {
    let digest: Vec<Value> = cards
        .iter()
        .map(|card| {
            json!({
                "id": card.id,
                "name": card.name.get(locale),
                "category": card.category,
                "stage": card.stage,
                "types": card.types,
                "hp": card.hp,
                "weakness": card.weakness,
                "retreat_cost": card.retreat_cost,
                "rarity": card.rarity,
                "set": card.set,
                "ability": card.ability.as_ref().map(|a| json!({
                    "name": a.name.get(locale),
                    "text": a.text.get(locale),
                })),
                "attacks": card.attacks.iter().map(|a| json!({
                    "name": a.name.get(locale),
                    "damage": a.damage,
                    "text": a.text.get(locale),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    Value::Array(digest).to_string()
}
