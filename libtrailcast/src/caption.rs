//! Caption generation with a deterministic fallback
//!
//! Captions come from a remote chat-completions endpoint when an API key
//! is configured, and from a local template otherwise. Generation never
//! fails: any gateway problem degrades to the template caption with a
//! warning attached, so scheduling and dispatch keep working offline.

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::CaptionConfig;
use crate::types::ContentItem;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// A caption plus provenance
#[derive(Debug, Clone)]
pub struct GeneratedCaption {
    pub text: String,
    /// True when the template produced the text instead of the gateway
    pub used_fallback: bool,
    /// Present when the gateway was tried and failed
    pub warning: Option<String>,
}

/// Template caption: title, summary and the configured default hashtags
///
/// Deterministic for a given (title, summary) and config. Item tags do
/// not feed the template; they only shape the remote prompt.
pub fn fallback_caption(item: &ContentItem, default_hashtags: &[String]) -> String {
    format!(
        "{} — {} {}",
        item.title,
        item.summary,
        default_hashtags.join(" ")
    )
}

pub struct CaptionGateway {
    config: CaptionConfig,
    client: reqwest::Client,
    api_key: Option<String>,
}

impl CaptionGateway {
    /// Build a gateway from config
    ///
    /// A missing or unreadable key file disables remote generation rather
    /// than erroring; the gateway then only produces template captions.
    pub fn new(config: CaptionConfig) -> Self {
        let api_key = config.key_file.as_ref().and_then(|key_file| {
            let path = shellexpand::tilde(key_file).to_string();
            match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    let key = contents.trim().to_string();
                    if key.is_empty() {
                        warn!(key_file = %path, "Caption API key file is empty, remote captions disabled");
                        None
                    } else {
                        Some(key)
                    }
                }
                Err(e) => {
                    warn!(key_file = %path, error = %e, "Cannot read caption API key, remote captions disabled");
                    None
                }
            }
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            config,
            client,
            api_key,
        }
    }

    pub fn remote_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a caption for the item. Infallible: gateway errors fall
    /// back to the template caption with the failure noted in `warning`.
    pub async fn generate(&self, item: &ContentItem) -> GeneratedCaption {
        let Some(api_key) = &self.api_key else {
            debug!(content_id = %item.id, "No caption API key, using template caption");
            return GeneratedCaption {
                text: fallback_caption(item, &self.config.hashtags),
                used_fallback: true,
                warning: None,
            };
        };

        match self.request_caption(item, api_key).await {
            Ok(text) => GeneratedCaption {
                text,
                used_fallback: false,
                warning: None,
            },
            Err(reason) => {
                warn!(content_id = %item.id, error = %reason, "Caption gateway failed, using template caption");
                GeneratedCaption {
                    text: fallback_caption(item, &self.config.hashtags),
                    used_fallback: true,
                    warning: Some(reason),
                }
            }
        }
    }

    async fn request_caption(
        &self,
        item: &ContentItem,
        api_key: &str,
    ) -> std::result::Result<String, String> {
        let url = self
            .config
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You write short, engaging social media captions for a travel \
                                and wildlife page. Reply with the caption only.",
                },
                {
                    "role": "user",
                    "content": build_prompt(item, &self.config.hashtags),
                },
            ],
            "max_tokens": 120,
        });

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status.as_u16(), detail));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| format!("invalid response body: {}", e))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "response contained no caption".to_string())?;

        Ok(text)
    }
}

fn build_prompt(item: &ContentItem, default_hashtags: &[String]) -> String {
    let hashtags = if item.tags.is_empty() {
        default_hashtags.join(" ")
    } else {
        item.tags.join(" ")
    };
    format!(
        "Write a caption for this post.\nTitle: {}\nSummary: {}\nInclude these hashtags: {}",
        item.title, item.summary, hashtags
    )
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> ContentItem {
        ContentItem::new(
            "Top Safari Lodges in Queen Elizabeth NP".to_string(),
            "A tour of the lodges with the best sunrise views over the Kazinga Channel."
                .to_string(),
            vec!["#QueenElizabethNP".to_string(), "#Safari".to_string()],
        )
    }

    #[test]
    fn test_fallback_caption_template() {
        let item = sample_item();
        let defaults = vec!["#Travel".to_string(), "#Wildlife".to_string()];
        let caption = fallback_caption(&item, &defaults);

        assert_eq!(
            caption,
            "Top Safari Lodges in Queen Elizabeth NP — A tour of the lodges with the best \
             sunrise views over the Kazinga Channel. #Travel #Wildlife"
        );
    }

    #[test]
    fn test_fallback_caption_is_deterministic() {
        let item = sample_item();
        let defaults = vec!["#Travel".to_string()];
        assert_eq!(
            fallback_caption(&item, &defaults),
            fallback_caption(&item, &defaults)
        );
    }

    #[test]
    fn test_fallback_caption_ignores_item_tags() {
        // Two items with the same title and summary get the same caption
        // no matter how they are tagged
        let defaults = vec!["#Travel".to_string()];
        let a = ContentItem::new(
            "Murchison Falls".to_string(),
            "Falls guide".to_string(),
            vec!["#MurchisonFalls".to_string()],
        );
        let b = ContentItem::new(
            "Murchison Falls".to_string(),
            "Falls guide".to_string(),
            vec!["#Boat".to_string()],
        );

        assert_eq!(fallback_caption(&a, &defaults), fallback_caption(&b, &defaults));
        assert_eq!(
            fallback_caption(&a, &defaults),
            "Murchison Falls — Falls guide #Travel"
        );
    }

    #[tokio::test]
    async fn test_generate_without_key_uses_template() {
        let gateway = CaptionGateway::new(CaptionConfig::default());
        assert!(!gateway.remote_enabled());

        let item = sample_item();
        let caption = gateway.generate(&item).await;

        assert!(caption.used_fallback);
        assert!(caption.warning.is_none());
        assert_eq!(
            caption.text,
            fallback_caption(&item, &CaptionConfig::default().hashtags)
        );
    }

    #[tokio::test]
    async fn test_generate_with_missing_key_file() {
        let config = CaptionConfig {
            key_file: Some("/nonexistent/trailcast-test.key".to_string()),
            ..CaptionConfig::default()
        };
        let gateway = CaptionGateway::new(config);

        // Unreadable key file disables remote generation, not an error
        assert!(!gateway.remote_enabled());
        let caption = gateway.generate(&sample_item()).await;
        assert!(caption.used_fallback);
    }

    #[test]
    fn test_prompt_includes_item_fields() {
        let item = sample_item();
        let prompt = build_prompt(&item, &[]);

        assert!(prompt.contains("Top Safari Lodges in Queen Elizabeth NP"));
        assert!(prompt.contains("Kazinga Channel"));
        assert!(prompt.contains("#QueenElizabethNP #Safari"));
    }

    fn temp_key_file() -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "test-api-key").unwrap();
        file
    }

    /// Serve one canned HTTP response to every connection
    async fn spawn_stub_server(response: &'static [u8]) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response).await;
            }
        });
        format!("http://{}", addr)
    }

    fn remote_config(api_url: String, key_file: &tempfile::NamedTempFile) -> CaptionConfig {
        CaptionConfig {
            api_url: Some(api_url),
            key_file: Some(key_file.path().to_string_lossy().to_string()),
            timeout_secs: 5,
            ..CaptionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_remote_500() {
        let url = spawn_stub_server(
            b"HTTP/1.1 500 Internal Server Error\r\n\
              content-length: 5\r\nconnection: close\r\n\r\noops!",
        )
        .await;
        let key = temp_key_file();
        let config = remote_config(url, &key);
        let gateway = CaptionGateway::new(config.clone());
        assert!(gateway.remote_enabled());

        let item = sample_item();
        let caption = gateway.generate(&item).await;

        assert!(caption.used_fallback);
        assert!(caption.warning.unwrap().contains("500"));
        assert_eq!(caption.text, fallback_caption(&item, &config.hashtags));
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_malformed_body() {
        let url = spawn_stub_server(
            b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
              content-length: 9\r\nconnection: close\r\n\r\nnot json!",
        )
        .await;
        let key = temp_key_file();
        let config = remote_config(url, &key);
        let gateway = CaptionGateway::new(config.clone());

        let item = sample_item();
        let caption = gateway.generate(&item).await;

        assert!(caption.used_fallback);
        assert!(caption.warning.unwrap().contains("invalid response body"));
        assert_eq!(caption.text, fallback_caption(&item, &config.hashtags));
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_connect_error() {
        // Port 1 is never listening
        let key = temp_key_file();
        let config = remote_config("http://127.0.0.1:1".to_string(), &key);
        let gateway = CaptionGateway::new(config.clone());
        assert!(gateway.remote_enabled());

        let item = sample_item();
        let caption = gateway.generate(&item).await;

        assert!(caption.used_fallback);
        assert!(caption.warning.unwrap().contains("request failed"));
        assert_eq!(caption.text, fallback_caption(&item, &config.hashtags));
    }

    #[test]
    fn test_chat_response_parsing() {
        let raw = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "  Golden hour over the channel.  "}}
            ]
        }"#;

        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.trim(),
            "Golden hour over the channel."
        );
    }
}
