//! OpenAI API client: chat completions and speech synthesis.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

const CHAT_MODEL: &str = "gpt-3.5-turbo";
// tts-1 is faster but lower quality
const TTS_MODEL: &str = "tts-1-hd";
const TTS_VOICE: &str = "nova";

pub struct Client {
    api_key: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest {
    model: &'static str,
    messages: Vec<ChatRequestMessage>,
}

#[derive(Serialize)]
struct ChatRequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Serialize)]
struct SpeechRequest {
    model: &'static str,
    voice: &'static str,
    input: String,
    /// "opus" yields OGG Opus, directly sendable as a Telegram voice message.
    response_format: &'static str,
}

impl Client {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to build HTTP client");

        Self { api_key, http }
    }

    /// Request a completion. Returns the trimmed assistant text;
    /// an empty answer is [`Error::Empty`].
    pub async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, Error> {
        let request = ChatRequest {
            model: CHAT_MODEL,
            messages: vec![
                ChatRequestMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatRequestMessage {
                    role: "user",
                    content: user_message.to_string(),
                },
            ],
        };

        let response = self
            .http
            .post(CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        let text = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or("")
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(Error::Empty);
        }

        debug!("Completion: {} chars", text.len());
        Ok(text)
    }

    /// Generate speech for a reply. Returns OGG Opus audio bytes.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, Error> {
        let preview: String = text.chars().take(50).collect();
        info!("TTS: \"{}\"", preview);

        let request = SpeechRequest {
            model: TTS_MODEL,
            voice: TTS_VOICE,
            input: text.to_string(),
            response_format: "opus",
        };

        let response = self
            .http
            .post(SPEECH_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("{status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if audio.is_empty() {
            return Err(Error::Empty);
        }

        info!("Generated {} bytes of voice audio", audio.len());
        Ok(audio.to_vec())
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api(String),
    Parse(String),
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api(e) => write!(f, "API error: {e}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
        }
    }
}

impl std::error::Error for Error {}
