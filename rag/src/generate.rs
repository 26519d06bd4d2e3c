use std::str::FromStr;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::build_prompt::Message;
use crate::config::Config;
use crate::error::{RagError, Result};
use crate::http::{post, post_json};
use crate::stream_decode::{decode_stream, FragmentStream};

/// Wire contract of the generation backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseShape {
    /// `POST /generate`, replies `{response, done}`.
    Flat,
    /// `POST /chat`, replies `{message: {role, content}, done}`.
    Chat,
}

impl FromStr for ResponseShape {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" | "generate" => Ok(Self::Flat),
            "chat" => Ok(Self::Chat),
            other => Err(RagError::Config(format!("unknown response shape `{other}`"))),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Serialize)]
struct PullRequest<'a> {
    name: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// HTTP client for the text-generation backend.
#[derive(Clone)]
pub struct GenerationClient {
    client: Client,
    base_url: String,
    model: String,
    shape: ResponseShape,
}

impl GenerationClient {
    pub fn new(client: Client, base_url: &str, model: &str, shape: ResponseShape) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            shape,
        }
    }

    pub fn from_config(cfg: &Config, client: Client) -> Self {
        Self::new(client, &cfg.ollama_url, &cfg.chat_model, cfg.response_shape)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Full answer in one response. Transport and status errors are returned as-is, no retry.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let answer = match self.shape {
            ResponseShape::Flat => {
                let url = format!("{}/generate", self.base_url);
                let req = GenerateRequest {
                    model: &self.model,
                    prompt,
                    stream: false,
                };
                post_json::<GenerateResponse, _>(&self.client, &url, &req)
                    .await?
                    .response
            }
            ResponseShape::Chat => {
                let url = format!("{}/chat", self.base_url);
                let messages = [Message::user(prompt)];
                let req = ChatRequest {
                    model: &self.model,
                    messages: &messages,
                    stream: false,
                };
                post_json::<ChatResponse, _>(&self.client, &url, &req)
                    .await?
                    .message
                    .content
            }
        };
        debug!(chars = answer.chars().count(), "generated answer");
        Ok(answer)
    }

    /// Opens a streaming generation. Dropping the returned stream closes the connection.
    pub async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        let resp = match self.shape {
            ResponseShape::Flat => {
                let url = format!("{}/generate", self.base_url);
                let req = GenerateRequest {
                    model: &self.model,
                    prompt,
                    stream: true,
                };
                post(&self.client, &url, &req).await?
            }
            ResponseShape::Chat => {
                let url = format!("{}/chat", self.base_url);
                let messages = [Message::user(prompt)];
                let req = ChatRequest {
                    model: &self.model,
                    messages: &messages,
                    stream: true,
                };
                post(&self.client, &url, &req).await?
            }
        };
        Ok(decode_stream(Box::pin(resp.bytes_stream()), self.shape))
    }

    /// Asks the backend to download `model`; waits for the final status.
    pub async fn pull_model(&self, model: &str) -> Result<()> {
        let url = format!("{}/pull", self.base_url);
        let req = PullRequest {
            name: model,
            stream: false,
        };
        post_json::<serde_json::Value, _>(&self.client, &url, &req).await?;
        info!(model, "model pulled successfully");
        Ok(())
    }
}
