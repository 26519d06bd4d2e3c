use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;

use crate::error::{RagError, Result};

pub fn build_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))
}

pub async fn post_json<T: DeserializeOwned, B: Serialize>(
    client: &Client,
    url: &str,
    body: &B,
) -> Result<T> {
    let resp = post(client, url, body).await?;
    let text = resp.text().await.map_err(|e| transport(url, e))?;
    from_str::<T>(&text).map_err(|e| RagError::Decode(format!("POST {url}: {e} | {text}")))
}

/// Sends the request and checks the status, leaving the body unread for streaming.
pub async fn post<B: Serialize>(client: &Client, url: &str, body: &B) -> Result<Response> {
    let resp = client
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| transport(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(RagError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: text,
        });
    }
    Ok(resp)
}

fn transport(url: &str, source: reqwest::Error) -> RagError {
    RagError::Transport {
        url: url.to_string(),
        source,
    }
}
