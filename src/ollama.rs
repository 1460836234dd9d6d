use crate::config::OllamaSettings;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::time::Duration;

pub type BoxError = Box<dyn Error + Send + Sync>;

const GENERATE_PATH: &str = "/api/generate";

/// Sampling options passed through to the runtime.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repeat_penalty: f32,
    pub num_predict: u32,
}

impl GenerationOptions {
    pub fn from_settings(settings: &OllamaSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_p: settings.top_p,
            top_k: settings.top_k,
            repeat_penalty: settings.repeat_penalty,
            num_predict: settings.num_predict,
        }
    }

    /// Cooler and much shorter; goal proposals are a handful of lines.
    pub fn for_suggestions(settings: &OllamaSettings) -> Self {
        Self {
            temperature: 0.4,
            num_predict: 150,
            ..Self::from_settings(settings)
        }
    }

    pub fn for_thinking(settings: &OllamaSettings) -> Self {
        Self {
            temperature: 0.7,
            num_predict: 200,
            ..Self::from_settings(settings)
        }
    }

    /// One to three sentences per round.
    pub fn for_follow_ups(settings: &OllamaSettings) -> Self {
        Self {
            temperature: 0.6,
            top_p: 0.9,
            num_predict: 120,
            ..Self::from_settings(settings)
        }
    }

    pub fn for_decisions(settings: &OllamaSettings) -> Self {
        Self {
            temperature: 0.3,
            num_predict: 100,
            ..Self::from_settings(settings)
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a GenerationOptions,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Splits a byte stream into complete newline-terminated lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append bytes and drain every complete, non-blank line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line).trim().to_string();
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// Whatever is left once the stream ends without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.pending).trim().to_string();
        self.pending.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

/// Decode one NDJSON line. Returns the text fragment and whether the stream is done.
fn decode_chunk(line: &str) -> Result<(String, bool), BoxError> {
    let chunk: GenerateChunk = serde_json::from_str(line)?;
    if let Some(error) = chunk.error {
        return Err(format!("Ollama error: {}", error).into());
    }
    Ok((chunk.response, chunk.done))
}

pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(settings: &OllamaSettings) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GENERATE_PATH)
    }

    async fn post(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
        images: &[Vec<u8>],
        stream: bool,
    ) -> Result<reqwest::Response, BoxError> {
        let request = GenerateRequest {
            model,
            prompt,
            stream,
            options,
            images: images.iter().map(|bytes| BASE64.encode(bytes)).collect(),
        };

        let response = self.client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Ollama API error ({}): {}", status, error_text).into());
        }

        Ok(response)
    }

    /// Single non-streamed completion.
    pub async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
        images: &[Vec<u8>],
    ) -> Result<String, BoxError> {
        let response = self.post(model, prompt, options, images, false).await?;
        let chunk: GenerateChunk = response.json().await?;
        if let Some(error) = chunk.error {
            return Err(format!("Ollama error: {}", error).into());
        }
        Ok(chunk.response)
    }

    /// Streamed completion. Each fragment goes to `on_fragment` in receipt order and the
    /// concatenation is returned.
    pub async fn generate_stream<F>(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerationOptions,
        images: &[Vec<u8>],
        mut on_fragment: F,
    ) -> Result<String, BoxError>
    where
        F: FnMut(&str),
    {
        let mut response = self.post(model, prompt, options, images, true).await?;
        let mut lines = LineBuffer::default();
        let mut full = String::new();

        let mut emit = |line: &str, full: &mut String| -> Result<bool, BoxError> {
            let (fragment, done) = decode_chunk(line)?;
            if !fragment.is_empty() {
                on_fragment(&fragment);
                full.push_str(&fragment);
            }
            Ok(done)
        };

        while let Some(bytes) = response.chunk().await? {
            for line in lines.push(&bytes) {
                if emit(&line, &mut full)? {
                    return Ok(full);
                }
            }
        }
        if let Some(line) = lines.finish() {
            emit(&line, &mut full)?;
        }

        Ok(full)
    }
}
