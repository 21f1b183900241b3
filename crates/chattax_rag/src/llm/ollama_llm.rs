use std::io::{BufRead, BufReader, Lines, Read};

use chattax_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::{FragmentStream, TextGenerator};
use crate::ollama::OllamaClient;

/// Streaming generation against Ollama `/api/generate`.
///
/// The response body is NDJSON, one `{response, done}` object per line; each
/// line becomes one fragment. No overall timeout is set here: connection-level
/// timeouts belong to the transport boundary.
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: OllamaClient,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

struct NdjsonFragments {
    lines: Lines<BufReader<Box<dyn Read + Send + Sync + 'static>>>,
    finished: bool,
}

impl Iterator for NdjsonFragments {
    type Item = Result<String, AppError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let line = match self.lines.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(AppError::new(
                        codes::GENERATION_FAILED,
                        "Generation stream read failed",
                    )
                    .with_details(e.to_string())
                    .with_retryable(true)));
                }
                Some(Ok(line)) => line,
            };
            if line.trim().is_empty() {
                continue;
            }

            let chunk: GenerateChunk = match serde_json::from_str(&line) {
                Ok(c) => c,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(AppError::new(
                        codes::GENERATION_FAILED,
                        "Failed to decode generation stream chunk",
                    )
                    .with_details(e.to_string())));
                }
            };

            if let Some(msg) = chunk.error {
                self.finished = true;
                return Some(Err(AppError::new(
                    codes::GENERATION_FAILED,
                    "Generation model reported an error",
                )
                .with_details(msg)));
            }

            if chunk.done {
                self.finished = true;
                if chunk.response.is_empty() {
                    return None;
                }
                return Some(Ok(chunk.response));
            }
            if !chunk.response.is_empty() {
                return Some(Ok(chunk.response));
            }
        }
    }
}

impl TextGenerator for OllamaGenerator {
    fn stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, AppError> {
        let url = format!("{}/api/generate", self.client.base_url());
        let req = GenerateRequest {
            model,
            prompt,
            stream: true,
        };

        let resp = ureq::post(&url).send_json(serde_json::to_value(req).map_err(|e| {
            AppError::new(codes::GENERATION_FAILED, "Failed to encode generation request")
                .with_details(e.to_string())
        })?);

        match resp {
            Ok(r) if r.status() == 200 => {
                let reader = BufReader::new(r.into_reader());
                Ok(Box::new(NdjsonFragments {
                    lines: reader.lines(),
                    finished: false,
                }))
            }
            Ok(r) => Err(
                AppError::new(codes::GENERATION_FAILED, "Generation request failed")
                    .with_details(format!("status={}", r.status())),
            ),
            Err(e) => Err(
                AppError::new(codes::GENERATION_FAILED, "Failed to call generation endpoint")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}
