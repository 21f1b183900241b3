use chattax_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};

use super::PairScorer;

/// Scores query/document pairs against a local text-embeddings-inference
/// style `/rerank` endpoint. Same localhost-only posture as the Ollama
/// client: document text never leaves the machine.
#[derive(Debug, Clone)]
pub struct HttpPairScorer {
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct RankEntry {
    index: usize,
    score: f32,
}

impl HttpPairScorer {
    pub fn new(base_url: &str, model: &str) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://127.0.0.1:") && base_url != "http://127.0.0.1" {
            return Err(AppError::new(
                codes::REMOTE_NOT_ALLOWED,
                "Rerank base URL must be localhost (127.0.0.1)",
            )
            .with_details(format!("base_url={base_url}")));
        }
        Ok(Self {
            base_url,
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/health", self.base_url);
        let resp = ureq::get(&url)
            .timeout(std::time::Duration::from_millis(800))
            .call();
        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(AppError::new(
                codes::MODEL_SERVER_UNHEALTHY,
                "Rerank endpoint health check failed",
            )
            .with_details(format!("status={}", r.status()))),
            Err(e) => Err(AppError::new(
                codes::MODEL_SERVER_UNREACHABLE,
                "Failed to reach rerank endpoint on 127.0.0.1",
            )
            .with_details(e.to_string())
            .with_retryable(true)),
        }
    }
}

impl PairScorer for HttpPairScorer {
    fn score(&self, query: &str, texts: &[&str]) -> Result<Vec<f32>, AppError> {
        let url = format!("{}/rerank", self.base_url);
        let req = RerankRequest {
            model: &self.model,
            query,
            texts,
        };
        let resp = ureq::post(&url)
            .timeout(std::time::Duration::from_secs(15))
            .send_json(serde_json::to_value(&req).map_err(|e| {
                AppError::new(codes::RERANK_FAILED, "Failed to encode rerank request")
                    .with_details(e.to_string())
            })?);

        let entries: Vec<RankEntry> = match resp {
            Ok(r) if r.status() == 200 => r.into_json().map_err(|e| {
                AppError::new(codes::RERANK_FAILED, "Failed to decode rerank response")
                    .with_details(e.to_string())
            })?,
            Ok(r) => {
                return Err(
                    AppError::new(codes::RERANK_FAILED, "Rerank request failed")
                        .with_details(format!("status={}", r.status())),
                );
            }
            Err(e) => {
                return Err(
                    AppError::new(codes::RERANK_FAILED, "Failed to call rerank endpoint")
                        .with_details(e.to_string())
                        .with_retryable(true),
                );
            }
        };

        // The endpoint returns entries ordered by score; restore input order.
        let mut scores = vec![0.0f32; texts.len()];
        let mut seen = vec![false; texts.len()];
        for entry in entries {
            match seen.get_mut(entry.index) {
                Some(slot) if !*slot => {
                    *slot = true;
                    scores[entry.index] = entry.score;
                }
                _ => {
                    return Err(AppError::new(
                        codes::RERANK_FAILED,
                        "Rerank response index out of range or duplicated",
                    )
                    .with_details(format!("index={}; texts={}", entry.index, texts.len())));
                }
            }
        }
        if seen.iter().any(|s| !*s) {
            return Err(AppError::new(
                codes::RERANK_FAILED,
                "Rerank response missing scores for some inputs",
            )
            .with_details(format!("texts={}", texts.len())));
        }
        Ok(scores)
    }
}
