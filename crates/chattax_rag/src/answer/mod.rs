use crate::confidence;
use crate::llm::{FragmentStream, TextGenerator};
use crate::retrieve::Candidate;

pub mod prompts;

/// Fixed client-visible answer when retrieval matched nothing.
pub const FALLBACK_NO_CONTEXT: &str = "I apologize, but I couldn't find relevant information in \
my knowledge base to answer your question accurately. Please try rephrasing your question or \
consult with a tax professional for personalized guidance.";

/// Fixed user-safe fragment emitted when generation fails mid-stream. No
/// error detail ever crosses this boundary.
pub const GENERATION_ERROR_MESSAGE: &str = "I apologize, but I encountered an error while \
processing your question. Please try again in a moment or contact support if the issue persists.";

const SOURCES_SEPARATOR: &str = "\n\n---\n\n";
const SOURCES_HEADER: &str = "**Sources:**\n\n";
const MAX_SOURCE_ENTRIES: usize = 3;
const GENERIC_TITLE: &str = "ATO Document";

/// Derive a human-readable link title from a source URL path.
///
/// Last path segment, hyphens to spaces, title-cased; when that comes out
/// shorter than 10 characters the last two segments are joined with " - "
/// instead; an empty result falls back to a generic label.
pub fn title_from_url(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = without_scheme
        .split_once('/')
        .map(|(_, path)| path)
        .unwrap_or("");
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_matches('/');

    let segments: Vec<&str> = path.split('/').collect();
    let last = segments.last().copied().unwrap_or("");
    let mut title = title_case(&last.replace('-', " "));

    if title.len() < 10 && segments.len() >= 2 {
        let joined = segments[segments.len() - 2..]
            .iter()
            .map(|s| s.replace('-', " "))
            .collect::<Vec<_>>()
            .join(" - ");
        title = title_case(&joined);
    }

    if title.trim().is_empty() {
        return GENERIC_TITLE.to_string();
    }
    title
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_source_entry(ordinal: usize, candidate: &Candidate) -> String {
    let title = title_from_url(&candidate.chunk.source_url);
    let mut entry = format!(
        "{ordinal}. [{title}]({})\n   - Relevance: {:.2}%",
        candidate.chunk.source_url,
        f64::from(candidate.similarity_score) * 100.0
    );
    if let Some(rerank) = candidate.rerank_score {
        entry.push_str(&format!(" | Reranked: {:.2}%", f64::from(rerank) * 100.0));
    }
    entry.push('\n');
    entry
}

/// Tracks how much answer text one streamed response emitted, for the
/// completion log line. Lives only as long as the stream.
#[derive(Debug, Default)]
struct AnswerSession {
    answer_chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Empty retrieval: one fixed fragment, then the stream ends.
    Fallback,
    /// Generation could not start: one safe error fragment, then end.
    Failed,
    Generating,
    SourcesHeader,
    SourceEntry(usize),
    Confidence,
    Done,
}

/// The observable contract of one chat turn, as a plain fragment iterator.
///
/// Protocol, in strict order: every generated fragment as it arrives; then,
/// only for a non-empty result, a separator, a sources header, up to three
/// numbered source entries, and the confidence percentage as the final
/// fragment. A failure during generation is converted into one fixed
/// user-safe fragment and the stream terminates; output already emitted
/// stands. Dropping the iterator cancels generation.
pub struct AnswerStream {
    phase: Phase,
    fragments: Option<FragmentStream>,
    source_entries: Vec<String>,
    confidence: f64,
    session: AnswerSession,
}

impl AnswerStream {
    pub fn new(
        generator: &dyn TextGenerator,
        model: &str,
        question: &str,
        candidates: &[Candidate],
    ) -> Self {
        if candidates.is_empty() {
            tracing::info!("no candidates; answering with the fixed fallback message");
            return Self {
                phase: Phase::Fallback,
                fragments: None,
                source_entries: Vec::new(),
                confidence: 0.0,
                session: AnswerSession::default(),
            };
        }

        let context = prompts::format_context(candidates);
        let prompt = prompts::advisor_prompt(question, &context);
        let source_entries = candidates
            .iter()
            .take(MAX_SOURCE_ENTRIES)
            .enumerate()
            .map(|(i, c)| format_source_entry(i + 1, c))
            .collect();
        let confidence = confidence::score(candidates);

        match generator.stream(model, &prompt) {
            Ok(fragments) => Self {
                phase: Phase::Generating,
                fragments: Some(fragments),
                source_entries,
                confidence,
                session: AnswerSession::default(),
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to start answer generation");
                Self {
                    phase: Phase::Failed,
                    fragments: None,
                    source_entries: Vec::new(),
                    confidence,
                    session: AnswerSession::default(),
                }
            }
        }
    }
}

impl Iterator for AnswerStream {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self.phase {
            Phase::Done => None,
            Phase::Fallback => {
                self.phase = Phase::Done;
                Some(FALLBACK_NO_CONTEXT.to_string())
            }
            Phase::Failed => {
                self.phase = Phase::Done;
                Some(GENERATION_ERROR_MESSAGE.to_string())
            }
            Phase::Generating => match self.fragments.as_mut().and_then(|f| f.next()) {
                Some(Ok(fragment)) => {
                    self.session.answer_chars += fragment.chars().count();
                    Some(fragment)
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, "generation failed mid-stream");
                    self.fragments = None;
                    self.phase = Phase::Done;
                    Some(GENERATION_ERROR_MESSAGE.to_string())
                }
                None => {
                    tracing::info!(
                        answer_chars = self.session.answer_chars,
                        "answer streaming complete"
                    );
                    self.fragments = None;
                    self.phase = Phase::SourcesHeader;
                    Some(SOURCES_SEPARATOR.to_string())
                }
            },
            Phase::SourcesHeader => {
                self.phase = if self.source_entries.is_empty() {
                    Phase::Confidence
                } else {
                    Phase::SourceEntry(0)
                };
                Some(SOURCES_HEADER.to_string())
            }
            Phase::SourceEntry(i) => {
                let entry = self.source_entries[i].clone();
                self.phase = if i + 1 < self.source_entries.len() {
                    Phase::SourceEntry(i + 1)
                } else {
                    Phase::Confidence
                };
                Some(entry)
            }
            Phase::Confidence => {
                self.phase = Phase::Done;
                Some(format!("\n*Confidence: {:.0}%*\n", self.confidence * 100.0))
            }
        }
    }
}

impl Drop for AnswerStream {
    fn drop(&mut self) {
        // Dropping mid-generation is cooperative cancellation, worth a trace.
        if self.phase != Phase::Done && self.session.answer_chars > 0 {
            tracing::debug!(
                answer_chars = self.session.answer_chars,
                "answer stream dropped before completion"
            );
        }
    }
}
