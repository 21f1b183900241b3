use crate::retrieve::Candidate;

/// Scalar confidence in the final result set, derived purely from the
/// bi-encoder similarity scores (reranking never changes it).
///
/// mean similarity, penalized below 3 documents, boosted 1.1x when the best
/// similarity exceeds 0.8, clamped to 1.0, then rounded to 3 decimals. The
/// exact arithmetic is user-visible, so keep the clamp-then-round order.
pub fn score(candidates: &[Candidate]) -> f64 {
    if candidates.is_empty() {
        return 0.0;
    }

    let scores: Vec<f64> = candidates
        .iter()
        .map(|c| f64::from(c.similarity_score))
        .collect();
    let avg: f64 = scores.iter().sum::<f64>() / scores.len() as f64;

    let doc_count_factor = (scores.len() as f64 / 3.0).min(1.0);

    let top = scores.iter().cloned().fold(f64::MIN, f64::max);
    let top_score_boost = if top > 0.8 { 1.1 } else { 1.0 };

    let confidence = (avg * doc_count_factor * top_score_boost).min(1.0);
    (confidence * 1000.0).round() / 1000.0
}
