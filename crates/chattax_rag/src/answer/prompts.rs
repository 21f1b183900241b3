use crate::retrieve::Candidate;

/// Serialize the final candidates into the delimited context block the
/// generation model sees. Per document: ordinal, the score that ranked it
/// ("Rerank Score" when stage 2 ran, "Similarity" otherwise), document id,
/// section, table reference for table summaries, URL, last-updated date
/// (falling back to the crawl date), provenance, and the full text.
pub fn format_context(candidates: &[Candidate]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(candidates.len());
    for (i, candidate) in candidates.iter().enumerate() {
        let idx = i + 1;
        let chunk = &candidate.chunk;

        let score_display = match candidate.rerank_score {
            Some(s) => format!("Rerank Score: {s:.3}"),
            None => format!("Similarity: {:.3}", candidate.similarity_score),
        };

        let mut lines: Vec<String> = vec![
            format!("[Source {idx}] ({score_display})"),
            format!("Document: {}", chunk.doc_id),
            format!("Section: {}", chunk.section_heading),
        ];
        if chunk.is_table_summary {
            let table_ref = chunk.table_ref.as_deref().unwrap_or("N/A");
            lines.push(format!("Table Reference: {table_ref}"));
        }
        lines.push(format!("URL: {}", chunk.source_url));
        lines.push(format!(
            "Last Updated: {}",
            chunk
                .last_updated_on_page
                .as_deref()
                .unwrap_or(&chunk.crawl_date)
        ));
        lines.push(format!("Provenance: {}", chunk.provenance));
        lines.push(format!("\nContent:\n{}", chunk.text));

        parts.push(lines.join("\n"));
    }

    format!("\n\n{}", parts.join("\n\n---\n\n"))
}

/// Build the full advisor prompt. The contract matters more than the prose:
/// answers come only from the source documents, and the generated text must
/// not contain citation markers, URLs, or the source delimiters. The
/// citation list is appended separately by the stream composer.
pub fn advisor_prompt(question: &str, context: &str) -> String {
    format!(
        r#"You are a professional tax advisor AI assistant specializing in Australian tax law and regulations from the Australian Taxation Office (ATO).

Rules (non-negotiable):
1) Base your answer ONLY on the SOURCE DOCUMENTS provided below. If the sources do not cover the question, say so clearly.
2) All information pertains to AUSTRALIAN tax law. Use Australian terminology ("tax return" not "tax filing", "ATO" not "IRS") and Australian financial years (e.g. 2023-24) when relevant.
3) Do NOT include [Source N] citation markers, URLs, or links anywhere in your answer. The source citations are appended separately after your answer.
4) Include relevant dates, amounts, and limitations, and mention when professional consultation is recommended for complex cases.

Question: {question}

SOURCE DOCUMENTS:
{context}

Output:
- Return Markdown only, in short paragraphs (2-3 sentences each).
- Use numbered lists for steps, with a blank line before each point.
- Write naturally, without reference markers of any kind.
"#
    )
}
