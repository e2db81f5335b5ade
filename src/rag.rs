//! Retrieval-augmented answering.
//!
//! Per query: embed the question in query mode, retrieve the top-k nearest
//! chunks, compose a grounded-generation prompt, call the completion provider
//! once, and attach an advisory groundedness signal. Any step failure aborts
//! the query with a single error; partial state is discarded.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::embedding::{EmbedMode, Embedder};
use crate::llm::CompletionProvider;
use crate::models::{GeneratedAnswer, RetrievedContext};
use crate::store::VectorStore;

/// Default number of contexts retrieved per query.
pub const DEFAULT_TOP_K: usize = 3;

/// Fraction of a context's word set that must appear in the answer for the
/// answer to count as grounded in that context.
const GROUNDING_OVERLAP_THRESHOLD: f32 = 0.1;

/// Disclaimers that mark an answer as grounded even without word overlap:
/// the model explicitly acknowledged the context was insufficient.
const NO_INFO_PHRASES: [&str; 3] = [
    "not available in the documentation",
    "not found in the provided context",
    "no information provided",
];

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant that answers questions based on provided documentation. \
Your answers should be grounded in the provided context and not rely on general knowledge. \
If the provided context does not contain information to answer the question, clearly state \
that the information is not available in the documentation. \
Be concise but thorough in your responses.";

/// The answer plus the contexts used to produce it.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: GeneratedAnswer,
    pub contexts: Vec<RetrievedContext>,
}

/// Run the full query flow for `question`.
///
/// An empty retrieval set is valid: generation proceeds with no contexts
/// and the model is expected to state that the information is unavailable.
pub async fn answer_question(
    embedder: &dyn Embedder,
    store: &dyn VectorStore,
    llm: &dyn CompletionProvider,
    question: &str,
    top_k: usize,
) -> Result<QueryOutcome> {
    let query_id = format!("query-{}", Uuid::new_v4());

    let vectors = embedder
        .embed(&[question.to_string()], EmbedMode::Query)
        .await
        .context("embedding the question failed")?;
    let query_vector = vectors
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("embedding the question returned no vector"))?;

    let hits = store
        .search(&query_vector, top_k)
        .await
        .context("vector search failed")?;
    let contexts: Vec<RetrievedContext> = hits
        .into_iter()
        .map(|hit| RetrievedContext {
            id: hit.id,
            content: hit.payload.content,
            source_url: hit.payload.source_url,
            similarity_score: hit.score,
            title: hit.payload.title,
        })
        .collect();

    let user_prompt = compose_user_prompt(question, &contexts);
    let text = llm
        .complete(SYSTEM_PROMPT, &user_prompt)
        .await
        .context("answer generation failed")?;

    let grounded = is_grounded(&text, &contexts);
    let confidence_score = contexts
        .first()
        .map(|c| c.similarity_score.clamp(0.0, 1.0))
        .unwrap_or(0.0);
    let sources: Vec<String> = contexts.iter().map(|c| c.source_url.clone()).collect();

    let answer = GeneratedAnswer {
        id: format!("answer-{}", Uuid::new_v4()),
        text,
        confidence_score,
        sources,
        grounded,
        timestamp: Utc::now(),
        query_id,
    };

    Ok(QueryOutcome { answer, contexts })
}

/// Compose the user message: enumerated contexts (source, score, content)
/// followed by the literal question.
pub fn compose_user_prompt(question: &str, contexts: &[RetrievedContext]) -> String {
    let context_block = if contexts.is_empty() {
        "(no matching documentation found)".to_string()
    } else {
        contexts
            .iter()
            .enumerate()
            .map(|(i, ctx)| {
                format!(
                    "Context {} (Source: {}, Score: {:.2}):\n{}",
                    i + 1,
                    ctx.source_url,
                    ctx.similarity_score,
                    ctx.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "Context Information:\n{context_block}\n\nQuestion: {question}\n\n\
         Please provide an answer based only on the provided context information."
    )
}

/// Advisory grounding check.
///
/// The answer counts as grounded when any context shares more than 10% of
/// its word set with the answer, or when the answer explicitly states the
/// information is unavailable. Observational only; it never blocks or
/// alters the answer.
pub fn is_grounded(answer: &str, contexts: &[RetrievedContext]) -> bool {
    let answer_lower = answer.to_lowercase();
    let answer_words: HashSet<&str> = answer_lower.split_whitespace().collect();

    for ctx in contexts {
        let content_lower = ctx.content.to_lowercase();
        let ctx_words: HashSet<&str> = content_lower.split_whitespace().collect();
        if ctx_words.is_empty() {
            continue;
        }
        let common = ctx_words.intersection(&answer_words).count();
        if common as f32 > GROUNDING_OVERLAP_THRESHOLD * ctx_words.len() as f32 {
            return true;
        }
    }

    NO_INFO_PHRASES
        .iter()
        .any(|phrase| answer_lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(content: &str) -> RetrievedContext {
        RetrievedContext {
            id: "ctx-1".to_string(),
            content: content.to_string(),
            source_url: "https://docs.example/sky".to_string(),
            similarity_score: 0.8,
            title: "Sky".to_string(),
        }
    }

    #[test]
    fn word_overlap_marks_answer_grounded() {
        let contexts = vec![context("The sky is blue and wide")];
        assert!(is_grounded("The sky is blue", &contexts));
    }

    #[test]
    fn unrelated_answer_is_ungrounded() {
        let contexts = vec![context("The sky is blue and wide")];
        assert!(!is_grounded("Compilers translate source code", &contexts));
    }

    #[test]
    fn disclaimer_marks_answer_grounded_without_overlap() {
        let contexts = vec![context("unrelated material about networking")];
        assert!(is_grounded(
            "That is not available in the documentation.",
            &contexts
        ));
    }

    #[test]
    fn no_contexts_and_no_disclaimer_is_ungrounded() {
        assert!(!is_grounded("Some confident claim", &[]));
        assert!(is_grounded("No information provided on this topic.", &[]));
    }

    #[test]
    fn prompt_enumerates_contexts_and_ends_with_question() {
        let contexts = vec![context("The sky is blue and wide")];
        let prompt = compose_user_prompt("What color is the sky?", &contexts);
        assert!(prompt.contains("Context 1 (Source: https://docs.example/sky, Score: 0.80):"));
        assert!(prompt.contains("The sky is blue and wide"));
        assert!(prompt.contains("Question: What color is the sky?"));
    }

    #[test]
    fn prompt_handles_empty_context_list() {
        let prompt = compose_user_prompt("anything", &[]);
        assert!(prompt.contains("no matching documentation found"));
        assert!(prompt.contains("Question: anything"));
    }
}
