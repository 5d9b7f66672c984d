//! AI study-tool routes — notes, quizzes, summaries.
//!
//! Each endpoint asks the configured text-generation backend first and
//! falls back to deterministic offline content when no key is set or the
//! upstream call fails, so the tools always answer.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studyhall_common::{validation::require_text, HallResult};

use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai/generate-notes", post(generate_notes))
        .route("/ai/generate-quiz", post(generate_quiz))
        .route("/ai/generate-summary", post(summarize))
}

#[derive(Serialize)]
struct AiResponse {
    content: String,
    /// False when the deterministic fallback answered.
    generated: bool,
}

#[derive(Deserialize)]
struct NotesRequest {
    topic: String,
}

/// POST /api/v1/ai/generate-notes
async fn generate_notes(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NotesRequest>,
) -> HallResult<Json<AiResponse>> {
    require_text(&body.topic, "Topic")?;
    let topic = body.topic.trim();

    let prompt = format!(
        "Create concise, well-structured study notes on the topic \"{topic}\". \
         Use headings and bullet points. Cover the key concepts, definitions, \
         and one worked example."
    );

    match state.ai.generate(&prompt).await {
        Some(content) => Ok(Json(AiResponse {
            content,
            generated: true,
        })),
        None => Ok(Json(AiResponse {
            content: fallback_notes(topic),
            generated: false,
        })),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizRequest {
    topic: String,
    question_count: Option<u8>,
}

/// POST /api/v1/ai/generate-quiz
async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QuizRequest>,
) -> HallResult<Json<AiResponse>> {
    require_text(&body.topic, "Topic")?;
    let topic = body.topic.trim();
    let count = body.question_count.unwrap_or(5).clamp(1, 20);

    let prompt = format!(
        "Write a {count}-question practice quiz on \"{topic}\". \
         Number each question, give four answer options (A-D), and list \
         the correct answers at the end."
    );

    match state.ai.generate(&prompt).await {
        Some(content) => Ok(Json(AiResponse {
            content,
            generated: true,
        })),
        None => Ok(Json(AiResponse {
            content: fallback_quiz(topic, count),
            generated: false,
        })),
    }
}

#[derive(Deserialize)]
struct SummaryRequest {
    text: String,
}

/// POST /api/v1/ai/generate-summary
async fn summarize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SummaryRequest>,
) -> HallResult<Json<AiResponse>> {
    require_text(&body.text, "Text")?;
    let text = body.text.trim();

    let prompt = format!(
        "Summarize the following study material in at most five bullet \
         points, keeping the key terms:\n\n{text}"
    );

    match state.ai.generate(&prompt).await {
        Some(content) => Ok(Json(AiResponse {
            content,
            generated: true,
        })),
        None => Ok(Json(AiResponse {
            content: fallback_summary(text),
            generated: false,
        })),
    }
}

fn fallback_notes(topic: &str) -> String {
    format!(
        "# Study Notes: {topic}\n\n\
         ## Key Concepts\n\
         - Define {topic} in your own words and note where it applies.\n\
         - List the core terms you keep seeing and write one-line definitions.\n\
         - Identify the main relationships or formulas involved.\n\n\
         ## Practice\n\
         - Work through one example end to end without looking at the source.\n\
         - Note the step you got stuck on; that is your next review target.\n\n\
         ## Review\n\
         - Summarize {topic} in three sentences from memory.\n\
         - Schedule a recall session tomorrow and one in a week."
    )
}

fn fallback_quiz(topic: &str, count: u8) -> String {
    let mut quiz = format!("# Practice Quiz: {topic}\n\n");
    let templates = [
        "Define the most important term in {} and give an example.",
        "What problem does {} solve? Describe a situation where it applies.",
        "List the main steps or components involved in {}.",
        "What is a common mistake when working with {}? How do you avoid it?",
        "Compare {} with a closely related concept. What distinguishes them?",
        "Explain {} to someone unfamiliar with it, in two sentences.",
    ];
    for i in 0..count as usize {
        let template = templates[i % templates.len()];
        quiz.push_str(&format!(
            "{}. {}\n",
            i + 1,
            template.replace("{}", topic)
        ));
    }
    quiz.push_str("\nAnswer from memory first, then check against your notes.");
    quiz
}

fn fallback_summary(text: &str) -> String {
    // First few sentences, capped; crude but deterministic.
    let mut summary = String::new();
    for sentence in text.split_inclusive(['.', '!', '?']) {
        if summary.len() + sentence.len() > 400 || summary.split('.').count() > 3 {
            break;
        }
        summary.push_str(sentence);
    }
    if summary.is_empty() {
        summary = text.chars().take(400).collect();
    }
    format!("Summary (offline):\n{}", summary.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_quiz_has_requested_count() {
        let quiz = fallback_quiz("graph theory", 7);
        assert!(quiz.contains("7. "));
        assert!(!quiz.contains("8. "));
        assert!(quiz.contains("graph theory"));
    }

    #[test]
    fn fallback_summary_truncates_long_text() {
        let text = "One. Two. Three. Four. Five. Six. Seven.".repeat(40);
        let summary = fallback_summary(&text);
        assert!(summary.len() < 500);
    }
}
