//! Parsing of the model's JSON reply

use crate::enhance::{Difficulty, EnhanceError};
use serde::Deserialize;

const MAX_AI_TOPICS: usize = 5;

#[derive(Debug, Deserialize)]
struct RawReply {
    cleaned_content: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    topics: Vec<String>,
    difficulty: String,
}

/// A validated reply from the text-generation API
#[derive(Debug, Clone, PartialEq)]
pub struct AiReply {
    pub cleaned_content: String,
    pub summary: String,
    pub topics: Vec<String>,
    pub difficulty: Difficulty,
}

/// Parses the model's reply, tolerating a surrounding markdown code fence
///
/// # Returns
///
/// * `Ok(AiReply)` - Well-formed reply with non-empty content
/// * `Err(EnhanceError::Malformed)` - Invalid JSON, empty content, or an
///   unknown difficulty
pub fn parse_reply(raw: &str) -> Result<AiReply, EnhanceError> {
    let json = strip_code_fence(raw);
    let reply: RawReply =
        serde_json::from_str(json).map_err(|e| EnhanceError::Malformed(e.to_string()))?;

    let cleaned_content = reply.cleaned_content.trim().to_string();
    if cleaned_content.is_empty() {
        return Err(EnhanceError::Malformed("empty cleaned_content".to_string()));
    }

    let difficulty = Difficulty::parse(&reply.difficulty).ok_or_else(|| {
        EnhanceError::Malformed(format!("unknown difficulty '{}'", reply.difficulty))
    })?;

    let topics = reply
        .topics
        .into_iter()
        .map(|topic| topic.trim().to_string())
        .filter(|topic| !topic.is_empty())
        .take(MAX_AI_TOPICS)
        .collect();

    Ok(AiReply {
        cleaned_content,
        summary: reply.summary.trim().to_string(),
        topics,
        difficulty,
    })
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "json") on the opening line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
