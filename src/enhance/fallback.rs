//! Deterministic content heuristics
//!
//! Used whenever the text-generation API is unavailable or returns something
//! unusable, and for read time on every item.

use crate::enhance::Difficulty;
use std::collections::HashMap;

/// Average adult reading speed (words per minute)
const WORDS_PER_MINUTE: usize = 200;

/// Longest summary produced locally, in characters
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Topics reported when no keyword matches
pub const DEFAULT_TOPIC: &str = "General";

const MAX_TOPICS: usize = 3;

/// Phrases marking navigation or promo lines rather than content
const BOILERPLATE: &[&str] = &[
    "subscribe",
    "sign up for",
    "share this",
    "share on",
    "advertisement",
    "sponsored",
    "cookie",
    "all rights reserved",
    "click here",
];

/// Lines longer than this are treated as content even if they mention boilerplate
const BOILERPLATE_MAX_CHARS: usize = 120;

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Technology",
        &[
            "software", "programming", "code", "computer", "algorithm", "api", "developer",
            "database", "rust", "cloud", "repository",
        ],
    ),
    (
        "AI",
        &[
            "ai", "machine learning", "neural", "model", "llm", "artificial intelligence",
        ],
    ),
    (
        "Business",
        &[
            "business", "market", "revenue", "startup", "company", "customer", "sales",
            "strategy",
        ],
    ),
    (
        "Finance",
        &[
            "finance", "investment", "investing", "stock", "money", "bank", "economy", "budget",
        ],
    ),
    (
        "Science",
        &[
            "research", "experiment", "scientific", "physics", "biology", "chemistry", "theory",
        ],
    ),
    (
        "Health",
        &[
            "health", "medical", "disease", "fitness", "nutrition", "wellness", "patient",
        ],
    ),
    (
        "Education",
        &["learning", "education", "student", "teacher", "course", "school"],
    ),
    (
        "Design",
        &["design", "user experience", "interface", "visual", "typography"],
    ),
    (
        "Productivity",
        &["productivity", "habit", "focus", "workflow", "time management"],
    ),
    (
        "History",
        &["history", "historical", "century", "war", "ancient"],
    ),
    (
        "Literature",
        &["novel", "story", "poetry", "chapter", "character", "fiction"],
    ),
];

/// Removes boilerplate and artifacts from extracted text
///
/// Whitespace runs inside a line collapse to one space, short lines that
/// look like navigation or promos are dropped, numeric-only lines are
/// dropped, and runs of blank lines collapse to a single blank line.
pub fn clean_text(content: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for raw in content.lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");

        if line.is_empty() {
            if lines.last().is_some_and(|last| !last.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }

        if is_boilerplate(&line) || line.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}

fn is_boilerplate(line: &str) -> bool {
    if line.chars().count() > BOILERPLATE_MAX_CHARS {
        return false;
    }
    let lower = line.to_lowercase();
    BOILERPLATE.iter().any(|phrase| lower.contains(phrase))
}

fn words_lowercase(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Ranks topics by keyword hits
///
/// Single-word keywords match whole words; multi-word keywords match as
/// phrases. Returns at most three topics, best first, or `["General"]`.
pub fn detect_topics(text: &str) -> Vec<String> {
    let words = words_lowercase(text);
    let mut word_counts: HashMap<&str, usize> = HashMap::new();
    for word in &words {
        *word_counts.entry(word.as_str()).or_insert(0) += 1;
    }
    let phrase_text = words.join(" ");

    let mut scored: Vec<(usize, usize)> = TOPIC_KEYWORDS
        .iter()
        .enumerate()
        .map(|(index, (_, keywords))| {
            let hits = keywords
                .iter()
                .map(|keyword| {
                    if keyword.contains(' ') {
                        phrase_text.matches(keyword).count()
                    } else {
                        word_counts.get(keyword).copied().unwrap_or(0)
                    }
                })
                .sum();
            (index, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .collect();

    // Stable sort keeps table order on ties
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let topics: Vec<String> = scored
        .into_iter()
        .take(MAX_TOPICS)
        .map(|(index, _)| TOPIC_KEYWORDS[index].0.to_string())
        .collect();

    if topics.is_empty() {
        vec![DEFAULT_TOPIC.to_string()]
    } else {
        topics
    }
}

/// Minutes to read `text` at 200 words per minute, never less than 1
pub fn estimate_read_time(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Rates reading difficulty from word and sentence length
///
/// One point each for a mean word length of at least 5 and 6 characters,
/// and for a mean sentence length of at least 15 and 25 words. Two points
/// is Intermediate, three or more Advanced.
pub fn estimate_difficulty(text: &str) -> Difficulty {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return Difficulty::Beginner;
    }

    let letters: usize = words.iter().map(|w| w.chars().count()).sum();
    let mean_word = letters as f64 / words.len() as f64;

    let sentences = sentences(text).len().max(1);
    let mean_sentence = words.len() as f64 / sentences as f64;

    let points = [
        mean_word >= 5.0,
        mean_word >= 6.0,
        mean_sentence >= 15.0,
        mean_sentence >= 25.0,
    ]
    .iter()
    .filter(|hit| **hit)
    .count();

    match points {
        0 | 1 => Difficulty::Beginner,
        2 => Difficulty::Intermediate,
        _ => Difficulty::Advanced,
    }
}

/// Splits text into sentences on `.`, `!` and `?`
fn sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let sentence = current.split_whitespace().collect::<Vec<_>>().join(" ");
            if sentence.chars().any(char::is_alphanumeric) {
                sentences.push(sentence);
            }
            current.clear();
        }
    }

    let rest = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if rest.chars().any(char::is_alphanumeric) {
        sentences.push(rest);
    }

    sentences
}

/// Builds a short summary from the leading sentences
///
/// Markdown heading lines and `Source:` lines are skipped. Whole sentences
/// are added while the summary stays within 200 characters; a first
/// sentence that is already too long is cut and ends with `...`.
pub fn summarize(text: &str) -> String {
    let body = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#') && !line.starts_with("Source:"))
        .collect::<Vec<_>>()
        .join(" ");

    let mut summary = String::new();
    for sentence in sentences(&body) {
        let extra = if summary.is_empty() { 0 } else { 1 };
        if summary.chars().count() + extra + sentence.chars().count() > SUMMARY_MAX_CHARS {
            if summary.is_empty() {
                let cut: String = sentence.chars().take(SUMMARY_MAX_CHARS - 3).collect();
                summary = format!("{}...", cut.trim_end());
            }
            break;
        }
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(&sentence);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_drops_boilerplate() {
        let raw = "Real   content\there.\nSubscribe to our newsletter!\n12\n\n\n\nMore content.\nShare this post";
        assert_eq!(clean_text(raw), "Real content here.\n\nMore content.");
    }

    #[test]
    fn test_clean_text_keeps_long_lines_mentioning_boilerplate() {
        let line = format!("{} subscribe {}", "word ".repeat(20), "word ".repeat(10));
        let cleaned = clean_text(&line);
        assert!(cleaned.contains("subscribe"));
    }

    #[test]
    fn test_detect_topics_ranked() {
        let text = "The software developer wrote code for the database. \
                    The startup sold software to a customer.";
        let topics = detect_topics(text);
        assert_eq!(topics[0], "Technology");
        assert_eq!(topics[1], "Business");
        assert_eq!(topics.len(), 2);
    }

    #[test]
    fn test_detect_topics_phrases_and_cap() {
        let text = "machine learning research in health, history and school design";
        // "learning" also counts toward Education; ties keep table order
        assert_eq!(detect_topics(text), vec!["Education", "AI", "Science"]);
    }

    #[test]
    fn test_detect_topics_default() {
        assert_eq!(detect_topics("lorem ipsum dolor"), vec!["General"]);
        assert_eq!(detect_topics(""), vec!["General"]);
    }

    #[test]
    fn test_whole_word_matching() {
        // "warm" must not count as "war", "coder" must not count as "code"
        assert_eq!(detect_topics("a warm coder"), vec!["General"]);
    }

    #[test]
    fn test_read_time() {
        assert_eq!(estimate_read_time(""), 1);
        assert_eq!(estimate_read_time(&"word ".repeat(200)), 1);
        assert_eq!(estimate_read_time(&"word ".repeat(201)), 2);
        assert_eq!(estimate_read_time(&"word ".repeat(1000)), 5);
    }

    #[test]
    fn test_difficulty_levels() {
        assert_eq!(estimate_difficulty("The cat sat. The dog ran."), Difficulty::Beginner);
        assert_eq!(estimate_difficulty(""), Difficulty::Beginner);

        let medium = "Careful engineers consider tradeoffs between reliability and speed.";
        assert_eq!(estimate_difficulty(medium), Difficulty::Intermediate);

        let hard = "Asynchronous distributed consensus algorithms guarantee linearizable \
                    replication across heterogeneous infrastructure notwithstanding \
                    intermittent partitions, adversarial scheduling, nondeterministic \
                    latencies, and catastrophic hardware degradation scenarios.";
        assert_eq!(estimate_difficulty(hard), Difficulty::Advanced);
    }

    #[test]
    fn test_summarize_whole_sentences() {
        let text = "# Heading\n\nFirst sentence here. Second sentence follows! Third?";
        assert_eq!(
            summarize(text),
            "First sentence here. Second sentence follows! Third?"
        );
    }

    #[test]
    fn test_summarize_limit() {
        let sentence = format!("{}.", "word ".repeat(30).trim());
        let text = format!("{} {} {}", sentence, sentence, sentence);
        let summary = summarize(&text);
        assert!(summary.chars().count() <= SUMMARY_MAX_CHARS);
        assert_eq!(summary, sentence);
    }

    #[test]
    fn test_summarize_long_first_sentence() {
        let text = "a".repeat(500);
        let summary = summarize(&text);
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_summarize_skips_source_line() {
        assert_eq!(summarize("Source: Foo (https://x.test)"), "");
    }
}
