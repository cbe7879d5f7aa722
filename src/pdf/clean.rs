//! Chapter content cleanup
//!
//! Drops extraction artifacts (page numbers, stray symbols) and marks
//! heading-like lines with markdown.

use regex::Regex;
use std::sync::OnceLock;

fn blank_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n\s*\n").expect("valid blank-run pattern"))
}

fn section_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\d+").expect("valid section pattern"))
}

/// Cleans raw page text into chapter content
///
/// Collapses runs of blank lines, then drops lines that are only digits,
/// shorter than 3 characters, or less than half alphanumeric/whitespace.
/// The surviving lines are passed through [`format_as_markdown`].
pub fn clean_content(content: &str) -> String {
    let collapsed = blank_runs().replace_all(content, "\n\n");

    let kept: Vec<&str> = collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !is_artifact(line))
        .collect();

    format_as_markdown(&kept.join("\n")).trim().to_string()
}

fn is_artifact(line: &str) -> bool {
    let len = line.chars().count();
    if len < 3 {
        return true;
    }
    if line.chars().all(|c| c.is_ascii_digit()) {
        return true;
    }

    let readable = line
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .count();
    (readable as f64) < len as f64 * 0.5
}

/// Marks heading-like lines with markdown
///
/// Lines under 80 characters that are all uppercase become `## Title Case`;
/// title-case lines and numbered sections (`1.2 ...`) become `### line`.
pub fn format_as_markdown(content: &str) -> String {
    content
        .split('\n')
        .map(|line| {
            let line = line.trim();
            if line.is_empty() || line.chars().count() >= 80 {
                return line.to_string();
            }

            if is_uppercase_line(line) {
                format!("## {}", to_title_case(line))
            } else if is_title_case_line(line) || section_number().is_match(line) {
                format!("### {}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when the line has letters and none of them are lowercase
pub(crate) fn is_uppercase_line(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

/// True when every word starts uppercase and continues lowercase
fn is_title_case_line(line: &str) -> bool {
    let mut previous_cased = false;
    let mut seen_cased = false;

    for c in line.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else {
            previous_cased = false;
        }
    }

    seen_cased
}

fn to_title_case(line: &str) -> String {
    let mut previous_alpha = false;
    line.chars()
        .flat_map(|c| {
            let out: Vec<char> = if previous_alpha {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            previous_alpha = c.is_alphabetic();
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drops_artifacts() {
        let raw = "A real sentence of text.\n42\nab\n*** --- ***\nAnother real line here.";
        assert_eq!(
            clean_content(raw),
            "A real sentence of text.\nAnother real line here."
        );
    }

    #[test]
    fn test_blank_lines_removed() {
        let raw = "first line of text\n\n\n\n   \nsecond line of text";
        assert_eq!(clean_content(raw), "first line of text\nsecond line of text");
    }

    #[test]
    fn test_uppercase_heading() {
        assert_eq!(format_as_markdown("THE DARK FOREST"), "## The Dark Forest");
    }

    #[test]
    fn test_title_case_and_numbered_headings() {
        assert_eq!(format_as_markdown("Getting Started"), "### Getting Started");
        assert_eq!(format_as_markdown("2.1 setup steps"), "### 2.1 setup steps");
        assert_eq!(
            format_as_markdown("this is an ordinary sentence."),
            "this is an ordinary sentence."
        );
    }

    #[test]
    fn test_long_lines_untouched() {
        let long = "A".repeat(85);
        assert_eq!(format_as_markdown(&long), long);
    }

    #[test]
    fn test_title_case_detection() {
        assert!(is_title_case_line("Hello World"));
        assert!(is_title_case_line("Part Two: The Return"));
        assert!(!is_title_case_line("Hello world"));
        assert!(!is_title_case_line("HELLO"));
        assert!(!is_title_case_line("1234"));
    }
}
