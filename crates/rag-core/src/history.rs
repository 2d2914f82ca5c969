//! Recent conversation exchanges: parsing saved exchange files and merging
//! them with retrieved passages under the shared budget.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;

use crate::time::Timestamp;

static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{8})_(\d{6})_(\d+)_message\.md$").unwrap());
static H1: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#\s+(.+?)\s*$").unwrap());
static ANY_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s*(.+)$").unwrap());

/// One saved question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryExchange {
    pub title: String,
    pub question: String,
    pub answer: String,
    pub timestamp: Timestamp,
    /// Source identity of the exchange file, relative to the base directory.
    pub source: String,
    /// Sources the saved answer cited, when they were recorded.
    pub sources: Vec<String>,
}

impl HistoryExchange {
    /// Question and answer folded into one body.
    pub fn content(&self) -> String {
        format!("Question:\n{}\n\nAnswer:\n{}", self.question, self.answer)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Question,
    Answer,
}

fn section_of(heading: &str) -> Option<Section> {
    let name = heading.trim_end_matches(':').trim().to_lowercase();
    match name.as_str() {
        "pergunta" | "question" => Some(Section::Question),
        "resposta" | "answer" => Some(Section::Answer),
        _ => None,
    }
}

/// Timestamp encoded in an exchange file name such as
/// `20250101_093000_123456_message.md`.
pub fn parse_file_name(name: &str) -> Option<Timestamp> {
    let caps = FILE_NAME.captures(name)?;
    Timestamp::parse_file_stamp(&caps[1], &caps[2], &caps[3])
}

/// Split exchange file content into `(title, question, answer)`.
///
/// Only level-1 headings delimit sections. A level-1 heading seen before
/// any section is the title; inside a section it is kept as content.
/// `None` when either section is missing or empty.
pub fn parse_content(content: &str) -> Option<(Option<String>, String, String)> {
    let mut title = None;
    let mut question: Option<Vec<&str>> = None;
    let mut answer: Option<Vec<&str>> = None;
    let mut current: Option<Section> = None;

    for line in content.lines() {
        if let Some(caps) = H1.captures(line) {
            let heading = caps.get(1).map_or("", |m| m.as_str());
            match section_of(heading) {
                Some(Section::Question) => {
                    current = Some(Section::Question);
                    question = Some(Vec::new());
                    continue;
                }
                Some(Section::Answer) => {
                    current = Some(Section::Answer);
                    answer = Some(Vec::new());
                    continue;
                }
                None if current.is_none() => {
                    if title.is_none() {
                        title = Some(heading.to_string());
                    }
                    continue;
                }
                None => {}
            }
        }
        match current {
            Some(Section::Question) => question.get_or_insert_default().push(line),
            Some(Section::Answer) => answer.get_or_insert_default().push(line),
            None => {}
        }
    }

    let question = question?.join("\n").trim().to_string();
    let answer = answer?.join("\n").trim().to_string();
    if question.is_empty() || answer.is_empty() {
        return None;
    }
    Some((title, question, answer))
}

/// Parse one exchange file. Unrecognised names and incomplete content
/// yield `None`.
pub fn parse_exchange(file_name: &str, source: &str, content: &str) -> Option<HistoryExchange> {
    let timestamp = parse_file_name(file_name)?;
    let (title, question, answer) = parse_content(content)?;
    Some(HistoryExchange {
        title: title.unwrap_or_else(|| file_name.to_string()),
        question,
        answer,
        timestamp,
        source: source.to_string(),
        sources: Vec::new(),
    })
}

/// Keep exchanges inside `[now - window, now]`, newest first.
pub fn within_window(
    mut exchanges: Vec<HistoryExchange>,
    now: Timestamp,
    window: Duration,
) -> Vec<HistoryExchange> {
    exchanges.retain(|e| e.timestamp.within(now, window));
    exchanges.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.source.cmp(&b.source)));
    exchanges
}

/// Push every markdown heading one level down so saved question and answer
/// text cannot open a new top-level section.
pub fn demote_headings(text: &str) -> String {
    text.split('\n')
        .map(|line| match ANY_HEADING.captures(line) {
            Some(caps) => format!("#{} {}", &caps[1], &caps[2]),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render an exchange file in the layout [`parse_content`] reads back.
pub fn format_exchange(title: Option<&str>, question: &str, answer: &str) -> String {
    let mut out = String::new();
    if let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) {
        out.push_str(&format!("# {title}\n\n"));
    }
    out.push_str(&format!(
        "# Pergunta:\n\n{}\n\n# Resposta\n\n{}\n",
        demote_headings(question.trim()),
        demote_headings(answer.trim())
    ));
    out
}

/// Result of merging history into a retrieved selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merged {
    /// Positions into the history list, newest first.
    pub history: Vec<usize>,
    /// Retrieved positions that survived deduplication, order kept.
    pub retrieved: Vec<usize>,
}

/// Merge newest-first `history` with the retrieved passages whose source
/// identities are `retrieved_sources`.
///
/// Retrieved passages sharing a source with any history exchange are
/// dropped; history then fills the slots left free under `k`.
pub fn merge_history(retrieved_sources: &[&str], history: &[HistoryExchange], k: usize) -> Merged {
    let history_sources: HashSet<&str> = history.iter().map(|h| h.source.as_str()).collect();

    let mut retrieved: Vec<usize> = retrieved_sources
        .iter()
        .enumerate()
        .filter(|(_, s)| !history_sources.contains(*s))
        .map(|(i, _)| i)
        .collect();
    retrieved.truncate(k);

    let free = k - retrieved.len();
    let history = (0..history.len()).take(free).collect();
    Merged { history, retrieved }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVED: &str = "\
# Deploy checklist

# Pergunta:

How do we deploy?

# Resposta

Run the pipeline.

## Details

Then verify.
";

    fn exchange(source: &str, secs: i64) -> HistoryExchange {
        HistoryExchange {
            title: source.to_string(),
            question: "q".into(),
            answer: "a".into(),
            timestamp: Timestamp::from_unix_secs(secs),
            source: source.to_string(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_file_name_pattern() {
        let ts = parse_file_name("20250101_093000_123456_message.md").unwrap();
        assert_eq!(ts.to_file_stamp(), "20250101_093000_123456");
        assert!(parse_file_name("notes.md").is_none());
        assert!(parse_file_name("20250101_093000_123456_message.txt").is_none());
        assert!(parse_file_name("20251301_093000_1_message.md").is_none());
    }

    #[test]
    fn test_parse_content_sections() {
        let (title, q, a) = parse_content(SAVED).unwrap();
        assert_eq!(title.as_deref(), Some("Deploy checklist"));
        assert_eq!(q, "How do we deploy?");
        assert_eq!(a, "Run the pipeline.\n\n## Details\n\nThen verify.");
    }

    #[test]
    fn test_parse_content_english_headings() {
        let (title, q, a) = parse_content("# Question\n\nwhy?\n\n# Answer:\n\nbecause").unwrap();
        assert!(title.is_none());
        assert_eq!(q, "why?");
        assert_eq!(a, "because");
    }

    #[test]
    fn test_missing_section_rejected() {
        assert!(parse_content("# Pergunta\n\nonly a question").is_none());
        assert!(parse_content("# Resposta\n\nonly an answer").is_none());
        assert!(parse_content("# Pergunta\n\n# Resposta\n\nanswer").is_none());
    }

    #[test]
    fn test_title_falls_back_to_file_name() {
        let name = "20250101_093000_000001_message.md";
        let ex = parse_exchange(name, "chat_history/x", "# Pergunta\nq\n# Resposta\na").unwrap();
        assert_eq!(ex.title, name);
    }

    #[test]
    fn test_format_roundtrips_through_parser() {
        let text = format_exchange(Some("Title"), "# Setup\nhow?", "# Steps\ndo it");
        assert!(text.contains("## Setup"));
        let (title, q, a) = parse_content(&text).unwrap();
        assert_eq!(title.as_deref(), Some("Title"));
        assert_eq!(q, "## Setup\nhow?");
        assert_eq!(a, "## Steps\ndo it");
    }

    #[test]
    fn test_window_filters_and_orders_newest_first() {
        let now = Timestamp::from_unix_secs(10_000);
        let window = Duration::from_secs(3600);
        let kept = within_window(
            vec![
                exchange("old", 10_000 - 3601),
                exchange("edge", 10_000 - 3600),
                exchange("new", 9_999),
            ],
            now,
            window,
        );
        let sources: Vec<&str> = kept.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["new", "edge"]);
    }

    #[test]
    fn test_merge_dedupes_by_source_and_fills_free_slots() {
        let history = vec![exchange("h1", 3), exchange("h2", 2), exchange("h3", 1)];
        let retrieved = ["a", "h2", "b", "h1"];
        let merged = merge_history(&retrieved, &history, 4);
        assert_eq!(merged.retrieved, vec![0, 2]);
        assert_eq!(merged.history, vec![0, 1]);
    }

    #[test]
    fn test_merge_without_overlap_leaves_no_room() {
        let history = vec![exchange("h1", 1)];
        let merged = merge_history(&["a", "b"], &history, 2);
        assert_eq!(merged.retrieved, vec![0, 1]);
        assert!(merged.history.is_empty());
    }

    #[test]
    fn test_merge_with_short_selection() {
        let history = vec![exchange("h1", 2), exchange("h2", 1)];
        let merged = merge_history(&["a"], &history, 4);
        assert_eq!(merged.history, vec![0, 1]);
        assert_eq!(merged.retrieved, vec![0]);
    }
}
