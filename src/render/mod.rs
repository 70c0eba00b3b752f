pub mod chart;
pub mod terminal;

use crate::models::chat::MessageContent;
use serde_json::Value as JsonValue;

const EMPHASIS_MARKER: &str = "**";

/// How a single message is drawn. Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Rendering<'a> {
    Chart(&'a JsonValue),
    Error(&'a str),
    Formatted(Vec<Line>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Emphasis(String),
}

impl Span {
    pub fn text(&self) -> &str {
        match self {
            Span::Plain(text) | Span::Emphasis(text) => text,
        }
    }

    pub fn is_emphasis(&self) -> bool {
        matches!(self, Span::Emphasis(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(Span::text).collect()
    }
}

pub fn render(content: &MessageContent) -> Rendering<'_> {
    match content {
        MessageContent::Chart(spec) => Rendering::Chart(spec),
        MessageContent::Text(text) if is_error_text(text) => Rendering::Error(text),
        MessageContent::Text(text) => Rendering::Formatted(format_text(text)),
    }
}

/// Case-insensitive `error` prefix.
pub fn is_error_text(text: &str) -> bool {
    text.get(..5).map(|prefix| prefix.eq_ignore_ascii_case("error")).unwrap_or(false)
}

pub fn format_text(text: &str) -> Vec<Line> {
    text.split('\n').map(parse_line).collect()
}

/// Splits one line into plain and `**emphasized**` spans. A marker without a
/// closing partner is kept verbatim.
pub fn parse_line(line: &str) -> Line {
    let mut spans = Vec::new();
    let mut rest = line;

    while let Some(open) = rest.find(EMPHASIS_MARKER) {
        let after_open = &rest[open + EMPHASIS_MARKER.len()..];
        let Some(close) = after_open.find(EMPHASIS_MARKER) else {
            break;
        };
        if open > 0 {
            spans.push(Span::Plain(rest[..open].to_string()));
        }
        if close > 0 {
            spans.push(Span::Emphasis(after_open[..close].to_string()));
        }
        rest = &after_open[close + EMPHASIS_MARKER.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::Plain(rest.to_string()));
    }
    Line { spans }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn price_example_splits_into_two_lines() {
        let content = MessageContent::Text("Price: **$500k**\nLocation: LA".into());
        let Rendering::Formatted(lines) = render(&content) else {
            panic!("expected formatted text");
        };
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans, vec![
            Span::Plain("Price: ".into()),
            Span::Emphasis("$500k".into())
        ]);
        assert_eq!(lines[1].spans, vec![Span::Plain("Location: LA".into())]);
    }

    #[test]
    fn chart_content_takes_chart_path() {
        let content = MessageContent::from(json!({ "mark": "bar" }));
        assert!(matches!(render(&content), Rendering::Chart(spec) if spec["mark"] == "bar"));
    }

    #[test]
    fn error_prefix_is_case_insensitive() {
        for text in ["Error: timeout", "ERROR", "error occurred", "eRrOr!"] {
            let content = MessageContent::Text(text.into());
            assert_eq!(render(&content), Rendering::Error(text));
        }
        let content = MessageContent::Text("An error happened".into());
        assert!(matches!(render(&content), Rendering::Formatted(_)));
    }

    #[test]
    fn short_or_multibyte_text_is_not_an_error() {
        assert!(!is_error_text("err"));
        assert!(!is_error_text(""));
        assert!(!is_error_text("éééé"));
    }

    #[test]
    fn unmatched_marker_stays_literal() {
        let line = parse_line("a **b");
        assert_eq!(line.spans, vec![Span::Plain("a **b".into())]);
        assert_eq!(line.plain_text(), "a **b");
    }

    #[test]
    fn several_emphasis_runs_in_one_line() {
        let line = parse_line("**LA** beats **SF** on price");
        assert_eq!(line.spans, vec![
            Span::Emphasis("LA".into()),
            Span::Plain(" beats ".into()),
            Span::Emphasis("SF".into()),
            Span::Plain(" on price".into())
        ]);
    }

    #[test]
    fn empty_lines_are_preserved() {
        let lines = format_text("first\n\nthird");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].spans.is_empty());
    }
}
