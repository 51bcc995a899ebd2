//! Inline `[label](url)` and `**emphasis**` markup used in response text.
//! Links are split out first; emphasis is only recognized in the runs
//! between links, so nesting is not supported. Links whose url carries a
//! scheme other than http, https or mailto are left as literal text.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("valid link regex"));
static EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid emphasis regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Segment {
    Text { text: String },
    Link { label: String, url: String },
    Emphasis { text: String },
}

pub fn parse_markup(input: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for captures in LINK.captures_iter(input) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if !is_safe_url(&captures[2]) {
            continue;
        }
        push_emphasis_runs(&mut segments, &input[cursor..whole.start()]);
        segments.push(Segment::Link {
            label: captures[1].to_string(),
            url: captures[2].to_string(),
        });
        cursor = whole.end();
    }
    push_emphasis_runs(&mut segments, &input[cursor..]);

    segments
}

fn is_safe_url(url: &str) -> bool {
    // Browsers ignore whitespace and control characters inside a scheme.
    let cleaned = url
        .chars()
        .filter(|ch| !ch.is_whitespace() && !ch.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    match cleaned.split_once(':') {
        Some((scheme, _)) if !scheme.contains(['/', '?', '#']) => {
            matches!(scheme, "http" | "https" | "mailto")
        }
        _ => true,
    }
}

fn push_emphasis_runs(segments: &mut Vec<Segment>, run: &str) {
    let mut cursor = 0;
    for captures in EMPHASIS.captures_iter(run) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        push_text(segments, &run[cursor..whole.start()]);
        segments.push(Segment::Emphasis {
            text: captures[1].to_string(),
        });
        cursor = whole.end();
    }
    push_text(segments, &run[cursor..]);
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Text {
            text: text.to_string(),
        });
    }
}

pub fn render_html(input: &str) -> String {
    let mut html = String::with_capacity(input.len() + 32);
    for segment in parse_markup(input) {
        match segment {
            Segment::Text { text } => html.push_str(&escape_html(&text)),
            Segment::Link { label, url } => {
                html.push_str(&format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                    escape_html(&url),
                    escape_html(&label)
                ));
            }
            Segment::Emphasis { text } => {
                html.push_str(&format!("<strong>{}</strong>", escape_html(&text)));
            }
        }
    }
    html
}

/// Terminal-friendly rendering: links become `label (url)`.
pub fn render_plain(input: &str) -> String {
    parse_markup(input)
        .into_iter()
        .map(|segment| match segment {
            Segment::Text { text } | Segment::Emphasis { text } => text,
            Segment::Link { label, url } => format!("{label} ({url})"),
        })
        .collect()
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
