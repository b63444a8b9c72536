use chrono::{Local, LocalResult, TimeZone};
use serde::Serialize;

/// Maximum number of whitespace-delimited words kept in a dialog preview.
pub const PREVIEW_WORD_LIMIT: usize = 20;

const PREVIEW_ELLIPSIS: &str = "...";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Preview of the most recent message in a dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastMessageSummary {
    pub who: String,
    pub when: String,
    pub text: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_unread: bool,
    #[serde(skip)]
    pub timestamp: i64,
}

/// One entry of a dialog's message history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSummary {
    pub who: String,
    pub when: String,
    pub text: String,
    #[serde(skip)]
    pub timestamp: i64,
}

/// Keeps the first [`PREVIEW_WORD_LIMIT`] words, re-joined by single spaces,
/// and appends `...` when anything was cut. Shorter texts are returned as-is.
pub fn truncate_words(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= PREVIEW_WORD_LIMIT {
        return text.to_owned();
    }

    let mut truncated = words[..PREVIEW_WORD_LIMIT].join(" ");
    truncated.push_str(PREVIEW_ELLIPSIS);
    truncated
}

pub fn format_unix_seconds(seconds: i64) -> String {
    format_unix_seconds_in(&Local, seconds)
}

fn format_unix_seconds_in<Tz>(tz: &Tz, seconds: i64) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_opt(seconds, 0) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => {
            dt.format(TIMESTAMP_FORMAT).to_string()
        }
        LocalResult::None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn words(count: usize) -> String {
        (1..=count)
            .map(|n| format!("w{n}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn keeps_text_up_to_word_limit_unchanged() {
        let text = format!("  {}\n", words(20));

        assert_eq!(truncate_words(&text), text);
        assert_eq!(truncate_words("hi"), "hi");
        assert_eq!(truncate_words(""), "");
    }

    #[test]
    fn cuts_text_over_word_limit_and_appends_ellipsis() {
        let text = words(25).replace(' ', "\n\t ");

        assert_eq!(truncate_words(&text), format!("{}...", words(20)));
    }

    #[test]
    fn formats_unix_seconds_as_date_time() {
        assert_eq!(
            format_unix_seconds_in(&Utc, 1_700_000_000),
            "2023-11-14 22:13:20"
        );
    }

    #[test]
    fn local_format_has_fixed_width() {
        assert_eq!(format_unix_seconds(1_700_000_000).len(), 19);
    }

    #[test]
    fn out_of_range_timestamp_formats_as_empty() {
        assert_eq!(format_unix_seconds_in(&Utc, i64::MAX), "");
    }

    #[test]
    fn raw_timestamp_is_not_serialized() {
        let summary = MessageSummary {
            who: "ann".to_owned(),
            when: "2023-11-14 22:13:20".to_owned(),
            text: "hi".to_owned(),
            timestamp: 1_700_000_000,
        };

        let json = serde_json::to_value(&summary).expect("summary should serialize");

        assert_eq!(
            json,
            serde_json::json!({"who": "ann", "when": "2023-11-14 22:13:20", "text": "hi"})
        );
    }
}
