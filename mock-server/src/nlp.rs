//! Tiny natural-language task parser: `#tags`, `today` / `tomorrow`,
//! `urgent`, `high priority` and `low priority`. Everything else is title.

use chrono::{DateTime, Duration, NaiveTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<i64>,
    pub tags: Vec<String>,
}

pub fn parse(text: &str, now: DateTime<Utc>) -> Parsed {
    let midnight = now.date_naive().and_time(NaiveTime::default()).and_utc();
    let words: Vec<&str> = text.split_whitespace().collect();

    let mut title = Vec::new();
    let mut due_date = None;
    let mut priority = None;
    let mut tags = Vec::new();

    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        let lower = word.to_lowercase();
        let next_is_priority = words
            .get(i + 1)
            .is_some_and(|w| w.eq_ignore_ascii_case("priority"));

        match lower.as_str() {
            tag if tag.len() > 1 && tag.starts_with('#') => tags.push(tag[1..].to_string()),
            "today" => due_date = Some(midnight),
            "tomorrow" => due_date = Some(midnight + Duration::days(1)),
            "urgent" => priority = Some(4),
            "high" if next_is_priority => {
                priority = Some(4);
                i += 1;
            }
            "low" if next_is_priority => {
                priority = Some(1);
                i += 1;
            }
            _ => title.push(word),
        }
        i += 1;
    }

    let title = if title.is_empty() {
        text.trim().to_string()
    } else {
        title.join(" ")
    };
    Parsed {
        title,
        due_date,
        priority,
        tags,
    }
}
