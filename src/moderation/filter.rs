use std::{fmt, sync::LazyLock};

use regex::Regex;

/// Russian layout: `+7`, `7` or `8`, then 3-3-2-2 digits with optional
/// brackets, spaces and dashes.
static LOCAL_PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+7|\b[78])[\s\-]*\(?\d{3}\)?[\s\-]*\d{3}[\s\-]*\d{2}[\s\-]*\d{2}\b")
        .expect("valid regex")
});
/// `+` followed by digits and separators. Only a phone when it carries 10 to
/// 15 digits.
static INTERNATIONAL_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+\d[\d\s()\-]{8,}\d").expect("valid regex"));

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 10..=15;

fn contains_phone(text: &str) -> bool {
    LOCAL_PHONE.is_match(text)
        || INTERNATIONAL_PHONE.find_iter(text).any(|m| {
            let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
            PHONE_DIGITS.contains(&digits)
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    BannedWord(String),
    PhoneNumber,
}

impl Violation {
    pub fn reason(&self) -> String {
        match self {
            Violation::BannedWord(word) => format!("banned word: {}", word),
            Violation::PhoneNumber => "phone number".to_string(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    enabled: bool,
    banned: Vec<String>,
}

impl Filter {
    pub fn new(enabled: bool, banned: &[String]) -> Self {
        let banned = banned
            .iter()
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        Self { enabled, banned }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn inspect(&self, text: &str) -> Option<Violation> {
        if !self.enabled {
            return None;
        }

        let lowered = text.to_lowercase();
        if let Some(word) = self.banned.iter().find(|w| lowered.contains(w.as_str())) {
            return Some(Violation::BannedWord(word.clone()));
        }

        if contains_phone(&lowered) {
            return Some(Violation::PhoneNumber);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> Filter {
        Filter::new(true, &["Casino".to_string(), "  ".to_string()])
    }

    #[test]
    fn banned_words_match_case_insensitively() {
        assert_eq!(
            filter().inspect("Best CASINO in town"),
            Some(Violation::BannedWord("casino".to_string()))
        );
    }

    #[test]
    fn phone_numbers_are_flagged() {
        assert_eq!(
            filter().inspect("звоните +7 (999) 123-45-67"),
            Some(Violation::PhoneNumber)
        );
        assert_eq!(filter().inspect("89991234567"), Some(Violation::PhoneNumber));
        assert_eq!(
            filter().inspect("пишите 8-999-123-45-67"),
            Some(Violation::PhoneNumber)
        );
        assert_eq!(
            filter().inspect("london: +44 20 7946 0958"),
            Some(Violation::PhoneNumber)
        );
    }

    #[test]
    fn ordinary_text_passes() {
        for text in [
            "Episode 42 aired 12.05.2024, season 2023-2024",
            "сезон шёл 2020 - 2024",
            "выпуски 100 200 300",
            "(2019) 2020 2021",
            "счёт 1 2 3 4 5 6 7 8 9 10",
            "",
        ] {
            assert_eq!(filter().inspect(text), None, "{}", text);
        }
    }

    #[test]
    fn disabled_filter_never_matches() {
        let filter = Filter::new(false, &["casino".to_string()]);
        assert_eq!(filter.inspect("casino"), None);
    }
}
