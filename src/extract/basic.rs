//! BasicDetect: line count plus whole-word keyword counts.

use std::collections::BTreeMap;

use super::{ExtractionOutcome, PresenceSignals, Structure};

static KEYWORDS: phf::Map<&'static str, &'static [&'static str]> = phf::phf_map! {
    "c" => &["struct", "enum", "union", "typedef"],
    "cpp" => &["class", "struct", "namespace", "template"],
    "csharp" => &["class", "interface", "struct", "namespace", "record"],
    "kotlin" => &["fun", "class", "interface", "object"],
    "ruby" => &["def", "class", "module"],
    "php" => &["function", "class", "interface", "trait"],
    "swift" => &["func", "class", "struct", "protocol", "extension"],
};

/// Keywords counted for a language. Unknown languages count none.
pub fn keywords_for(language: &str) -> &'static [&'static str] {
    KEYWORDS.get(language).copied().unwrap_or(&[])
}

pub fn extract(language: &str, source: &str) -> (Structure, ExtractionOutcome) {
    let keywords = keywords_for(language);
    let mut keyword_counts: BTreeMap<String, usize> =
        keywords.iter().map(|k| (k.to_string(), 0)).collect();

    if !keywords.is_empty() {
        for word in source.split(|c: char| !(c.is_alphanumeric() || c == '_')) {
            if let Some(count) = keyword_counts.get_mut(word) {
                *count += 1;
            }
        }
    }

    let signals = PresenceSignals {
        line_count: source.lines().count(),
        keyword_counts,
    };
    (Structure::Signals(signals), ExtractionOutcome::Complete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(language: &str, source: &str) -> PresenceSignals {
        match extract(language, source).0 {
            Structure::Signals(s) => s,
            Structure::Parsed(_) => panic!("basic detection produced parsed data"),
        }
    }

    #[test]
    fn test_ruby_keywords() {
        let s = signals(
            "ruby",
            "module Shop\n  class Cart\n    def add(item)\n    end\n    def undefined_total; end\n  end\nend\n",
        );
        assert_eq!(s.line_count, 7);
        assert_eq!(s.keyword_counts["def"], 2);
        assert_eq!(s.keyword_counts["class"], 1);
        assert_eq!(s.keyword_counts["module"], 1);
    }

    #[test]
    fn test_whole_words_only() {
        let s = signals("c", "typedef struct point { int x; } point_t;\nint structure = 0;\n");
        assert_eq!(s.keyword_counts["struct"], 1);
        assert_eq!(s.keyword_counts["typedef"], 1);
        assert_eq!(s.keyword_counts["union"], 0);
    }

    #[test]
    fn test_unknown_language_counts_lines() {
        let s = signals("elm", "module Main exposing (..)\n\nmain = text \"hi\"\n");
        assert_eq!(s.line_count, 3);
        assert!(s.keyword_counts.is_empty());
    }
}
