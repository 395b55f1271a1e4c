//! Supported target languages and a best-effort source-language heuristic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// The fixed set of output languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Th,
    Vi,
    Ms,
    Km,
    Tl,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::Th,
        Language::Vi,
        Language::Ms,
        Language::Km,
        Language::Tl,
    ];

    /// Parse a language code (`"th"`, `" TH "`).
    pub fn from_code(code: &str) -> Result<Self, InputError> {
        let normalized = code.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|l| l.code() == normalized)
            .ok_or_else(|| InputError::UnsupportedLanguage(code.trim().to_string()))
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Th => "th",
            Language::Vi => "vi",
            Language::Ms => "ms",
            Language::Km => "km",
            Language::Tl => "tl",
        }
    }

    /// English name of the language, as embedded in prompts.
    pub fn name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Th => "Thai",
            Language::Vi => "Vietnamese",
            Language::Ms => "Malay",
            Language::Km => "Khmer",
            Language::Tl => "Tagalog",
        }
    }

    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Th => "ไทย",
            Language::Vi => "Tiếng Việt",
            Language::Ms => "Bahasa Melayu",
            Language::Km => "ខ្មែរ",
            Language::Tl => "Filipino",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const MIN_DETECTION_CHARS: usize = 20;

const ENGLISH_INDICATORS: &[&str] = &[
    "the ", "and ", "with ", "for ", "your ", "this ", "that ", "will ", "have ", "are ",
    "patient", "take ", "daily", "doctor", "medication", "tablet", "treatment",
];

const MALAY_INDICATORS: &[&str] = &[
    "dan ", "yang ", "untuk ", "dengan ", "ini ", "itu ", "tidak ", "anda ", "sila ",
    "ubat", "doktor", "hari ", "pesakit", "rawatan", "kesihatan", "sebelum ", "selepas ",
];

const TAGALOG_INDICATORS: &[&str] = &[
    "ang ", "ng ", "mga ", "sa ", "na ", "ay ", "ito ", "po ", "inyong ", "para ",
    "gamot", "doktor", "araw ", "pasyente", "kalusugan", "uminom", "hindi ",
];

/// Guess the dominant language of `text`.
///
/// Thai and Khmer are recognized by script, Vietnamese by its distinctive
/// diacritics, and English/Malay/Tagalog by indicator-word frequency.
/// Returns `None` when the text is too short or nothing scores.
pub fn detect_language(text: &str) -> Option<Language> {
    let letters: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if letters.len() < MIN_DETECTION_CHARS {
        return None;
    }

    let thai = letters
        .iter()
        .filter(|c| ('\u{0E00}'..='\u{0E7F}').contains(*c))
        .count();
    let khmer = letters
        .iter()
        .filter(|c| ('\u{1780}'..='\u{17FF}').contains(*c))
        .count();
    let script_threshold = letters.len() / 4;
    if thai > script_threshold && thai >= khmer {
        return Some(Language::Th);
    }
    if khmer > script_threshold {
        return Some(Language::Km);
    }

    if count_vietnamese_marks(&letters) >= 3 {
        return Some(Language::Vi);
    }

    // Pad so indicators with a trailing space match the last word too.
    let lower = format!("{} ", text.to_lowercase());
    let scores = [
        (Language::En, count_indicators(&lower, ENGLISH_INDICATORS)),
        (Language::Ms, count_indicators(&lower, MALAY_INDICATORS)),
        (Language::Tl, count_indicators(&lower, TAGALOG_INDICATORS)),
    ];

    scores
        .into_iter()
        .filter(|(_, score)| *score > 0)
        // English wins ties: first max in declaration order.
        .fold(None, |best: Option<(Language, u32)>, (lang, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((lang, score)),
        })
        .map(|(lang, _)| lang)
}

fn count_indicators(lower_text: &str, indicators: &[&str]) -> u32 {
    indicators
        .iter()
        .map(|indicator| {
            lower_text
                .match_indices(indicator)
                .filter(|(i, _)| {
                    // Only count whole-word starts.
                    *i == 0
                        || !lower_text[..*i]
                            .chars()
                            .next_back()
                            .is_some_and(char::is_alphanumeric)
                })
                .count() as u32
        })
        .sum()
}

/// Letters that are characteristic of Vietnamese orthography.
fn count_vietnamese_marks(letters: &[char]) -> usize {
    letters
        .iter()
        .filter(|c| {
            matches!(
                c.to_lowercase().next().unwrap_or(**c),
                'ă' | 'ơ' | 'ư' | 'đ' | 'ạ' | 'ả' | 'ấ' | 'ầ' | 'ẩ' | 'ậ' | 'ắ' | 'ằ' | 'ặ'
                    | 'ẹ' | 'ẻ' | 'ẽ' | 'ế' | 'ề' | 'ể' | 'ễ' | 'ệ' | 'ỉ' | 'ị' | 'ọ' | 'ỏ'
                    | 'ố' | 'ồ' | 'ổ' | 'ỗ' | 'ộ' | 'ớ' | 'ờ' | 'ở' | 'ỡ' | 'ợ' | 'ụ' | 'ủ'
                    | 'ứ' | 'ừ' | 'ử' | 'ữ' | 'ự' | 'ỳ' | 'ỵ' | 'ỷ' | 'ỹ'
            )
        })
        .count()
}
