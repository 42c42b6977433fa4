//! Keyword analysis of a user's free-text instruction.
//!
//! Front ends run this once to turn a prompt into explicit flags; the
//! engine never looks at prompt text itself.

use crate::types::ExtractionMode;

/// How a keyword is matched against a lower-cased prompt
#[derive(Debug, Clone, Copy)]
enum Keyword {
    /// Whole token
    Word(&'static str),
    /// Token prefix, for inflected Russian forms
    Stem(&'static str),
    /// Substring of the prompt
    Phrase(&'static str),
}

use Keyword::{Phrase, Stem, Word};

const TEXT_KEYWORDS: &[Keyword] = &[
    Word("text"),
    Word("texts"),
    Word("inscription"),
    Word("inscriptions"),
    Phrase("only text"),
    Stem("текст"),
    Stem("надпис"),
];

const AGGRESSIVE_KEYWORDS: &[Keyword] = &[
    Phrase("remove background"),
    Phrase("gray background"),
    Phrase("grey background"),
    Phrase("убери фон"),
    Phrase("удали фон"),
    Phrase("убери задний"),
    Phrase("удали задний"),
    Phrase("серый фон"),
];

const ENTIRE_KEYWORDS: &[Keyword] = &[
    Word("entire"),
    Word("whole"),
    Word("all"),
    Word("everything"),
    Phrase("from entire"),
    Phrase("from whole"),
    Word("весь"),
    Word("все"),
    Word("всё"),
    Word("целиком"),
    Word("целое"),
    Phrase("со всего"),
];

/// Flags derived from a prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptIntent {
    pub mode: ExtractionMode,
    /// The user asked for the background to be stripped
    pub aggressive: bool,
    /// The user asked for the whole image rather than a part of it
    pub entire: bool,
}

impl PromptIntent {
    pub fn parse(prompt: &str) -> Self {
        let lower = prompt.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let matches = |keywords: &[Keyword]| {
            keywords.iter().any(|keyword| match *keyword {
                Word(word) => tokens.iter().any(|t| *t == word),
                Stem(stem) => tokens.iter().any(|t| t.starts_with(stem)),
                Phrase(phrase) => lower.contains(phrase),
            })
        };

        Self {
            mode: if matches(TEXT_KEYWORDS) { ExtractionMode::Text } else { ExtractionMode::Generic },
            aggressive: matches(AGGRESSIVE_KEYWORDS),
            entire: matches(ENTIRE_KEYWORDS),
        }
    }

    /// Whether the prompt asks for text.
    pub fn is_text(&self) -> bool {
        self.mode == ExtractionMode::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_keywords() {
        assert!(PromptIntent::parse("extract the TEXT on the shirt").is_text());
        assert!(PromptIntent::parse("надпись LINKIN PARK").is_text());
        assert!(PromptIntent::parse("извлеки весь текста блок").is_text());
        assert!(!PromptIntent::parse("the texture of the print").is_text());
        assert!(!PromptIntent::parse("logo with a woman").is_text());
    }

    #[test]
    fn test_entire_keywords_match_whole_words() {
        assert!(PromptIntent::parse("весь").entire);
        assert!(PromptIntent::parse("Take the ENTIRE picture").entire);
        assert!(PromptIntent::parse("текст со всего листа").entire);
        assert!(!PromptIntent::parse("the small print").entire);
        assert!(!PromptIntent::parse("wallpaper pattern").entire);
    }

    #[test]
    fn test_aggressive_keywords() {
        assert!(PromptIntent::parse("Remove background please").aggressive);
        assert!(PromptIntent::parse("убери фон").aggressive);
        assert!(!PromptIntent::parse("the background tree").aggressive);
    }

    #[test]
    fn test_mode_from_prompt_defaults_to_generic() {
        assert_eq!(ExtractionMode::from_prompt(None), ExtractionMode::Generic);
        assert_eq!(ExtractionMode::from_prompt(Some("inscription")), ExtractionMode::Text);
    }
}
