//! Token → mouth shape resolution.
//!
//! Two alphabets are supported: Japanese kana (one mora per token) and an
//! ARPAbet-like English phoneme set. Resolution is a pure function of
//! `(token, language, rig)`; rig profiles may override individual shapes.

pub mod english;
pub mod japanese;

use serde::{Deserialize, Serialize};

use crate::channels::{MorphWeights, JAW_OPEN, MOUTH_OPEN};
use crate::error::LipSyncError;
use crate::rig::RigProfile;

pub use english::EnglishTable;
pub use japanese::JapaneseTable;

/// Shape used when a token cannot be resolved at all.
pub const FALLBACK_SHAPE: [(&str, f32); 2] = [(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15)];

/// Language mode of the current utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "ja", alias = "jp", alias = "japanese")]
    Japanese,
    #[serde(rename = "en", alias = "english")]
    English,
}

impl Language {
    /// Parse a language tag (`ja`, `en`, `en-US`, `japanese`, ...).
    pub fn from_tag(tag: &str) -> Option<Self> {
        let lower = tag.trim().to_ascii_lowercase();
        let primary = lower.split(['-', '_']).next().unwrap_or("");
        match primary {
            "ja" | "jp" | "jpn" | "japanese" => Some(Self::Japanese),
            "en" | "eng" | "english" => Some(Self::English),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Japanese => "ja",
            Self::English => "en",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// A viseme unit in one of the two alphabets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhonemeSymbol {
    /// Hiragana mora key (vowel, ん or っ)
    Mora(&'static str),
    /// ARPAbet code without stress digits
    Arpabet(&'static str),
}

impl PhonemeSymbol {
    /// Key used by the phoneme tables and by rig overrides.
    pub fn code(&self) -> &'static str {
        match *self {
            Self::Mora(code) | Self::Arpabet(code) => code,
        }
    }
}

/// Resolves tokens into unscaled target mouth shapes.
#[derive(Debug)]
pub struct PhonemeResolver {
    japanese: JapaneseTable,
    english: EnglishTable,
}

impl Default for PhonemeResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PhonemeResolver {
    /// Build the lookup tables. Done once at startup and shared.
    pub fn new() -> Self {
        Self {
            japanese: JapaneseTable::new(),
            english: EnglishTable::new(),
        }
    }

    /// Map a token to its phoneme symbol.
    ///
    /// Tokens written in the other language's script fall through to that
    /// language's path, so romaji or English words inside Japanese dialogue
    /// still move the mouth.
    pub fn symbol(&self, token: &str, language: Language) -> Option<PhonemeSymbol> {
        match language {
            Language::Japanese => self
                .japanese
                .symbol(token)
                .or_else(|| self.english.symbol(token)),
            Language::English => self
                .english
                .symbol(token)
                .or_else(|| self.japanese.symbol(token)),
        }
    }

    /// Resolve a token, reporting tokens that have no mouth shape.
    pub fn try_resolve(
        &self,
        token: &str,
        language: Language,
        rig: &RigProfile,
    ) -> Result<MorphWeights, LipSyncError> {
        let token = token.trim();

        if let Some(shape) = rig.override_shape(token) {
            return Ok(shape.clone());
        }

        let symbol = self
            .symbol(token, language)
            .ok_or_else(|| LipSyncError::UnresolvedToken(token.to_string()))?;

        if let Some(shape) = rig.override_shape(symbol.code()) {
            return Ok(shape.clone());
        }

        let shape = match symbol {
            PhonemeSymbol::Mora(code) => self.japanese.shape(code),
            PhonemeSymbol::Arpabet(code) => self.english.shape(code),
        };

        shape
            .cloned()
            .ok_or_else(|| LipSyncError::UnresolvedToken(token.to_string()))
    }

    /// Resolve a token, falling back to a slightly open mouth.
    pub fn resolve(&self, token: &str, language: Language, rig: &RigProfile) -> MorphWeights {
        self.try_resolve(token, language, rig)
            .unwrap_or_else(|_| fallback_shape())
    }

    pub fn japanese(&self) -> &JapaneseTable {
        &self.japanese
    }

    pub fn english(&self) -> &EnglishTable {
        &self.english
    }
}

/// Fresh copy of the default open-mouth shape.
pub fn fallback_shape() -> MorphWeights {
    MorphWeights::from_pairs(FALLBACK_SHAPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{MOUTH_CLOSE, MOUTH_LOWER_DOWN, MOUTH_PUCKER};
    use crate::rig::RigRegistry;
    use proptest::prelude::*;

    fn default_rig() -> std::sync::Arc<RigProfile> {
        RigRegistry::with_builtins().default_profile()
    }

    #[test]
    fn test_language_tags() {
        assert_eq!(Language::from_tag("ja"), Some(Language::Japanese));
        assert_eq!(Language::from_tag("en-US"), Some(Language::English));
        assert_eq!(Language::from_tag("EN"), Some(Language::English));
        assert_eq!(Language::from_tag("fr"), None);
    }

    #[test]
    fn test_japanese_vowel() {
        let resolver = PhonemeResolver::new();
        let shape = resolver.resolve("あ", Language::Japanese, &default_rig());
        assert!((shape.get(JAW_OPEN) - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_japanese_consonant_decomposes_to_vowel() {
        let resolver = PhonemeResolver::new();
        let rig = default_rig();
        let ka = resolver.resolve("か", Language::Japanese, &rig);
        let a = resolver.resolve("あ", Language::Japanese, &rig);
        assert_eq!(ka, a);

        let katakana = resolver.resolve("ム", Language::Japanese, &rig);
        let u = resolver.resolve("う", Language::Japanese, &rig);
        assert_eq!(katakana, u);
    }

    #[test]
    fn test_bilabial_closes_lips() {
        let resolver = PhonemeResolver::new();
        let shape = resolver.resolve("M", Language::English, &default_rig());
        assert!(shape.get(JAW_OPEN) < 0.05, "M should keep the jaw shut");
        assert!(shape.get(MOUTH_CLOSE) > 0.5, "M should close the lips");
    }

    #[test]
    fn test_open_vowels_drop_lower_lip() {
        let resolver = PhonemeResolver::new();
        let rig = default_rig();
        for (token, language) in [
            ("あ", Language::Japanese),
            ("え", Language::Japanese),
            ("AA", Language::English),
            ("AE", Language::English),
            ("AH", Language::English),
        ] {
            let shape = resolver.resolve(token, language, &rig);
            assert!(shape.get(MOUTH_LOWER_DOWN) > 0.0, "{token}");
        }
        let m = resolver.resolve("M", Language::English, &rig);
        assert_eq!(m.get(MOUTH_LOWER_DOWN), 0.0);
    }

    #[test]
    fn test_unresolved_token_falls_back() {
        let resolver = PhonemeResolver::new();
        let rig = default_rig();
        for language in [Language::Japanese, Language::English] {
            let result = resolver.try_resolve("Ω", language, &rig);
            assert_eq!(result, Err(LipSyncError::UnresolvedToken("Ω".to_string())));

            let shape = resolver.resolve("Ω", language, &rig);
            assert_eq!(shape, fallback_shape());
            assert!((shape.get(JAW_OPEN) - 0.2).abs() < 1e-6);
            assert!((shape.get(MOUTH_OPEN) - 0.15).abs() < 1e-6);
        }
    }

    #[test]
    fn test_english_word_uses_dictionary_first_phoneme() {
        let resolver = PhonemeResolver::new();
        assert_eq!(
            resolver.symbol("you", Language::English),
            Some(PhonemeSymbol::Arpabet("Y"))
        );
        assert_eq!(
            resolver.symbol("Water!", Language::English),
            Some(PhonemeSymbol::Arpabet("W"))
        );
    }

    #[test]
    fn test_cross_script_fallthrough() {
        let resolver = PhonemeResolver::new();
        assert_eq!(
            resolver.symbol("M", Language::Japanese),
            Some(PhonemeSymbol::Arpabet("M"))
        );
        assert_eq!(
            resolver.symbol("お", Language::English),
            Some(PhonemeSymbol::Mora("お"))
        );
    }

    #[test]
    fn test_rig_override_takes_precedence() {
        let registry = RigRegistry::with_builtins();
        let child = registry.get("child").unwrap();
        let resolver = PhonemeResolver::new();

        let generic = resolver.resolve("う", Language::Japanese, &default_rig());
        let overridden = resolver.resolve("う", Language::Japanese, &child);
        assert_ne!(generic, overridden);
        assert!(overridden.get(MOUTH_PUCKER) > 0.0);
        // Decomposed moras also pick up the override of their vowel
        let mu = resolver.resolve("む", Language::Japanese, &child);
        assert_eq!(mu, overridden);
    }

    #[test]
    fn test_every_table_entry_in_range() {
        let resolver = PhonemeResolver::new();
        let rig = default_rig();
        let tokens = resolver
            .japanese()
            .known_kana()
            .map(|c| c.to_string())
            .chain(resolver.english().codes().map(str::to_string))
            .chain(resolver.english().words().map(str::to_string));
        for token in tokens {
            for language in [Language::Japanese, Language::English] {
                let shape = resolver.resolve(&token, language, &rig);
                assert!(!shape.is_empty(), "{token} resolved to an empty shape");
                for (name, value) in shape.iter() {
                    assert!(
                        (0.0..=1.0).contains(&value),
                        "{token}/{name} out of range: {value}"
                    );
                }
            }
        }
    }

    proptest! {
        #[test]
        fn prop_any_token_yields_bounded_nonempty_shape(token in "\\PC{0,6}", english in any::<bool>()) {
            let resolver = PhonemeResolver::new();
            let language = if english { Language::English } else { Language::Japanese };
            let shape = resolver.resolve(&token, language, &default_rig());
            prop_assert!(!shape.is_empty());
            for (_, value) in shape.iter() {
                prop_assert!((0.0..=1.0).contains(&value));
            }
        }
    }
}
