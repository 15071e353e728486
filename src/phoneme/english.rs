//! English phoneme tables (CMU ARPAbet subset) and a heuristic
//! grapheme → phoneme fallback.

use std::collections::HashMap;

use crate::channels::{
    MorphWeights, JAW_OPEN, MOUTH_CLOSE, MOUTH_FUNNEL, MOUTH_LOWER_DOWN, MOUTH_OPEN, MOUTH_PUCKER,
    MOUTH_ROLL_LOWER, MOUTH_SMILE, MOUTH_STRETCH, MOUTH_UPPER_UP, TONGUE_OUT,
};

use super::PhonemeSymbol;

type ShapeRow = (&'static str, &'static [(&'static str, f32)]);

/// Neutral vowel used for letters with no rule.
pub const NEUTRAL_VOWEL: &str = "AH";

const PHONEME_SHAPES: &[ShapeRow] = &[
    // Open vowels
    ("AA", &[(JAW_OPEN, 0.7), (MOUTH_OPEN, 0.6), (MOUTH_LOWER_DOWN, 0.3)]),
    (
        "AO",
        &[(JAW_OPEN, 0.65), (MOUTH_OPEN, 0.55), (MOUTH_FUNNEL, 0.3), (MOUTH_LOWER_DOWN, 0.25)],
    ),
    (
        "AW",
        &[(JAW_OPEN, 0.65), (MOUTH_OPEN, 0.5), (MOUTH_PUCKER, 0.2), (MOUTH_LOWER_DOWN, 0.25)],
    ),
    (
        "AE",
        &[(JAW_OPEN, 0.6), (MOUTH_OPEN, 0.5), (MOUTH_STRETCH, 0.3), (MOUTH_LOWER_DOWN, 0.25)],
    ),
    (
        "AY",
        &[(JAW_OPEN, 0.6), (MOUTH_OPEN, 0.5), (MOUTH_STRETCH, 0.2), (MOUTH_LOWER_DOWN, 0.25)],
    ),
    ("AH", &[(JAW_OPEN, 0.45), (MOUTH_OPEN, 0.4), (MOUTH_LOWER_DOWN, 0.2)]),
    // Mid / front vowels
    (
        "EH",
        &[(JAW_OPEN, 0.4), (MOUTH_OPEN, 0.35), (MOUTH_STRETCH, 0.35), (MOUTH_LOWER_DOWN, 0.2)],
    ),
    ("EY", &[(JAW_OPEN, 0.35), (MOUTH_OPEN, 0.3), (MOUTH_STRETCH, 0.45)]),
    ("ER", &[(JAW_OPEN, 0.3), (MOUTH_OPEN, 0.25), (MOUTH_FUNNEL, 0.3)]),
    ("IH", &[(JAW_OPEN, 0.25), (MOUTH_OPEN, 0.2), (MOUTH_STRETCH, 0.5)]),
    (
        "IY",
        &[(JAW_OPEN, 0.15), (MOUTH_OPEN, 0.15), (MOUTH_STRETCH, 0.65), (MOUTH_SMILE, 0.3)],
    ),
    // Rounded vowels
    (
        "OW",
        &[(JAW_OPEN, 0.45), (MOUTH_OPEN, 0.35), (MOUTH_FUNNEL, 0.55), (MOUTH_PUCKER, 0.25)],
    ),
    ("OY", &[(JAW_OPEN, 0.45), (MOUTH_OPEN, 0.35), (MOUTH_FUNNEL, 0.45)]),
    (
        "UH",
        &[(JAW_OPEN, 0.25), (MOUTH_OPEN, 0.2), (MOUTH_FUNNEL, 0.35), (MOUTH_PUCKER, 0.3)],
    ),
    (
        "UW",
        &[(JAW_OPEN, 0.15), (MOUTH_OPEN, 0.1), (MOUTH_PUCKER, 0.65), (MOUTH_FUNNEL, 0.35)],
    ),
    // Bilabial: lips pressed together, jaw shut
    ("B", &[(MOUTH_CLOSE, 0.8), (MOUTH_PUCKER, 0.1)]),
    ("P", &[(MOUTH_CLOSE, 0.8), (MOUTH_PUCKER, 0.1)]),
    ("M", &[(MOUTH_CLOSE, 0.8), (MOUTH_PUCKER, 0.1)]),
    // Labiodental
    ("F", &[(JAW_OPEN, 0.1), (MOUTH_ROLL_LOWER, 0.6), (MOUTH_UPPER_UP, 0.2)]),
    ("V", &[(JAW_OPEN, 0.1), (MOUTH_ROLL_LOWER, 0.6), (MOUTH_UPPER_UP, 0.2)]),
    // Dental
    ("TH", &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (TONGUE_OUT, 0.4)]),
    ("DH", &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (TONGUE_OUT, 0.4)]),
    // Alveolar
    ("T", &[(JAW_OPEN, 0.25), (MOUTH_OPEN, 0.2), (MOUTH_STRETCH, 0.1)]),
    ("D", &[(JAW_OPEN, 0.25), (MOUTH_OPEN, 0.2), (MOUTH_STRETCH, 0.1)]),
    ("N", &[(JAW_OPEN, 0.25), (MOUTH_OPEN, 0.2), (MOUTH_STRETCH, 0.1)]),
    ("L", &[(JAW_OPEN, 0.25), (MOUTH_OPEN, 0.2), (TONGUE_OUT, 0.1)]),
    ("S", &[(JAW_OPEN, 0.1), (MOUTH_OPEN, 0.08), (MOUTH_STRETCH, 0.45)]),
    ("Z", &[(JAW_OPEN, 0.1), (MOUTH_OPEN, 0.08), (MOUTH_STRETCH, 0.45)]),
    // Velar
    ("K", &[(JAW_OPEN, 0.3), (MOUTH_OPEN, 0.2)]),
    ("G", &[(JAW_OPEN, 0.3), (MOUTH_OPEN, 0.2)]),
    ("NG", &[(JAW_OPEN, 0.3), (MOUTH_OPEN, 0.2)]),
    // Postalveolar
    ("CH", &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (MOUTH_FUNNEL, 0.4), (MOUTH_PUCKER, 0.3)]),
    ("JH", &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (MOUTH_FUNNEL, 0.4), (MOUTH_PUCKER, 0.3)]),
    ("SH", &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (MOUTH_FUNNEL, 0.4), (MOUTH_PUCKER, 0.3)]),
    ("ZH", &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (MOUTH_FUNNEL, 0.4), (MOUTH_PUCKER, 0.3)]),
    // Approximants
    ("R", &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (MOUTH_PUCKER, 0.35)]),
    ("W", &[(JAW_OPEN, 0.1), (MOUTH_PUCKER, 0.7), (MOUTH_FUNNEL, 0.3)]),
    ("Y", &[(JAW_OPEN, 0.15), (MOUTH_OPEN, 0.1), (MOUTH_STRETCH, 0.4)]),
    ("HH", &[(JAW_OPEN, 0.35), (MOUTH_OPEN, 0.3)]),
];

/// Small pronunciation dictionary for frequent words the letter rules get wrong.
const WORDS: &[(&str, &[&str])] = &[
    ("a", &["AH"]),
    ("and", &["AE", "N", "D"]),
    ("are", &["AA", "R"]),
    ("be", &["B", "IY"]),
    ("do", &["D", "UW"]),
    ("eye", &["AY"]),
    ("good", &["G", "UH", "D"]),
    ("hello", &["HH", "AH", "L", "OW"]),
    ("hi", &["HH", "AY"]),
    ("honest", &["AA", "N", "AH", "S", "T"]),
    ("hour", &["AW", "ER"]),
    ("how", &["HH", "AW"]),
    ("i", &["AY"]),
    ("is", &["IH", "Z"]),
    ("it", &["IH", "T"]),
    ("know", &["N", "OW"]),
    ("love", &["L", "AH", "V"]),
    ("meet", &["M", "IY", "T"]),
    ("morning", &["M", "AO", "R", "N", "IH", "NG"]),
    ("my", &["M", "AY"]),
    ("name", &["N", "EY", "M"]),
    ("nice", &["N", "AY", "S"]),
    ("no", &["N", "OW"]),
    ("of", &["AH", "V"]),
    ("oh", &["OW"]),
    ("ok", &["OW", "K", "EY"]),
    ("okay", &["OW", "K", "EY"]),
    ("one", &["W", "AH", "N"]),
    ("our", &["AW", "ER"]),
    ("please", &["P", "L", "IY", "Z"]),
    ("sorry", &["S", "AA", "R", "IY"]),
    ("thank", &["TH", "AE", "NG", "K"]),
    ("thanks", &["TH", "AE", "NG", "K", "S"]),
    ("the", &["DH", "AH"]),
    ("they", &["DH", "EY"]),
    ("to", &["T", "UW"]),
    ("today", &["T", "AH", "D", "EY"]),
    ("water", &["W", "AO", "T", "ER"]),
    ("we", &["W", "IY"]),
    ("welcome", &["W", "EH", "L", "K", "AH", "M"]),
    ("what", &["W", "AH", "T"]),
    ("why", &["W", "AY"]),
    ("world", &["W", "ER", "L", "D"]),
    ("yes", &["Y", "EH", "S"]),
    ("you", &["Y", "UW"]),
];

/// Two-letter rules, checked before single letters.
const DIGRAPHS: &[(&str, &str)] = &[
    ("th", "TH"),
    ("sh", "SH"),
    ("ch", "CH"),
    ("ph", "F"),
    ("wh", "W"),
    ("ng", "NG"),
    ("ck", "K"),
    ("qu", "K"),
    ("kn", "N"),
    ("wr", "R"),
    ("ee", "IY"),
    ("ea", "IY"),
    ("ie", "IY"),
    ("oo", "UW"),
    ("ou", "AW"),
    ("ow", "OW"),
    ("oa", "OW"),
    ("ai", "EY"),
    ("ay", "EY"),
    ("oi", "OY"),
    ("oy", "OY"),
    ("au", "AO"),
    ("aw", "AO"),
    ("er", "ER"),
    ("ir", "ER"),
    ("ur", "ER"),
];

const LETTERS: &[(char, &str)] = &[
    ('a', "AE"),
    ('b', "B"),
    ('c', "K"),
    ('d', "D"),
    ('e', "EH"),
    ('f', "F"),
    ('g', "G"),
    ('h', "HH"),
    ('i', "IH"),
    ('j', "JH"),
    ('k', "K"),
    ('l', "L"),
    ('m', "M"),
    ('n', "N"),
    ('o', "AA"),
    ('p', "P"),
    ('q', "K"),
    ('r', "R"),
    ('s', "S"),
    ('t', "T"),
    ('u', "AH"),
    ('v', "V"),
    ('w', "W"),
    ('x', "K"),
    ('y', "Y"),
    ('z', "Z"),
];

/// Strip ARPAbet stress markers (`AH0`, `IY1`).
fn strip_stress(code: &str) -> &str {
    code.trim_end_matches(['0', '1', '2'])
}

/// Greedy longest-match letter → phoneme decomposition of a lowercase word.
///
/// Digits and punctuation are skipped; alphabetic characters without a rule
/// become the neutral vowel.
pub fn letter_phonemes(word: &str) -> Vec<&'static str> {
    let chars: Vec<char> = word.chars().collect();
    let mut phonemes = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        if i + 1 < chars.len() {
            let pair: String = chars[i..i + 2].iter().collect();
            if let Some(&(_, code)) = DIGRAPHS.iter().find(|(g, _)| *g == pair) {
                phonemes.push(code);
                i += 2;
                continue;
            }
        }

        let c = chars[i];
        if let Some(&(_, code)) = LETTERS.iter().find(|(l, _)| *l == c) {
            phonemes.push(code);
        } else if c.is_alphabetic() && !c.is_ascii() && is_latin(c) {
            phonemes.push(NEUTRAL_VOWEL);
        }
        i += 1;
    }

    phonemes
}

/// Latin-script letters outside ASCII (accented vowels and the like).
fn is_latin(c: char) -> bool {
    matches!(c as u32, 0x00C0..=0x024F | 0x1E00..=0x1EFF)
}

/// Phoneme table, pronunciation dictionary and letter rules.
#[derive(Debug)]
pub struct EnglishTable {
    shapes: HashMap<&'static str, MorphWeights>,
    words: HashMap<&'static str, &'static [&'static str]>,
}

impl Default for EnglishTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EnglishTable {
    pub fn new() -> Self {
        let shapes = PHONEME_SHAPES
            .iter()
            .map(|&(code, weights)| (code, MorphWeights::from_pairs(weights.iter().copied())))
            .collect();
        let words = WORDS.iter().copied().collect();
        Self { shapes, words }
    }

    /// Look up a phoneme code, returning the table's static key.
    pub fn code(&self, token: &str) -> Option<&'static str> {
        let stripped = strip_stress(token);
        if stripped.is_empty()
            || stripped.len() > 2
            || !stripped.chars().all(|c| c.is_ascii_uppercase())
        {
            return None;
        }
        self.shapes.get_key_value(stripped).map(|(code, _)| *code)
    }

    /// Full phoneme sequence for a word: dictionary entry if known,
    /// letter rules otherwise.
    pub fn word_phonemes(&self, word: &str) -> Vec<&'static str> {
        let normalized = normalize_word(word);
        if let Some(phonemes) = self.words.get(normalized.as_str()) {
            return phonemes.to_vec();
        }
        letter_phonemes(&normalized)
    }

    /// Symbol for a token: phoneme code, then dictionary word, then first
    /// letter-rule phoneme.
    pub fn symbol(&self, token: &str) -> Option<PhonemeSymbol> {
        let token = token.trim();
        if let Some(code) = self.code(token) {
            return Some(PhonemeSymbol::Arpabet(code));
        }
        self.word_phonemes(token)
            .first()
            .copied()
            .map(PhonemeSymbol::Arpabet)
    }

    pub fn shape(&self, code: &str) -> Option<&MorphWeights> {
        self.shapes.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.shapes.keys().copied()
    }

    pub fn words(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.words.keys().copied()
    }
}

/// Lowercase and trim surrounding punctuation (keeps inner apostrophes).
fn normalize_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phoneme_codes() {
        let table = EnglishTable::new();
        assert_eq!(table.code("M"), Some("M"));
        assert_eq!(table.code("AH0"), Some("AH"));
        assert_eq!(table.code("IY1"), Some("IY"));
        assert_eq!(table.code("NG"), Some("NG"));
        assert_eq!(table.code("A"), None);
        assert_eq!(table.code("m"), None);
        assert_eq!(table.code("HELLO"), None);
    }

    #[test]
    fn test_dictionary_words() {
        let table = EnglishTable::new();
        assert_eq!(table.word_phonemes("Hello"), vec!["HH", "AH", "L", "OW"]);
        assert_eq!(table.symbol("the"), Some(PhonemeSymbol::Arpabet("DH")));
        assert_eq!(table.symbol("A"), Some(PhonemeSymbol::Arpabet("AH")));
    }

    #[test]
    fn test_digraphs_before_letters() {
        assert_eq!(letter_phonemes("ship"), vec!["SH", "IH", "P"]);
        assert_eq!(letter_phonemes("phone"), vec!["F", "AA", "N", "EH"]);
        assert_eq!(letter_phonemes("moon"), vec!["M", "UW", "N"]);
        assert_eq!(letter_phonemes("bat"), vec!["B", "AE", "T"]);
    }

    #[test]
    fn test_unknown_letters_become_neutral_vowel() {
        assert_eq!(letter_phonemes("café"), vec!["K", "AE", "F", NEUTRAL_VOWEL]);
        assert_eq!(letter_phonemes("r2d2"), vec!["R", "D"]);
    }

    #[test]
    fn test_tokens_without_letters() {
        let table = EnglishTable::new();
        assert_eq!(table.symbol("Ω"), None);
        assert_eq!(table.symbol("..."), None);
        assert_eq!(table.symbol(""), None);
        assert_eq!(table.symbol("あ"), None);
    }

    #[test]
    fn test_every_rule_has_a_shape() {
        let table = EnglishTable::new();
        for &(graph, code) in DIGRAPHS {
            assert!(table.shape(code).is_some(), "{graph}: missing shape for {code}");
        }
        for &(letter, code) in LETTERS {
            assert!(table.shape(code).is_some(), "{letter}: missing shape for {code}");
        }
        for (word, phonemes) in WORDS {
            for code in phonemes.iter() {
                assert!(table.shape(code).is_some(), "{word}: missing shape for {code}");
            }
        }
    }
}
