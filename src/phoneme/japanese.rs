//! Japanese mora tables.
//!
//! Only the five vowels plus ん and っ carry their own mouth shape. Every
//! other kana is decomposed to the vowel it ends on, since the visible mouth
//! shape of a CV mora is dominated by its vowel.

use std::collections::HashMap;

use crate::channels::{
    MorphWeights, JAW_OPEN, MOUTH_CLOSE, MOUTH_FUNNEL, MOUTH_LOWER_DOWN, MOUTH_OPEN, MOUTH_PUCKER,
    MOUTH_SMILE, MOUTH_STRETCH,
};

use super::PhonemeSymbol;

type ShapeRow = (&'static str, &'static [(&'static str, f32)]);

const MORA_SHAPES: &[ShapeRow] = &[
    ("あ", &[(JAW_OPEN, 0.7), (MOUTH_OPEN, 0.6), (MOUTH_LOWER_DOWN, 0.3)]),
    (
        "い",
        &[(JAW_OPEN, 0.2), (MOUTH_OPEN, 0.15), (MOUTH_STRETCH, 0.6), (MOUTH_SMILE, 0.3)],
    ),
    (
        "う",
        &[(JAW_OPEN, 0.15), (MOUTH_OPEN, 0.1), (MOUTH_PUCKER, 0.6), (MOUTH_FUNNEL, 0.3)],
    ),
    (
        "え",
        &[(JAW_OPEN, 0.4), (MOUTH_OPEN, 0.35), (MOUTH_STRETCH, 0.4), (MOUTH_LOWER_DOWN, 0.2)],
    ),
    (
        "お",
        &[(JAW_OPEN, 0.5), (MOUTH_OPEN, 0.4), (MOUTH_FUNNEL, 0.5), (MOUTH_PUCKER, 0.2)],
    ),
    ("ん", &[(JAW_OPEN, 0.05), (MOUTH_CLOSE, 0.5)]),
    ("っ", &[(JAW_OPEN, 0.05), (MOUTH_CLOSE, 0.3)]),
];

/// Kana grouped by the vowel they end on (hiragana only; katakana is folded
/// to hiragana before lookup).
const KANA_ROWS: &[(&str, &str)] = &[
    ("あぁかがさざただなはばぱまやゃらわゎ", "あ"),
    ("いぃきぎしじちぢにひびぴみりゐ", "い"),
    ("うぅくぐすずつづぬふぶぷむゆゅるゔ", "う"),
    ("えぇけげせぜてでねへべぺめれゑ", "え"),
    ("おぉこごそぞとどのほぼぽもよょろを", "お"),
];

/// Fold katakana into the matching hiragana code point.
pub fn to_hiragana(c: char) -> char {
    match c {
        'ァ'..='ヶ' => char::from_u32(c as u32 - 0x60).unwrap_or(c),
        _ => c,
    }
}

/// Mora → shape table plus the consonant → vowel decomposition.
#[derive(Debug)]
pub struct JapaneseTable {
    shapes: HashMap<&'static str, MorphWeights>,
    direct: HashMap<char, &'static str>,
    vowel_of: HashMap<char, &'static str>,
}

impl Default for JapaneseTable {
    fn default() -> Self {
        Self::new()
    }
}

impl JapaneseTable {
    pub fn new() -> Self {
        let mut shapes = HashMap::with_capacity(MORA_SHAPES.len());
        let mut direct = HashMap::with_capacity(MORA_SHAPES.len());
        for &(mora, weights) in MORA_SHAPES {
            shapes.insert(mora, MorphWeights::from_pairs(weights.iter().copied()));
            if let Some(c) = mora.chars().next() {
                direct.insert(c, mora);
            }
        }

        let mut vowel_of = HashMap::new();
        for &(row, vowel) in KANA_ROWS {
            for c in row.chars() {
                vowel_of.insert(c, vowel);
            }
        }

        Self {
            shapes,
            direct,
            vowel_of,
        }
    }

    /// Symbol for a single kana character.
    pub fn symbol_for_char(&self, c: char) -> Option<PhonemeSymbol> {
        let c = to_hiragana(c);
        self.direct
            .get(&c)
            .or_else(|| self.vowel_of.get(&c))
            .copied()
            .map(PhonemeSymbol::Mora)
    }

    /// Symbol for a token.
    ///
    /// Multi-character tokens (きゃ, カー) resolve by their last resolvable
    /// kana: small ゃゅょ carry the vowel of a contracted mora and the
    /// long-vowel mark has no shape of its own.
    pub fn symbol(&self, token: &str) -> Option<PhonemeSymbol> {
        token
            .trim()
            .chars()
            .rev()
            .find_map(|c| self.symbol_for_char(c))
    }

    pub fn shape(&self, mora: &str) -> Option<&MorphWeights> {
        self.shapes.get(mora)
    }

    /// Every kana the table can resolve.
    pub fn known_kana(&self) -> impl Iterator<Item = char> + '_ {
        self.direct.keys().chain(self.vowel_of.keys()).copied()
    }
}
