//! Formatting markers embedded in compiled strings
//!
//! A formatted string stores one marker character per interpolated value or
//! text macro. A marker is `0xFF00 | suffix`.

use std::fmt;

/// Upper byte of every marker
pub const FORMAT_PREFIX: u32 = 0xFF00;

/// Lower byte of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FormatSuffix {
    /// `[]`
    StringifyWithArticle = 0,
    /// `[]` after an article macro
    StringifyNoArticle = 1,
    /// `\ref[]`
    ReferenceOfValue = 2,
    UpperDefiniteArticle = 3,
    LowerDefiniteArticle = 4,
    UpperIndefiniteArticle = 5,
    LowerIndefiniteArticle = 6,
    UpperSubjectPronoun = 7,
    LowerSubjectPronoun = 8,
    UpperPossessiveAdjective = 9,
    LowerPossessiveAdjective = 10,
    ObjectPronoun = 11,
    ReflexivePronoun = 12,
    UpperPossessivePronoun = 13,
    LowerPossessivePronoun = 14,
    Proper = 15,
    Improper = 16,
    LowerRoman = 17,
    UpperRoman = 18,
    OrdinalIndicator = 19,
    PluralSuffix = 20,
    Icon = 21,
    ColorRed = 22,
    ColorBlue = 23,
    ColorGreen = 24,
    ColorBlack = 25,
    ColorYellow = 26,
    ColorNavy = 27,
    ColorTeal = 28,
    ColorCyan = 29,
    Bold = 30,
    Italic = 31,
}

const ALL: [FormatSuffix; 32] = [
    FormatSuffix::StringifyWithArticle,
    FormatSuffix::StringifyNoArticle,
    FormatSuffix::ReferenceOfValue,
    FormatSuffix::UpperDefiniteArticle,
    FormatSuffix::LowerDefiniteArticle,
    FormatSuffix::UpperIndefiniteArticle,
    FormatSuffix::LowerIndefiniteArticle,
    FormatSuffix::UpperSubjectPronoun,
    FormatSuffix::LowerSubjectPronoun,
    FormatSuffix::UpperPossessiveAdjective,
    FormatSuffix::LowerPossessiveAdjective,
    FormatSuffix::ObjectPronoun,
    FormatSuffix::ReflexivePronoun,
    FormatSuffix::UpperPossessivePronoun,
    FormatSuffix::LowerPossessivePronoun,
    FormatSuffix::Proper,
    FormatSuffix::Improper,
    FormatSuffix::LowerRoman,
    FormatSuffix::UpperRoman,
    FormatSuffix::OrdinalIndicator,
    FormatSuffix::PluralSuffix,
    FormatSuffix::Icon,
    FormatSuffix::ColorRed,
    FormatSuffix::ColorBlue,
    FormatSuffix::ColorGreen,
    FormatSuffix::ColorBlack,
    FormatSuffix::ColorYellow,
    FormatSuffix::ColorNavy,
    FormatSuffix::ColorTeal,
    FormatSuffix::ColorCyan,
    FormatSuffix::Bold,
    FormatSuffix::Italic,
];

impl FormatSuffix {
    /// Marker character for this suffix
    #[inline]
    pub fn encode(self) -> char {
        // 0xFF00..=0xFF1F are all valid scalar values
        char::from_u32(FORMAT_PREFIX | self as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    /// The suffix a marker character carries, if it is one
    pub fn decode(c: char) -> Option<FormatSuffix> {
        let bits = c as u32;
        if bits & 0xFF00 != FORMAT_PREFIX || bits > 0xFFFF {
            return None;
        }
        ALL.get((bits & 0xFF) as usize).copied()
    }

    /// Markers that consume one interpolated value
    #[inline]
    pub fn is_interpolation(self) -> bool {
        self <= FormatSuffix::ReferenceOfValue
    }

    /// Marker written for the text macro `\name`
    pub fn from_macro(name: &str) -> Option<FormatSuffix> {
        let suffix = match name {
            "The" => FormatSuffix::UpperDefiniteArticle,
            "the" => FormatSuffix::LowerDefiniteArticle,
            "A" | "An" => FormatSuffix::UpperIndefiniteArticle,
            "a" | "an" => FormatSuffix::LowerIndefiniteArticle,
            "He" | "She" => FormatSuffix::UpperSubjectPronoun,
            "he" | "she" => FormatSuffix::LowerSubjectPronoun,
            "His" => FormatSuffix::UpperPossessiveAdjective,
            "his" => FormatSuffix::LowerPossessiveAdjective,
            "him" | "Him" => FormatSuffix::ObjectPronoun,
            "himself" | "herself" => FormatSuffix::ReflexivePronoun,
            "Hers" => FormatSuffix::UpperPossessivePronoun,
            "hers" => FormatSuffix::LowerPossessivePronoun,
            "proper" => FormatSuffix::Proper,
            "improper" => FormatSuffix::Improper,
            "roman" => FormatSuffix::LowerRoman,
            "Roman" => FormatSuffix::UpperRoman,
            "th" => FormatSuffix::OrdinalIndicator,
            "s" => FormatSuffix::PluralSuffix,
            "icon" => FormatSuffix::Icon,
            "red" => FormatSuffix::ColorRed,
            "blue" => FormatSuffix::ColorBlue,
            "green" => FormatSuffix::ColorGreen,
            "black" => FormatSuffix::ColorBlack,
            "yellow" => FormatSuffix::ColorYellow,
            "navy" => FormatSuffix::ColorNavy,
            "teal" => FormatSuffix::ColorTeal,
            "cyan" => FormatSuffix::ColorCyan,
            "bold" | "b" => FormatSuffix::Bold,
            "italic" => FormatSuffix::Italic,
            _ => return None,
        };
        Some(suffix)
    }

    /// Article macros make the following `[]` drop its own article
    #[inline]
    pub fn is_article(self) -> bool {
        matches!(
            self,
            FormatSuffix::UpperDefiniteArticle
                | FormatSuffix::LowerDefiniteArticle
                | FormatSuffix::UpperIndefiniteArticle
                | FormatSuffix::LowerIndefiniteArticle
        )
    }
}

impl fmt::Display for FormatSuffix {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Number of interpolation markers in `text`
pub fn count_interpolations(text: &str) -> usize {
    text.chars()
        .filter_map(FormatSuffix::decode)
        .filter(|s| s.is_interpolation())
        .count()
}

/// `text` with every marker removed
pub fn remove_formatting(text: &str) -> String {
    text.chars()
        .filter(|c| FormatSuffix::decode(*c).is_none())
        .collect()
}

/// Human-readable form of a formatted string, markers shown as `[suffix]`
pub fn describe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match FormatSuffix::decode(c) {
            Some(FormatSuffix::StringifyWithArticle) => out.push_str("[]"),
            Some(suffix) => {
                out.push('[');
                out.push_str(&suffix.to_string());
                out.push(']');
            }
            None => out.push(c),
        }
    }
    out
}
