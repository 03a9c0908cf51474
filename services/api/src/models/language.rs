//! Languages the translator accepts

use std::fmt;
use std::str::FromStr;

/// A supported source or target language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Russian,
    German,
    Arabic,
    Chinese,
    Dutch,
    French,
    Greek,
    Hebrew,
    Italian,
    Japanese,
    Korean,
    Polish,
    Portuguese,
    Spanish,
    Swedish,
    Thai,
    Turkish,
    Ukrainian,
    Vietnamese,
}

impl Language {
    pub const ALL: [Language; 20] = [
        Language::English,
        Language::Russian,
        Language::German,
        Language::Arabic,
        Language::Chinese,
        Language::Dutch,
        Language::French,
        Language::Greek,
        Language::Hebrew,
        Language::Italian,
        Language::Japanese,
        Language::Korean,
        Language::Polish,
        Language::Portuguese,
        Language::Spanish,
        Language::Swedish,
        Language::Thai,
        Language::Turkish,
        Language::Ukrainian,
        Language::Vietnamese,
    ];

    /// Lower-case name, as stored and as accepted on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Russian => "russian",
            Language::German => "german",
            Language::Arabic => "arabic",
            Language::Chinese => "chinese",
            Language::Dutch => "dutch",
            Language::French => "french",
            Language::Greek => "greek",
            Language::Hebrew => "hebrew",
            Language::Italian => "italian",
            Language::Japanese => "japanese",
            Language::Korean => "korean",
            Language::Polish => "polish",
            Language::Portuguese => "portuguese",
            Language::Spanish => "spanish",
            Language::Swedish => "swedish",
            Language::Thai => "thai",
            Language::Turkish => "turkish",
            Language::Ukrainian => "ukrainian",
            Language::Vietnamese => "vietnamese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Language::ALL
            .into_iter()
            .find(|language| language.as_str() == wanted)
            .ok_or_else(|| format!("Unsupported language: {}", s))
    }
}

/// Parse a language pair, rejecting unknown languages and identical pairs
pub fn language_pair(from: &str, to: &str) -> Result<(Language, Language), String> {
    let from: Language = from.parse()?;
    let to: Language = to.parse()?;

    if from == to {
        return Err("Source and target languages must differ".to_string());
    }

    Ok((from, to))
}
