//! Portuguese content-word tokenization for word clouds and graphs.

use std::sync::LazyLock;

use regex::Regex;

/// Minimum token length, in characters.
const MIN_TOKEN_CHARS: usize = 3;

/// Runs of Latin letters, including the Latin-1 accented range.
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-ZÀ-ÿ]+").expect("word pattern compiles"));

/// Split `text` into lowercase content words.
///
/// Digits, punctuation and whitespace separate tokens. Tokens shorter than
/// three characters and Portuguese stop words are dropped. Order is
/// preserved; empty input yields an empty vector.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS && !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Returns true for Portuguese function words (pronouns, articles,
/// prepositions, common verb forms). Matching is case-insensitive.
pub fn is_stop_word(word: &str) -> bool {
    let lowered = word.to_lowercase();
    matches!(
        lowered.as_str(),
        "a" | "à"
            | "às"
            | "ao"
            | "aos"
            | "as"
            | "o"
            | "os"
            | "um"
            | "uma"
            | "uns"
            | "umas"
            | "de"
            | "da"
            | "do"
            | "das"
            | "dos"
            | "dá"
            | "dão"
            | "em"
            | "no"
            | "na"
            | "nos"
            | "nas"
            | "por"
            | "para"
            | "pra"
            | "com"
            | "sem"
            | "entre"
            | "sobre"
            | "sob"
            | "até"
            | "após"
            | "que"
            | "se"
            | "é"
            | "ser"
            | "são"
            | "era"
            | "eram"
            | "foi"
            | "fui"
            | "vai"
            | "vou"
            | "e"
            | "ou"
            | "mas"
            | "como"
            | "quando"
            | "onde"
            | "qual"
            | "quais"
            | "porque"
            | "porquê"
            | "já"
            | "não"
            | "sim"
            | "também"
            | "mais"
            | "menos"
            | "muito"
            | "muita"
            | "muitos"
            | "muitas"
            | "meu"
            | "minha"
            | "meus"
            | "minhas"
            | "seu"
            | "sua"
            | "seus"
            | "suas"
            | "depois"
            | "antes"
            | "este"
            | "esta"
            | "estes"
            | "estas"
            | "isso"
            | "isto"
            | "aquele"
            | "aquela"
            | "aqueles"
            | "aquelas"
            | "lhe"
            | "lhes"
            | "ele"
            | "ela"
            | "eles"
            | "elas"
            | "você"
            | "vocês"
            | "nós"
            | "nosso"
            | "nossa"
            | "nossos"
            | "nossas"
    )
}
