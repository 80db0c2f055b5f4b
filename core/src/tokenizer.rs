use lazy_static::lazy_static;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

/// Every apostrophe variant is stored as this character inside a token.
pub const APOSTROPHE: char = '\'';

const QUOTES: [char; 3] = ['\'', '\u{2018}', '\u{2019}'];

lazy_static! {
    /// Accented Latin letters folded to plain ASCII so differently-encoded sources
    /// produce the same tokens.
    static ref FOLD: HashMap<char, String> = {
        let pairs: &[(char, &str)] = &[
            ('à', "a"), ('á', "a"), ('â', "a"), ('ä', "a"), ('æ', "a"), ('ã', "a"), ('å', "a"), ('ā', "a"),
            ('ç', "c"), ('ć', "c"), ('č', "c"),
            ('è', "e"), ('é', "e"), ('ê', "e"), ('ë', "e"), ('ē', "e"), ('ė', "e"), ('ę', "e"),
            ('î', "i"), ('ï', "i"), ('í', "i"), ('ī', "i"), ('į', "i"), ('ì', "i"),
            ('ł', "l"),
            ('ñ', "n"), ('ń', "n"),
            ('ô', "o"), ('ö', "o"), ('ò', "o"), ('ó', "o"), ('œ', "o"), ('ø', "o"), ('ō', "o"), ('õ', "o"),
            ('ß', "ss"), ('ś', "s"), ('š', "s"),
            ('û', "u"), ('ü', "u"), ('ù', "u"), ('ú', "u"), ('ū', "u"),
            ('ÿ', "y"),
            ('ž', "z"), ('ż', "z"),
        ];
        let mut fold = HashMap::with_capacity(pairs.len() * 2);
        for &(lower, plain) in pairs {
            fold.insert(lower, plain.to_string());
            // Tokens keep their case, so "CRÈME" folds to "CREME".
            let mut upper = lower.to_uppercase();
            if let (Some(u), None) = (upper.next(), upper.next()) {
                if u != lower {
                    fold.insert(u, plain.to_uppercase());
                }
            }
        }
        fold
    };
}

fn is_quote(c: char) -> bool {
    QUOTES.contains(&c)
}

/// Split text into tokens, keeping contractions and possessives ("brewer's",
/// "d'Asti") intact and dropping quotation marks. Case is preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    // NFC first so decomposed accents hit the fold table.
    let chars: Vec<char> = text.trim().nfc().collect();
    let mut tokens = Vec::new();
    let mut token = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if is_quote(c) {
            if token.is_empty() {
                continue;
            }
            let closes = chars.get(i + 1).map_or(true, |next| !next.is_alphanumeric());
            if closes {
                tokens.push(std::mem::take(&mut token));
                continue;
            }
            token.push(APOSTROPHE);
        } else if c.is_alphanumeric() {
            match FOLD.get(&c) {
                Some(folded) => token.push_str(folded),
                None => token.push(c),
            }
        } else if !token.is_empty() {
            // "2%" in "2% milk"
            if c == '%' {
                token.push('%');
            }
            tokens.push(std::mem::take(&mut token));
        }
    }
    if !token.is_empty() {
        tokens.push(token);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercase_accents_fold_too() {
        assert_eq!(tokenize("CRÈME BRÛLÉE"), vec!["CREME", "BRULEE"]);
        assert_eq!(tokenize("Ærøskøbing Œuf"), vec!["Aroskobing", "Ouf"]);
        assert_eq!(tokenize("STRAßE"), vec!["STRAssE"]);
    }

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!");
        assert_eq!(t, vec!["Running", "runner's", "run"]);
    }

    #[test]
    fn right_single_quote_is_canonicalized() {
        assert_eq!(tokenize("Moscato d\u{2019}Asti"), vec!["Moscato", "d'Asti"]);
    }

    #[test]
    fn percent_only_attaches_to_a_token() {
        assert_eq!(tokenize("% 2%"), vec!["2%"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  -- ''  ").is_empty());
    }
}
