//! Identifier normalization
//!
//! Raw fragments (table names, column names) are cleaned of ignorable
//! affixes, singularized, split into words and deduplicated across the whole
//! chain, so `["orders", "customer_id"]` and `["customers", "customer_id"]`
//! read as `order_customer` and `customer`.

use indexmap::IndexSet;
use inflector::Inflector;

use crate::config::NamingConfig;
use crate::error::{Error, Result};

/// Convert a plural word to singular
pub fn singularize_word(word: &str) -> String {
    match word.to_lowercase().as_str() {
        "" => String::new(),
        "people" => "person".to_string(),
        "children" => "child".to_string(),
        "men" => "man".to_string(),
        "women" => "woman".to_string(),
        "feet" => "foot".to_string(),
        "teeth" => "tooth".to_string(),
        "geese" => "goose".to_string(),
        "mice" => "mouse".to_string(),
        "data" | "datum" => "datum".to_string(),
        "media" | "medium" => "medium".to_string(),
        _ => word.to_singular(),
    }
}

/// Convert a singular word to plural
pub fn pluralize_word(word: &str) -> String {
    match word.to_lowercase().as_str() {
        "" => String::new(),
        "person" => "people".to_string(),
        "child" => "children".to_string(),
        "man" => "men".to_string(),
        "woman" => "women".to_string(),
        "foot" => "feet".to_string(),
        "tooth" => "teeth".to_string(),
        "goose" => "geese".to_string(),
        "mouse" => "mice".to_string(),
        "datum" => "data".to_string(),
        "medium" => "media".to_string(),
        _ => word.to_plural(),
    }
}

/// Singular form of a word, or the word itself when the inflection rules
/// would not leave the singular form alone on a second application
fn singular(word: &str) -> String {
    let once = singularize_word(word);
    if singularize_word(&once) == once {
        once
    } else {
        word.to_string()
    }
}

/// Token-level name cleanup.
///
/// Affixes are matched as whole words, so `_id` strips the word `id` from
/// the end of a name but leaves `paid` alone.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    prefixes: Vec<Vec<String>>,
    suffixes: Vec<Vec<String>>,
    separator: char,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self {
            prefixes: Vec::new(),
            suffixes: vec![vec!["id".to_string()]],
            separator: '_',
        }
    }
}

/// Split each affix into its words
fn affix_words(affixes: &[String], separator: char) -> Result<Vec<Vec<String>>> {
    affixes
        .iter()
        .filter(|affix| !affix.is_empty())
        .map(|affix| {
            let words = split_words(affix, separator);
            if words.is_empty() {
                Err(Error::ConfigError(format!("Affix '{}' contains no words", affix)))
            } else {
                Ok(words)
            }
        })
        .collect()
}

fn split_words(text: &str, separator: char) -> Vec<String> {
    text.split(separator)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

impl NameNormalizer {
    pub fn new(prefixes: &[String], suffixes: &[String], separator: char) -> Result<Self> {
        Ok(Self {
            prefixes: affix_words(prefixes, separator)?,
            suffixes: affix_words(suffixes, separator)?,
            separator,
        })
    }

    pub fn from_config(config: &NamingConfig) -> Result<Self> {
        Self::new(&config.ignore_prefixes, &config.ignore_suffixes, config.separator)
    }

    /// Clean a single fragment into its word tokens
    pub fn tokens(&self, fragment: &str) -> Vec<String> {
        self.clean(split_words(fragment, self.separator))
    }

    /// Normalize a chain of fragments into one identifier.
    ///
    /// Each word is emitted once, at its first occurrence. Feeding the result
    /// back in as a single fragment returns it unchanged.
    pub fn normalize<I, S>(&self, fragments: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.normalize_excluding(fragments, &[])
    }

    /// Like [`normalize`](Self::normalize), but words in `excluded` are treated
    /// as already emitted.
    pub fn normalize_excluding<I, S>(&self, fragments: I, excluded: &[String]) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = fragments
            .into_iter()
            .flat_map(|fragment| self.tokens(fragment.as_ref()))
            .collect();

        // The joined chain is a name of its own: clean it until it stops changing.
        loop {
            let settled = self.clean(dedup(words.clone(), excluded));
            if settled == words {
                break;
            }
            words = settled;
        }

        words.join(&self.separator.to_string())
    }

    /// Class-style name for a table fullname, e.g. `order_items` → `OrderItem`
    pub fn class_name(&self, tablename: &str) -> String {
        self.normalize(tablename.split('.')).to_pascal_case()
    }

    /// Pluralize the last word of a normalized name
    pub fn plural(&self, name: &str) -> String {
        let (head, last) = self.split_last(name);
        format!("{}{}", head, pluralize_word(last))
    }

    /// Singularize the last word and strip affixes until neither applies
    fn clean(&self, mut words: Vec<String>) -> Vec<String> {
        loop {
            if let Some(last) = words.pop() {
                let last = singular(&last);
                if !last.is_empty() {
                    words.push(last);
                }
            }

            let before = words.len();
            strip_leading(&mut words, &self.prefixes);
            strip_trailing(&mut words, &self.suffixes);
            if words.len() == before {
                return words;
            }
        }
    }

    fn split_last<'a>(&self, name: &'a str) -> (&'a str, &'a str) {
        match name.rfind(self.separator) {
            Some(index) => name.split_at(index + self.separator.len_utf8()),
            None => ("", name),
        }
    }
}

/// First occurrence of each word, minus the excluded ones
fn dedup(words: Vec<String>, excluded: &[String]) -> Vec<String> {
    let mut seen: IndexSet<String> = excluded.iter().cloned().collect();
    words.into_iter().filter(|word| seen.insert(word.clone())).collect()
}

fn strip_leading(words: &mut Vec<String>, affixes: &[Vec<String>]) {
    while let Some(affix) = affixes.iter().find(|affix| words.starts_with(affix.as_slice())) {
        words.drain(..affix.len());
    }
}

fn strip_trailing(words: &mut Vec<String>, affixes: &[Vec<String>]) {
    while let Some(affix) = affixes.iter().find(|affix| words.ends_with(affix.as_slice())) {
        words.truncate(words.len() - affix.len());
    }
}
