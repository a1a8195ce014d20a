//! Lexical similarity adapters: TF-IDF cosine and keyword Jaccard.

mod stop_words;

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::model::DocumentPair;
use crate::similarity::{SimilarityAdapter, normalized_pair};

pub use stop_words::ENGLISH_STOP_WORDS;

const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Where the TF-IDF vocabulary and idf weights come from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LexicalFit {
    /// Refit on the two documents of every comparison.
    PerPair,
    /// Fit once over every source and target text of the dataset.
    Corpus,
}

impl LexicalFit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PerPair => "per-pair",
            Self::Corpus => "corpus",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
    stop_words: HashSet<&'static str>,
}

impl Tokenizer {
    pub fn new() -> Result<Self, EvalError> {
        Ok(Self {
            pattern: Regex::new(TOKEN_PATTERN)?,
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
        })
    }

    pub fn tokens(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.pattern
            .find_iter(&lowered)
            .map(|found| found.as_str())
            .filter(|token| !self.stop_words.contains(token))
            .map(ToOwned::to_owned)
            .collect()
    }
}

/// Smoothed inverse document frequencies: `ln((1 + n) / (1 + df)) + 1`.
#[derive(Debug, Clone, Default)]
pub struct IdfTable {
    document_count: usize,
    document_frequency: HashMap<String, usize>,
}

impl IdfTable {
    pub fn fit<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut table = Self::default();
        for tokens in documents {
            table.document_count += 1;
            let unique = tokens.iter().collect::<HashSet<&String>>();
            for token in unique {
                *table.document_frequency.entry(token.clone()).or_default() += 1;
            }
        }
        table
    }

    pub fn vocabulary_len(&self) -> usize {
        self.document_frequency.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        let df = *self.document_frequency.get(term)?;
        let n = self.document_count as f64;
        Some(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
    }

    /// L2-normalized tf-idf vector; out-of-vocabulary terms are dropped.
    pub fn vectorize(&self, tokens: &[String]) -> HashMap<String, f64> {
        let mut counts = HashMap::<&str, usize>::new();
        for token in tokens {
            *counts.entry(token.as_str()).or_default() += 1;
        }

        let mut vector = counts
            .into_iter()
            .filter_map(|(term, count)| {
                self.idf(term)
                    .map(|idf| (term.to_string(), count as f64 * idf))
            })
            .collect::<HashMap<String, f64>>();

        let norm = vector.values().map(|value| value * value).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in vector.values_mut() {
                *value /= norm;
            }
        }
        vector
    }
}

pub fn sparse_cosine(left: &HashMap<String, f64>, right: &HashMap<String, f64>) -> f64 {
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };

    let dot = small
        .iter()
        .filter_map(|(term, value)| large.get(term).map(|other| value * other))
        .sum::<f64>();
    let left_norm = left.values().map(|value| value * value).sum::<f64>().sqrt();
    let right_norm = right.values().map(|value| value * value).sum::<f64>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    (dot / (left_norm * right_norm)).clamp(0.0, 1.0)
}

pub struct TfidfAdapter {
    name: String,
    tokenizer: Tokenizer,
    fit: LexicalFit,
    corpus_idf: Option<IdfTable>,
}

impl TfidfAdapter {
    pub fn per_pair() -> Result<Self, EvalError> {
        Ok(Self {
            name: default_tfidf_name(LexicalFit::PerPair),
            tokenizer: Tokenizer::new()?,
            fit: LexicalFit::PerPair,
            corpus_idf: None,
        })
    }

    pub fn fit_corpus<'a, I>(texts: I) -> Result<Self, EvalError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tokenizer = Tokenizer::new()?;
        let documents = texts
            .into_iter()
            .map(|text| tokenizer.tokens(text))
            .collect::<Vec<Vec<String>>>();
        let corpus_idf = IdfTable::fit(documents.iter().map(Vec::as_slice));

        Ok(Self {
            name: default_tfidf_name(LexicalFit::Corpus),
            tokenizer,
            fit: LexicalFit::Corpus,
            corpus_idf: Some(corpus_idf),
        })
    }

    /// Builds the adapter for a dataset; corpus fitting covers sources then targets.
    pub fn for_dataset(pairs: &[DocumentPair], fit: LexicalFit) -> Result<Self, EvalError> {
        match fit {
            LexicalFit::PerPair => Self::per_pair(),
            LexicalFit::Corpus => Self::fit_corpus(
                pairs
                    .iter()
                    .map(|pair| pair.source_text.as_str())
                    .chain(pairs.iter().map(|pair| pair.target_text.as_str())),
            ),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn fit(&self) -> LexicalFit {
        self.fit
    }

    pub fn vocabulary_len(&self) -> Option<usize> {
        self.corpus_idf.as_ref().map(IdfTable::vocabulary_len)
    }
}

impl SimilarityAdapter for TfidfAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, source_text: &str, target_text: &str) -> Result<f64, EvalError> {
        let (source, target) = normalized_pair(source_text, target_text)?;
        let source_tokens = self.tokenizer.tokens(&source);
        let target_tokens = self.tokenizer.tokens(&target);

        let pair_idf;
        let idf = match &self.corpus_idf {
            Some(table) => table,
            None => {
                pair_idf = IdfTable::fit([source_tokens.as_slice(), target_tokens.as_slice()]);
                &pair_idf
            }
        };

        Ok(sparse_cosine(
            &idf.vectorize(&source_tokens),
            &idf.vectorize(&target_tokens),
        ))
    }
}

fn default_tfidf_name(fit: LexicalFit) -> String {
    format!("TF-IDF ({} fit)", fit.as_str())
}

/// Jaccard index of the stop-word-filtered token sets.
pub struct KeywordJaccardAdapter {
    name: String,
    tokenizer: Tokenizer,
}

impl KeywordJaccardAdapter {
    pub fn new() -> Result<Self, EvalError> {
        Ok(Self {
            name: "Keyword Jaccard".to_string(),
            tokenizer: Tokenizer::new()?,
        })
    }
}

impl SimilarityAdapter for KeywordJaccardAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, source_text: &str, target_text: &str) -> Result<f64, EvalError> {
        let (source, target) = normalized_pair(source_text, target_text)?;
        let source_terms = self
            .tokenizer
            .tokens(&source)
            .into_iter()
            .collect::<HashSet<String>>();
        let target_terms = self
            .tokenizer
            .tokens(&target)
            .into_iter()
            .collect::<HashSet<String>>();

        let union = source_terms.union(&target_terms).count();
        if union == 0 {
            return Ok(0.0);
        }
        let intersection = source_terms.intersection(&target_terms).count();
        Ok(intersection as f64 / union as f64)
    }
}
