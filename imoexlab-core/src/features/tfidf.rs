//! TF-IDF vectorizer.
//!
//! Tokens are runs of two or more word characters. When the vocabulary would
//! exceed `max_features`, the most frequent terms across the whole corpus are
//! kept (ties broken alphabetically). Weights use the smoothed inverse
//! document frequency `ln((1 + n) / (1 + df)) + 1` and every row is scaled to
//! unit L2 norm. Columns are ordered alphabetically.

use std::collections::{BTreeMap, HashMap};

/// Dense feature matrix: one row per input document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: Vec<String>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: Vec::new(),
            idf: Vec::new(),
        }
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Vocabulary of the last fit, alphabetical.
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    fn tokenize(doc: &str) -> Vec<String> {
        doc.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| t.chars().count() >= 2)
            .map(str::to_string)
            .collect()
    }

    /// Learn vocabulary and idf weights from `docs`.
    pub fn fit(&mut self, docs: &[String]) {
        let tokenized: Vec<Vec<String>> = docs.iter().map(|d| Self::tokenize(d)).collect();

        let mut term_freq: BTreeMap<&str, usize> = BTreeMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for tokens in &tokenized {
            let mut seen: Vec<&str> = Vec::new();
            for t in tokens {
                *term_freq.entry(t.as_str()).or_insert(0) += 1;
                if !seen.contains(&t.as_str()) {
                    seen.push(t.as_str());
                }
            }
            for t in seen {
                *doc_freq.entry(t).or_insert(0) += 1;
            }
        }

        // BTreeMap iteration is alphabetical, and the sort is stable.
        let mut ranked: Vec<(&str, usize)> = term_freq.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(self.max_features);

        let mut vocabulary: Vec<String> = ranked.into_iter().map(|(t, _)| t.to_string()).collect();
        vocabulary.sort();

        let n = docs.len() as f64;
        self.idf = vocabulary
            .iter()
            .map(|t| {
                let df = doc_freq.get(t.as_str()).copied().unwrap_or(0) as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.vocabulary = vocabulary;
    }

    /// Weight `docs` against the fitted vocabulary.
    pub fn transform(&self, docs: &[String]) -> FeatureMatrix {
        let index: HashMap<&str, usize> = self
            .vocabulary
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let rows = docs
            .iter()
            .map(|doc| {
                let mut row = vec![0.0; self.vocabulary.len()];
                for t in Self::tokenize(doc) {
                    if let Some(&i) = index.get(t.as_str()) {
                        row[i] += 1.0;
                    }
                }
                for (w, idf) in row.iter_mut().zip(&self.idf) {
                    *w *= idf;
                }
                let norm = row.iter().map(|w| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    row.iter_mut().for_each(|w| *w /= norm);
                }
                row
            })
            .collect();

        FeatureMatrix {
            columns: self.vocabulary.clone(),
            rows,
        }
    }

    pub fn fit_transform(&mut self, docs: &[String]) -> FeatureMatrix {
        self.fit(docs);
        self.transform(docs)
    }
}
