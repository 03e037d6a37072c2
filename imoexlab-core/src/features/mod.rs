//! Text-feature transform for news headlines.
//!
//! A [`TextFeatureTransform`] turns a corpus of raw titles into one numeric
//! vector per title. The shipped implementation, [`NewsFeaturizer`], chains a
//! [`TextCleaner`] with a [`TfidfVectorizer`]. Both are constructed explicitly
//! and passed in; nothing here keeps process-wide state.

pub mod text;
pub mod tfidf;

pub use text::{IdentityLemmatizer, Lemmatizer, TextCleaner, RUSSIAN_STOPWORDS};
pub use tfidf::{FeatureMatrix, TfidfVectorizer};

/// Deterministic title → vector transform, fit on the corpus it is given.
pub trait TextFeatureTransform: Send {
    /// Fit on `titles` and return one row per title, in input order.
    fn fit_transform(&mut self, titles: &[String]) -> FeatureMatrix;
}

/// Cleaner + TF-IDF pipeline used by the dataset assembler.
pub struct NewsFeaturizer {
    cleaner: TextCleaner,
    vectorizer: TfidfVectorizer,
}

impl NewsFeaturizer {
    pub fn new(cleaner: TextCleaner, vectorizer: TfidfVectorizer) -> Self {
        Self {
            cleaner,
            vectorizer,
        }
    }

    /// Russian stopwords, identity lemmatizer, `max_features` vocabulary cap.
    pub fn russian(max_features: usize) -> Self {
        Self::new(TextCleaner::russian(), TfidfVectorizer::new(max_features))
    }

    pub fn vectorizer(&self) -> &TfidfVectorizer {
        &self.vectorizer
    }
}

impl TextFeatureTransform for NewsFeaturizer {
    fn fit_transform(&mut self, titles: &[String]) -> FeatureMatrix {
        let cleaned: Vec<String> = titles.iter().map(|t| self.cleaner.clean(t)).collect();
        self.vectorizer.fit_transform(&cleaned)
    }
}
