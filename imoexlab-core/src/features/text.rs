//! Headline normalization ahead of vectorization.

use std::collections::HashSet;

/// Word-form normalizer plugged into [`TextCleaner`].
pub trait Lemmatizer: Send + Sync {
    fn lemmatize(&self, word: &str) -> String;
}

/// Leaves every word unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityLemmatizer;

impl Lemmatizer for IdentityLemmatizer {
    fn lemmatize(&self, word: &str) -> String {
        word.to_string()
    }
}

/// Russian stopword list (NLTK corpus).
pub const RUSSIAN_STOPWORDS: &[&str] = &[
    "и", "в", "во", "не", "что", "он", "на", "я", "с", "со", "как", "а", "то", "все", "она",
    "так", "его", "но", "да", "ты", "к", "у", "же", "вы", "за", "бы", "по", "только", "ее",
    "мне", "было", "вот", "от", "меня", "еще", "нет", "о", "из", "ему", "теперь", "когда",
    "даже", "ну", "вдруг", "ли", "если", "уже", "или", "ни", "быть", "был", "него", "до",
    "вас", "нибудь", "опять", "уж", "вам", "ведь", "там", "потом", "себя", "ничего", "ей",
    "может", "они", "тут", "где", "есть", "надо", "ней", "для", "мы", "тебя", "их", "чем",
    "была", "сам", "чтоб", "без", "будто", "чего", "раз", "тоже", "себе", "под", "будет",
    "ж", "тогда", "кто", "этот", "того", "потому", "этого", "какой", "совсем", "ним",
    "здесь", "этом", "один", "почти", "мой", "тем", "чтобы", "нее", "сейчас", "были",
    "куда", "зачем", "всех", "никогда", "можно", "при", "наконец", "два", "об", "другой",
    "хоть", "после", "над", "больше", "тот", "через", "эти", "нас", "про", "всего", "них",
    "какая", "много", "разве", "три", "эту", "моя", "впрочем", "хорошо", "свою", "этой",
    "перед", "иногда", "лучше", "чуть", "том", "нельзя", "такой", "им", "более", "всегда",
    "конечно", "всю", "между",
];

/// Lowercases, strips punctuation and digits, drops stopwords, lemmatizes.
pub struct TextCleaner {
    stopwords: HashSet<String>,
    lemmatizer: Box<dyn Lemmatizer>,
}

impl TextCleaner {
    pub fn new<I, S>(stopwords: I, lemmatizer: Box<dyn Lemmatizer>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stopwords: stopwords.into_iter().map(Into::into).collect(),
            lemmatizer,
        }
    }

    /// Built-in Russian stopwords with the identity lemmatizer.
    pub fn russian() -> Self {
        Self::new(RUSSIAN_STOPWORDS.iter().copied(), Box::new(IdentityLemmatizer))
    }

    pub fn with_lemmatizer(mut self, lemmatizer: Box<dyn Lemmatizer>) -> Self {
        self.lemmatizer = lemmatizer;
        self
    }

    pub fn clean(&self, text: &str) -> String {
        let stripped: String = text
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_alphabetic() || c == '_' || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        stripped
            .split_whitespace()
            .filter(|w| !self.stopwords.contains(*w))
            .map(|w| self.lemmatizer.lemmatize(w))
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::fmt::Debug for TextCleaner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextCleaner")
            .field("stopwords", &self.stopwords.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TruncatingLemmatizer;

    impl Lemmatizer for TruncatingLemmatizer {
        fn lemmatize(&self, word: &str) -> String {
            word.chars().take(4).collect()
        }
    }

    #[test]
    fn strips_punctuation_digits_and_stopwords() {
        let c = TextCleaner::russian();
        assert_eq!(
            c.clean("Индекс МосБиржи вырос на 2,5% — до 3000 пунктов!"),
            "индекс мосбиржи вырос пунктов"
        );
    }

    #[test]
    fn empty_and_stopword_only_titles_clean_to_empty() {
        let c = TextCleaner::russian();
        assert_eq!(c.clean(""), "");
        assert_eq!(c.clean("И в на, с."), "");
    }

    #[test]
    fn lemmatizer_is_pluggable() {
        let c = TextCleaner::russian().with_lemmatizer(Box::new(TruncatingLemmatizer));
        assert_eq!(c.clean("Нефтяные котировки"), "нефт коти");
    }

    #[test]
    fn custom_stopwords() {
        let c = TextCleaner::new(["market"], Box::new(IdentityLemmatizer));
        assert_eq!(c.clean("Market rally"), "rally");
    }
}
