//! Generation of unique CVU and alias identifiers.
//!
//! Candidates are drawn at random and checked against the account store,
//! retrying up to a fixed bound. The store's unique constraints remain the
//! source of truth: a value that is free here can still collide at insert
//! time, which registration handles by regenerating.

use std::num::NonZeroU32;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error as ThisError;
use tracing::debug;

use super::account::{ALIAS_WORD_COUNT, Alias, Cvu, is_alias_word};
use super::failures::store_failure;
use super::ports::AccountRepository;
use super::Error;

const CVU_HIGH_BOUND: u64 = 1_000_000_000_000_000_000;
const CVU_LOW_BOUND: u16 = 10_000;

/// Errors raised while building an [`AliasWords`] list.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum AliasWordsError {
    /// No usable word was supplied.
    #[error("alias word list is empty")]
    Empty,
    /// A word contains a separator, whitespace, or punctuation.
    #[error("alias word {word:?} on line {line} is not a single alphanumeric word")]
    InvalidWord { line: usize, word: String },
}

/// Non-empty list of words aliases are drawn from.
///
/// # Examples
/// ```
/// use wallet::domain::AliasWords;
///
/// let words = AliasWords::parse_lines("sol\nluna\n\nmar\n").unwrap();
/// assert_eq!(words.len(), 3);
/// assert!(AliasWords::parse_lines("\n \n").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasWords(Arc<[String]>);

impl AliasWords {
    /// Validate a list of words.
    pub fn new(words: Vec<String>) -> Result<Self, AliasWordsError> {
        if words.is_empty() {
            return Err(AliasWordsError::Empty);
        }
        if let Some((index, word)) = words.iter().enumerate().find(|(_, w)| !is_alias_word(w)) {
            return Err(AliasWordsError::InvalidWord {
                line: index + 1,
                word: word.clone(),
            });
        }
        Ok(Self(words.into()))
    }

    /// Parse one word per line, ignoring blank lines and surrounding
    /// whitespace.
    pub fn parse_lines(text: &str) -> Result<Self, AliasWordsError> {
        let mut words = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let word = line.trim();
            if word.is_empty() {
                continue;
            }
            if !is_alias_word(word) {
                return Err(AliasWordsError::InvalidWord {
                    line: index + 1,
                    word: word.to_owned(),
                });
            }
            words.push(word.to_owned());
        }
        Self::new(words)
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with [`Self::len`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn draw(&self) -> Result<Alias, Error> {
        let mut rng = rand::thread_rng();
        let picked: Vec<&str> = (0..ALIAS_WORD_COUNT)
            .filter_map(|_| self.0.choose(&mut rng).map(String::as_str))
            .collect();
        Alias::from_words(picked)
            .map_err(|err| Error::internal(format!("alias candidate rejected: {err}")))
    }
}

fn draw_cvu() -> Result<Cvu, Error> {
    let mut rng = rand::thread_rng();
    let high = rng.gen_range(0..CVU_HIGH_BOUND);
    let low = rng.gen_range(0..CVU_LOW_BOUND);
    Cvu::parse(format!("{high:018}{low:04}"))
        .map_err(|err| Error::internal(format!("cvu candidate rejected: {err}")))
}

/// Bounded generate-and-check loop for account identifiers.
pub struct IdentifierGenerator<R> {
    repo: Arc<R>,
    words: AliasWords,
    max_attempts: NonZeroU32,
}

impl<R> Clone for IdentifierGenerator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            words: self.words.clone(),
            max_attempts: self.max_attempts,
        }
    }
}

impl<R> IdentifierGenerator<R> {
    /// Create a generator checking candidates against `repo`.
    pub fn new(repo: Arc<R>, words: AliasWords, max_attempts: NonZeroU32) -> Self {
        Self {
            repo,
            words,
            max_attempts,
        }
    }
}

impl<R> IdentifierGenerator<R>
where
    R: AccountRepository,
{
    /// A 22-digit CVU no stored account uses.
    ///
    /// Fails with `ExhaustedRetries` once every attempt collided. Store
    /// failures are not retried.
    pub async fn generate_cvu(&self) -> Result<Cvu, Error> {
        for attempt in 1..=self.max_attempts.get() {
            let candidate = draw_cvu()?;
            let taken = self
                .repo
                .cvu_exists(&candidate)
                .await
                .map_err(|err| store_failure("check cvu", err))?;
            if !taken {
                return Ok(candidate);
            }
            debug!(attempt, "cvu candidate already taken");
        }
        Err(Error::exhausted_retries())
    }

    /// A three word alias no stored account uses.
    ///
    /// Each attempt draws three fresh words with replacement.
    pub async fn generate_alias(&self) -> Result<Alias, Error> {
        for attempt in 1..=self.max_attempts.get() {
            let candidate = self.words.draw()?;
            let taken = self
                .repo
                .alias_exists(&candidate)
                .await
                .map_err(|err| store_failure("check alias", err))?;
            if !taken {
                return Ok(candidate);
            }
            debug!(attempt, alias = %candidate, "alias candidate already taken");
        }
        Err(Error::exhausted_retries())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{AccountPersistenceError, MockAccountRepository};
    use mockall::Sequence;
    use rstest::{fixture, rstest};

    fn attempts(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero attempts")
    }

    #[fixture]
    fn words() -> AliasWords {
        AliasWords::new(vec!["sol".to_owned(), "luna".to_owned(), "mar".to_owned()])
            .expect("valid words")
    }

    #[rstest]
    fn parse_lines_reports_line_of_invalid_word() {
        let err = AliasWords::parse_lines("sol\n\nla luna\n").expect_err("space in word");
        assert_eq!(
            err,
            AliasWordsError::InvalidWord {
                line: 3,
                word: "la luna".to_owned()
            }
        );
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec!["a.b".to_owned()])]
    fn new_rejects_unusable_lists(#[case] raw: Vec<String>) {
        assert!(AliasWords::new(raw).is_err());
    }

    #[rstest]
    fn cvu_candidates_are_22_digits() {
        for _ in 0..64 {
            let cvu = draw_cvu().expect("candidate");
            assert_eq!(cvu.as_str().len(), 22);
        }
    }

    #[rstest]
    fn alias_candidates_only_use_listed_words(words: AliasWords) {
        for _ in 0..64 {
            let alias = words.draw().expect("candidate");
            assert!(alias.words().all(|w| ["sol", "luna", "mar"].contains(&w)));
        }
    }

    #[rstest]
    #[tokio::test]
    async fn cvu_retries_until_free(words: AliasWords) {
        let mut repo = MockAccountRepository::new();
        let mut seq = Sequence::new();
        repo.expect_cvu_exists()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(true));
        repo.expect_cvu_exists()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(false));
        let generator = IdentifierGenerator::new(Arc::new(repo), words, attempts(5));

        let cvu = generator.generate_cvu().await.expect("third attempt is free");
        assert_eq!(cvu.as_str().len(), 22);
    }

    #[rstest]
    #[tokio::test]
    async fn alias_exhausts_after_bound(words: AliasWords) {
        let mut repo = MockAccountRepository::new();
        repo.expect_alias_exists().times(3).returning(|_| Ok(true));
        let generator = IdentifierGenerator::new(Arc::new(repo), words, attempts(3));

        let err = generator.generate_alias().await.expect_err("always taken");
        assert_eq!(err.code(), ErrorCode::ExhaustedRetries);
    }

    #[rstest]
    #[tokio::test]
    async fn store_failure_is_not_retried(words: AliasWords) {
        let mut repo = MockAccountRepository::new();
        repo.expect_cvu_exists()
            .times(1)
            .returning(|_| Err(AccountPersistenceError::query("relation missing")));
        let generator = IdentifierGenerator::new(Arc::new(repo), words, attempts(5));

        let err = generator.generate_cvu().await.expect_err("store down");
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[rstest]
    #[tokio::test]
    async fn single_word_list_yields_repeated_word() {
        let words = AliasWords::new(vec!["eco".to_owned()]).expect("one word");
        let mut repo = MockAccountRepository::new();
        repo.expect_alias_exists()
            .withf(|alias| alias.as_str() == "eco.eco.eco")
            .times(1)
            .returning(|_| Ok(false));
        let generator = IdentifierGenerator::new(Arc::new(repo), words, attempts(1));

        let alias = generator.generate_alias().await.expect("free alias");
        assert_eq!(alias.as_str(), "eco.eco.eco");
    }
}
