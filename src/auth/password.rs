//! Passwords for member and treasurer accounts.
//!
//! A password is checked with zxcvbn against the account's own username and
//! email address before it is hashed with bcrypt, so `asha.k@college.edu`
//! cannot pick `asha.k2025` as a password.

use std::fmt::Display;

use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};
use zxcvbn::{Score, feedback::Feedback, zxcvbn};

use crate::Error;

/// The words an attacker would try first against an account.
fn account_words<'a>(username: &'a str, email: &'a str) -> Vec<&'a str> {
    let mut words = vec![username, email];

    if let Some((local_part, domain)) = email.split_once('@') {
        words.push(local_part);
        words.extend(domain.split('.').filter(|part| part.len() > 2));
    }

    words
}

/// A password that is strong enough to hash, but has not been hashed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Check a new account password and its confirmation.
    ///
    /// # Errors
    /// Returns [Error::TooWeak] if the password is easy to guess, including
    /// passwords built from `username` or `email`, and
    /// [Error::PasswordMismatch] if `confirmation` differs.
    pub fn for_account(
        password: &str,
        confirmation: &str,
        username: &str,
        email: &str,
    ) -> Result<Self, Error> {
        let validated = Self::check_strength(password, &account_words(username, email))?;

        if password != confirmation {
            return Err(Error::PasswordMismatch);
        }

        Ok(validated)
    }

    /// Wrap a password without checking it.
    #[cfg(test)]
    pub fn new_unchecked(password: &str) -> Self {
        Self(password.to_owned())
    }

    fn check_strength(password: &str, account_words: &[&str]) -> Result<Self, Error> {
        let entropy = zxcvbn(password, account_words);

        match entropy.score() {
            Score::Three | Score::Four => Ok(Self(password.to_owned())),
            _ => Err(Error::TooWeak(
                entropy
                    .feedback()
                    .map(Feedback::to_string)
                    .unwrap_or_default(),
            )),
        }
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("********")
    }
}

/// A bcrypt hash of an account password, as stored in the user table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Hash `password` with `cost` rounds. Tests use a cost of 4 to stay fast.
    ///
    /// # Errors
    /// Returns [Error::HashingError] if bcrypt fails.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        hash(&password.0, cost)
            .map(Self)
            .map_err(|error| Error::HashingError(error.to_string()))
    }

    /// Wrap a hash read from the database.
    pub fn new_unchecked(password_hash: &str) -> Self {
        Self(password_hash.to_owned())
    }

    /// Whether `password` is the password this hash was made from.
    ///
    /// # Errors
    /// Returns [Error::HashingError] if the stored hash is malformed.
    pub fn verify(&self, password: &str) -> Result<bool, Error> {
        verify(password, &self.0).map_err(|error| Error::HashingError(error.to_string()))
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
