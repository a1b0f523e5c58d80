//! Email verification: a one-time link proves that a new member owns their
//! email address before they can log in.
//!
//! Only a SHA-256 digest of each token is stored, so a leaked database does
//! not leak working verification links.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::html;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    auth::{UserID, mark_email_verified},
    endpoints,
    html::{base, link, log_in_register},
};

/// How long a verification link stays valid.
pub const VERIFICATION_TOKEN_LIFETIME: Duration = Duration::hours(24);

pub fn create_email_verification_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS email_verification (
            user_id INTEGER PRIMARY KEY,
            token_hash TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            verified_at TEXT,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// A new random, URL safe verification token.
pub fn generate_token() -> String {
    base64_url::encode(&rand::random::<[u8; 32]>())
}

/// The hex encoded SHA-256 digest of `token`.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());

    format!("{:x}", hasher.finalize())
}

/// Start verification for `user_id` and return the raw token to send to the user.
///
/// Any earlier pending verification for the user is replaced.
pub fn create_verification(
    user_id: UserID,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<String, Error> {
    let token = generate_token();

    connection.execute(
        "INSERT OR REPLACE INTO email_verification (user_id, token_hash, created_at)
        VALUES (?1, ?2, ?3)",
        (user_id.as_i64(), hash_token(&token), created_at),
    )?;

    Ok(token)
}

/// Mark the email address belonging to `token` as verified.
///
/// Following the same link twice is harmless.
///
/// # Errors
///
/// Returns [Error::InvalidVerificationToken] if no verification matches the
/// token, or [Error::ExpiredVerificationToken] if the token is older than
/// [VERIFICATION_TOKEN_LIFETIME].
pub fn verify_email_token(
    token: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<UserID, Error> {
    let verification: Option<(i64, OffsetDateTime, Option<OffsetDateTime>)> = connection
        .query_row(
            "SELECT user_id, created_at, verified_at FROM email_verification
            WHERE token_hash = ?1",
            (hash_token(token),),
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((user_id, created_at, verified_at)) = verification else {
        return Err(Error::InvalidVerificationToken);
    };
    let user_id = UserID::new(user_id);

    if verified_at.is_some() {
        return Ok(user_id);
    }

    if now - created_at > VERIFICATION_TOKEN_LIFETIME {
        return Err(Error::ExpiredVerificationToken);
    }

    let transaction = connection.unchecked_transaction()?;
    transaction.execute(
        "UPDATE email_verification SET verified_at = ?1 WHERE user_id = ?2",
        (now, user_id.as_i64()),
    )?;
    mark_email_verified(user_id, &transaction)?;
    transaction.commit()?;

    Ok(user_id)
}

/// The state needed to verify an email address.
#[derive(Debug, Clone)]
pub struct VerifyEmailState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for VerifyEmailState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

/// Confirm the email address for the token in the verification link.
pub async fn get_verify_email_page(
    State(state): State<VerifyEmailState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user_id = verify_email_token(&query.token, OffsetDateTime::now_utc(), &connection)?;
    tracing::info!("User {user_id} verified their email address");

    let content = log_in_register(
        "Email verified",
        &html! {
            p class="text-gray-900 dark:text-white"
            {
                "Thanks for confirming your email address. You can now "
                (link(endpoints::LOG_IN_VIEW, "log in"))
                "."
            }
        },
    );

    Ok(base("Email Verified", &[], &content).into_response())
}

#[cfg(test)]
mod email_verification_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::{PasswordHash, Role, User, create_user, get_user_by_id},
        db::initialize,
    };

    use super::{
        VerifyEmailQuery, VerifyEmailState, create_verification, get_verify_email_page,
        hash_token, verify_email_token,
    };

    fn get_connection_with_user() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "asha",
            "asha@example.com",
            PasswordHash::new_unchecked("hunter2"),
            Role::Member,
            &connection,
        )
        .unwrap();

        (connection, user)
    }

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn token_is_not_stored_in_plain_text() {
        let (connection, user) = get_connection_with_user();
        let token = create_verification(user.id, OffsetDateTime::now_utc(), &connection).unwrap();

        let stored: String = connection
            .query_row("SELECT token_hash FROM email_verification", [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_ne!(stored, token);
        assert_eq!(stored, hash_token(&token));
    }

    #[test]
    fn valid_token_verifies_user() {
        let (connection, user) = get_connection_with_user();
        let now = OffsetDateTime::now_utc();
        let token = create_verification(user.id, now, &connection).unwrap();

        assert_eq!(verify_email_token(&token, now, &connection), Ok(user.id));
        assert!(get_user_by_id(user.id, &connection).unwrap().email_verified);
    }

    #[test]
    fn unknown_token_is_invalid() {
        let (connection, _) = get_connection_with_user();

        assert_eq!(
            verify_email_token("nope", OffsetDateTime::now_utc(), &connection),
            Err(Error::InvalidVerificationToken)
        );
    }

    #[test]
    fn old_token_is_expired() {
        let (connection, user) = get_connection_with_user();
        let created_at = OffsetDateTime::now_utc() - Duration::hours(25);
        let token = create_verification(user.id, created_at, &connection).unwrap();

        assert_eq!(
            verify_email_token(&token, OffsetDateTime::now_utc(), &connection),
            Err(Error::ExpiredVerificationToken)
        );
        assert!(!get_user_by_id(user.id, &connection).unwrap().email_verified);
    }

    #[tokio::test]
    async fn verify_page_renders_success() {
        let (connection, user) = get_connection_with_user();
        let token = create_verification(user.id, OffsetDateTime::now_utc(), &connection).unwrap();
        let state = VerifyEmailState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_verify_email_page(State(state), Query(VerifyEmailQuery { token }))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn verify_page_with_bad_token_is_bad_request() {
        let (connection, _) = get_connection_with_user();
        let state = VerifyEmailState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_verify_email_page(
            State(state),
            Query(VerifyEmailQuery {
                token: "nope".to_owned(),
            }),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
