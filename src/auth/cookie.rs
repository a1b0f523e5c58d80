//! The session cookie: a serialized [Token] stored in an encrypted private cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::{Error, auth::UserID};

/// The name of the cookie holding the session token.
pub const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(15);

/// A token for authorization and authentication.
///
/// The expiry is stored as a unix timestamp so that the token does not depend
/// on a date-time string format.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    pub user_id: UserID,

    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

/// Add the session cookie to the cookie jar, indicating that a user is logged in.
///
/// The cookie expires `duration` from now, expressed in `local_offset`.
///
/// # Errors
///
/// Returns [Error::InvalidDateFormat] if the expiry overflows or the token
/// cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = OffsetDateTime::now_utc()
        .to_offset(local_offset)
        .checked_add(duration)
        .ok_or_else(|| {
            Error::InvalidDateFormat("expiry overflowed".to_owned(), duration.to_string())
        })?;

    set_token_cookie(
        jar,
        Token {
            user_id,
            expires_at,
        },
    )
}

/// Set the session cookie to an invalid value and expire it, which should
/// delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Read and validate the session token.
///
/// # Errors
///
/// Returns [Error::CookieMissing] if there is no session cookie, the cookie
/// cannot be parsed, or the token has expired.
pub fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::CookieMissing)?;
    let token: Token =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::CookieMissing)?;

    if token.expires_at <= OffsetDateTime::now_utc() {
        return Err(Error::CookieMissing);
    }

    Ok(token)
}

/// Push the session expiry out to at least `duration` from now.
///
/// Tokens that already expire later than that, e.g. "remember me" sessions,
/// are left alone.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
pub fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
    local_offset: UtcOffset,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;
    let new_expiry = OffsetDateTime::now_utc()
        .to_offset(local_offset)
        .checked_add(duration)
        .ok_or_else(|| {
            Error::InvalidDateFormat("expiry overflowed".to_owned(), duration.to_string())
        })?;

    if token.expires_at >= new_expiry {
        return Ok(jar);
    }

    set_token_cookie(
        jar,
        Token {
            user_id: token.user_id,
            expires_at: new_expiry,
        },
    )
}

fn set_token_cookie(jar: PrivateCookieJar, token: Token) -> Result<PrivateCookieJar, Error> {
    let serialized = serde_json::to_string(&token)
        .map_err(|error| Error::InvalidDateFormat(error.to_string(), format!("{token:?}")))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, serialized))
            .path("/")
            .expires(token.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    ))
}
