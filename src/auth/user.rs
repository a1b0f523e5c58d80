//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(transparent)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What a user is allowed to do.
///
/// Members can submit transactions and view the organisation's finances.
/// Treasurers can also approve transactions and manage income, categories
/// and budgets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Approves spending and manages the books.
    Treasurer,
    /// A regular member of the organisation.
    Member,
}

impl Role {
    /// The name of the role as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Treasurer => "treasurer",
            Role::Member => "member",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "treasurer" => Ok(Role::Treasurer),
            "member" => Ok(Role::Member),
            other => Err(format!("unknown role \"{other}\"")),
        }
    }
}

/// The longest username that may be registered.
pub const MAX_USERNAME_LENGTH: usize = 150;
/// The shortest username that may be registered.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: String,
    /// The user's email address, always lowercase.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// Whether the user is a treasurer or a regular member.
    pub role: Role,
    /// Whether the user has followed their email verification link.
    pub email_verified: bool,
}

impl User {
    /// Whether the user can approve transactions and manage the books.
    pub fn is_treasurer(&self) -> bool {
        self.role == Role::Treasurer
    }
}

/// Check that `username` is 3 to 150 characters of letters, digits and `_.-`.
///
/// Leading and trailing whitespace is removed before checking.
///
/// # Errors
///
/// Returns [Error::InvalidUsername] explaining what is wrong with the username.
pub fn validate_username(username: &str) -> Result<String, Error> {
    let username = username.trim();
    let length = username.chars().count();

    if length < MIN_USERNAME_LENGTH {
        return Err(Error::InvalidUsername(format!(
            "must be at least {MIN_USERNAME_LENGTH} characters long"
        )));
    }

    if length > MAX_USERNAME_LENGTH {
        return Err(Error::InvalidUsername(format!(
            "must be at most {MAX_USERNAME_LENGTH} characters long"
        )));
    }

    if let Some(bad_char) = username
        .chars()
        .find(|c| !(c.is_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(Error::InvalidUsername(format!(
            "\"{bad_char}\" is not allowed, use letters, digits and _ . - only"
        )));
    }

    Ok(username.to_owned())
}

/// Check that `email` looks like an email address and lowercase it.
///
/// # Errors
///
/// Returns [Error::InvalidEmail] if the trimmed address does not contain an '@'.
pub fn normalize_email(email: &str) -> Result<String, Error> {
    let email = email.trim();

    if !email.contains('@') {
        return Err(Error::InvalidEmail(email.to_owned()));
    }

    Ok(email.to_lowercase())
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'member',
                email_verified INTEGER NOT NULL DEFAULT 0
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// The caller is expected to have validated `username` and `email` with
/// [validate_username] and [normalize_email].
///
/// # Errors
///
/// Returns [Error::DuplicateUsername] or [Error::DuplicateEmail] if either
/// is already registered, or [Error::SqlError] if another SQL error occurred.
pub fn create_user(
    username: &str,
    email: &str,
    password_hash: PasswordHash,
    role: Role,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, email, password, role) VALUES (?1, ?2, ?3, ?4)",
        (username, email, password_hash.as_ref(), role.as_str()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        email: email.to_owned(),
        password_hash,
        role,
        email_verified: false,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, email, password, role, email_verified FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_row)
        .map_err(|error| error.into())
}

/// Get the user with the given `username`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that username.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, email, password, role, email_verified
            FROM user WHERE username = :username",
        )?
        .query_row(&[(":username", username)], map_row)
        .map_err(|error| error.into())
}

/// Change the role of the user with the ID `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn set_user_role(user_id: UserID, role: Role, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET role = ?1 WHERE id = ?2",
        (role.as_str(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Mark the user's email address as confirmed so that they may log in.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn mark_email_verified(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET email_verified = 1 WHERE id = ?1",
        (user_id.as_i64(),),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The IDs of every treasurer, used for sending them notifications.
pub fn get_treasurer_ids(connection: &Connection) -> Result<Vec<UserID>, Error> {
    connection
        .prepare("SELECT id FROM user WHERE role = 'treasurer' ORDER BY id")?
        .query_map([], |row| row.get(0).map(UserID::new))?
        .map(|maybe_id| maybe_id.map_err(Error::from))
        .collect()
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let username = row.get(1)?;
    let email = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;
    let raw_role: String = row.get(4)?;
    let email_verified = row.get(5)?;

    let role = Role::from_str(&raw_role).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, error.into())
    })?;

    Ok(User {
        id,
        username,
        email,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        role,
        email_verified,
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{
            PasswordHash,
            user::{
                Role, UserID, create_user, get_treasurer_ids, get_user_by_id,
                get_user_by_username, mark_email_verified, set_user_role,
            },
        },
    };

    use super::create_user_table;

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    fn insert_member(username: &str, connection: &Connection) -> crate::auth::User {
        create_user(
            username,
            &format!("{username}@example.com"),
            PasswordHash::new_unchecked("hunter2"),
            Role::Member,
            connection,
        )
        .unwrap()
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();

        let inserted_user = insert_member("asha", &db_connection);

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.role, Role::Member);
        assert!(!inserted_user.email_verified);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db_connection = get_db_connection();
        insert_member("asha", &db_connection);

        let result = create_user(
            "asha",
            "other@example.com",
            PasswordHash::new_unchecked("hunter2"),
            Role::Member,
            &db_connection,
        );

        assert_eq!(result, Err(Error::DuplicateUsername));
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db_connection = get_db_connection();
        insert_member("asha", &db_connection);

        let result = create_user(
            "ravi",
            "asha@example.com",
            PasswordHash::new_unchecked("hunter2"),
            Role::Member,
            &db_connection,
        );

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let db_connection = get_db_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn get_user_by_username_round_trips() {
        let db_connection = get_db_connection();
        let test_user = insert_member("asha", &db_connection);

        let retrieved_user = get_user_by_username("asha", &db_connection).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn set_role_and_verify_email() {
        let db_connection = get_db_connection();
        let user = insert_member("asha", &db_connection);

        set_user_role(user.id, Role::Treasurer, &db_connection).unwrap();
        mark_email_verified(user.id, &db_connection).unwrap();

        let user = get_user_by_id(user.id, &db_connection).unwrap();
        assert!(user.is_treasurer());
        assert!(user.email_verified);
    }

    #[test]
    fn set_role_on_missing_user_is_not_found() {
        let db_connection = get_db_connection();

        assert_eq!(
            set_user_role(UserID::new(9), Role::Treasurer, &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn lists_only_treasurers() {
        let db_connection = get_db_connection();
        insert_member("asha", &db_connection);
        let treasurer = insert_member("ravi", &db_connection);
        set_user_role(treasurer.id, Role::Treasurer, &db_connection).unwrap();

        assert_eq!(get_treasurer_ids(&db_connection), Ok(vec![treasurer.id]));
    }
}

#[cfg(test)]
mod validation_tests {
    use crate::Error;

    use super::{normalize_email, validate_username};

    #[test]
    fn username_is_trimmed() {
        assert_eq!(validate_username("  asha_k  "), Ok("asha_k".to_owned()));
    }

    #[test]
    fn short_username_is_rejected() {
        assert!(matches!(
            validate_username("ab"),
            Err(Error::InvalidUsername(_))
        ));
    }

    #[test]
    fn long_username_is_rejected() {
        assert!(matches!(
            validate_username(&"a".repeat(151)),
            Err(Error::InvalidUsername(_))
        ));
    }

    #[test]
    fn username_with_space_is_rejected() {
        assert!(matches!(
            validate_username("asha k"),
            Err(Error::InvalidUsername(_))
        ));
    }

    #[test]
    fn email_is_lowercased() {
        assert_eq!(
            normalize_email(" Asha@Example.COM "),
            Ok("asha@example.com".to_owned())
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert_eq!(
            normalize_email("asha.example.com"),
            Err(Error::InvalidEmail("asha.example.com".to_owned()))
        );
    }
}
