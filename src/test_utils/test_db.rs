use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{
    auth::{PasswordHash, Role, UserID, create_user, mark_email_verified},
    db::initialize,
};

/// An in-memory database with every table and the default categories.
pub(crate) fn test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

/// Insert a verified user named `username` with `role`.
pub(crate) fn insert_user(username: &str, role: Role, connection: &Connection) -> UserID {
    let user = create_user(
        username,
        &format!("{username}@example.com"),
        PasswordHash::new_unchecked("hunter2"),
        role,
        connection,
    )
    .expect("Could not create test user");
    mark_email_verified(user.id, connection).expect("Could not verify test user");

    user.id
}

/// A test database with a single treasurer.
pub(crate) fn connection_with_treasurer() -> (Connection, UserID) {
    let connection = test_connection();
    let treasurer = insert_user("treasurer", Role::Treasurer, &connection);

    (connection, treasurer)
}

pub(crate) fn into_state(connection: Connection) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(connection))
}
