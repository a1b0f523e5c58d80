//! Database operations for categories.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    category::{Category, CategoryName, DEFAULT_CATEGORIES},
    database_id::CategoryId,
};

/// Create a category and return it with its generated ID.
pub fn create_category(name: CategoryName, connection: &Connection) -> Result<Category, Error> {
    connection.execute("INSERT INTO category (name) VALUES (?1);", (name.as_ref(),))?;

    let id = connection.last_insert_rowid();

    Ok(Category { id, name })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve a single category by its exact name.
pub fn get_category_by_name(name: &str, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name FROM category WHERE name = :name;")?
        .query_row(&[(":name", &name)], map_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered alphabetically by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name FROM category ORDER BY name ASC;")?
        .query_map([], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Rename a category. Returns an error if the category doesn't exist.
///
/// Transactions filed under the old name are moved to the new name.
pub fn update_category(
    category_id: CategoryId,
    new_name: CategoryName,
    connection: &Connection,
) -> Result<(), Error> {
    let old_name = match get_category(category_id, connection) {
        Ok(category) => category.name,
        Err(Error::NotFound) => return Err(Error::UpdateMissingCategory),
        Err(error) => return Err(error),
    };

    let transaction = connection.unchecked_transaction()?;
    transaction.execute(
        "UPDATE category SET name = ?1 WHERE id = ?2",
        (new_name.as_ref(), category_id),
    )?;
    transaction.execute(
        "UPDATE \"transaction\" SET category = ?1 WHERE category = ?2",
        (new_name.as_ref(), old_name.as_ref()),
    )?;
    transaction.commit()?;

    Ok(())
}

/// Delete a category by ID. Returns an error if the category doesn't exist.
///
/// The category's budget is deleted with it. Transactions keep the old
/// category name.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let transaction = connection.unchecked_transaction()?;
    let rows_affected = transaction.execute("DELETE FROM category WHERE id = ?1", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    transaction.execute("DELETE FROM budget WHERE category_id = ?1", [category_id])?;
    transaction.commit()?;

    Ok(())
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

/// Insert the default categories that are missing.
pub fn seed_default_categories(connection: &Connection) -> Result<(), rusqlite::Error> {
    let mut statement = connection.prepare("INSERT OR IGNORE INTO category (name) VALUES (?1)")?;

    for name in DEFAULT_CATEGORIES {
        statement.execute((name,))?;
    }

    Ok(())
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = CategoryName::new_unchecked(&raw_name);

    Ok(Category { id, name })
}

#[cfg(test)]
mod category_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        category::{
            CategoryName, DEFAULT_CATEGORIES, create_category, get_all_categories, get_category,
            get_category_by_name, update_category,
        },
        db::initialize,
    };

    use super::{create_category_table, delete_category, seed_default_categories};

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        create_category_table(&connection).expect("Could not create category table");
        connection
    }

    #[test]
    fn create_category_succeeds() {
        let connection = get_test_db_connection();
        let name = CategoryName::new("Catering").unwrap();

        let category = create_category(name.clone(), &connection).expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, name);
    }

    #[test]
    fn create_duplicate_category_fails() {
        let connection = get_test_db_connection();
        create_category(CategoryName::new_unchecked("Catering"), &connection).unwrap();

        let result = create_category(CategoryName::new_unchecked("Catering"), &connection);

        assert_eq!(result, Err(Error::DuplicateCategoryName));
    }

    #[test]
    fn get_category_with_invalid_id_returns_not_found() {
        let connection = get_test_db_connection();
        let inserted = create_category(CategoryName::new_unchecked("Foo"), &connection).unwrap();

        assert_eq!(get_category(inserted.id + 123, &connection), Err(Error::NotFound));
    }

    #[test]
    fn get_category_by_name_succeeds() {
        let connection = get_test_db_connection();
        let inserted = create_category(CategoryName::new_unchecked("Foo"), &connection).unwrap();

        assert_eq!(get_category_by_name("Foo", &connection), Ok(inserted));
        assert_eq!(get_category_by_name("Bar", &connection), Err(Error::NotFound));
    }

    #[test]
    fn seeding_is_idempotent() {
        let connection = get_test_db_connection();

        seed_default_categories(&connection).unwrap();
        seed_default_categories(&connection).unwrap();

        let categories = get_all_categories(&connection).unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert!(
            categories
                .iter()
                .any(|category| category.name.is_sponsor())
        );
    }

    #[test]
    fn update_category_renames_transactions() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let venue = get_category_by_name("Venue", &connection).unwrap();
        connection
            .execute(
                "INSERT INTO \"transaction\" (title, amount, category, date, approved)
                VALUES ('Hall hire', -5000, 'Venue', '2025-01-10', 1)",
                (),
            )
            .unwrap();

        update_category(venue.id, CategoryName::new_unchecked("Venues"), &connection).unwrap();

        let category: String = connection
            .query_row("SELECT category FROM \"transaction\"", [], |row| row.get(0))
            .unwrap();
        assert_eq!(category, "Venues");
        assert_eq!(
            get_category(venue.id, &connection).unwrap().name.as_ref(),
            "Venues"
        );
    }

    #[test]
    fn update_category_with_invalid_id_returns_error() {
        let connection = get_test_db_connection();

        let result = update_category(999999, CategoryName::new_unchecked("Updated"), &connection);

        assert_eq!(result, Err(Error::UpdateMissingCategory));
    }

    #[test]
    fn delete_category_succeeds() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let category = create_category(CategoryName::new_unchecked("ToDelete"), &connection).unwrap();
        connection
            .execute(
                "INSERT INTO budget (category_id, amount, start_date, end_date)
                VALUES (?1, 1000, '2025-01-01', '2025-03-31')",
                (category.id,),
            )
            .unwrap();

        assert!(delete_category(category.id, &connection).is_ok());
        assert_eq!(get_category(category.id, &connection), Err(Error::NotFound));
        let budget_count: i64 = connection
            .query_row("SELECT COUNT(*) FROM budget", [], |row| row.get(0))
            .unwrap();
        assert_eq!(budget_count, 0);
    }

    #[test]
    fn delete_category_with_invalid_id_returns_error() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        assert_eq!(
            delete_category(999999, &connection),
            Err(Error::DeleteMissingCategory)
        );
    }
}
