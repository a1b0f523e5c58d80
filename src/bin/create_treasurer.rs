use std::{
    error::Error,
    io::{self},
    path::Path,
    process::exit,
};

use clap::Parser;
use rusqlite::Connection;

use fundtrack::{
    PasswordHash, Role, ValidatedPassword, create_user, get_user_by_username, initialize_db,
    mark_email_verified, set_user_role,
};

/// A utility for creating the first treasurer, or promoting an existing
/// member to treasurer.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The treasurer's username.
    #[arg(long)]
    username: String,

    /// The treasurer's email address. Only needed for new users.
    #[arg(long)]
    email: Option<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let connection = Connection::open(db_path)?;
    initialize_db(&connection)?;

    if let Ok(user) = get_user_by_username(&args.username, &connection) {
        set_user_role(user.id, Role::Treasurer, &connection)?;
        println!("{} is now a treasurer.", user.username);
        return Ok(());
    }

    let Some(email) = args.email else {
        print_error("There is no user with that username, pass --email to create one.");
        exit(1);
    };

    let password_hash = match get_new_password_hash(&args.username, &email) {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    let user = create_user(
        &args.username,
        &email,
        password_hash,
        Role::Treasurer,
        &connection,
    )?;
    mark_email_verified(user.id, &connection)?;
    println!("Created treasurer {} ({}).", user.username, user.email);

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            print_error("Database path must include a file extension (e.g., 'fundtrack.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            print_error("Database path must include a file extension (e.g., 'fundtrack.db').");
            exit(1);
        }
        _ => {}
    }
}

fn prompt_password(prompt: &str) -> Option<String> {
    match rpassword::prompt_password(prompt) {
        Ok(string) => Some(string),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn get_new_password_hash(username: &str, email: &str) -> Option<PasswordHash> {
    loop {
        println!();

        let password = prompt_password("Enter a password: ")?;
        let confirmation = prompt_password("Enter the same password again: ")?;

        let validated_password =
            match ValidatedPassword::for_account(&password, &confirmation, username, email) {
                Ok(validated_password) => validated_password,
                Err(error) => {
                    print_error(format!("{error}, try again."));
                    continue;
                }
            };

        match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => {
                print_error(format!("Could not hash password: {error}. Try again."));
            }
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!("\x1b[31;1m{}\x1b[0m", error.to_string());
}
