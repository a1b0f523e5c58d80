//! Accounts, sessions and access control.
//!
//! Members register and confirm their email address before logging in.
//! Every page except the authentication pages requires a session cookie, and
//! treasurer-only routes additionally check the user's role.

mod cookie;
mod email_verification;
mod log_in;
mod log_out;
mod login_attempt;
mod middleware;
mod password;
mod redirect;
mod register;
mod user;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use email_verification::{create_email_verification_table, get_verify_email_page};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use login_attempt::create_login_attempt_table;
pub use middleware::{auth_guard, auth_guard_hx, treasurer_guard, treasurer_guard_hx};
pub use password::{PasswordHash, ValidatedPassword};
pub use redirect::normalize_redirect_url;
pub use register::{get_register_page, register_user};
pub use user::{
    Role, User, UserID, create_user, create_user_table, get_treasurer_ids, get_user_by_id,
    get_user_by_username, mark_email_verified, normalize_email, set_user_role,
    validate_username,
};

#[cfg(test)]
pub use cookie::COOKIE_TOKEN;
#[cfg(test)]
pub use middleware::AuthState;
