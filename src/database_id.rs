//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
pub type TransactionId = DatabaseId;
pub type CategoryId = DatabaseId;
pub type BudgetId = DatabaseId;
pub type FundId = DatabaseId;
pub type SponsorId = DatabaseId;
