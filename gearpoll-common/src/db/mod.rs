//! Database access for gearpoll
//!
//! SQLite via sqlx. The answer log is append-only: records are inserted,
//! queried for resume filtering, and never updated or deleted.

pub mod init;
pub mod records;
pub mod retry;

pub use init::init_database;
pub use records::{answered_pairs, count_records, insert_record};
pub use retry::retry_on_lock;
