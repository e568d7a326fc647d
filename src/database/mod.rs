//! GitBrowser archive database layer.
//!
//! Provides SQLite connection management and schema migrations for the
//! persistent archive store.
//!
//! # Usage
//!
//! ```no_run
//! use gitbrowser_archive::database::Database;
//!
//! // Open a persistent archive database
//! let db = Database::open("archive.db").expect("failed to open database");
//!
//! // Or use an in-memory database for testing
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//!
//! let conn = db.connection();
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
