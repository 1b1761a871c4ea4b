//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database.
//! It defines the database tables and the state shared by request handlers.

use redb::{Database, TableDefinition};
use std::sync::Arc;

use crate::config::Settings;
use crate::store::LinkStore;

/// Main table for storing link records
///
/// Key: Short slug as string
/// Value: JSON-serialized LinkRecord as string
///
/// Example:
/// - Key: "abc123"
/// - Value: '{"id":1,"longUrl":"https://example.com","shortSlug":"abc123",...}'
///
/// Keying by slug is what keeps slugs unique.
pub const TABLE_LINKS: TableDefinition<&str, &str> = TableDefinition::new("links_v1");

/// Secondary index listing the links of an owner in creation order
///
/// Key: (owner id, link id)
/// Value: Short slug, pointing back into `TABLE_LINKS`
pub const TABLE_OWNER_INDEX: TableDefinition<(&str, u64), &str> =
    TableDefinition::new("owner_index_v1");

/// Small key/value table for counters that are not tied to one link
pub const TABLE_META: TableDefinition<&str, u64> = TableDefinition::new("meta_v1");

/// Key in `TABLE_META` holding the next link id to hand out
pub const NEXT_LINK_ID: &str = "next_link_id";

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Link storage backed by the embedded database
    pub store: LinkStore,

    /// Settings read at startup
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        Self {
            store: LinkStore::new(Arc::new(db)),
            settings: Arc::new(settings),
        }
    }
}

/// Initializes the embedded database and creates required tables
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Example
///
/// ```no_run
/// # use clipsnip::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    // Open every table once so read transactions never see a missing table
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_LINKS)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
        write_txn.open_table(TABLE_META)?;
    }
    write_txn.commit()?;

    Ok(db)
}
