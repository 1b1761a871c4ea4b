//! Link storage and the redirect resolver
//!
//! Every mutation runs in a single redb write transaction. redb allows one
//! writer at a time, so a visit's read-modify-write of the counters cannot
//! interleave with another visit and no increment is lost.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata};
use tracing::{debug, info};

use crate::database::{NEXT_LINK_ID, TABLE_LINKS, TABLE_META, TABLE_OWNER_INDEX};
use crate::error::AppError;
use crate::model::{is_reserved, LinkRecord, NewLink, SLUG_LENGTH};

/// How many random slugs to try before giving up on a creation
const SLUG_ATTEMPTS: usize = 8;

/// Aggregate numbers for one owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OwnerStats {
    pub links: u64,
    pub visits: u64,
}

#[derive(Clone)]
pub struct LinkStore {
    db: Arc<Database>,
}

fn generate_slug() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SLUG_LENGTH)
        .map(char::from)
        .collect()
}

fn link_not_found(slug: &str) -> AppError {
    AppError::NotFound(format!("Link '{}' not found or removed", slug))
}

impl LinkStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Looks up a link by slug without touching its counters
    pub fn find(&self, slug: &str) -> Result<Option<LinkRecord>, AppError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LINKS)?;

        let record = match table.get(slug)? {
            Some(guard) => Some(serde_json::from_str::<LinkRecord>(guard.value())?),
            None => None,
        };
        Ok(record)
    }

    /// Resolves a slug for a visit
    ///
    /// Active links get their total, per-country and per-day counters bumped
    /// in one transaction and the updated record is returned. Disabled links
    /// come back unchanged.
    pub fn resolve(
        &self,
        slug: &str,
        country: &str,
        today: NaiveDate,
    ) -> Result<LinkRecord, AppError> {
        if slug.is_empty() {
            return Err(AppError::Validation("Missing slug".to_string()));
        }

        // Misses and disabled links are answered from a read transaction,
        // keeping them off the single writer.
        match self.find(slug)? {
            None => {
                debug!(slug, "resolve miss");
                return Err(link_not_found(slug));
            }
            Some(record) if record.disabled => {
                debug!(slug, "link disabled, counters left untouched");
                return Ok(record);
            }
            Some(_) => {}
        }

        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(TABLE_LINKS)?;

            // Re-read under the write lock; the link may have changed since.
            let mut record = match table.get(slug)? {
                Some(guard) => serde_json::from_str::<LinkRecord>(guard.value())?,
                None => return Err(link_not_found(slug)),
            };

            if !record.disabled {
                record.register_visit(country, today, Utc::now());
                let record_json = serde_json::to_string(&record)?;
                table.insert(slug, record_json.as_str())?;
            }
            record
        };
        write_txn.commit()?;

        Ok(record)
    }

    /// Persists a new link and returns the stored record
    ///
    /// A requested slug that is already taken is a `Conflict`. Without a
    /// requested slug a random one is drawn, retrying on collision.
    pub fn create(&self, new_link: NewLink) -> Result<LinkRecord, AppError> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut links = write_txn.open_table(TABLE_LINKS)?;

            let slug = match new_link.slug {
                Some(slug) => {
                    if links.get(slug.as_str())?.is_some() {
                        return Err(AppError::Conflict(format!(
                            "Slug '{}' is already taken. Please choose another.",
                            slug
                        )));
                    }
                    slug
                }
                None => {
                    let mut attempts = 0;
                    loop {
                        let candidate = generate_slug();
                        if !is_reserved(&candidate) && links.get(candidate.as_str())?.is_none() {
                            break candidate;
                        }
                        attempts += 1;
                        debug!(attempts, "generated slug collided");
                        if attempts >= SLUG_ATTEMPTS {
                            return Err(AppError::Conflict(
                                "Could not allocate a unique slug, try again".to_string(),
                            ));
                        }
                    }
                }
            };

            let mut meta = write_txn.open_table(TABLE_META)?;
            let id = meta.get(NEXT_LINK_ID)?.map(|g| g.value()).unwrap_or(1);
            meta.insert(NEXT_LINK_ID, id + 1)?;

            let now = Utc::now();
            let record = LinkRecord {
                id,
                long_url: new_link.long_url,
                description: new_link.description,
                short_slug: slug,
                owner_id: new_link.owner_id,
                total_visit_count: 1,
                disabled: !new_link.enabled,
                visit_count_by_country: Default::default(),
                visit_count_by_date: Default::default(),
                created_at: now,
                updated_at: now,
            };

            let record_json = serde_json::to_string(&record)?;
            links.insert(record.short_slug.as_str(), record_json.as_str())?;

            let mut owners = write_txn.open_table(TABLE_OWNER_INDEX)?;
            owners.insert(
                (record.owner_id.as_str(), record.id),
                record.short_slug.as_str(),
            )?;

            record
        };
        write_txn.commit()?;

        info!(slug = %record.short_slug, owner = %record.owner_id, "link created");
        Ok(record)
    }

    /// Flips `disabled` on one of the owner's links
    ///
    /// Returns `None` without writing when the slug does not exist or
    /// belongs to someone else.
    pub fn toggle_disabled(
        &self,
        owner_id: &str,
        slug: &str,
    ) -> Result<Option<LinkRecord>, AppError> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(TABLE_LINKS)?;

            let mut record = match table.get(slug)? {
                Some(guard) => serde_json::from_str::<LinkRecord>(guard.value())?,
                None => return Ok(None),
            };
            if record.owner_id != owner_id {
                debug!(slug, owner_id, "toggle ignored, caller is not the owner");
                return Ok(None);
            }

            record.disabled = !record.disabled;
            record.updated_at = Utc::now();
            let record_json = serde_json::to_string(&record)?;
            table.insert(slug, record_json.as_str())?;
            record
        };
        write_txn.commit()?;

        info!(slug, disabled = record.disabled, "link toggled");
        Ok(Some(record))
    }

    /// Number of links across all owners
    pub fn count_all(&self) -> Result<u64, AppError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LINKS)?;
        Ok(table.len()?)
    }

    /// The owner's links in creation order, paginated
    pub fn list_for_owner(
        &self,
        owner_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<LinkRecord>, AppError> {
        let read_txn = self.db.begin_read()?;
        let owners = read_txn.open_table(TABLE_OWNER_INDEX)?;
        let links = read_txn.open_table(TABLE_LINKS)?;

        let mut records = Vec::new();
        for entry in owners
            .range((owner_id, 0u64)..=(owner_id, u64::MAX))?
            .skip(offset)
            .take(limit)
        {
            let (_, slug) = entry?;
            if let Some(guard) = links.get(slug.value())? {
                records.push(serde_json::from_str::<LinkRecord>(guard.value())?);
            }
        }
        Ok(records)
    }

    /// Link count and visit total for an owner
    ///
    /// Visits exclude the initial offset each link starts with.
    pub fn owner_stats(&self, owner_id: &str) -> Result<OwnerStats, AppError> {
        let read_txn = self.db.begin_read()?;
        let owners = read_txn.open_table(TABLE_OWNER_INDEX)?;
        let links = read_txn.open_table(TABLE_LINKS)?;

        let mut stats = OwnerStats::default();
        for entry in owners.range((owner_id, 0u64)..=(owner_id, u64::MAX))? {
            let (_, slug) = entry?;
            if let Some(guard) = links.get(slug.value())? {
                let record = serde_json::from_str::<LinkRecord>(guard.value())?;
                stats.links += 1;
                stats.visits += record.visits();
            }
        }
        Ok(stats)
    }
}
