use std::path::Path;

use rusqlite::{Connection, params};
use tracing::{debug, info};

use super::open_connection;
use crate::error::DeskmateResult;
use crate::visit::{CategoryActivity, CategoryStats, Counts, OTHER_CATEGORY, Visit};

/// Visit log and recommendation snapshot (`history.db`).
pub struct HistoryStore {
    pub(super) conn: Connection,
}

impl HistoryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> DeskmateResult<Self> {
        let store = Self {
            conn: open_connection(path.as_ref())?,
        };
        store.init_schema()?;
        debug!("History store opened at {}", path.as_ref().display());
        Ok(store)
    }

    pub fn open_in_memory() -> DeskmateResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> DeskmateResult<()> {
        // Visits (append-only)
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                title TEXT,
                visit_time TEXT NOT NULL,
                domain TEXT,
                category TEXT,
                visit_count INTEGER DEFAULT 1,
                category_confidence REAL DEFAULT 0.0
            )",
            [],
        )?;

        // Latest generated recommendations (replaced wholesale)
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                description TEXT,
                category TEXT,
                confidence REAL,
                timestamp TEXT,
                is_visited INTEGER DEFAULT 0
            )",
            [],
        )?;

        Ok(())
    }

    /// Append visits in one transaction. Returns how many were written.
    pub fn record_visits(&mut self, visits: &[Visit]) -> DeskmateResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO history (url, title, visit_time, domain, category, visit_count, category_confidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for visit in visits {
                stmt.execute(params![
                    visit.url,
                    visit.title,
                    visit.visit_time,
                    visit.domain,
                    visit.category,
                    visit.visit_count,
                    visit.category_confidence,
                ])?;
            }
        }
        tx.commit()?;

        info!("Recorded {} visits", visits.len());
        Ok(visits.len())
    }

    /// Visit count and latest visit per scoreable category (not null, not "Other").
    pub fn category_activity(&self) -> DeskmateResult<Vec<CategoryActivity>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) AS visit_count, MAX(visit_time) AS last_visit
             FROM history
             WHERE category IS NOT NULL AND category != ?1
             GROUP BY category
             ORDER BY visit_count DESC, category",
        )?;

        let rows = stmt
            .query_map(params![OTHER_CATEGORY], |row| {
                Ok(CategoryActivity {
                    category: row.get(0)?,
                    visit_count: row.get(1)?,
                    last_visit: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Per-category counts, distinct domains and latest visit, most visited first.
    pub fn category_stats(&self) -> DeskmateResult<Vec<CategoryStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) AS count, COUNT(DISTINCT domain), MAX(visit_time)
             FROM history
             WHERE category IS NOT NULL AND category != ''
             GROUP BY category
             ORDER BY count DESC, category",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok(CategoryStats {
                    category: row.get(0)?,
                    visit_count: row.get(1)?,
                    unique_domains: row.get(2)?,
                    last_visit: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn category_distribution(&self) -> DeskmateResult<Counts> {
        self.counts(
            "SELECT category, COUNT(*) AS count FROM history
             WHERE category IS NOT NULL
             GROUP BY category
             ORDER BY count DESC, category",
        )
    }

    pub fn hourly_counts(&self) -> DeskmateResult<Counts> {
        self.counts(
            "SELECT strftime('%H', visit_time) AS hour, COUNT(*) AS count FROM history
             WHERE strftime('%H', visit_time) IS NOT NULL
             GROUP BY hour
             ORDER BY count DESC, hour",
        )
    }

    pub fn weekday_counts(&self) -> DeskmateResult<Counts> {
        self.counts(
            "SELECT strftime('%w', visit_time) AS day, COUNT(*) AS count FROM history
             WHERE strftime('%w', visit_time) IS NOT NULL
             GROUP BY day
             ORDER BY day",
        )
    }

    fn counts(&self, sql: &str) -> DeskmateResult<Counts> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Counts(rows))
    }
}
