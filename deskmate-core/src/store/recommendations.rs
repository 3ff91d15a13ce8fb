use rusqlite::params;
use tracing::debug;

use super::HistoryStore;
use crate::error::DeskmateResult;
use crate::recommend::Recommendation;

impl HistoryStore {
    /// Replace the saved snapshot with `recommendations`, atomically.
    pub fn replace_recommendations(&mut self, recommendations: &[Recommendation]) -> DeskmateResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM recommendations", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO recommendations (title, url, description, category, confidence, timestamp, is_visited)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for rec in recommendations {
                stmt.execute(params![
                    rec.title,
                    rec.url,
                    rec.description,
                    rec.category,
                    rec.confidence,
                    rec.timestamp,
                    rec.is_visited,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Saved {} recommendations", recommendations.len());
        Ok(())
    }

    /// Saved recommendations, highest confidence first, then insertion order.
    pub fn saved_recommendations(&self, limit: usize) -> DeskmateResult<Vec<Recommendation>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, url, description, category, confidence, timestamp, is_visited
             FROM recommendations
             ORDER BY confidence DESC, id
             LIMIT ?1",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(Recommendation {
                    title: row.get(0)?,
                    url: row.get(1)?,
                    description: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    category: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    confidence: row.get::<_, Option<f64>>(4)?.unwrap_or_default(),
                    timestamp: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                    is_visited: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(url: &str, confidence: f64) -> Recommendation {
        Recommendation {
            title: url.to_string(),
            url: url.to_string(),
            description: String::new(),
            category: "News".to_string(),
            confidence,
            timestamp: "2025-04-20 12:00:00".to_string(),
            is_visited: false,
        }
    }

    #[test]
    fn test_saved_in_confidence_order() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        store
            .replace_recommendations(&[rec("a", 10.0), rec("b", 40.0), rec("c", 10.0)])
            .unwrap();

        let saved = store.saved_recommendations(10).unwrap();
        let urls: Vec<_> = saved.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "a", "c"]);

        assert_eq!(store.saved_recommendations(1).unwrap().len(), 1);
    }

    #[test]
    fn test_replace_discards_previous() {
        let mut store = HistoryStore::open_in_memory().unwrap();
        store.replace_recommendations(&[rec("a", 1.0), rec("b", 2.0)]).unwrap();
        store.replace_recommendations(&[rec("c", 3.0)]).unwrap();

        let saved = store.saved_recommendations(10).unwrap();
        assert_eq!(saved, vec![rec("c", 3.0)]);
    }
}
