//! Flat key/value settings store.
//!
//! Workflows read the whole table once at run start and treat the result as
//! an immutable snapshot; nothing re-reads settings mid-run. The bulk upsert
//! is transactional so a failed write never leaves a half-applied update.

use crate::{Store, StoreError};
use rusqlite::{params, OptionalExtension};
use spectrail_core::{now_iso, SettingsKV};
use std::collections::HashMap;

impl Store {
    pub fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn()
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now_iso()],
        )?;
        Ok(())
    }

    /// Upsert several pairs atomically: all of them or none.
    pub fn set_settings(&self, pairs: &[(String, String)]) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )?;
            let stamp = now_iso();
            for (key, value) in pairs {
                stmt.execute(params![key, value, stamp])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn all_settings(&self) -> Result<HashMap<String, String>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            out.insert(key, value);
        }
        Ok(out)
    }

    pub fn list_settings(&self) -> Result<Vec<SettingsKV>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT key, value, updated_at FROM settings ORDER BY key ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(SettingsKV {
                key: row.get(0)?,
                value: row.get(1)?,
                updated_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
