//! Artifact storage.
//!
//! Artifacts are upserted by `(task_id, kind)` for the phase-less core flows:
//! saving a new plan replaces the previous one for that task. The row id is
//! reused on replace but `created_at` always advances to the write time, so
//! every upsert is a fresh content snapshot.

use crate::{Store, StoreError};
use rusqlite::{params, OptionalExtension};
use spectrail_core::{new_id, now_iso, Artifact, ArtifactKind};

impl Store {
    pub fn upsert_artifact(
        &self,
        task_id: &str,
        kind: ArtifactKind,
        content: &str,
    ) -> Result<Artifact, StoreError> {
        let conn = self.conn();
        let created_at = now_iso();

        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM artifacts
                 WHERE task_id = ?1 AND phase_id IS NULL AND kind = ?2 LIMIT 1",
                params![task_id, kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE artifacts SET content = ?1, created_at = ?2 WHERE id = ?3",
                    params![content, created_at, id],
                )?;
                id
            }
            None => {
                let id = new_id();
                conn.execute(
                    "INSERT INTO artifacts (id, task_id, phase_id, kind, content, created_at, pinned)
                     VALUES (?1, ?2, NULL, ?3, ?4, ?5, 0)",
                    params![id, task_id, kind.as_str(), content, created_at],
                )?;
                id
            }
        };

        Ok(Artifact {
            id,
            task_id: task_id.to_string(),
            phase_id: None,
            kind: kind.as_str().to_string(),
            content: content.to_string(),
            created_at,
            pinned: 0,
        })
    }

    pub fn latest_artifact(
        &self,
        task_id: &str,
        kind: ArtifactKind,
    ) -> Result<Option<Artifact>, StoreError> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, task_id, phase_id, kind, content, created_at, pinned
                 FROM artifacts
                 WHERE task_id = ?1 AND phase_id IS NULL AND kind = ?2
                 ORDER BY created_at DESC LIMIT 1",
                params![task_id, kind.as_str()],
                |row| {
                    Ok(Artifact {
                        id: row.get(0)?,
                        task_id: row.get(1)?,
                        phase_id: row.get(2)?,
                        kind: row.get(3)?,
                        content: row.get(4)?,
                        created_at: row.get(5)?,
                        pinned: row.get(6)?,
                    })
                },
            )
            .optional()?)
    }

    pub fn list_artifacts(&self, task_id: &str) -> Result<Vec<Artifact>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, task_id, phase_id, kind, content, created_at, pinned
             FROM artifacts WHERE task_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([task_id], |row| {
            Ok(Artifact {
                id: row.get(0)?,
                task_id: row.get(1)?,
                phase_id: row.get(2)?,
                kind: row.get(3)?,
                content: row.get(4)?,
                created_at: row.get(5)?,
                pinned: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
