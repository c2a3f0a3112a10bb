//! Runs and their append-only transcript: messages and tool-call rows.
//!
//! Invariants enforced here:
//! - appends are only accepted while the run is open (`ended_at IS NULL`);
//! - a tool step (tool-call row + its `tool` message) is written in one
//!   transaction, so a crash mid-step leaves either both rows or neither;
//! - read order is insertion order (`created_at`, then rowid as tiebreaker).

use crate::{Store, StoreError};
use rusqlite::{params, Connection, OptionalExtension};
use spectrail_core::{new_id, now_iso, Message, Role, Run, RunType, ToolCallRow};
use tracing::debug;

fn ensure_open(conn: &Connection, run_id: &str) -> Result<(), StoreError> {
    let ended_at: Option<Option<String>> = conn
        .query_row("SELECT ended_at FROM runs WHERE id = ?1", [run_id], |row| {
            row.get(0)
        })
        .optional()?;
    match ended_at {
        None => Err(StoreError::NotFound(format!("run {run_id}"))),
        Some(Some(_)) => Err(StoreError::RunClosed(run_id.to_string())),
        Some(None) => Ok(()),
    }
}

fn insert_message(
    conn: &Connection,
    run_id: &str,
    role: Role,
    content: &str,
) -> Result<Message, StoreError> {
    let message = Message {
        id: new_id(),
        run_id: run_id.to_string(),
        role: role.as_str().to_string(),
        content: content.to_string(),
        created_at: now_iso(),
    };
    conn.execute(
        "INSERT INTO messages (id, run_id, role, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            message.id,
            message.run_id,
            message.role,
            message.content,
            message.created_at
        ],
    )?;
    Ok(message)
}

fn insert_tool_call(
    conn: &Connection,
    run_id: &str,
    name: &str,
    args_json: &str,
    result_json: &str,
) -> Result<ToolCallRow, StoreError> {
    let row = ToolCallRow {
        id: new_id(),
        run_id: run_id.to_string(),
        name: name.to_string(),
        args_json: args_json.to_string(),
        result_json: result_json.to_string(),
        created_at: now_iso(),
    };
    conn.execute(
        "INSERT INTO tool_calls (id, run_id, name, args_json, result_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            row.id,
            row.run_id,
            row.name,
            row.args_json,
            row.result_json,
            row.created_at
        ],
    )?;
    Ok(row)
}

impl Store {
    pub fn open_run(
        &self,
        task_id: &str,
        run_type: RunType,
        provider: &str,
        model: &str,
    ) -> Result<Run, StoreError> {
        let run = Run {
            id: new_id(),
            task_id: task_id.to_string(),
            phase_id: None,
            run_type: run_type.as_str().to_string(),
            provider: Some(provider.to_string()),
            model: Some(model.to_string()),
            started_at: now_iso(),
            ended_at: None,
        };
        self.conn().execute(
            "INSERT INTO runs (id, task_id, phase_id, run_type, provider, model, started_at, ended_at)
             VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, NULL)",
            params![
                run.id,
                run.task_id,
                run.run_type,
                run.provider,
                run.model,
                run.started_at
            ],
        )?;
        debug!(run_id = %run.id, run_type = %run.run_type, "opened run");
        Ok(run)
    }

    /// Set `ended_at`, making the run terminal. Closing twice is a no-op:
    /// the first timestamp wins.
    pub fn close_run(&self, run_id: &str) -> Result<(), StoreError> {
        let updated = self.conn().execute(
            "UPDATE runs SET ended_at = ?1 WHERE id = ?2 AND ended_at IS NULL",
            params![now_iso(), run_id],
        )?;
        if updated > 0 {
            debug!(run_id, "closed run");
        }
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> Result<Run, StoreError> {
        self.conn()
            .query_row(
                "SELECT id, task_id, phase_id, run_type, provider, model, started_at, ended_at
                 FROM runs WHERE id = ?1",
                [run_id],
                |row| {
                    Ok(Run {
                        id: row.get(0)?,
                        task_id: row.get(1)?,
                        phase_id: row.get(2)?,
                        run_type: row.get(3)?,
                        provider: row.get(4)?,
                        model: row.get(5)?,
                        started_at: row.get(6)?,
                        ended_at: row.get(7)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("run {run_id}")))
    }

    pub fn list_runs(&self, task_id: &str) -> Result<Vec<Run>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, task_id, phase_id, run_type, provider, model, started_at, ended_at
             FROM runs WHERE task_id = ?1 ORDER BY started_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([task_id], |row| {
            Ok(Run {
                id: row.get(0)?,
                task_id: row.get(1)?,
                phase_id: row.get(2)?,
                run_type: row.get(3)?,
                provider: row.get(4)?,
                model: row.get(5)?,
                started_at: row.get(6)?,
                ended_at: row.get(7)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Append one chat message to an open run.
    pub fn append_message(
        &self,
        run_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, StoreError> {
        let conn = self.conn();
        ensure_open(&conn, run_id)?;
        insert_message(&conn, run_id, role, content)
    }

    /// Append a tool-call row on its own, without a paired `tool` message.
    /// Used for checks the facade pre-runs outside the chat transcript.
    pub fn append_tool_call(
        &self,
        run_id: &str,
        name: &str,
        args_json: &str,
        result_json: &str,
    ) -> Result<ToolCallRow, StoreError> {
        let conn = self.conn();
        ensure_open(&conn, run_id)?;
        insert_tool_call(&conn, run_id, name, args_json, result_json)
    }

    /// Append one executed tool step: the tool-call row and the `tool`
    /// message the provider will observe, atomically.
    pub fn append_tool_step(
        &self,
        run_id: &str,
        name: &str,
        args_json: &str,
        result_json: &str,
        message_content: &str,
    ) -> Result<(ToolCallRow, Message), StoreError> {
        let mut conn = self.conn();
        ensure_open(&conn, run_id)?;
        let tx = conn.transaction()?;
        let call = insert_tool_call(&tx, run_id, name, args_json, result_json)?;
        let message = insert_message(&tx, run_id, Role::Tool, message_content)?;
        tx.commit()?;
        Ok((call, message))
    }

    pub fn list_messages(&self, run_id: &str) -> Result<Vec<Message>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, run_id, role, content, created_at
             FROM messages WHERE run_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([run_id], |row| {
            Ok(Message {
                id: row.get(0)?,
                run_id: row.get(1)?,
                role: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_tool_calls(&self, run_id: &str) -> Result<Vec<ToolCallRow>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, run_id, name, args_json, result_json, created_at
             FROM tool_calls WHERE run_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([run_id], |row| {
            Ok(ToolCallRow {
                id: row.get(0)?,
                run_id: row.get(1)?,
                name: row.get(2)?,
                args_json: row.get(3)?,
                result_json: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
