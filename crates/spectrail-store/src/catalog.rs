//! Project and task catalog.
//!
//! Projects and tasks are owned by the host shell; the core only needs enough
//! of a surface to create fixtures and to resolve `project_id -> repo_path`
//! for tool execution. Richer CRUD stays out of this crate.

use crate::{Store, StoreError};
use rusqlite::{params, OptionalExtension};
use spectrail_core::{new_id, now_iso, Project, Task};

impl Store {
    pub fn create_project(&self, name: &str, repo_path: &str) -> Result<Project, StoreError> {
        let project = Project {
            id: new_id(),
            name: name.to_string(),
            repo_path: repo_path.to_string(),
            created_at: now_iso(),
            last_opened_at: None,
        };
        self.conn().execute(
            "INSERT INTO projects (id, name, repo_path, created_at, last_opened_at)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![project.id, project.name, project.repo_path, project.created_at],
        )?;
        Ok(project)
    }

    pub fn get_project(&self, project_id: &str) -> Result<Project, StoreError> {
        self.conn()
            .query_row(
                "SELECT id, name, repo_path, created_at, last_opened_at
                 FROM projects WHERE id = ?1",
                [project_id],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        repo_path: row.get(2)?,
                        created_at: row.get(3)?,
                        last_opened_at: row.get(4)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("project {project_id}")))
    }

    /// Stamp `last_opened_at`; called when a workflow touches the project.
    pub fn touch_project(&self, project_id: &str) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE projects SET last_opened_at = ?1 WHERE id = ?2",
            params![now_iso(), project_id],
        )?;
        Ok(())
    }

    pub fn create_task(
        &self,
        project_id: &str,
        title: &str,
        mode: &str,
    ) -> Result<Task, StoreError> {
        let stamp = now_iso();
        let task = Task {
            id: new_id(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            mode: mode.to_string(),
            status: "draft".to_string(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };
        self.conn().execute(
            "INSERT INTO tasks (id, project_id, title, mode, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                task.id,
                task.project_id,
                task.title,
                task.mode,
                task.status,
                task.created_at,
                task.updated_at
            ],
        )?;
        Ok(task)
    }

    pub fn get_task(&self, task_id: &str) -> Result<Task, StoreError> {
        self.conn()
            .query_row(
                "SELECT id, project_id, title, mode, status, created_at, updated_at
                 FROM tasks WHERE id = ?1",
                [task_id],
                |row| {
                    Ok(Task {
                        id: row.get(0)?,
                        project_id: row.get(1)?,
                        title: row.get(2)?,
                        mode: row.get(3)?,
                        status: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("task {task_id}")))
    }
}
