use std::path::Path;

use chrono::{Local, NaiveDateTime};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};

use crate::types::{NewRun, Pool, TaskInstance, Workflow, WorkflowRun};
use crate::{MetadataError, Result};

/// Timestamp layout used by the orchestrator's SQLite backend.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Tables this crate reads and writes, in the orchestrator's layout.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS dag (
    dag_id VARCHAR(250) NOT NULL PRIMARY KEY,
    is_paused BOOLEAN,
    is_subdag BOOLEAN,
    is_active BOOLEAN,
    last_scheduler_run DATETIME,
    fileloc VARCHAR(2000),
    owners VARCHAR(2000)
);
CREATE TABLE IF NOT EXISTS dag_run (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    dag_id VARCHAR(250),
    execution_date DATETIME,
    state VARCHAR(50),
    run_id VARCHAR(250),
    external_trigger BOOLEAN,
    conf BLOB,
    end_date DATETIME,
    start_date DATETIME,
    UNIQUE (dag_id, execution_date),
    UNIQUE (dag_id, run_id)
);
CREATE TABLE IF NOT EXISTS task_instance (
    task_id VARCHAR(250) NOT NULL,
    dag_id VARCHAR(250) NOT NULL,
    execution_date DATETIME NOT NULL,
    start_date DATETIME,
    end_date DATETIME,
    duration FLOAT,
    state VARCHAR(20),
    try_number INTEGER,
    hostname VARCHAR(1000),
    pool VARCHAR(50),
    PRIMARY KEY (task_id, dag_id, execution_date)
);
CREATE TABLE IF NOT EXISTS slot_pool (
    id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
    pool VARCHAR(50) UNIQUE,
    slots INTEGER,
    description TEXT
);
";

/// Thin repository over the orchestrator's SQLite metadata database.
///
/// Each method is a single statement or a short read-modify-write; there are
/// no multi-record transactions. Thread-safe via an internal mutex.
pub struct MetadataStore {
    conn: Mutex<Connection>,
}

impl MetadataStore {
    /// Open an existing metadata database. The schema is left untouched and
    /// a missing file is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::from_connection(Connection::open_with_flags(path, flags)?)
    }

    /// Open the metadata database, creating the file and any missing tables.
    pub fn create(path: &Path) -> Result<Self> {
        let store = Self::from_connection(Connection::open(path)?)?;
        store.initialize()?;
        Ok(store)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database with the schema created (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create any missing tables.
    pub fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    // ── Workflows ───────────────────────────────────────────────────

    /// Insert or replace a workflow record.
    pub fn register_workflow(&self, workflow: &Workflow) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO dag (dag_id, is_paused, is_subdag, is_active, fileloc, owners)
             VALUES (?1, ?2, 0, ?3, ?4, ?5)",
            params![
                workflow.dag_id,
                workflow.is_paused,
                workflow.is_active,
                workflow.fileloc,
                workflow.owners
            ],
        )?;
        Ok(())
    }

    pub fn get_workflow(&self, dag_id: &str) -> Result<Option<Workflow>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT dag_id, is_paused, is_active, fileloc, owners FROM dag WHERE dag_id = ?1",
                params![dag_id],
                row_to_workflow,
            )
            .optional()?)
    }

    /// All workflows, ordered by id.
    pub fn list_workflows(&self) -> Result<Vec<Workflow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT dag_id, is_paused, is_active, fileloc, owners FROM dag ORDER BY dag_id",
        )?;
        let rows = stmt
            .query_map([], row_to_workflow)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Workflows whose definition was loaded from `fileloc`.
    pub fn workflows_for_file(&self, fileloc: &str) -> Result<Vec<Workflow>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT dag_id, is_paused, is_active, fileloc, owners FROM dag
             WHERE fileloc = ?1 ORDER BY dag_id",
        )?;
        let rows = stmt
            .query_map(params![fileloc], row_to_workflow)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Set the paused flag and return the updated record.
    pub fn set_paused(&self, dag_id: &str, is_paused: bool) -> Result<Workflow> {
        let updated = self.conn().execute(
            "UPDATE dag SET is_paused = ?1 WHERE dag_id = ?2",
            params![is_paused, dag_id],
        )?;
        if updated == 0 {
            return Err(MetadataError::NotFound(format!(
                "The DAG ID '{}' does not exist",
                dag_id
            )));
        }
        tracing::info!(dag_id, is_paused, "Updated paused state");

        self.get_workflow(dag_id)?.ok_or_else(|| {
            MetadataError::NotFound(format!("The DAG ID '{}' does not exist", dag_id))
        })
    }

    // ── Runs ────────────────────────────────────────────────────────

    /// Insert a run. Fails with `Duplicate` if the run id or execution date
    /// is already used for this workflow.
    pub fn create_run(&self, run: &NewRun) -> Result<WorkflowRun> {
        let conn = self.conn();

        let run_id_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM dag_run WHERE dag_id = ?1 AND run_id = ?2)",
            params![run.dag_id, run.run_id],
            |row| row.get(0),
        )?;
        if run_id_taken {
            return Err(MetadataError::Duplicate(format!(
                "Run id {} already exists for dag id {}",
                run.run_id, run.dag_id
            )));
        }

        let date_taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM dag_run WHERE dag_id = ?1 AND execution_date = ?2)",
            params![run.dag_id, format_dt(&run.execution_date)],
            |row| row.get(0),
        )?;
        if date_taken {
            return Err(MetadataError::Duplicate(format!(
                "A run already exists for dag id {} at execution date {}",
                run.dag_id,
                run.execution_date.format("%Y-%m-%dT%H:%M:%S")
            )));
        }

        let now = Local::now().naive_local();
        let conf = run.conf.as_ref().map(serde_json::to_string).transpose()?;
        conn.execute(
            "INSERT INTO dag_run (dag_id, execution_date, state, run_id, external_trigger, conf, start_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.dag_id,
                format_dt(&run.execution_date),
                run.state,
                run.run_id,
                run.external_trigger,
                conf,
                format_dt(&now)
            ],
        )?;

        Ok(WorkflowRun {
            id: conn.last_insert_rowid(),
            dag_id: run.dag_id.clone(),
            run_id: run.run_id.clone(),
            execution_date: run.execution_date,
            start_date: Some(now),
            end_date: None,
            state: Some(run.state.clone()),
            external_trigger: run.external_trigger,
            conf: run.conf.clone(),
        })
    }

    /// The run of `dag_id` at `execution_date`, if any.
    pub fn find_run(
        &self,
        dag_id: &str,
        execution_date: &NaiveDateTime,
    ) -> Result<Option<WorkflowRun>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, dag_id, run_id, execution_date, start_date, end_date, state, external_trigger, conf
                 FROM dag_run WHERE dag_id = ?1 AND execution_date = ?2",
                params![dag_id, format_dt(execution_date)],
                row_to_run,
            )
            .optional()?)
    }

    // ── Task instances ──────────────────────────────────────────────

    /// Insert or replace a task instance record.
    pub fn record_task_instance(&self, ti: &TaskInstance) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO task_instance (task_id, dag_id, execution_date, state, try_number, hostname)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ti.task_id,
                ti.dag_id,
                format_dt(&ti.execution_date),
                ti.state,
                ti.try_number,
                ti.hostname
            ],
        )?;
        Ok(())
    }

    /// Current state of a task instance; `None` if it never ran or has no state.
    pub fn task_state(
        &self,
        dag_id: &str,
        task_id: &str,
        execution_date: &NaiveDateTime,
    ) -> Result<Option<String>> {
        let state: Option<Option<String>> = self
            .conn()
            .query_row(
                "SELECT state FROM task_instance
                 WHERE dag_id = ?1 AND task_id = ?2 AND execution_date = ?3",
                params![dag_id, task_id, format_dt(execution_date)],
                |row| row.get(0),
            )
            .optional()?;
        Ok(state.flatten())
    }

    // ── Pools ───────────────────────────────────────────────────────

    pub fn get_pool(&self, name: &str) -> Result<Option<Pool>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT id, pool, slots, description FROM slot_pool WHERE pool = ?1",
                params![name],
                row_to_pool,
            )
            .optional()?)
    }

    /// Create or update a pool. Writes only when something changed; the
    /// returned flag reports whether a write happened.
    pub fn set_pool(&self, name: &str, slots: i64, description: &str) -> Result<(Pool, bool)> {
        match self.get_pool(name)? {
            Some(existing)
                if existing.slots == slots
                    && existing.description.as_deref() == Some(description) =>
            {
                Ok((existing, false))
            }
            Some(existing) => {
                self.conn().execute(
                    "UPDATE slot_pool SET slots = ?1, description = ?2 WHERE id = ?3",
                    params![slots, description, existing.id],
                )?;
                tracing::info!(pool = name, slots, "Updated pool");
                Ok((
                    Pool {
                        slots,
                        description: Some(description.to_string()),
                        ..existing
                    },
                    true,
                ))
            }
            None => {
                let conn = self.conn();
                conn.execute(
                    "INSERT INTO slot_pool (pool, slots, description) VALUES (?1, ?2, ?3)",
                    params![name, slots, description],
                )?;
                tracing::info!(pool = name, slots, "Created pool");
                Ok((
                    Pool {
                        id: conn.last_insert_rowid(),
                        pool: name.to_string(),
                        slots,
                        description: Some(description.to_string()),
                    },
                    true,
                ))
            }
        }
    }

    /// Remove a pool. Fails with `NotFound` if there is no such pool.
    pub fn delete_pool(&self, name: &str) -> Result<()> {
        let deleted = self
            .conn()
            .execute("DELETE FROM slot_pool WHERE pool = ?1", params![name])?;
        if deleted == 0 {
            return Err(MetadataError::NotFound(format!(
                "The {} record does not exist",
                name
            )));
        }
        tracing::info!(pool = name, "Deleted pool");
        Ok(())
    }
}

impl dagway_dispatch::WorkflowCatalog for MetadataStore {
    fn contains_workflow(&self, workflow_id: &str) -> dagway_dispatch::Result<bool> {
        self.get_workflow(workflow_id)
            .map(|w| w.is_some())
            .map_err(|e| dagway_dispatch::DispatchError::Catalog(e.to_string()))
    }

    fn workflow_ids(&self) -> dagway_dispatch::Result<Vec<String>> {
        self.list_workflows()
            .map(|ws| ws.into_iter().map(|w| w.dag_id).collect())
            .map_err(|e| dagway_dispatch::DispatchError::Catalog(e.to_string()))
    }
}

fn format_dt(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn parse_dt(s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_opt_dt(s: Option<String>) -> rusqlite::Result<Option<NaiveDateTime>> {
    s.as_deref().map(parse_dt).transpose()
}

fn row_to_workflow(row: &rusqlite::Row<'_>) -> rusqlite::Result<Workflow> {
    Ok(Workflow {
        dag_id: row.get(0)?,
        is_paused: row.get::<_, Option<bool>>(1)?.unwrap_or(false),
        is_active: row.get::<_, Option<bool>>(2)?.unwrap_or(false),
        fileloc: row.get(3)?,
        owners: row.get(4)?,
    })
}

fn row_to_run(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkflowRun> {
    let conf: Option<String> = row.get(8)?;
    Ok(WorkflowRun {
        id: row.get(0)?,
        dag_id: row.get(1)?,
        run_id: row.get(2)?,
        execution_date: parse_dt(&row.get::<_, String>(3)?)?,
        start_date: parse_opt_dt(row.get(4)?)?,
        end_date: parse_opt_dt(row.get(5)?)?,
        state: row.get(6)?,
        external_trigger: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
        conf: conf.and_then(|c| serde_json::from_str(&c).ok()),
    })
}

fn row_to_pool(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pool> {
    Ok(Pool {
        id: row.get(0)?,
        pool: row.get(1)?,
        slots: row.get::<_, Option<i64>>(2)?.unwrap_or(0),
        description: row.get(3)?,
    })
}
