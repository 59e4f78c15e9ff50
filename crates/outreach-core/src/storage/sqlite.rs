//! SQLite-backed store. Records are kept as JSON bodies keyed by id.

use outreach_types::{Resource, ResourceKind, WorkItem};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

use super::{ResourceStore, WorkItemStore};
use crate::error::AppResult;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the schema exists.
    pub fn open(path: &Path) -> AppResult<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS resources (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_resources_kind ON resources (kind);
            CREATE TABLE IF NOT EXISTS work_items (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_work_items_state ON work_items (state);",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl ResourceStore for SqliteStore {
    fn load_resources(&self, kind: ResourceKind) -> AppResult<Vec<Resource>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT body FROM resources WHERE kind = ?1 ORDER BY id")?;
        let bodies = stmt
            .query_map(params![kind.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut resources = Vec::with_capacity(bodies.len());
        for body in bodies {
            resources.push(serde_json::from_str(&body)?);
        }
        Ok(resources)
    }

    fn save_resource(&self, resource: &Resource) -> AppResult<()> {
        let body = serde_json::to_string(resource)?;
        self.conn.lock().execute(
            "INSERT INTO resources (id, kind, body, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET kind = excluded.kind, body = excluded.body,
                updated_at = excluded.updated_at",
            params![resource.id, resource.kind().to_string(), body, chrono::Utc::now().timestamp()],
        )?;
        Ok(())
    }

    fn delete_resource(&self, id: &str) -> AppResult<()> {
        self.conn.lock().execute("DELETE FROM resources WHERE id = ?1", params![id])?;
        Ok(())
    }
}

impl WorkItemStore for SqliteStore {
    fn load_work_items(&self) -> AppResult<Vec<WorkItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT body FROM work_items ORDER BY id")?;
        let bodies = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut items = Vec::with_capacity(bodies.len());
        for body in bodies {
            items.push(serde_json::from_str(&body)?);
        }
        Ok(items)
    }

    fn save_work_item(&self, item: &WorkItem) -> AppResult<()> {
        let body = serde_json::to_string(item)?;
        self.conn.lock().execute(
            "INSERT INTO work_items (id, state, body, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET state = excluded.state, body = excluded.body,
                updated_at = excluded.updated_at",
            params![item.id, item.state.to_string(), body, item.updated_at.timestamp()],
        )?;
        Ok(())
    }

    fn delete_work_item(&self, id: &str) -> AppResult<()> {
        self.conn.lock().execute("DELETE FROM work_items WHERE id = ?1", params![id])?;
        Ok(())
    }
}
