//! SQLite implementation of the task/event link store.
//!
//! # Responsibility
//! - Persist `TaskEventLink` records and their ordered event pairs.
//! - Keep every multi-row mutation inside one transaction.
//!
//! # Invariants
//! - Event pairs are returned in insertion order.
//! - Appending an existing pair is a no-op and keeps its position.
//! - Mutations on a missing link fail with `StoreError::NotFound`.

use crate::db::migrations::ensure_schema_current;
use crate::db::{DbError, DbResult};
use crate::model::link::{EventRef, TaskEventLink};
use crate::store::{LinkStore, StoreError, StoreResult};
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

/// SQLite-backed link store over a migrated connection.
pub struct SqliteLinkStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLinkStore<'conn> {
    /// Creates a store from a connection returned by `open_db*`.
    ///
    /// # Errors
    /// - `DbError::SchemaNotReady` when migrations have not been applied.
    pub fn try_new(conn: &'conn Connection) -> DbResult<Self> {
        ensure_schema_current(conn)?;
        Ok(Self { conn })
    }

    /// Finds the task owning `event`, if any link references it.
    pub fn find_task_by_event(&self, event: &EventRef) -> StoreResult<Option<String>> {
        let task_id = self
            .conn
            .query_row(
                "SELECT task_id
                 FROM task_event_link_events
                 WHERE event_id = ?1 AND calendar_id = ?2
                 ORDER BY task_id ASC
                 LIMIT 1;",
                params![event.event_id, event.calendar_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(task_id)
    }
}

impl LinkStore for SqliteLinkStore<'_> {
    fn put(&self, link: &TaskEventLink) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO task_event_links (task_id, task_list_id, created_at, last_updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (task_id) DO UPDATE SET
                task_list_id = excluded.task_list_id,
                created_at = excluded.created_at,
                last_updated_at = excluded.last_updated_at;",
            params![
                link.task_id,
                link.task_list_id,
                link.created_at.timestamp_millis(),
                link.last_updated_at.timestamp_millis(),
            ],
        )?;
        tx.execute(
            "DELETE FROM task_event_link_events WHERE task_id = ?1;",
            [link.task_id.as_str()],
        )?;
        for (position, event) in link.links.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO task_event_link_events
                    (task_id, event_id, calendar_id, position)
                 VALUES (?1, ?2, ?3, ?4);",
                params![link.task_id, event.event_id, event.calendar_id, position as i64],
            )?;
        }
        tx.commit()?;

        debug!(
            "event=link_put module=link_store status=ok events={}",
            link.links.len()
        );
        Ok(())
    }

    fn get(&self, task_id: &str) -> StoreResult<Option<TaskEventLink>> {
        let header = self
            .conn
            .query_row(
                "SELECT task_id, task_list_id, created_at, last_updated_at
                 FROM task_event_links
                 WHERE task_id = ?1;",
                [task_id],
                read_header,
            )
            .optional()?;

        match header {
            Some(header) => Ok(Some(load_link(self.conn, header)?)),
            None => Ok(None),
        }
    }

    fn append_event_link(&self, task_id: &str, event: &EventRef) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        if !link_exists(&tx, task_id)? {
            return Err(StoreError::not_found(format!("link for task {task_id}")));
        }

        tx.execute(
            "INSERT OR IGNORE INTO task_event_link_events
                (task_id, event_id, calendar_id, position)
             SELECT ?1, ?2, ?3, COALESCE(MAX(position) + 1, 0)
             FROM task_event_link_events
             WHERE task_id = ?1;",
            params![task_id, event.event_id, event.calendar_id],
        )?;
        touch(&tx, task_id)?;
        tx.commit()?;
        Ok(())
    }

    fn remove_event_link(&self, task_id: &str, event: &EventRef) -> StoreResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        if !link_exists(&tx, task_id)? {
            return Err(StoreError::not_found(format!("link for task {task_id}")));
        }

        let removed = tx.execute(
            "DELETE FROM task_event_link_events
             WHERE task_id = ?1 AND event_id = ?2 AND calendar_id = ?3;",
            params![task_id, event.event_id, event.calendar_id],
        )?;
        if removed > 0 {
            touch(&tx, task_id)?;
        }
        tx.commit()?;
        Ok(removed > 0)
    }

    fn delete(&self, task_id: &str) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM task_event_link_events WHERE task_id = ?1;",
            [task_id],
        )?;
        let deleted = tx.execute("DELETE FROM task_event_links WHERE task_id = ?1;", [task_id])?;
        if deleted == 0 {
            return Err(StoreError::not_found(format!("link for task {task_id}")));
        }
        tx.commit()?;
        Ok(())
    }

    fn list_all(&self) -> StoreResult<Vec<TaskEventLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_id, task_list_id, created_at, last_updated_at
             FROM task_event_links
             ORDER BY task_id ASC;",
        )?;
        let headers = stmt
            .query_map([], read_header)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut links = Vec::with_capacity(headers.len());
        for header in headers {
            links.push(load_link(self.conn, header)?);
        }
        Ok(links)
    }
}

struct LinkHeader {
    task_id: String,
    task_list_id: String,
    created_at: i64,
    last_updated_at: i64,
}

fn read_header(row: &rusqlite::Row<'_>) -> rusqlite::Result<LinkHeader> {
    Ok(LinkHeader {
        task_id: row.get("task_id")?,
        task_list_id: row.get("task_list_id")?,
        created_at: row.get("created_at")?,
        last_updated_at: row.get("last_updated_at")?,
    })
}

fn load_link(conn: &Connection, header: LinkHeader) -> StoreResult<TaskEventLink> {
    let mut stmt = conn.prepare(
        "SELECT event_id, calendar_id
         FROM task_event_link_events
         WHERE task_id = ?1
         ORDER BY position ASC, event_id ASC;",
    )?;
    let links = stmt
        .query_map([header.task_id.as_str()], |row| {
            Ok(EventRef::new(
                row.get::<_, String>("event_id")?,
                row.get::<_, String>("calendar_id")?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(TaskEventLink {
        created_at: millis_to_utc(header.created_at, "created_at")?,
        last_updated_at: millis_to_utc(header.last_updated_at, "last_updated_at")?,
        task_id: header.task_id,
        task_list_id: header.task_list_id,
        links,
    })
}

fn link_exists(conn: &Connection, task_id: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM task_event_links WHERE task_id = ?1);",
        [task_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn touch(conn: &Connection, task_id: &str) -> StoreResult<()> {
    conn.execute(
        "UPDATE task_event_links
         SET last_updated_at = MAX(created_at, ?2)
         WHERE task_id = ?1;",
        params![task_id, Utc::now().timestamp_millis()],
    )?;
    Ok(())
}

fn millis_to_utc(value: i64, column: &str) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(value).single().ok_or_else(|| {
        StoreError::Db(DbError::Corrupt(format!(
            "invalid {column} value `{value}` in task_event_links"
        )))
    })
}
