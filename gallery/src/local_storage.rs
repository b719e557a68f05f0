use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

pub const DEFAULT_LOCAL_STORAGE_FILENAME: &'static str = "gallery-storage.sqlite";

/// A tiny persistent string-to-string store, in the spirit of a browser's
/// `localStorage`.
pub struct LocalStorage {
    conn: Connection,
}

impl LocalStorage {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute(
            "
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            ",
            (),
        )?;
        Ok(LocalStorage { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        LocalStorage::new(Connection::open_in_memory()?)
    }

    pub fn get_item<T: AsRef<str>>(&self, key: T) -> Result<Option<String>> {
        let mut statement = self
            .conn
            .prepare_cached("SELECT value FROM local_storage WHERE key = ?1")?;
        Ok(statement
            .query_row([key.as_ref()], |row| row.get(0))
            .optional()?)
    }

    pub fn set_item<T: AsRef<str>, U: AsRef<str>>(&mut self, key: T, value: U) -> Result<()> {
        self.conn.execute(
            "
            INSERT INTO local_storage (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value=excluded.value
            ",
            (key.as_ref(), value.as_ref()),
        )?;
        Ok(())
    }

    pub fn remove_item<T: AsRef<str>>(&mut self, key: T) -> Result<()> {
        self.conn
            .execute("DELETE FROM local_storage WHERE key = ?1", [key.as_ref()])?;
        Ok(())
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut statement = self
            .conn
            .prepare_cached("SELECT key FROM local_storage ORDER BY key")?;
        let mut rows = statement.query(())?;
        let mut result = vec![];
        while let Some(row) = rows.next()? {
            result.push(row.get(0)?);
        }
        Ok(result)
    }

    /// Writes several items in one transaction.
    pub fn set_items<T: AsRef<str>, U: AsRef<str>>(&mut self, items: &[(T, U)]) -> Result<()> {
        let tx = self.conn.transaction()?;
        for (key, value) in items {
            tx.execute(
                "
                INSERT INTO local_storage (key, value) VALUES (?1, ?2)
                    ON CONFLICT(key) DO UPDATE SET value=excluded.value
                ",
                (key.as_ref(), value.as_ref()),
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
