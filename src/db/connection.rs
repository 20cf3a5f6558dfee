use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use crate::errors::AstraError;

pub struct Database {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(path: &str) -> Result<Self, AstraError> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AstraError::Database(format!("Failed to open database: {}", e)))?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| AstraError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self, AstraError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AstraError::Database(format!("Failed to open in-memory db: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| AstraError::Database(format!("Failed to set pragmas: {}", e)))?;
        let db = Self { conn: Arc::new(Mutex::new(conn)) };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<(), AstraError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(super::schema::CREATE_TABLES)
            .map_err(|e| AstraError::Database(format!("Failed to create tables: {}", e)))?;
        Ok(())
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self { conn: self.conn.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_database_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("astra.db");
        let path = path.to_str().unwrap();

        let db = Database::new(path).unwrap();
        db.conn.lock().unwrap().execute(
            "INSERT INTO scan_targets (id, company_id, name, target_type, target_value, created_at) \
             VALUES ('t1', 'acme', 'edge', 'ip_address', '10.0.0.5', '2024-01-01T00:00:00Z')",
            [],
        ).unwrap();
        drop(db);

        let reopened = Database::new(path).unwrap();
        let name: String = reopened.conn.lock().unwrap().query_row(
            "SELECT name FROM scan_targets WHERE id = 't1'",
            [],
            |row| row.get(0),
        ).unwrap();
        assert_eq!(name, "edge");
    }

    #[test]
    fn test_new_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("astra.db");
        assert!(Database::new(nested.to_str().unwrap()).is_ok());
        assert!(nested.exists());
    }
}
