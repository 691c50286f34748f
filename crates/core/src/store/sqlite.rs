//! SQLite-backed store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode};

use super::{
    BacklogFilter, BacklogStore, DailyCounter, DailyStats, IndexedTorrent, IndexedTorrentUpdate,
    PendingHash, PendingHashUpdate, StatsStore, StoreError, TorrentIndex,
};
use crate::infohash::InfoHash;

const BACKLOG_COLUMNS: &str = "id, infohash, hotness, failure_count, indexed, created_at";

const TORRENT_COLUMNS: &str = "id, infohash, title, total_size, file_count, hotness, files, \
     file_tree, search_tokens, view_count, created_time, indexed_time";

/// SQLite store for the backlog, the torrent index and daily stats.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            -- Discovered infohashes; seq preserves creation order
            CREATE TABLE IF NOT EXISTS backlog (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                infohash TEXT NOT NULL UNIQUE,
                hotness INTEGER NOT NULL DEFAULT 1,
                failure_count INTEGER NOT NULL DEFAULT 0,
                indexed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_backlog_pending
                ON backlog(indexed, failure_count, hotness DESC);

            -- Indexed torrents (one row per infohash)
            CREATE TABLE IF NOT EXISTS torrents (
                id TEXT PRIMARY KEY,
                infohash TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                total_size INTEGER NOT NULL,
                file_count INTEGER NOT NULL,
                hotness INTEGER NOT NULL DEFAULT 1,
                files TEXT NOT NULL,
                file_tree TEXT NOT NULL,
                search_tokens TEXT NOT NULL,
                view_count INTEGER NOT NULL DEFAULT 0,
                created_time TEXT NOT NULL,
                indexed_time TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_torrents_title ON torrents(title);

            -- Per-day counters, keyed YYYYMMDD
            CREATE TABLE IF NOT EXISTS daily_stats (
                day TEXT PRIMARY KEY,
                discovered INTEGER NOT NULL DEFAULT 0,
                ingested INTEGER NOT NULL DEFAULT 0
            );
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &BacklogFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(indexed) = filter.indexed {
            conditions.push("indexed = ?");
            params.push(Box::new(indexed));
        }

        if let Some(max_failures) = filter.max_failures {
            conditions.push("failure_count <= ?");
            params.push(Box::new(max_failures));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_pending(row: &rusqlite::Row) -> rusqlite::Result<PendingHash> {
        let created_at_str: String = row.get(5)?;

        Ok(PendingHash {
            id: row.get(0)?,
            infohash: read_infohash(row, 1)?,
            hotness: row.get(2)?,
            failure_count: row.get(3)?,
            indexed: row.get(4)?,
            created_at: parse_timestamp(&created_at_str),
        })
    }

    fn row_to_torrent(row: &rusqlite::Row) -> rusqlite::Result<IndexedTorrent> {
        let created_time_str: String = row.get(10)?;
        let indexed_time_str: String = row.get(11)?;

        Ok(IndexedTorrent {
            id: row.get(0)?,
            infohash: read_infohash(row, 1)?,
            title: row.get(2)?,
            total_size: row.get(3)?,
            file_count: row.get(4)?,
            hotness: row.get(5)?,
            files: read_json(row, 6)?,
            file_tree: read_json(row, 7)?,
            search_tokens: read_json(row, 8)?,
            view_count: row.get(9)?,
            created_time: parse_timestamp(&created_time_str),
            indexed_time: parse_timestamp(&indexed_time_str),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn read_infohash(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<InfoHash> {
    let raw: String = row.get(idx)?;
    InfoHash::parse(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn read_json<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Map an INSERT failure, turning unique violations into `Duplicate`.
fn insert_error(e: rusqlite::Error, infohash: &InfoHash) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Duplicate(infohash.to_string())
        }
        other => StoreError::Database(other.to_string()),
    }
}

/// Map a lookup failure, turning an empty result into `NotFound`.
fn lookup_error(e: rusqlite::Error, infohash: &InfoHash) -> StoreError {
    match e {
        rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(infohash.to_string()),
        other => StoreError::Database(other.to_string()),
    }
}

impl BacklogStore for SqliteStore {
    fn count(&self, filter: &BacklogFilter) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM backlog {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: u64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(count)
    }

    fn find_page(&self, filter: &BacklogFilter) -> Result<Vec<PendingHash>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!(
            "SELECT {} FROM backlog {} ORDER BY hotness DESC, seq ASC LIMIT ? OFFSET ?",
            BACKLOG_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_pending)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| StoreError::Database(e.to_string()))?);
        }
        Ok(entries)
    }

    fn get(&self, infohash: &InfoHash) -> Result<Option<PendingHash>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!("SELECT {} FROM backlog WHERE infohash = ?", BACKLOG_COLUMNS),
            params![infohash.as_str()],
            Self::row_to_pending,
        );

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn insert(&self, entry: &PendingHash) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "INSERT INTO backlog (id, infohash, hotness, failure_count, indexed, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                entry.id,
                entry.infohash.as_str(),
                entry.hotness,
                entry.failure_count,
                entry.indexed,
                entry.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| insert_error(e, &entry.infohash))?;

        Ok(())
    }

    fn update(&self, infohash: &InfoHash, update: &PendingHashUpdate) -> Result<(), StoreError> {
        let mut sets = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(indexed) = update.indexed {
            sets.push("indexed = ?");
            params.push(Box::new(indexed));
        }
        if let Some(failure_count) = update.failure_count {
            sets.push("failure_count = ?");
            params.push(Box::new(failure_count));
        }

        let conn = self.conn.lock().unwrap();

        let changed = if sets.is_empty() {
            conn.query_row(
                "SELECT COUNT(*) FROM backlog WHERE infohash = ?",
                params![infohash.as_str()],
                |row| row.get::<_, usize>(0),
            )
        } else {
            params.push(Box::new(infohash.as_str().to_string()));
            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            conn.execute(
                &format!("UPDATE backlog SET {} WHERE infohash = ?", sets.join(", ")),
                param_refs.as_slice(),
            )
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(StoreError::NotFound(infohash.to_string()));
        }
        Ok(())
    }

    fn increment_failures(&self, infohash: &InfoHash) -> Result<u32, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "UPDATE backlog SET failure_count = failure_count + 1 WHERE infohash = ? \
             RETURNING failure_count",
            params![infohash.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| lookup_error(e, infohash))
    }

    fn increment_hotness(&self, infohash: &InfoHash) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "UPDATE backlog SET hotness = hotness + 1 WHERE infohash = ? RETURNING hotness",
            params![infohash.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| lookup_error(e, infohash))
    }
}

impl TorrentIndex for SqliteStore {
    fn exists(&self, infohash: &InfoHash) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM torrents WHERE infohash = ?)",
                params![infohash.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(exists)
    }

    fn get(&self, infohash: &InfoHash) -> Result<Option<IndexedTorrent>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!("SELECT {} FROM torrents WHERE infohash = ?", TORRENT_COLUMNS),
            params![infohash.as_str()],
            Self::row_to_torrent,
        );

        match result {
            Ok(torrent) => Ok(Some(torrent)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(rusqlite::Error::FromSqlConversionFailure(_, _, e)) => {
                Err(StoreError::Serialization(e.to_string()))
            }
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }

    fn insert(&self, torrent: &IndexedTorrent) -> Result<(), StoreError> {
        let files = to_json(&torrent.files)?;
        let file_tree = to_json(&torrent.file_tree)?;
        let search_tokens = to_json(&torrent.search_tokens)?;

        let conn = self.conn.lock().unwrap();

        conn.execute(
            &format!(
                "INSERT INTO torrents ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                TORRENT_COLUMNS
            ),
            params![
                torrent.id,
                torrent.infohash.as_str(),
                torrent.title,
                torrent.total_size,
                torrent.file_count,
                torrent.hotness,
                files,
                file_tree,
                search_tokens,
                torrent.view_count,
                torrent.created_time.to_rfc3339(),
                torrent.indexed_time.to_rfc3339(),
            ],
        )
        .map_err(|e| insert_error(e, &torrent.infohash))?;

        Ok(())
    }

    fn update(
        &self,
        infohash: &InfoHash,
        update: &IndexedTorrentUpdate,
    ) -> Result<(), StoreError> {
        let mut sets = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref title) = update.title {
            sets.push("title = ?");
            params.push(Box::new(title.clone()));
        }
        if let Some(total_size) = update.total_size {
            sets.push("total_size = ?");
            params.push(Box::new(total_size));
        }
        if let Some(file_count) = update.file_count {
            sets.push("file_count = ?");
            params.push(Box::new(file_count));
        }
        if let Some(created_time) = update.created_time {
            sets.push("created_time = ?");
            params.push(Box::new(created_time.to_rfc3339()));
        }
        if let Some(indexed_time) = update.indexed_time {
            sets.push("indexed_time = ?");
            params.push(Box::new(indexed_time.to_rfc3339()));
        }

        let conn = self.conn.lock().unwrap();

        let changed = if sets.is_empty() {
            conn.query_row(
                "SELECT COUNT(*) FROM torrents WHERE infohash = ?",
                params![infohash.as_str()],
                |row| row.get::<_, usize>(0),
            )
        } else {
            params.push(Box::new(infohash.as_str().to_string()));
            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params.iter().map(|p| p.as_ref()).collect();
            conn.execute(
                &format!("UPDATE torrents SET {} WHERE infohash = ?", sets.join(", ")),
                param_refs.as_slice(),
            )
        }
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(StoreError::NotFound(infohash.to_string()));
        }
        Ok(())
    }

    fn increment_hotness(&self, infohash: &InfoHash) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "UPDATE torrents SET hotness = hotness + 1 WHERE infohash = ? RETURNING hotness",
            params![infohash.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| lookup_error(e, infohash))
    }

    fn increment_views(&self, infohash: &InfoHash) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "UPDATE torrents SET view_count = view_count + 1 WHERE infohash = ? \
             RETURNING view_count",
            params![infohash.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| lookup_error(e, infohash))
    }

    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row("SELECT COUNT(*) FROM torrents", [], |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl StatsStore for SqliteStore {
    fn increment(&self, day: &str, counter: DailyCounter) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();

        // Column names come from a closed enum, never from input.
        let column = counter.as_str();
        conn.execute(
            &format!(
                "INSERT INTO daily_stats (day, {column}) VALUES (?, 1) \
                 ON CONFLICT(day) DO UPDATE SET {column} = {column} + 1"
            ),
            params![day],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get(&self, day: &str) -> Result<Option<DailyStats>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            "SELECT day, discovered, ingested FROM daily_stats WHERE day = ?",
            params![day],
            |row| {
                Ok(DailyStats {
                    day: row.get(0)?,
                    discovered: row.get(1)?,
                    ingested: row.get(2)?,
                })
            },
        );

        match result {
            Ok(stats) => Ok(Some(stats)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_tree, FileEntry};

    fn create_test_store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn hash(c: char) -> InfoHash {
        InfoHash::parse(&c.to_string().repeat(40)).unwrap()
    }

    fn create_test_torrent(infohash: InfoHash) -> IndexedTorrent {
        let files = vec![
            FileEntry::new("docs/readme.txt", 10),
            FileEntry::new("docs/sub/data.bin", 20),
        ];
        let now = Utc::now();
        IndexedTorrent {
            id: uuid::Uuid::new_v4().to_string(),
            infohash,
            title: "docs".to_string(),
            total_size: 30,
            file_count: 2,
            hotness: 1,
            file_tree: build_tree(&files),
            files,
            search_tokens: vec!["docs".to_string()],
            view_count: 0,
            created_time: now,
            indexed_time: now,
        }
    }

    #[test]
    fn test_backlog_insert_and_get() {
        let store = create_test_store();
        let entry = PendingHash::new(hash('A'));
        BacklogStore::insert(&store, &entry).unwrap();

        let fetched = BacklogStore::get(&store, &hash('A')).unwrap().unwrap();
        assert_eq!(fetched.id, entry.id);
        assert_eq!(fetched.hotness, 1);
        assert_eq!(fetched.failure_count, 0);
        assert!(!fetched.indexed);

        assert!(BacklogStore::get(&store, &hash('B')).unwrap().is_none());
    }

    #[test]
    fn test_backlog_duplicate_insert() {
        let store = create_test_store();
        BacklogStore::insert(&store, &PendingHash::new(hash('A'))).unwrap();
        let err = BacklogStore::insert(&store, &PendingHash::new(hash('A'))).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[test]
    fn test_backlog_page_ordering() {
        let store = create_test_store();
        for c in ['A', 'B', 'C', 'D'] {
            BacklogStore::insert(&store, &PendingHash::new(hash(c))).unwrap();
        }
        store.increment_failures(&hash('A')).unwrap();
        BacklogStore::increment_hotness(&store, &hash('C')).unwrap();
        BacklogStore::increment_hotness(&store, &hash('C')).unwrap();
        BacklogStore::increment_hotness(&store, &hash('D')).unwrap();

        let page = store
            .find_page(&BacklogFilter::new().with_limit(10))
            .unwrap();
        let order: Vec<_> = page.iter().map(|p| p.infohash.clone()).collect();
        // Hottest first, ties by insertion order.
        assert_eq!(order, vec![hash('C'), hash('D'), hash('A'), hash('B')]);

        let second = store
            .find_page(&BacklogFilter::new().with_limit(2).with_offset(2))
            .unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].infohash, hash('A'));
    }

    #[test]
    fn test_backlog_eligibility_filter() {
        let store = create_test_store();
        for c in ['A', 'B', 'C'] {
            BacklogStore::insert(&store, &PendingHash::new(hash(c))).unwrap();
        }
        BacklogStore::update(&store, &hash('A'), &PendingHashUpdate::mark_indexed()).unwrap();
        for _ in 0..4 {
            store.increment_failures(&hash('B')).unwrap();
        }

        let eligible = BacklogFilter::eligible(3);
        assert_eq!(BacklogStore::count(&store, &eligible).unwrap(), 1);
        let page = store.find_page(&eligible).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].infohash, hash('C'));

        assert_eq!(BacklogStore::count(&store, &BacklogFilter::new()).unwrap(), 3);
    }

    #[test]
    fn test_increment_failures_returns_new_count() {
        let store = create_test_store();
        BacklogStore::insert(&store, &PendingHash::new(hash('A'))).unwrap();
        assert_eq!(store.increment_failures(&hash('A')).unwrap(), 1);
        assert_eq!(store.increment_failures(&hash('A')).unwrap(), 2);
        assert!(matches!(
            store.increment_failures(&hash('B')),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_backlog_update() {
        let store = create_test_store();
        BacklogStore::insert(&store, &PendingHash::new(hash('A'))).unwrap();

        let update = PendingHashUpdate {
            indexed: Some(true),
            failure_count: Some(0),
        };
        BacklogStore::update(&store, &hash('A'), &update).unwrap();
        let entry = BacklogStore::get(&store, &hash('A')).unwrap().unwrap();
        assert!(entry.indexed);

        assert!(matches!(
            BacklogStore::update(&store, &hash('B'), &update),
            Err(StoreError::NotFound(_))
        ));
        BacklogStore::update(&store, &hash('A'), &PendingHashUpdate::default()).unwrap();
    }

    #[test]
    fn test_torrent_insert_and_get() {
        let store = create_test_store();
        let torrent = create_test_torrent(hash('A'));
        TorrentIndex::insert(&store, &torrent).unwrap();

        assert!(store.exists(&hash('A')).unwrap());
        assert!(!store.exists(&hash('B')).unwrap());

        let fetched = TorrentIndex::get(&store, &hash('A')).unwrap().unwrap();
        assert_eq!(fetched.title, "docs");
        assert_eq!(fetched.total_size, 30);
        assert_eq!(fetched.files, torrent.files);
        assert_eq!(fetched.file_tree, torrent.file_tree);
        assert_eq!(fetched.search_tokens, vec!["docs"]);
        assert_eq!(TorrentIndex::count(&store).unwrap(), 1);
    }

    #[test]
    fn test_torrent_duplicate_insert() {
        let store = create_test_store();
        TorrentIndex::insert(&store, &create_test_torrent(hash('A'))).unwrap();
        let err = TorrentIndex::insert(&store, &create_test_torrent(hash('A'))).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(TorrentIndex::count(&store).unwrap(), 1);
    }

    #[test]
    fn test_torrent_update_and_counters() {
        let store = create_test_store();
        TorrentIndex::insert(&store, &create_test_torrent(hash('A'))).unwrap();

        let update = IndexedTorrentUpdate {
            title: Some("renamed".to_string()),
            ..IndexedTorrentUpdate::default()
        };
        TorrentIndex::update(&store, &hash('A'), &update).unwrap();
        assert_eq!(TorrentIndex::increment_hotness(&store, &hash('A')).unwrap(), 2);
        assert_eq!(store.increment_views(&hash('A')).unwrap(), 1);

        let fetched = TorrentIndex::get(&store, &hash('A')).unwrap().unwrap();
        assert_eq!(fetched.title, "renamed");
        assert_eq!(fetched.hotness, 2);
        assert_eq!(fetched.view_count, 1);

        assert!(matches!(
            store.increment_views(&hash('B')),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_daily_stats() {
        let store = create_test_store();
        assert!(StatsStore::get(&store, "20240101").unwrap().is_none());

        store.increment("20240101", DailyCounter::Ingested).unwrap();
        store.increment("20240101", DailyCounter::Ingested).unwrap();
        store.increment("20240101", DailyCounter::Discovered).unwrap();
        store.increment("20240102", DailyCounter::Discovered).unwrap();

        let day = StatsStore::get(&store, "20240101").unwrap().unwrap();
        assert_eq!(day.ingested, 2);
        assert_eq!(day.discovered, 1);

        let next = StatsStore::get(&store, "20240102").unwrap().unwrap();
        assert_eq!(next.ingested, 0);
        assert_eq!(next.discovered, 1);
    }

    #[test]
    fn test_file_based_store() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("magnetdex.db");

        {
            let store = SqliteStore::new(&db_path).unwrap();
            BacklogStore::insert(&store, &PendingHash::new(hash('A'))).unwrap();
        }
        assert!(db_path.exists());

        let reopened = SqliteStore::new(&db_path).unwrap();
        assert!(BacklogStore::get(&reopened, &hash('A')).unwrap().is_some());
    }
}
