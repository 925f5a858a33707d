use crate::playback::{PlayMode, QueueSnapshot, SessionStore};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

const KEY_PLAY_MODE: &str = "play_mode";
const KEY_QUEUE: &str = "queue_snapshot";

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory db")?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS kv (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS lyrics_cache (
  track_id TEXT PRIMARY KEY,
  lrc_content TEXT NOT NULL,
  fetched_at INTEGER NOT NULL
);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO kv(key, value, updated_at)
VALUES(?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value=excluded.value,
  updated_at=excluded.updated_at
"#,
                params![key, value, now_unix()],
            )
            .with_context(|| format!("store {key}"))?;
        Ok(())
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key=?1", params![key], |row| row.get(0))
            .optional()
            .with_context(|| format!("read {key}"))
    }

    pub fn cache_lyrics(&self, track_id: &str, lrc_content: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO lyrics_cache(track_id, lrc_content, fetched_at)
VALUES(?1, ?2, ?3)
ON CONFLICT(track_id) DO UPDATE SET
  lrc_content=excluded.lrc_content,
  fetched_at=excluded.fetched_at
"#,
                params![track_id, lrc_content, now_unix()],
            )
            .context("cache lyrics")?;
        Ok(())
    }

    pub fn get_lyrics(&self, track_id: &str) -> anyhow::Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT lrc_content FROM lyrics_cache WHERE track_id=?1",
                params![track_id],
                |row| row.get(0),
            )
            .optional()
            .context("read cached lyrics")
    }
}

impl SessionStore for Storage {
    fn save_queue_snapshot(&self, snapshot: &QueueSnapshot) -> anyhow::Result<()> {
        let json = serde_json::to_string(snapshot).context("serialize queue snapshot")?;
        self.put(KEY_QUEUE, &json)
    }

    fn load_queue_snapshot(&self) -> anyhow::Result<Option<QueueSnapshot>> {
        self.get(KEY_QUEUE)?
            .map(|json| serde_json::from_str(&json).context("parse queue snapshot"))
            .transpose()
    }

    fn save_play_mode(&self, mode: PlayMode) -> anyhow::Result<()> {
        let json = serde_json::to_string(&mode).context("serialize play mode")?;
        self.put(KEY_PLAY_MODE, &json)
    }

    fn load_play_mode(&self) -> anyhow::Result<Option<PlayMode>> {
        self.get(KEY_PLAY_MODE)?
            .map(|json| serde_json::from_str(&json).context("parse play mode"))
            .transpose()
    }
}

// rusqlite connections are not Sync: async tasks open one per operation
// inside spawn_blocking.
#[derive(Debug, Clone)]
pub struct StorageHandle {
    path: PathBuf,
}

impl StorageHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn open(&self) -> anyhow::Result<Storage> {
        Storage::open(&self.path)
    }

    pub fn get_lyrics(&self, track_id: &str) -> anyhow::Result<Option<String>> {
        self.open()?.get_lyrics(track_id)
    }

    pub fn cache_lyrics(&self, track_id: &str, lrc_content: &str) -> anyhow::Result<()> {
        self.open()?.cache_lyrics(track_id, lrc_content)
    }
}

fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
