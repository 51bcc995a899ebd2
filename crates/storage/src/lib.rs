use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::RwLock;
use publicsphere_core::{MessageRecord, ResponsePayload, Role};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

/// Lookup key for one transcript: a user's session within one scenario.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptKey<'a> {
    pub user_id: &'a str,
    pub session_id: &'a str,
    pub scenario: &'a str,
}

impl TranscriptKey<'_> {
    fn matches(&self, record: &MessageRecord) -> bool {
        record.user_id == self.user_id
            && record.session_id == self.session_id
            && record.scenario == self.scenario
    }
}

pub trait TranscriptRepository: Send + Sync {
    async fn append_message(&self, record: &MessageRecord) -> Result<()>;
    /// Records for the key, oldest first; ties keep insertion order.
    async fn load_transcript(&self, key: TranscriptKey<'_>) -> Result<Vec<MessageRecord>>;
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    messages: Arc<RwLock<Vec<MessageRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptRepository for MemoryStore {
    async fn append_message(&self, record: &MessageRecord) -> Result<()> {
        self.messages.write().push(record.clone());
        Ok(())
    }

    async fn load_transcript(&self, key: TranscriptKey<'_>) -> Result<Vec<MessageRecord>> {
        let mut transcript = self
            .messages
            .read()
            .iter()
            .filter(|record| key.matches(record))
            .cloned()
            .collect::<Vec<_>>();
        transcript.sort_by_key(|record| record.created_at);
        Ok(transcript)
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut removed = 0_u64;
        self.messages.write().retain(|record| {
            let keep = record.created_at >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });

        Ok(removed)
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url {}", database_url))?
            .create_if_missing(true);
        let pool = pool_options(database_url)
            .connect_with(options)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
              seq INTEGER PRIMARY KEY AUTOINCREMENT,
              message_id TEXT NOT NULL UNIQUE,
              user_id TEXT NOT NULL,
              session_id TEXT NOT NULL,
              scenario TEXT NOT NULL,
              role TEXT NOT NULL,
              content TEXT NOT NULL,
              payload_json TEXT,
              created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_transcript
              ON messages (user_id, session_id, scenario, created_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn pool_options(database_url: &str) -> SqlitePoolOptions {
    if database_url.contains(":memory:") {
        // Every connection to `:memory:` opens its own database, and closing
        // the only one drops it.
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    // Fixed-width so text ordering in sqlite matches time ordering.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_from_row(row: &SqliteRow) -> Result<MessageRecord> {
    let role_code: String = row.get("role");
    let role = Role::parse(&role_code).ok_or_else(|| anyhow!("unknown role `{}`", role_code))?;

    let payload_json: Option<String> = row.get("payload_json");
    let payload = payload_json
        .map(|json| serde_json::from_str::<ResponsePayload>(&json))
        .transpose()
        .context("stored payload is not valid json")?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .with_context(|| format!("bad created_at `{}`", created_at))?
        .with_timezone(&Utc);

    Ok(MessageRecord {
        message_id: row.get("message_id"),
        user_id: row.get("user_id"),
        session_id: row.get("session_id"),
        scenario: row.get("scenario"),
        role,
        content: row.get("content"),
        payload,
        created_at,
    })
}

impl TranscriptRepository for SqliteStore {
    async fn append_message(&self, record: &MessageRecord) -> Result<()> {
        let payload_json = record
            .payload
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO messages
              (message_id, user_id, session_id, scenario, role, content, payload_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&record.message_id)
        .bind(&record.user_id)
        .bind(&record.session_id)
        .bind(&record.scenario)
        .bind(record.role.as_code())
        .bind(&record.content)
        .bind(payload_json)
        .bind(format_timestamp(record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_transcript(&self, key: TranscriptKey<'_>) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT message_id, user_id, session_id, scenario, role, content, payload_json, created_at
            FROM messages
            WHERE user_id = ?1 AND session_id = ?2 AND scenario = ?3
            ORDER BY created_at, seq
            "#,
        )
        .bind(key.user_id)
        .bind(key.session_id)
        .bind(key.scenario)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE created_at < ?1")
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl TranscriptRepository for Store {
    async fn append_message(&self, record: &MessageRecord) -> Result<()> {
        match self {
            Store::Memory(store) => store.append_message(record).await,
            Store::Sqlite(store) => store.append_message(record).await,
        }
    }

    async fn load_transcript(&self, key: TranscriptKey<'_>) -> Result<Vec<MessageRecord>> {
        match self {
            Store::Memory(store) => store.load_transcript(key).await,
            Store::Sqlite(store) => store.load_transcript(key).await,
        }
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        match self {
            Store::Memory(store) => store.purge_before(cutoff).await,
            Store::Sqlite(store) => store.purge_before(cutoff).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(id: &str, session: &str, role: Role, at: DateTime<Utc>) -> MessageRecord {
        MessageRecord {
            message_id: id.to_string(),
            user_id: "user-1".to_string(),
            session_id: session.to_string(),
            scenario: "tax".to_string(),
            role,
            content: format!("content {id}"),
            payload: match role {
                Role::User => None,
                Role::Assistant => Some(ResponsePayload::text_only(format!("reply {id}"))),
            },
            created_at: at,
        }
    }

    const KEY: TranscriptKey<'static> = TranscriptKey {
        user_id: "user-1",
        session_id: "s1",
        scenario: "tax",
    };

    async fn exercise_ordering_and_filtering(store: &Store) {
        let now = Utc::now();
        store
            .append_message(&record("b", "s1", Role::Assistant, now))
            .await
            .unwrap();
        store
            .append_message(&record("a", "s1", Role::User, now - Duration::seconds(5)))
            .await
            .unwrap();
        store
            .append_message(&record("c", "s1", Role::User, now))
            .await
            .unwrap();
        store
            .append_message(&record("other", "s2", Role::User, now))
            .await
            .unwrap();

        let transcript = store.load_transcript(KEY).await.unwrap();
        let ids = transcript
            .iter()
            .map(|record| record.message_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            transcript[1].payload.as_ref().map(|p| p.text.as_str()),
            Some("reply b")
        );

        let other_scenario = store
            .load_transcript(TranscriptKey {
                scenario: "housing",
                ..KEY
            })
            .await
            .unwrap();
        assert!(other_scenario.is_empty());
    }

    #[tokio::test]
    async fn memory_transcripts_are_filtered_and_ordered() {
        exercise_ordering_and_filtering(&Store::memory()).await;
    }

    #[tokio::test]
    async fn sqlite_transcripts_are_filtered_and_ordered() {
        let store = Store::sqlite("sqlite::memory:").await.unwrap();
        exercise_ordering_and_filtering(&store).await;
    }

    #[test]
    fn in_memory_pool_keeps_its_single_connection() {
        let options = pool_options("sqlite::memory:");
        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert!(options.get_idle_timeout().is_none());
        assert!(options.get_max_lifetime().is_none());

        let options = pool_options("sqlite://transcripts.db");
        assert_eq!(options.get_max_connections(), 5);
        assert!(options.get_idle_timeout().is_some());
    }

    #[tokio::test]
    async fn purge_drops_only_old_records() {
        let now = Utc::now();
        for store in [Store::memory(), Store::sqlite("sqlite::memory:").await.unwrap()] {
            store
                .append_message(&record("old", "s1", Role::User, now - Duration::days(40)))
                .await
                .unwrap();
            store
                .append_message(&record("new", "s1", Role::User, now))
                .await
                .unwrap();

            let removed = store.purge_before(now - Duration::days(30)).await.unwrap();
            assert_eq!(removed, 1, "backend {}", store.backend_name());

            let remaining = store.load_transcript(KEY).await.unwrap();
            assert_eq!(remaining.len(), 1);
            assert_eq!(remaining[0].message_id, "new");
        }
    }
}
