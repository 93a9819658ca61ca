// 🗄️ Embedded Store
// SQLite schema, seed import and queries behind the REST server, plus
// `SqliteStore`, which serves the same contract in-process for offline use.

use crate::api::{
    DashboardOverview, RemoteStore, StatusHistoryEntry, StatusUpdateRequest, StatusUpdateResponse,
};
use crate::entity::{CountScope, Entity, EntityKey, EntityQuery};
use crate::error::{Result, TrackerError};
use crate::status::{Status, StatusCounts};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const DEFAULT_CATEGORY: &str = "Other";
const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// SQL CONVERSIONS
// ============================================================================

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    value.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Entities (billers, ISPs, MFIs share one id space)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT 'Other',
            status TEXT NOT NULL DEFAULT 'not_started',
            web TEXT,
            is_top_50 INTEGER NOT NULL DEFAULT 0,
            integration_date TEXT,
            onboarding_date TEXT,
            updated_at TEXT NOT NULL,
            UNIQUE(name, category)
        )",
        [],
    )?;

    // ==========================================================================
    // Status history (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS status_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id INTEGER NOT NULL REFERENCES entities(id),
            entity_name TEXT NOT NULL,
            old_status TEXT,
            new_status TEXT NOT NULL,
            changed_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entities_category ON entities(category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_entities_status ON entities(status)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_history_entity ON status_history(entity_id, changed_at)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// SEED IMPORT
// ============================================================================

/// One spreadsheet row: `Name,Category,Status,Web,Top50`
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntity {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Category", default)]
    pub category: String,

    #[serde(rename = "Status", default)]
    pub status: String,

    #[serde(rename = "Web", default)]
    pub web: String,

    #[serde(rename = "Top50", default)]
    pub top_50: String,
}

impl SeedEntity {
    pub fn new(name: &str, category: &str, status: &str) -> Self {
        SeedEntity {
            name: name.to_string(),
            category: category.to_string(),
            status: status.to_string(),
            web: String::new(),
            top_50: String::new(),
        }
    }

    pub fn category(&self) -> &str {
        match self.category.trim() {
            "" => DEFAULT_CATEGORY,
            c => c,
        }
    }

    /// Blank means not started; labels ("Go Live") are accepted
    pub fn status(&self) -> Result<Status> {
        if self.status.trim().is_empty() {
            return Ok(Status::NotStarted);
        }
        self.status.parse().map_err(TrackerError::Validation)
    }

    pub fn is_top_50(&self) -> bool {
        matches!(
            self.top_50.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "x"
        )
    }

    fn web(&self) -> Option<&str> {
        Some(self.web.trim()).filter(|w| !w.is_empty())
    }
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<SeedEntity>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(csv_path)?;

    let mut seeds = Vec::new();
    for result in rdr.deserialize() {
        let seed: SeedEntity = result?;
        if seed.name.trim().is_empty() {
            continue;
        }
        seeds.push(seed);
    }

    tracing::info!(path = %csv_path.display(), rows = seeds.len(), "seed file loaded");
    Ok(seeds)
}

/// Insert seed rows; `(name, category)` pairs already present are skipped
pub fn insert_entities(conn: &Connection, seeds: &[SeedEntity]) -> Result<usize> {
    let mut inserted = 0;
    let mut duplicates = 0;
    let now = Utc::now().to_rfc3339();

    for seed in seeds {
        let result = conn.execute(
            "INSERT INTO entities (name, category, status, web, is_top_50, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                seed.name.trim(),
                seed.category(),
                seed.status()?,
                seed.web(),
                seed.is_top_50(),
                now,
            ],
        );

        match result {
            Ok(_) => inserted += 1,
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                duplicates += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::info!(inserted, duplicates, "entities imported");
    Ok(inserted)
}

// ============================================================================
// QUERIES
// ============================================================================

const ENTITY_COLUMNS: &str = "id, name, category, status, web, is_top_50, integration_date, onboarding_date";

fn row_to_entity(row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: EntityKey(row.get(0)?),
        name: row.get(1)?,
        category: row.get(2)?,
        status: row.get(3)?,
        web: row.get(4)?,
        is_top_50: row.get(5)?,
        integration_date: parse_date(row.get(6)?),
        onboarding_date: parse_date(row.get(7)?),
    })
}

/// Make `%`, `_` and the escape char itself match literally under `ESCAPE '\'`
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Filtered list ordered by name. `all` / blank filters are ignored.
pub fn query_entities(conn: &Connection, query: &EntityQuery) -> Result<Vec<Entity>> {
    let status = query
        .status_filter()
        .map(|s| s.parse::<Status>().map_err(TrackerError::Validation))
        .transpose()?;

    let sql = format!(
        "SELECT {ENTITY_COLUMNS}
         FROM entities
         WHERE (?1 IS NULL OR name LIKE '%' || ?1 || '%' ESCAPE '\\')
           AND (?2 IS NULL OR category = ?2)
           AND (?3 IS NULL OR status = ?3)
           AND (?4 = 0 OR is_top_50 = 1)
         ORDER BY name COLLATE NOCASE, id"
    );

    let search = query.search_term().map(escape_like);

    let mut stmt = conn.prepare(&sql)?;
    let entities = stmt
        .query_map(
            params![search, query.category_filter(), status, query.top_50],
            row_to_entity,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entities)
}

pub fn get_entity(conn: &Connection, key: EntityKey) -> Result<Option<Entity>> {
    let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1");
    let entity = conn
        .query_row(&sql, params![key.0], row_to_entity)
        .optional()?;
    Ok(entity)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
    Ok(count)
}

pub fn status_counts(conn: &Connection, scope: &CountScope) -> Result<StatusCounts> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*)
         FROM entities
         WHERE (?1 IS NULL OR category = ?1)
           AND (?2 = 0 OR is_top_50 = 1)
         GROUP BY status",
    )?;

    let mut counts = StatusCounts::default();
    let rows = stmt.query_map(params![scope.category_filter(), scope.top_50], |row| {
        Ok((row.get::<_, Status>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (status, count) = row?;
        match status {
            Status::NotStarted => counts.not_started = count,
            Status::InProgress => counts.in_progress = count,
            Status::GoLive => counts.go_live = count,
        }
    }

    Ok(counts)
}

pub fn categories(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT category FROM entities ORDER BY category")?;
    let categories = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(categories)
}

/// Totals plus ISP/MFI rows that have not gone live
pub fn dashboard_overview(conn: &Connection) -> Result<DashboardOverview> {
    let (target_count, unavailable_isp, unavailable_mfi, last_updated) = conn.query_row(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN category = 'ISP' AND status != 'go_live' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN category = 'MFI' AND status != 'go_live' THEN 1 ELSE 0 END), 0),
            MAX(updated_at)
         FROM entities",
        [],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        },
    )?;

    Ok(DashboardOverview {
        target_count,
        unavailable_isp,
        unavailable_mfi,
        last_updated: last_updated.as_deref().and_then(parse_timestamp),
        trend: None,
    })
}

// ============================================================================
// STATUS UPDATES
// ============================================================================

/// Validate, update the row and append a history entry in one transaction.
/// Errors: Validation (bad payload), NotFound, Conflict (leaving go_live).
pub fn update_status(
    conn: &mut Connection,
    key: EntityKey,
    update: &StatusUpdateRequest,
) -> Result<StatusUpdateResponse> {
    update.validate()?;

    let tx = conn.transaction()?;
    let current = get_entity(&tx, key)?.ok_or(TrackerError::NotFound(key))?;

    if !current.status.can_transition_to(update.status) {
        return Err(TrackerError::Conflict(format!(
            "{} is already live and cannot move to {}",
            current.name,
            update.status.label()
        )));
    }

    let now = Utc::now();
    let (integration_date, onboarding_date) = match update.dates() {
        Some(d) => (
            Some(d.integration_date.format(DATE_FORMAT).to_string()),
            Some(d.onboarding_date.format(DATE_FORMAT).to_string()),
        ),
        None if update.status == Status::GoLive => (
            current.integration_date.map(|d| d.format(DATE_FORMAT).to_string()),
            current.onboarding_date.map(|d| d.format(DATE_FORMAT).to_string()),
        ),
        None => (None, None),
    };

    tx.execute(
        "UPDATE entities
         SET status = ?1, integration_date = ?2, onboarding_date = ?3, updated_at = ?4
         WHERE id = ?5",
        params![update.status, integration_date, onboarding_date, now.to_rfc3339(), key.0],
    )?;

    tx.execute(
        "INSERT INTO status_history (entity_id, entity_name, old_status, new_status, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![key.0, current.name, current.status, update.status, now.to_rfc3339()],
    )?;
    let history_id = tx.last_insert_rowid();

    let entity = get_entity(&tx, key)?.ok_or(TrackerError::NotFound(key))?;
    tx.commit()?;

    let crossed_go_live = current.status == Status::GoLive || update.status == Status::GoLive;
    let dashboard = if crossed_go_live {
        Some(dashboard_overview(conn)?)
    } else {
        None
    };

    tracing::info!(%key, from = %current.status, to = %update.status, "status persisted");

    Ok(StatusUpdateResponse {
        success: true,
        history: Some(StatusHistoryEntry {
            id: history_id,
            entity_id: key,
            entity_name: entity.name.clone(),
            old_status: Some(current.status),
            new_status: update.status,
            changed_at: now,
        }),
        data: Some(entity),
        dashboard,
        error: None,
    })
}

/// Newest first
pub fn status_history(conn: &Connection, key: EntityKey) -> Result<Vec<StatusHistoryEntry>> {
    if get_entity(conn, key)?.is_none() {
        return Err(TrackerError::NotFound(key));
    }

    let mut stmt = conn.prepare(
        "SELECT id, entity_id, entity_name, old_status, new_status, changed_at
         FROM status_history
         WHERE entity_id = ?1
         ORDER BY changed_at DESC, id DESC",
    )?;

    let entries = stmt
        .query_map(params![key.0], |row| {
            let changed_at: String = row.get(5)?;
            Ok(StatusHistoryEntry {
                id: row.get(0)?,
                entity_id: EntityKey(row.get(1)?),
                entity_name: row.get(2)?,
                old_status: row.get(3)?,
                new_status: row.get(4)?,
                changed_at: parse_timestamp(&changed_at).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        5,
                        "changed_at".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// `RemoteStore` over a local database file, no server in between
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        SqliteStore {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (creating if needed) and set up the schema
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self::new(conn))
    }

    /// Shared handle, e.g. for the server's state
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RemoteStore for SqliteStore {
    async fn list_entities(&self, query: &EntityQuery) -> Result<Vec<Entity>> {
        query_entities(&self.lock(), query)
    }

    async fn status_counts(&self, scope: &CountScope) -> Result<StatusCounts> {
        status_counts(&self.lock(), scope)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        categories(&self.lock())
    }

    async fn update_status(
        &self,
        key: EntityKey,
        update: &StatusUpdateRequest,
    ) -> Result<StatusUpdateResponse> {
        match update_status(&mut self.lock(), key, update) {
            Ok(response) => Ok(response),
            // The store answered and refused
            Err(
                e @ (TrackerError::Validation(_)
                | TrackerError::NotFound(_)
                | TrackerError::Conflict(_)),
            ) => Ok(StatusUpdateResponse {
                success: false,
                error: Some(e.to_string()),
                ..StatusUpdateResponse::default()
            }),
            Err(e) => Err(TrackerError::Persist(e.to_string())),
        }
    }

    async fn dashboard_overview(&self) -> Result<DashboardOverview> {
        dashboard_overview(&self.lock())
    }

    async fn status_history(&self, key: EntityKey) -> Result<Vec<StatusHistoryEntry>> {
        status_history(&self.lock(), key)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::GoLiveDates;
    use std::io::Write;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();

        let mut acme = SeedEntity::new("Acme", "Utilities", "Not Started");
        acme.top_50 = "yes".to_string();
        acme.web = "acme.example".to_string();
        let seeds = vec![
            acme,
            SeedEntity::new("FastNet", "ISP", "in_progress"),
            SeedEntity::new("SlowNet", "ISP", "go_live"),
            SeedEntity::new("MicroFin", "MFI", ""),
        ];
        insert_entities(&conn, &seeds).unwrap();
        conn
    }

    fn key_of(conn: &Connection, name: &str) -> EntityKey {
        let id: i64 = conn
            .query_row("SELECT id FROM entities WHERE name = ?1", [name], |r| r.get(0))
            .unwrap();
        EntityKey(id)
    }

    fn dates() -> GoLiveDates {
        GoLiveDates {
            integration_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            onboarding_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        }
    }

    #[test]
    fn test_import_twice_skips_duplicates() {
        let conn = seeded();
        assert_eq!(verify_count(&conn).unwrap(), 4);

        let again = vec![SeedEntity::new("Acme", "Utilities", "")];
        assert_eq!(insert_entities(&conn, &again).unwrap(), 0);

        // Same name, different category is a different entity
        let other = vec![SeedEntity::new("Acme", "ISP", "")];
        assert_eq!(insert_entities(&conn, &other).unwrap(), 1);

        println!("✅ Seed idempotency test PASSED");
    }

    #[test]
    fn test_load_csv_accepts_labels_and_blank_columns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name,Category,Status,Web,Top50").unwrap();
        writeln!(file, "Acme,Utilities,Go Live,acme.example,yes").unwrap();
        writeln!(file, "Beta,,,,").unwrap();
        writeln!(file, ",ISP,,,").unwrap();
        file.flush().unwrap();

        let seeds = load_csv(file.path()).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].status().unwrap(), Status::GoLive);
        assert!(seeds[0].is_top_50());
        assert_eq!(seeds[1].category(), "Other");
        assert_eq!(seeds[1].status().unwrap(), Status::NotStarted);
    }

    #[test]
    fn test_query_filters() {
        let conn = seeded();

        let all = query_entities(&conn, &EntityQuery::default()).unwrap();
        let names: Vec<&str> = all.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "FastNet", "MicroFin", "SlowNet"]);

        let isp = query_entities(
            &conn,
            &EntityQuery {
                category: Some("ISP".to_string()),
                ..EntityQuery::default()
            },
        )
        .unwrap();
        assert_eq!(isp.len(), 2);

        let search = query_entities(
            &conn,
            &EntityQuery {
                search: Some("net".to_string()),
                status: Some("In Progress".to_string()),
                ..EntityQuery::default()
            },
        )
        .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "FastNet");

        let top = query_entities(
            &conn,
            &EntityQuery {
                top_50: true,
                category: Some("all".to_string()),
                ..EntityQuery::default()
            },
        )
        .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].web.as_deref(), Some("acme.example"));
    }

    #[test]
    fn test_search_wildcards_match_literally() {
        let conn = seeded();
        insert_entities(&conn, &[SeedEntity::new("100% Power", "Utilities", "")]).unwrap();

        let by_term = |term: &str| {
            query_entities(
                &conn,
                &EntityQuery {
                    search: Some(term.to_string()),
                    ..EntityQuery::default()
                },
            )
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect::<Vec<_>>()
        };

        assert_eq!(by_term("%"), vec!["100% Power".to_string()]);
        assert!(by_term("_").is_empty());
        assert!(by_term("Fast_et").is_empty());
        assert_eq!(by_term("fastnet"), vec!["FastNet".to_string()]);
        assert_eq!(escape_like(r"a%b_c\d"), r"a\%b\_c\\d");
    }

    #[test]
    fn test_counts_categories_and_overview() {
        let conn = seeded();

        let isp = status_counts(
            &conn,
            &CountScope {
                category: Some("ISP".to_string()),
                top_50: false,
            },
        )
        .unwrap();
        assert_eq!(isp, StatusCounts { not_started: 0, in_progress: 1, go_live: 1 });

        assert_eq!(categories(&conn).unwrap(), vec!["ISP", "MFI", "Utilities"]);

        let overview = dashboard_overview(&conn).unwrap();
        assert_eq!(overview.target_count, 4);
        assert_eq!(overview.unavailable_isp, 1);
        assert_eq!(overview.unavailable_mfi, 1);
        assert!(overview.last_updated.is_some());
    }

    #[test]
    fn test_go_live_update_records_history_and_dashboard() {
        let mut conn = seeded();
        let acme = key_of(&conn, "Acme");

        let plain = update_status(&mut conn, acme, &StatusUpdateRequest::plain(Status::InProgress))
            .unwrap();
        assert!(plain.success);
        assert!(plain.dashboard.is_none());

        let live = update_status(&mut conn, acme, &StatusUpdateRequest::go_live(dates())).unwrap();
        let entity = live.data.unwrap();
        assert_eq!(entity.status, Status::GoLive);
        assert_eq!(entity.integration_date, Some(dates().integration_date));
        assert!(live.dashboard.is_some());

        let history = status_history(&conn, acme).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].new_status, Status::GoLive);
        assert_eq!(history[0].old_status, Some(Status::InProgress));

        println!("✅ Status update + history test PASSED");
    }

    #[test]
    fn test_update_rejections() {
        let mut conn = seeded();
        let slow = key_of(&conn, "SlowNet");

        let err = update_status(&mut conn, slow, &StatusUpdateRequest::plain(Status::NotStarted))
            .unwrap_err();
        assert!(matches!(err, TrackerError::Conflict(_)));

        let mut missing_dates = StatusUpdateRequest::plain(Status::GoLive);
        missing_dates.integration_date = Some(dates().integration_date);
        assert!(update_status(&mut conn, slow, &missing_dates)
            .unwrap_err()
            .is_validation());

        let err = update_status(
            &mut conn,
            EntityKey(999),
            &StatusUpdateRequest::plain(Status::InProgress),
        )
        .unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(EntityKey(999))));

        // Nothing was written by the rejected calls
        assert!(status_history(&conn, slow).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_store_reports_refusals_in_body() {
        let store = SqliteStore::new(seeded());
        let slow = key_of(&store.lock(), "SlowNet");

        let response = store
            .update_status(slow, &StatusUpdateRequest::plain(Status::InProgress))
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.error.unwrap().contains("already live"));

        let rows = store.list_entities(&EntityQuery::default()).await.unwrap();
        assert_eq!(rows.len(), 4);
    }
}
