//! PostgreSQL server inspection: version, tuning settings and size of the
//! database a benchmark is about to hit.

use std::fmt::Write;
use std::future::Future;

use serde::Serialize;
use sqlx::{Connection, PgConnection};
use tracing::{debug, info};

use super::error::{ToolError, ToolResult};

/// Tuning parameters worth knowing before a load test, in report order.
pub const SETTINGS: [&str; 5] = [
    "shared_buffers",
    "max_connections",
    "work_mem",
    "effective_cache_size",
    "maintenance_work_mem",
];

const SETTING_WIDTH: usize = 25;

const VERSION_QUERY: &str = "SELECT version()";
const SIZE_QUERY: &str = "SELECT pg_size_pretty(pg_database_size(current_database()))";
const NAME_QUERY: &str = "SELECT current_database()";

/// Runs a query that yields a single text value.
pub trait TextQuery {
    fn query_text(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<String, sqlx::Error>> + Send;
}

impl TextQuery for PgConnection {
    async fn query_text(&mut self, sql: &str) -> Result<String, sqlx::Error> {
        sqlx::query_scalar::<_, String>(sql)
            .fetch_one(&mut *self)
            .await
    }
}

/// What [`inspect_database`] found out about a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerReport {
    pub version: String,
    /// Setting name and its value, or `(error: ...)` when the query failed.
    pub settings: Vec<(String, String)>,
    /// Pretty-printed size of the current database, or `(error: ...)`.
    pub size: String,
    pub name: Option<String>,
}

impl ServerReport {
    /// Query everything the report needs. Only a failing version query is
    /// fatal; other failures end up in the report.
    pub async fn collect<Q: TextQuery>(db: &mut Q) -> ToolResult<Self> {
        let version = db
            .query_text(VERSION_QUERY)
            .await
            .map_err(ToolError::database("failed to get version"))?;

        let mut settings = Vec::with_capacity(SETTINGS.len());
        for setting in SETTINGS {
            let value = db.query_text(&format!("SHOW {setting}")).await;
            settings.push((setting.to_string(), value_or_error(value)));
        }

        let size = value_or_error(db.query_text(SIZE_QUERY).await);
        let name = match db.query_text(NAME_QUERY).await {
            Ok(name) => Some(name),
            Err(e) => {
                debug!("Could not read database name: {}", e);
                None
            }
        };

        Ok(ServerReport {
            version,
            settings,
            size,
            name,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Version: {}\n", self.version);

        out.push_str("Configuration:\n");
        for (setting, value) in &self.settings {
            let _ = writeln!(
                out,
                "  {:<width$} {}",
                format!("{setting}:"),
                value,
                width = SETTING_WIDTH
            );
        }

        let _ = writeln!(out, "\nDatabase size: {}", self.size);
        if let Some(name) = &self.name {
            let _ = writeln!(out, "Database name: {name}");
        }
        out
    }
}

fn value_or_error(result: Result<String, sqlx::Error>) -> String {
    result.unwrap_or_else(|e| format!("(error: {e})"))
}

/// Connect to the database at `url` and report version, settings and size.
pub async fn inspect_database(url: &str) -> ToolResult<String> {
    info!("Inspecting PostgreSQL server");
    let mut conn = PgConnection::connect(url)
        .await
        .map_err(ToolError::database("connection failed"))?;

    let report = ServerReport::collect(&mut conn).await;
    if let Err(e) = conn.close().await {
        debug!("Closing inspection connection failed: {}", e);
    }
    Ok(report?.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Answers queries from a fixed table and records what was asked.
    #[derive(Default)]
    struct FakeServer {
        answers: HashMap<String, String>,
        asked: Vec<String>,
    }

    impl FakeServer {
        fn answer(mut self, sql: &str, value: &str) -> Self {
            self.answers.insert(sql.to_string(), value.to_string());
            self
        }

        fn healthy() -> Self {
            FakeServer::default()
                .answer(VERSION_QUERY, "PostgreSQL 16.2 on x86_64-pc-linux-gnu")
                .answer("SHOW shared_buffers", "128MB")
                .answer("SHOW max_connections", "100")
                .answer("SHOW work_mem", "4MB")
                .answer("SHOW effective_cache_size", "4GB")
                .answer("SHOW maintenance_work_mem", "64MB")
                .answer(SIZE_QUERY, "7453 kB")
                .answer(NAME_QUERY, "stroppy")
        }
    }

    impl TextQuery for FakeServer {
        async fn query_text(&mut self, sql: &str) -> Result<String, sqlx::Error> {
            self.asked.push(sql.to_string());
            self.answers
                .get(sql)
                .cloned()
                .ok_or_else(|| sqlx::Error::Protocol(format!("no answer for {sql}")))
        }
    }

    fn setting_line(name: &str, value: &str) -> String {
        format!("  {:<25} {}\n", format!("{name}:"), value)
    }

    #[tokio::test]
    async fn test_full_report() {
        let mut server = FakeServer::healthy();
        let report = ServerReport::collect(&mut server).await.unwrap();

        let expected = [
            "Version: PostgreSQL 16.2 on x86_64-pc-linux-gnu\n\n".to_string(),
            "Configuration:\n".to_string(),
            setting_line("shared_buffers", "128MB"),
            setting_line("max_connections", "100"),
            setting_line("work_mem", "4MB"),
            setting_line("effective_cache_size", "4GB"),
            setting_line("maintenance_work_mem", "64MB"),
            "\nDatabase size: 7453 kB\n".to_string(),
            "Database name: stroppy\n".to_string(),
        ]
        .concat();
        assert_eq!(report.render(), expected);
    }

    #[tokio::test]
    async fn test_queries_run_in_report_order() {
        let mut server = FakeServer::healthy();
        ServerReport::collect(&mut server).await.unwrap();

        assert_eq!(server.asked.first().map(String::as_str), Some(VERSION_QUERY));
        assert_eq!(server.asked[1], "SHOW shared_buffers");
        assert_eq!(server.asked.last().map(String::as_str), Some(NAME_QUERY));
        assert_eq!(server.asked.len(), 8);
    }

    #[tokio::test]
    async fn test_failed_queries_are_reported_inline() {
        let mut server = FakeServer::default()
            .answer(VERSION_QUERY, "PostgreSQL 15.6")
            .answer("SHOW max_connections", "500");
        let text = ServerReport::collect(&mut server).await.unwrap().render();

        assert!(text.contains(&setting_line("max_connections", "500")));
        assert!(text.contains(&format!("  {:<25} (error: ", "shared_buffers:")));
        assert!(text.contains("\nDatabase size: (error: "));
        assert!(!text.contains("Database name:"));
    }

    #[tokio::test]
    async fn test_version_failure_is_fatal() {
        let mut server = FakeServer::default();
        let err = ServerReport::collect(&mut server).await.unwrap_err();

        assert!(matches!(
            err,
            ToolError::Database {
                context: "failed to get version",
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to get version: "));
        assert_eq!(server.asked, vec![VERSION_QUERY.to_string()]);
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_to_connect() {
        let err = inspect_database("postgres://stroppy@127.0.0.1:1/stroppy")
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("connection failed: "), "{err}");
    }
}
