//! Dedicated (non-pooled) connection with automatic reconnect.

use crate::client::{Driver, run_query};
use crate::config::ConnectionSettings;
use crate::error::{OrmError, OrmResult, is_connection_lost};
use crate::row::QueryOutput;
use sqlx::{ConnectOptions, Connection, Executor};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;

/// Delay before each reconnect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2000);

struct Shared {
    settings: ConnectionSettings,
    conn: Mutex<Option<sqlx::MySqlConnection>>,
    reconnecting: AtomicBool,
}

/// A single MySQL connection owned by one [`Adapter`](crate::Adapter).
///
/// When a statement fails because the link dropped (refused, reset, broken
/// pipe, unexpected EOF), the connection is discarded and a background task
/// reopens it every [`RECONNECT_DELAY`] until it succeeds. Statements issued
/// meanwhile fail with [`OrmError::Connection`].
pub struct MySqlConnection {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("host", &self.shared.settings.host)
            .field("database", &self.shared.settings.database)
            .field("reconnecting", &self.is_reconnecting())
            .finish()
    }
}

async fn open(settings: &ConnectionSettings) -> OrmResult<sqlx::MySqlConnection> {
    let mut conn = settings
        .connect_options()
        .connect()
        .await
        .map_err(|e| OrmError::Connection(e.to_string()))?;
    if let Some(sql) = settings.set_names_sql() {
        conn.execute(sqlx::raw_sql(&sql)).await?;
    }
    Ok(conn)
}

impl MySqlConnection {
    /// Validate `settings` and open the connection.
    pub async fn connect(settings: ConnectionSettings) -> OrmResult<Self> {
        let settings = settings.validate()?;
        let conn = open(&settings).await?;
        tracing::debug!(
            target: "mysql_activerecord.connection",
            host = %settings.host,
            database = %settings.database,
            "connected"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                settings,
                conn: Mutex::new(Some(conn)),
                reconnecting: AtomicBool::new(false),
            }),
        })
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.shared.settings
    }

    /// Whether a reconnect is scheduled or in progress.
    pub fn is_reconnecting(&self) -> bool {
        self.shared.reconnecting.load(Ordering::Acquire)
    }

    fn schedule_reconnect(&self) {
        if self.shared.reconnecting.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::warn!(
            target: "mysql_activerecord.connection",
            delay_ms = RECONNECT_DELAY.as_millis() as u64,
            "connection lost, scheduling reconnect"
        );
        tokio::spawn(reconnect_loop(Arc::downgrade(&self.shared)));
    }
}

async fn reconnect_loop(shared: Weak<Shared>) {
    loop {
        tokio::time::sleep(RECONNECT_DELAY).await;
        // The owning connection was dropped; nothing to reconnect.
        let Some(shared) = shared.upgrade() else {
            return;
        };
        match open(&shared.settings).await {
            Ok(conn) => {
                *shared.conn.lock().await = Some(conn);
                shared.reconnecting.store(false, Ordering::Release);
                tracing::info!(target: "mysql_activerecord.connection", "reconnected");
                return;
            }
            Err(e) => {
                tracing::error!(
                    target: "mysql_activerecord.connection",
                    error = %e,
                    "reconnect failed, retrying"
                );
            }
        }
    }
}

impl Driver for MySqlConnection {
    async fn query(&mut self, sql: &str) -> OrmResult<QueryOutput> {
        let mut guard = self.shared.conn.lock().await;
        let Some(conn) = guard.as_mut() else {
            return Err(OrmError::Connection(
                "connection lost, reconnect pending".to_string(),
            ));
        };

        match run_query(&mut *conn, sql).await {
            Err(OrmError::Query(e)) if is_connection_lost(&e) => {
                guard.take();
                drop(guard);
                self.schedule_reconnect();
                Err(OrmError::Query(e))
            }
            other => other,
        }
    }

    async fn ping(&mut self) -> OrmResult<()> {
        let mut guard = self.shared.conn.lock().await;
        match guard.as_mut() {
            Some(conn) => conn.ping().await.map_err(OrmError::from),
            None => Err(OrmError::Connection(
                "connection lost, reconnect pending".to_string(),
            )),
        }
    }

    async fn end(self) -> OrmResult<()> {
        let conn = self.shared.conn.lock().await.take();
        match conn {
            Some(conn) => conn.close().await.map_err(OrmError::from),
            None => Ok(()),
        }
    }
}
