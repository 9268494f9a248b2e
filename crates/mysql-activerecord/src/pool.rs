//! Connection pool

use crate::adapter::Adapter;
use crate::client::{Driver, run_query};
use crate::config::{ConnectionSettings, PoolConfig, PoolSettings};
use crate::error::{OrmError, OrmResult};
use crate::row::QueryOutput;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::pool::PoolConnection;
use sqlx::{Connection, Executor, MySql, MySqlPool};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct PoolInner {
    pool: MySqlPool,
    settings: ConnectionSettings,
    pool_settings: PoolSettings,
    waiting: AtomicUsize,
}

/// Cloneable handle to a MySQL connection pool.
///
/// Connections are opened lazily on first checkout; creating the pool does
/// no I/O but must happen inside a tokio runtime.
///
/// ```no_run
/// use mysql_activerecord::{ClauseBuilder, ConnectionSettings, Pool, PoolSettings};
///
/// # async fn run() -> mysql_activerecord::OrmResult<()> {
/// let pool = Pool::new(
///     ConnectionSettings::new("localhost", "shop").user("app"),
///     PoolSettings::new().connection_limit(4),
/// )?;
///
/// let mut db = pool.get_new_adapter().await?;
/// let orders = db.where_eq("status", "active").get("orders").await?;
/// println!("{} active orders", orders.rows.len());
/// db.release_connection();
///
/// pool.disconnect().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("host", &self.inner.settings.host)
            .field("database", &self.inner.settings.database)
            .field("size", &self.inner.pool.size())
            .field("idle", &self.inner.pool.num_idle())
            .finish()
    }
}

/// Releases a waiter slot when the checkout finishes or is cancelled.
struct WaitSlot<'a>(&'a AtomicUsize);

impl Drop for WaitSlot<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn map_acquire_error(err: sqlx::Error) -> OrmError {
    match err {
        sqlx::Error::PoolTimedOut => OrmError::Pool("timed out waiting for a connection".into()),
        sqlx::Error::PoolClosed => OrmError::Pool("pool is closed".into()),
        other => OrmError::Connection(other.to_string()),
    }
}

impl Pool {
    /// Build a pool from validated settings.
    pub fn new(settings: ConnectionSettings, pool_settings: PoolSettings) -> OrmResult<Self> {
        let settings = settings.validate()?;
        let pool_settings = pool_settings.validate()?;

        let mut options = MySqlPoolOptions::new()
            .max_connections(pool_settings.connection_limit)
            .acquire_timeout(pool_settings.acquire_timeout_duration());
        if let Some(set_names) = settings.set_names_sql() {
            options = options.after_connect(move |conn, _meta| {
                let sql = set_names.clone();
                Box::pin(async move {
                    conn.execute(sqlx::raw_sql(&sql)).await?;
                    Ok(())
                })
            });
        }
        let pool = options.connect_lazy_with(settings.connect_options());

        tracing::debug!(
            target: "mysql_activerecord.pool",
            host = %settings.host,
            database = %settings.database,
            connection_limit = pool_settings.connection_limit,
            "pool created"
        );

        Ok(Self {
            inner: Arc::new(PoolInner {
                pool,
                settings,
                pool_settings,
                waiting: AtomicUsize::new(0),
            }),
        })
    }

    pub fn from_config(config: PoolConfig) -> OrmResult<Self> {
        Self::new(config.connection, config.pool)
    }

    pub fn connection_settings(&self) -> &ConnectionSettings {
        &self.inner.settings
    }

    pub fn pool_settings(&self) -> &PoolSettings {
        &self.inner.pool_settings
    }

    /// Open connections (idle and checked out).
    pub fn size(&self) -> u32 {
        self.inner.pool.size()
    }

    pub fn num_idle(&self) -> usize {
        self.inner.pool.num_idle()
    }

    /// Callers currently waiting for a connection.
    pub fn num_waiting(&self) -> usize {
        self.inner.waiting.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    /// Check a connection out of the pool.
    ///
    /// Fails with [`OrmError::Pool`] when `queue_limit` callers are already
    /// waiting, or when `wait_for_connections` is off and every one of the
    /// `connection_limit` connections is checked out.
    pub async fn get_connection(&self) -> OrmResult<PooledConnection> {
        let pool = &self.inner.pool;
        let settings = &self.inner.pool_settings;

        if !settings.wait_for_connections {
            if let Some(conn) = pool.try_acquire() {
                return Ok(PooledConnection { conn });
            }
            if pool.size() >= settings.connection_limit {
                return Err(OrmError::Pool("no connections available".into()));
            }
        }

        let queued = self.inner.waiting.fetch_add(1, Ordering::AcqRel);
        let _slot = WaitSlot(&self.inner.waiting);
        if settings.queue_limit > 0 && queued >= settings.queue_limit {
            return Err(OrmError::Pool(format!(
                "queue limit reached ({} waiting)",
                settings.queue_limit
            )));
        }

        let conn = pool.acquire().await.map_err(map_acquire_error)?;
        Ok(PooledConnection { conn })
    }

    /// Check out a connection and wrap it in a fresh [`Adapter`].
    pub async fn get_new_adapter(&self) -> OrmResult<Adapter<PooledConnection>> {
        let conn = self.get_connection().await?;
        Ok(Adapter::new(conn, self.inner.settings.clone()))
    }

    /// Close every connection once it is returned, and refuse new checkouts.
    pub async fn disconnect(&self) {
        self.inner.pool.close().await;
        tracing::debug!(target: "mysql_activerecord.pool", "pool closed");
    }
}

/// A connection checked out of a [`Pool`].
///
/// Dropping it (or calling [`release`](Self::release)) returns it to the pool.
pub struct PooledConnection {
    conn: PoolConnection<MySql>,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

impl PooledConnection {
    /// Return the connection to the pool for reuse.
    pub fn release(self) {
        drop(self.conn);
    }
}

impl Driver for PooledConnection {
    async fn query(&mut self, sql: &str) -> OrmResult<QueryOutput> {
        run_query(&mut *self.conn, sql).await
    }

    async fn ping(&mut self) -> OrmResult<()> {
        self.conn.ping().await.map_err(OrmError::from)
    }

    /// Close the underlying connection instead of returning it to the pool.
    async fn end(self) -> OrmResult<()> {
        self.conn.close().await.map_err(OrmError::from)
    }

    /// Take the connection out of the pool and drop it.
    fn destroy(self) {
        drop(self.conn.detach());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings() -> ConnectionSettings {
        ConnectionSettings::new("127.0.0.1", "shop").port(1)
    }

    #[tokio::test]
    async fn new_pool_is_lazy() {
        let pool = Pool::new(settings(), PoolSettings::new()).unwrap();
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.num_waiting(), 0);
        assert_eq!(pool.connection_settings().database, "shop");
        assert!(!pool.is_closed());
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected() {
        let err = Pool::new(ConnectionSettings::default(), PoolSettings::new()).unwrap_err();
        assert!(err.is_config());
        assert!(Pool::new(settings(), PoolSettings::new().connection_limit(0)).is_err());
    }

    #[tokio::test]
    async fn closed_pool_refuses_checkout() {
        let pool = Pool::new(settings(), PoolSettings::new()).unwrap();
        pool.disconnect().await;
        assert!(pool.is_closed());

        let err = pool.get_connection().await.unwrap_err();
        assert!(matches!(err, OrmError::Pool(_)), "{err:?}");
        assert_eq!(pool.num_waiting(), 0);
    }

    #[tokio::test]
    async fn unreachable_server_times_out() {
        let pool = Pool::new(
            settings(),
            PoolSettings::new().acquire_timeout(Duration::from_millis(200)),
        )
        .unwrap();
        assert!(pool.get_new_adapter().await.is_err());
        assert_eq!(pool.num_waiting(), 0);
    }

    #[tokio::test]
    async fn clones_share_the_pool() {
        let pool = Pool::new(settings(), PoolSettings::new()).unwrap();
        let other = pool.clone();
        other.disconnect().await;
        assert!(pool.is_closed());
    }
}
