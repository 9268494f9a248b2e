//! Driver trait for dispatching compiled SQL.

use crate::error::OrmResult;
use crate::row::{QueryOutput, Row};
use futures_util::TryStreamExt;
use sqlx::{Either, Executor, MySql};

/// A connection-like object that can run SQL text.
///
/// Implemented by [`MySqlConnection`](crate::MySqlConnection) (a single
/// dedicated connection) and [`PooledConnection`](crate::PooledConnection)
/// (a connection checked out of a [`Pool`](crate::Pool)). The builder only
/// ever hands it fully rendered SQL; nothing is bound as a parameter.
pub trait Driver: Send {
    /// Run `sql` and collect its rows and write summary.
    fn query(
        &mut self,
        sql: &str,
    ) -> impl std::future::Future<Output = OrmResult<QueryOutput>> + Send;

    /// Round-trip a no-op command to check the connection is alive.
    fn ping(&mut self) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    /// Gracefully close the connection.
    fn end(self) -> impl std::future::Future<Output = OrmResult<()>> + Send
    where
        Self: Sized;

    /// Drop the connection without the close handshake.
    fn destroy(self)
    where
        Self: Sized,
    {
        drop(self);
    }
}

/// Run `sql` over the text protocol and gather every result set.
///
/// Multi-statement strings are accepted; rows from all result sets are
/// concatenated and `affected_rows` is summed.
pub(crate) async fn run_query<'e, E>(executor: E, sql: &'e str) -> OrmResult<QueryOutput>
where
    E: Executor<'e, Database = MySql>,
{
    let mut output = QueryOutput::default();
    let mut results = executor.fetch_many(sqlx::raw_sql(sql));
    while let Some(item) = results.try_next().await? {
        match item {
            Either::Left(done) => {
                output.affected_rows += done.rows_affected();
                if done.last_insert_id() > 0 {
                    output.last_insert_id = Some(done.last_insert_id());
                }
            }
            Either::Right(row) => output.rows.push(Row::from_mysql(&row)?),
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    impl Driver for Silent {
        async fn query(&mut self, _sql: &str) -> OrmResult<QueryOutput> {
            Ok(QueryOutput::default())
        }

        async fn ping(&mut self) -> OrmResult<()> {
            Ok(())
        }

        async fn end(self) -> OrmResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn async_surface() {
        let mut driver = Silent;
        assert!(driver.query("SELECT 1").await.unwrap().is_empty());
        driver.ping().await.unwrap();
        driver.end().await.unwrap();
    }
}
