//! Builder bound to a driver.

use crate::builder::{ClauseBuilder, InsertVerb, QueryBuilder, Statement, StatementKind};
use crate::client::Driver;
use crate::config::ConnectionSettings;
use crate::connection::MySqlConnection;
use crate::error::{OrmError, OrmResult};
use crate::pool::PooledConnection;
use crate::row::QueryOutput;
use crate::value::{Operand, Record, Value};

/// Longest SQL text written to debug logs, in bytes.
const MAX_LOGGED_SQL: usize = 200;

fn truncate_sql(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// A statement builder that dispatches what it builds.
///
/// Clause methods come from [`ClauseBuilder`]; the terminal methods here
/// compile the statement, reset the builder, hand the SQL to the driver and
/// return its output. Compilation problems (no table, bad batch shape) are
/// reported before anything is sent.
///
/// ```no_run
/// use mysql_activerecord::{Adapter, ClauseBuilder, ConnectionSettings, LikeSide, Record};
///
/// # async fn run() -> mysql_activerecord::OrmResult<()> {
/// let mut db = Adapter::connect(ConnectionSettings::from_url("mysql://app@localhost/shop")?).await?;
///
/// let out = db
///     .select("id, name")
///     .like("name", "lamp", LikeSide::Both)
///     .order_by("name")
///     .limit(20)
///     .get("products")
///     .await?;
/// for row in &out.rows {
///     let name: String = row.try_get("name")?;
///     println!("{name}");
/// }
///
/// db.insert("products", &Record::new().with("name", "Desk lamp"), "").await?;
/// db.disconnect().await
/// # }
/// ```
pub struct Adapter<D: Driver> {
    driver: D,
    builder: QueryBuilder,
    settings: ConnectionSettings,
}

impl<D: Driver + std::fmt::Debug> std::fmt::Debug for Adapter<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapter")
            .field("driver", &self.driver)
            .field("statement", self.builder.statement())
            .finish_non_exhaustive()
    }
}

impl<D: Driver> ClauseBuilder for Adapter<D> {
    fn statement(&self) -> &Statement {
        self.builder.statement()
    }

    fn statement_mut(&mut self) -> &mut Statement {
        self.builder.statement_mut()
    }
}

impl Adapter<MySqlConnection> {
    /// Open a dedicated connection.
    ///
    /// Settings are validated first; a configured charset is applied with
    /// `SET NAMES` before this returns.
    pub async fn connect(settings: ConnectionSettings) -> OrmResult<Self> {
        let conn = MySqlConnection::connect(settings).await?;
        let settings = conn.settings().clone();
        Ok(Self::new(conn, settings))
    }
}

impl Adapter<PooledConnection> {
    /// Hand the connection back to its pool.
    pub fn release_connection(self) {
        self.driver.release();
    }
}

impl<D: Driver> Adapter<D> {
    /// Wrap an already-open driver.
    pub fn new(driver: D, settings: ConnectionSettings) -> Self {
        Self {
            driver,
            builder: QueryBuilder::new(),
            settings,
        }
    }

    /// Settings the connection was opened with.
    pub fn connection_settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The most recently compiled statement.
    pub fn last_query(&self) -> &str {
        self.builder.last_query()
    }

    /// Render `value` exactly as compiled statements embed it.
    pub fn escape(&self, value: impl Into<Value>) -> String {
        value.into().to_sql_literal()
    }

    /// Discard accumulated clauses without dispatching anything.
    pub fn reset(&mut self) {
        self.builder.reset();
    }

    async fn dispatch(&mut self, kind: StatementKind, sql: String) -> OrmResult<QueryOutput> {
        let shown = match truncate_sql(&sql, MAX_LOGGED_SQL) {
            short if short.len() < sql.len() => format!("{short}..."),
            _ => sql.clone(),
        };
        tracing::debug!(
            target: "mysql_activerecord.sql",
            kind = kind.as_str(),
            sql = %shown,
            "dispatch"
        );

        let result = self.driver.query(&sql).await;
        if let Err(e) = &result {
            tracing::debug!(
                target: "mysql_activerecord.sql",
                kind = kind.as_str(),
                error = %e,
                "statement failed"
            );
        }
        result
    }

    /// SELECT from `table` (plus any tables given to `from`).
    pub async fn get(&mut self, table: &str) -> OrmResult<QueryOutput> {
        let sql = self.builder.build_get(table)?;
        self.dispatch(StatementKind::Select, sql).await
    }

    /// SELECT from the tables given to `from`.
    pub async fn get_from_state(&mut self) -> OrmResult<QueryOutput> {
        let sql = self.builder.build_get_from_state()?;
        self.dispatch(StatementKind::Select, sql).await
    }

    /// SELECT with extra AND conditions; an empty `table` uses the FROM state.
    pub async fn get_where<K, V, I>(&mut self, table: &str, pairs: I) -> OrmResult<QueryOutput>
    where
        K: AsRef<str>,
        V: Into<Operand>,
        I: IntoIterator<Item = (K, V)>,
    {
        let sql = self.builder.build_get_where(table, pairs)?;
        self.dispatch(StatementKind::Select, sql).await
    }

    /// Number of rows matching the accumulated FROM / JOIN / WHERE state.
    pub async fn count(&mut self, table: &str) -> OrmResult<u64> {
        let sql = self.builder.build_count(table)?;
        let output = self.dispatch(StatementKind::Count, sql).await?;
        let row = output
            .first()
            .ok_or_else(|| OrmError::not_found("count query returned no rows"))?;
        row.try_get("count")
    }

    /// `INSERT into table SET ...`; `suffix` (if non-empty) is appended verbatim.
    pub async fn insert(
        &mut self,
        table: &str,
        record: &Record,
        suffix: &str,
    ) -> OrmResult<QueryOutput> {
        let sql = self
            .builder
            .build_insert(InsertVerb::Insert, table, record, suffix)?;
        self.dispatch(StatementKind::Insert, sql).await
    }

    /// `INSERT IGNORE into table SET ...`.
    pub async fn insert_ignore(
        &mut self,
        table: &str,
        record: &Record,
        suffix: &str,
    ) -> OrmResult<QueryOutput> {
        let sql = self
            .builder
            .build_insert(InsertVerb::InsertIgnore, table, record, suffix)?;
        self.dispatch(StatementKind::Insert, sql).await
    }

    /// Multi-row INSERT. An empty `rows` slice sends nothing.
    pub async fn insert_batch(&mut self, table: &str, rows: &[Record]) -> OrmResult<QueryOutput> {
        self.insert_many(InsertVerb::Insert, table, rows).await
    }

    /// Multi-row INSERT IGNORE. An empty `rows` slice sends nothing.
    pub async fn insert_ignore_batch(
        &mut self,
        table: &str,
        rows: &[Record],
    ) -> OrmResult<QueryOutput> {
        self.insert_many(InsertVerb::InsertIgnore, table, rows)
            .await
    }

    async fn insert_many(
        &mut self,
        verb: InsertVerb,
        table: &str,
        rows: &[Record],
    ) -> OrmResult<QueryOutput> {
        match self.builder.build_insert_batch(verb, table, rows)? {
            Some(sql) => self.dispatch(StatementKind::Insert, sql).await,
            None => Ok(QueryOutput::default()),
        }
    }

    /// `UPDATE table SET ...` with the accumulated WHERE and LIMIT.
    pub async fn update(&mut self, table: &str, record: &Record) -> OrmResult<QueryOutput> {
        let sql = self.builder.build_update(table, record)?;
        self.dispatch(StatementKind::Update, sql).await
    }

    /// DELETE from `table` (plus any tables given to `from`).
    pub async fn delete(&mut self, table: &str) -> OrmResult<QueryOutput> {
        let sql = self.builder.build_delete(table)?;
        self.dispatch(StatementKind::Delete, sql).await
    }

    /// DELETE from the tables given to `from`.
    pub async fn delete_from_state(&mut self) -> OrmResult<QueryOutput> {
        let sql = self.builder.build_delete_from_state()?;
        self.dispatch(StatementKind::Delete, sql).await
    }

    /// Send `sql` as-is. Accumulated clauses are discarded.
    pub async fn query(&mut self, sql: &str) -> OrmResult<QueryOutput> {
        let sql = self.builder.build_query(sql);
        self.dispatch(StatementKind::Raw, sql).await
    }

    pub async fn ping(&mut self) -> OrmResult<()> {
        self.driver.ping().await
    }

    /// Close the connection gracefully.
    pub async fn disconnect(self) -> OrmResult<()> {
        self.driver.end().await
    }

    /// Drop the connection immediately.
    pub fn force_disconnect(self) {
        self.driver.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LikeSide;
    use crate::row::Row;
    use std::collections::VecDeque;

    #[derive(Debug, Default)]
    struct RecordingDriver {
        executed: Vec<String>,
        responses: VecDeque<OrmResult<QueryOutput>>,
    }

    impl RecordingDriver {
        fn respond(mut self, output: OrmResult<QueryOutput>) -> Self {
            self.responses.push_back(output);
            self
        }
    }

    impl Driver for RecordingDriver {
        async fn query(&mut self, sql: &str) -> OrmResult<QueryOutput> {
            self.executed.push(sql.to_string());
            self.responses
                .pop_front()
                .unwrap_or_else(|| Ok(QueryOutput::default()))
        }

        async fn ping(&mut self) -> OrmResult<()> {
            Ok(())
        }

        async fn end(self) -> OrmResult<()> {
            Ok(())
        }
    }

    fn adapter(driver: RecordingDriver) -> Adapter<RecordingDriver> {
        Adapter::new(driver, ConnectionSettings::new("localhost", "space"))
    }

    fn executed(db: &Adapter<RecordingDriver>) -> &[String] {
        &db.driver().executed
    }

    #[tokio::test]
    async fn count_reads_count_column() {
        let rows = vec![Row::new().with("count", 5_i64)];
        let mut db = adapter(RecordingDriver::default().respond(Ok(QueryOutput::from_rows(rows))));

        db.where_eq("kind", "rock");
        assert_eq!(db.count("planets").await.unwrap(), 5);
        assert_eq!(
            executed(&db),
            &["SELECT COUNT(*) AS `count` FROM (`planets`) WHERE `kind` = 'rock'"]
        );
    }

    #[tokio::test]
    async fn count_accepts_text_result() {
        let rows = vec![Row::new().with("count", "12")];
        let mut db = adapter(RecordingDriver::default().respond(Ok(QueryOutput::from_rows(rows))));
        assert_eq!(db.count("planets").await.unwrap(), 12);
    }

    #[tokio::test]
    async fn count_without_rows_is_not_found() {
        let mut db = adapter(RecordingDriver::default());
        assert!(db.count("planets").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn back_to_back_statements_are_isolated() {
        let mut db = adapter(RecordingDriver::default());
        db.select("name")
            .where_eq("id", 1)
            .like("name", "ar", LikeSide::After);
        db.get("planets").await.unwrap();
        db.get("stars").await.unwrap();

        assert_eq!(
            executed(&db),
            &[
                "SELECT `name` FROM (`planets`) WHERE `id` = 1 AND `name` LIKE 'ar%'",
                "SELECT * FROM (`stars`)",
            ]
        );
        assert!(db.statement().is_empty());
    }

    #[tokio::test]
    async fn usage_errors_dispatch_nothing() {
        let mut db = adapter(RecordingDriver::default());
        db.where_eq("id", 1);
        assert!(db.get_from_state().await.unwrap_err().is_usage());
        assert!(db.delete_from_state().await.unwrap_err().is_usage());

        let rows = [Record::new().with("a", 1), Record::new().with("b", 2)];
        assert!(db.insert_batch("t", &rows).await.unwrap_err().is_usage());
        assert!(executed(&db).is_empty());
    }

    #[tokio::test]
    async fn driver_errors_still_reset_state() {
        let driver = RecordingDriver::default().respond(Err(OrmError::Other("boom".into())));
        let mut db = adapter(driver);

        db.where_eq("id", 1);
        assert!(db.delete("planets").await.is_err());
        assert!(db.statement().is_empty());
        assert_eq!(db.last_query(), "DELETE FROM (`planets`) WHERE `id` = 1");
    }

    #[tokio::test]
    async fn writes_pass_output_through() {
        let output = QueryOutput {
            rows: vec![],
            affected_rows: 1,
            last_insert_id: Some(42),
        };
        let mut db = adapter(RecordingDriver::default().respond(Ok(output.clone())));

        let record = Record::new().with("name", "Ceres").with("moons", 0);
        assert_eq!(db.insert("planets", &record, "").await.unwrap(), output);

        db.where_eq("name", "Ceres").limit(1);
        db.update("planets", &Record::new().with("kind", "dwarf"))
            .await
            .unwrap();
        db.insert_ignore("planets", &record, "").await.unwrap();

        assert_eq!(
            executed(&db),
            &[
                "INSERT into `planets` SET `name`='Ceres', `moons`=0",
                "UPDATE `planets` SET `kind`='dwarf' WHERE `name` = 'Ceres' LIMIT 1",
                "INSERT IGNORE into `planets` SET `name`='Ceres', `moons`=0",
            ]
        );
    }

    #[tokio::test]
    async fn batch_inserts() {
        let mut db = adapter(RecordingDriver::default());
        let rows = [
            Record::new().with("a", 1).with("b", 2),
            Record::new().with("a", 3).with("b", 4),
        ];

        assert_eq!(
            db.insert_batch("t", &[]).await.unwrap(),
            QueryOutput::default()
        );
        db.insert_batch("t", &rows).await.unwrap();
        db.insert_ignore_batch("t", &rows).await.unwrap();

        assert_eq!(
            executed(&db),
            &[
                "INSERT INTO `t` (`a`, `b`) VALUES (1,2),(3,4)",
                "INSERT IGNORE INTO `t` (`a`, `b`) VALUES (1,2),(3,4)",
            ]
        );
    }

    #[tokio::test]
    async fn get_where_and_raw_query() {
        let mut db = adapter(RecordingDriver::default());
        db.get_where("planets", [("id", 3)]).await.unwrap();
        db.where_eq("ignored", 1);
        db.query("SHOW TABLES").await.unwrap();

        assert_eq!(
            executed(&db),
            &["SELECT * FROM (`planets`) WHERE `id` = 3", "SHOW TABLES"]
        );
        assert!(db.statement().is_empty());
        assert_eq!(db.last_query(), "SHOW TABLES");
    }

    #[tokio::test]
    async fn rejected_get_where_leaves_no_conditions_behind() {
        let mut db = adapter(RecordingDriver::default());
        let err = db.get_where("", [("id", 1)]).await.unwrap_err();
        assert!(err.is_usage());
        assert!(db.statement().is_empty());

        db.get("planets").await.unwrap();
        assert_eq!(executed(&db), &["SELECT * FROM (`planets`)"]);
    }

    #[tokio::test]
    async fn utilities() {
        let mut db = adapter(RecordingDriver::default());
        assert_eq!(db.escape("a'b"), "'a\\'b'");
        assert_eq!(db.escape(None::<i64>), "NULL");
        db.where_eq("name", "O'Neil");
        assert_eq!(
            db.statement().where_fragments(),
            &[format!("`name` = {}", db.escape("O'Neil"))]
        );
        db.reset();
        assert_eq!(db.connection_settings().database, "space");
        db.ping().await.unwrap();

        db.where_eq("id", 1);
        db.reset();
        assert!(db.statement().is_empty());

        db.disconnect().await.unwrap();
        adapter(RecordingDriver::default()).force_disconnect();
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_sql("SELECT 1", 200), "SELECT 1");
        assert_eq!(truncate_sql("héllo", 2), "h");
    }
}
