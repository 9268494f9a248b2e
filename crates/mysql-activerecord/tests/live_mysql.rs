use mysql_activerecord::connection::RECONNECT_DELAY;
use mysql_activerecord::{
    Adapter, ClauseBuilder, ConnectionSettings, LikeSide, OrmError, OrmResult, Pool,
    PoolSettings, Record,
};
use std::time::{SystemTime, UNIX_EPOCH};

fn database_url(test: &str) -> Option<String> {
    dotenvy::dotenv().ok();
    match std::env::var("DATABASE_URL") {
        Ok(v) => Some(v),
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            None
        }
    }
}

fn unique_table(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    format!("{prefix}_{}_{}", std::process::id(), nanos)
}

#[tokio::test]
async fn crud_roundtrip_on_direct_connection() -> OrmResult<()> {
    let Some(url) = database_url("crud_roundtrip_on_direct_connection") else {
        return Ok(());
    };
    let mut db = Adapter::connect(ConnectionSettings::from_url(&url)?).await?;
    let table = unique_table("ar_planets");

    db.query(&format!(
        "CREATE TABLE `{table}` (id INT AUTO_INCREMENT PRIMARY KEY, name VARCHAR(64) NOT NULL, moons INT NOT NULL, kind VARCHAR(16) NULL)"
    ))
    .await?;

    let inserted = db
        .insert(&table, &Record::new().with("name", "Earth").with("moons", 1), "")
        .await?;
    assert_eq!(inserted.affected_rows, 1);
    assert!(inserted.last_insert_id.is_some());

    let rows = [
        Record::new().with("name", "Mars").with("moons", 2),
        Record::new().with("name", "Venus").with("moons", 0),
        Record::new().with("name", "O'Neil").with("moons", 0),
    ];
    assert_eq!(db.insert_batch(&table, &rows).await?.affected_rows, 3);

    assert_eq!(db.count(&table).await?, 4);
    db.where_eq("moons >", 0);
    assert_eq!(db.count(&table).await?, 2);

    let out = db
        .select("name")
        .where_in("moons", [0, 2])
        .order_by("name")
        .get(&table)
        .await?;
    let names: Vec<String> = out
        .rows
        .iter()
        .map(|row| row.try_get("name"))
        .collect::<OrmResult<_>>()?;
    assert_eq!(names, ["Mars", "O'Neil", "Venus"]);

    db.where_eq("name", "Venus")
        .update(&table, &Record::new().with("kind", "rocky"))
        .await?;
    let out = db.like("kind", "rock", LikeSide::After).get(&table).await?;
    assert_eq!(out.rows.len(), 1);
    assert_eq!(out.rows[0].try_get::<Option<String>>("kind")?.as_deref(), Some("rocky"));

    db.where_eq("kind", None::<String>);
    let deleted = db.delete(&table).await?;
    assert_eq!(deleted.affected_rows, 3);
    assert_eq!(db.count(&table).await?, 1);

    db.ping().await?;
    db.query(&format!("DROP TABLE `{table}`")).await?;
    db.disconnect().await
}

#[tokio::test]
async fn pooled_adapters() -> OrmResult<()> {
    let Some(url) = database_url("pooled_adapters") else {
        return Ok(());
    };
    let pool = Pool::new(
        ConnectionSettings::from_url(&url)?,
        PoolSettings::new().connection_limit(2),
    )?;

    let mut first = pool.get_new_adapter().await?;
    let mut second = pool.get_new_adapter().await?;
    let one = first.query("SELECT 1 AS n").await?;
    let two = second.query("SELECT 2 AS n").await?;
    assert_eq!(one.rows[0].try_get::<i64>("n")?, 1);
    assert_eq!(two.rows[0].try_get::<i64>("n")?, 2);

    first.release_connection();
    second.release_connection();
    assert_eq!(pool.size(), 2);

    pool.disconnect().await;
    assert!(pool.is_closed());
    Ok(())
}

#[tokio::test]
async fn no_wait_pool_opens_connections_up_to_limit() -> OrmResult<()> {
    let Some(url) = database_url("no_wait_pool_opens_connections_up_to_limit") else {
        return Ok(());
    };
    let pool = Pool::new(
        ConnectionSettings::from_url(&url)?,
        PoolSettings::new()
            .connection_limit(1)
            .wait_for_connections(false),
    )?;

    let mut db = pool.get_new_adapter().await?;
    let out = db.query("SELECT 1 AS n").await?;
    assert_eq!(out.rows[0].try_get::<i64>("n")?, 1);

    let err = pool.get_connection().await.unwrap_err();
    assert!(matches!(err, OrmError::Pool(_)), "{err:?}");

    db.release_connection();
    let mut again = pool.get_new_adapter().await?;
    again.ping().await?;
    again.release_connection();

    pool.disconnect().await;
    Ok(())
}

async fn connection_id(db: &mut Adapter<mysql_activerecord::MySqlConnection>) -> OrmResult<u64> {
    db.query("SELECT CONNECTION_ID() AS id").await?.rows[0].try_get("id")
}

#[tokio::test]
async fn killed_connection_reconnects() -> OrmResult<()> {
    let Some(url) = database_url("killed_connection_reconnects") else {
        return Ok(());
    };
    let mut db = Adapter::connect(ConnectionSettings::from_url(&url)?).await?;
    let mut admin = Adapter::connect(ConnectionSettings::from_url(&url)?).await?;

    let id = connection_id(&mut db).await?;
    admin.query(&format!("KILL {id}")).await?;
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert!(db.query("SELECT 1").await.is_err());
    assert!(db.driver().is_reconnecting());
    let err = db.query("SELECT 1").await.unwrap_err();
    assert!(matches!(err, OrmError::Connection(_)), "{err:?}");

    let mut reconnected = false;
    for _ in 0..5 {
        tokio::time::sleep(RECONNECT_DELAY + std::time::Duration::from_millis(500)).await;
        if !db.driver().is_reconnecting() {
            reconnected = true;
            break;
        }
    }
    assert!(reconnected, "connection did not come back");
    assert_ne!(connection_id(&mut db).await?, id);

    admin.disconnect().await?;
    db.disconnect().await
}
