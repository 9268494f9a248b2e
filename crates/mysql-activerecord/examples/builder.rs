//! Print the SQL produced by the builder (no database required).
//!
//! Run with: `cargo run --example builder -p mysql-activerecord`

use mysql_activerecord::{ClauseBuilder, InsertVerb, LikeSide, OrmResult, QueryBuilder, Record};

fn main() -> OrmResult<()> {
    let mut qb = QueryBuilder::new();

    qb.select("u.id, u.name, r.name AS role")
        .from("users u")
        .join("roles r", "r.id = u.role_id", "left")
        .where_eq("u.status", "active")
        .where_in("u.team_id", [3, 5, 8])
        .like("u.email", "@example.com", LikeSide::Before)
        .order_by("u.name")
        .limit_offset(20, 40);
    println!("{}", qb.build_get_from_state()?);

    qb.select_sum("total", Some("revenue"))?
        .group_by("customer_id")
        .having("SUM(total) > 1000");
    println!("{}", qb.build_get("orders")?);

    qb.where_eq("archived", false);
    println!("{}", qb.build_count("orders")?);

    let record = Record::new().with("name", "O'Brien").with("team_id", 3);
    println!(
        "{}",
        qb.build_insert(InsertVerb::Insert, "users", &record, "")?
    );

    let rows = vec![
        Record::new().with("sku", "A-1").with("qty", 2),
        Record::new().with("sku", "B-7").with("qty", 1),
    ];
    if let Some(sql) = qb.build_insert_batch(InsertVerb::InsertIgnore, "stock", &rows)? {
        println!("{sql}");
    }

    qb.where_eq("id", 42).limit(1);
    println!(
        "{}",
        qb.build_update("users", &Record::new().with("status", "inactive"))?
    );

    qb.where_eq("deleted_at <", mysql_activerecord::Value::raw("NOW() - INTERVAL 30 DAY"));
    println!("{}", qb.build_delete("sessions")?);

    Ok(())
}
