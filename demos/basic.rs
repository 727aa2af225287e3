use cratedb_http::{CrateDbClient, Params, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let endpoint = std::env::var("CRATEDB_URL").unwrap_or_else(|_| "localhost:4200".to_owned());
    let db = CrateDbClient::new(endpoint);

    db.create_table(
        "posts",
        [("id", "string primary key"), ("title", "string"), ("views", "integer")],
    )
    .await?;

    db.insert(
        "posts",
        [
            ("id", Value::text("first")),
            ("title", Value::text("Hello CrateDB")),
            ("views", Value::integer(1)),
        ],
    )
    .await?;

    db.execute(
        "insert into posts (id, title, views) values (?, ?, ?)",
        Params::bulk([
            vec![Value::text("second"), Value::text("Bulk A"), Value::integer(2)],
            vec![Value::text("third"), Value::text("Bulk B"), Value::integer(3)],
        ]),
    )
    .await?;

    db.refresh_table("posts").await?;

    let result = db
        .execute("select id, title, views from posts order by views", ())
        .await?;
    println!("{} row(s) in {} ms", result.row_count(), result.duration());
    for row in result.select_columns(&["title", "views"]) {
        println!("{row:?}");
    }

    println!("tables: {:?}", db.tables().await?);
    db.drop_table("posts", false).await?;

    Ok(())
}
