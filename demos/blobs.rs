use cratedb_http::{blob_digest, CrateDbClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let endpoint = std::env::var("CRATEDB_URL").unwrap_or_else(|_| "localhost:4200".to_owned());
    let db = CrateDbClient::new(endpoint);

    db.create_blob_table("my_blobs", 1, 0).await?;

    let payload = b"my crazy".to_vec();
    let digest = blob_digest(&payload);

    if !db.blob_put("my_blobs", &digest, payload).await? {
        anyhow::bail!("upload of {digest} was rejected");
    }

    match db.blob_get("my_blobs", &digest).await? {
        Some(data) => println!("downloaded {} byte(s)", data.len()),
        None => println!("blob {digest} not found"),
    }

    println!("deleted: {}", db.blob_delete("my_blobs", &digest).await?);
    println!("blob tables: {:?}", db.blob_tables().await?);
    db.drop_table("my_blobs", true).await?;

    Ok(())
}
