use anyhow::Result;
use sqlx::{Pool, Sqlite};

// Creates the read-side tables when they don't exist yet (dev databases, tests).
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
