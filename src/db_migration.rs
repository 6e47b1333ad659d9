use sqlx::SqlitePool;

use crate::errors::{DbError, DbResult};

// Embed all migration SQL files at compile time
const MIGRATION_INIT: &str = include_str!("../migrations/20250601000000_init.sql");
const MIGRATION_LEASE_PAYMENT: &str =
    include_str!("../migrations/20250618000000_add_lease_payment_fields.sql");

// List of migrations with their names and SQL content, in application order
const MIGRATIONS: &[(&str, &str)] = &[
    ("20250601000000_init.sql", MIGRATION_INIT),
    ("20250618000000_add_lease_payment_fields.sql", MIGRATION_LEASE_PAYMENT),
];

/// Apply any migrations that have not been recorded yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    create_migrations_table(pool).await?;

    let last_migration = get_last_migration(pool).await?;
    match &last_migration {
        Some(name) => log::debug!("last applied migration: {}", name),
        None => log::debug!("no migrations applied yet"),
    }

    apply_pending_migrations(pool, last_migration).await
}

/// Create migrations table if it doesn't exist
async fn create_migrations_table(pool: &SqlitePool) -> DbResult<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| DbError::Migration(format!("Failed to create migrations table: {}", e)))?;

    Ok(())
}

/// Get the last applied migration
async fn get_last_migration(pool: &SqlitePool) -> DbResult<Option<String>> {
    sqlx::query_scalar::<_, String>("SELECT name FROM migrations ORDER BY id DESC LIMIT 1")
        .fetch_optional(pool)
        .await
        .map_err(|e| DbError::Migration(format!("Failed to get last migration: {}", e)))
}

/// Apply pending migrations inside a single transaction
async fn apply_pending_migrations(
    pool: &SqlitePool,
    last_migration: Option<String>,
) -> DbResult<()> {
    let pending_migrations = get_pending_migrations(last_migration);

    if pending_migrations.is_empty() {
        log::debug!("no pending migrations to apply");
        return Ok(());
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| DbError::Transaction(format!("Failed to begin transaction: {}", e)))?;

    for (migration_name, migration_sql) in pending_migrations {
        log::info!("applying migration {}", migration_name);

        sqlx::raw_sql(migration_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DbError::Migration(format!("Failed to apply migration {}: {}", migration_name, e))
            })?;

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query("INSERT INTO migrations (name, applied_at) VALUES (?, ?)")
            .bind(migration_name)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration {}: {}",
                    migration_name, e
                ))
            })?;
    }

    tx.commit()
        .await
        .map_err(|e| DbError::Transaction(format!("Failed to commit migrations: {}", e)))?;

    Ok(())
}

/// Determine which migrations need to be applied
fn get_pending_migrations(last_migration: Option<String>) -> Vec<(&'static str, &'static str)> {
    let mut pending = Vec::new();
    let mut should_include = last_migration.is_none();

    for &(migration_name, migration_sql) in MIGRATIONS {
        if should_include {
            pending.push((migration_name, migration_sql));
        } else if Some(migration_name) == last_migration.as_deref() {
            // Found the last applied migration, include all subsequent ones
            should_include = true;
        }
    }

    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Store;

    #[test]
    fn test_pending_migration_selection() {
        let all = get_pending_migrations(None);
        assert_eq!(all.len(), MIGRATIONS.len());

        let after_first = get_pending_migrations(Some("20250601000000_init.sql".to_string()));
        assert_eq!(after_first.len(), MIGRATIONS.len() - 1);
        assert_eq!(after_first[0].0, "20250618000000_add_lease_payment_fields.sql");

        let up_to_date = get_pending_migrations(Some(
            "20250618000000_add_lease_payment_fields.sql".to_string(),
        ));
        assert!(up_to_date.is_empty());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = Store::in_memory().await.unwrap();
        run_migrations(store.pool()).await.unwrap();
        // A second run must find nothing to do
        run_migrations(store.pool()).await.unwrap();

        let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM migrations")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(applied as usize, MIGRATIONS.len());
    }
}
