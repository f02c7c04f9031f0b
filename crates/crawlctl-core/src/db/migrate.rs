//! Database migration system
//!
//! Runs migrations on startup and tracks which have been applied.

use sqlx::{PgPool, Row};
use tracing::{error, info, warn};

use crate::{Error, Result};

/// Migration record tracking applied migrations
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
}

const MIGRATION_001_JOB_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS job (
    id                 TEXT PRIMARY KEY,
    status             TEXT NOT NULL DEFAULT 'PENDING',
    result_html        TEXT,
    urls_submitted     INTEGER NOT NULL,
    urls_succeeded     INTEGER NOT NULL DEFAULT 0,
    urls_failed        INTEGER NOT NULL DEFAULT 0,
    user_id            TEXT,
    execution_time_ms  BIGINT,
    started_at         TIMESTAMPTZ,
    completed_at       TIMESTAMPTZ,
    created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_job_status ON job (status);
CREATE INDEX IF NOT EXISTS idx_job_user_id ON job (user_id);
CREATE INDEX IF NOT EXISTS idx_job_succeeded_completed
    ON job (completed_at DESC)
    WHERE status = 'SUCCEEDED';
"#;

/// Database migration manager
pub struct Migrator {
    pool: PgPool,
}

impl Migrator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn init_migration_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_applied_migrations(&self) -> Result<Vec<Migration>> {
        let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
            .fetch_all(&self.pool)
            .await?;

        let migrations = rows
            .into_iter()
            .map(|row| Migration {
                version: row.get("version"),
                name: row.get("name"),
                applied_at: row.get("applied_at"),
            })
            .collect();

        Ok(migrations)
    }

    async fn record_migration(&self, version: i64, name: &str) -> Result<()> {
        sqlx::query("INSERT INTO _migrations (version, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(version)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Run all pending migrations
    pub async fn migrate(&self) -> Result<()> {
        info!("Initializing migration system...");
        self.init_migration_table().await?;

        let applied = self.get_applied_migrations().await?;
        info!("Found {} applied migrations", applied.len());

        let migrations = [(1i64, "job_table", MIGRATION_001_JOB_TABLE)];

        for (version, name, sql) in migrations {
            if applied.iter().any(|m| m.version == version) {
                info!("Migration {} ({}) already applied, skipping", version, name);
                continue;
            }

            info!("Applying migration {} ({})...", version, name);

            sqlx::raw_sql(sql).execute(&self.pool).await.map_err(|e| {
                error!("Failed to execute migration {}: {}", version, e);
                Error::from(e)
            })?;

            self.record_migration(version, name).await?;
            info!("Migration {} ({}) applied successfully", version, name);
        }

        info!("All migrations completed successfully!");
        Ok(())
    }

    /// Reset database (drop all tables and re-run migrations)
    pub async fn reset(&self) -> Result<()> {
        warn!("RESETTING DATABASE - This will delete all data!");

        sqlx::query("DROP TABLE IF EXISTS job CASCADE")
            .execute(&self.pool)
            .await?;
        sqlx::query("DROP TABLE IF EXISTS _migrations CASCADE")
            .execute(&self.pool)
            .await?;

        info!("Database reset complete. Re-running migrations...");
        self.migrate().await?;

        Ok(())
    }

    /// Get database status
    pub async fn status(&self) -> Result<DbStatus> {
        self.init_migration_table().await?;

        let applied = self.get_applied_migrations().await?;

        let job_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);

        let pending_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job WHERE status = 'PENDING'")
            .fetch_one(&self.pool)
            .await
            .unwrap_or(0);

        Ok(DbStatus {
            applied_migrations: applied.len() as i64,
            job_count,
            pending_count,
        })
    }
}

/// Database status information
#[derive(Debug, Clone)]
pub struct DbStatus {
    pub applied_migrations: i64,
    pub job_count: i64,
    pub pending_count: i64,
}

/// Run migrations automatically on server start
pub async fn auto_migrate(pool: &PgPool) -> Result<()> {
    let migrator = Migrator::new(pool.clone());
    migrator.migrate().await?;
    Ok(())
}
