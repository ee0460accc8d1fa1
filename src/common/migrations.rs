// src/common/migrations.rs
//! Database schema management
//!
//! Every statement is idempotent, so this runs on each startup.

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Only drop tables if RESET_DB environment variable is set to "true"
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - dropping all tables and recreating schema");
        drop_all_tables(pool).await?;
    }

    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_user_tables(pool).await?;
    create_token_tables(pool).await?;
    create_plan_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database schema ready");
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Reverse dependency order
    let tables = vec!["plans", "password_reset_tokens", "refresh_tokens", "users"];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            name TEXT NOT NULL,
            age INTEGER,
            gender TEXT CHECK(gender IN ('male', 'female', 'other')),
            height REAL,
            weight REAL,
            location TEXT,
            fitness_level TEXT CHECK(fitness_level IN ('beginner', 'intermediate', 'advanced')),
            fitness_goal TEXT CHECK(fitness_goal IN ('weight_loss', 'muscle_gain', 'endurance', 'general_fitness')),
            dietary_pref TEXT CHECK(dietary_pref IN ('vegetarian', 'vegan', 'keto', 'paleo', 'none')),
            medical_notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_token_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id TEXT PRIMARY KEY,
            token TEXT UNIQUE NOT NULL,
            user_id TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS password_reset_tokens (
            id TEXT PRIMARY KEY,
            token TEXT UNIQUE NOT NULL,
            user_id TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_plan_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plans (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            job_id TEXT,
            age INTEGER NOT NULL,
            gender TEXT NOT NULL,
            height REAL NOT NULL,
            weight REAL NOT NULL,
            fitness_level TEXT NOT NULL,
            fitness_goal TEXT NOT NULL,
            location TEXT,
            dietary_pref TEXT,
            medical_notes TEXT,
            workout_plan TEXT NOT NULL DEFAULT '{}',
            diet_plan TEXT NOT NULL DEFAULT '{}',
            metadata TEXT,
            status TEXT NOT NULL DEFAULT 'generating'
                CHECK(status IN ('generating', 'completed', 'failed')),
            audio_url TEXT,
            pdf_url TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_password_reset_tokens_user_id ON password_reset_tokens(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_plans_user_created ON plans(user_id, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_plans_job_id ON plans(job_id)",
        "CREATE INDEX IF NOT EXISTS idx_plans_status ON plans(status)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"users"));
        assert!(names.contains(&"plans"));
        assert!(names.contains(&"refresh_tokens"));
        assert!(names.contains(&"password_reset_tokens"));
    }

    #[tokio::test]
    async fn test_plan_status_is_constrained() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO users (id, email, password_hash, name) VALUES ('U_1', 'a@b.co', 'x', 'A')")
            .execute(&pool)
            .await
            .unwrap();

        let result = sqlx::query(
            "INSERT INTO plans (id, user_id, age, gender, height, weight, fitness_level, fitness_goal, status)
             VALUES ('P_1', 'U_1', 30, 'male', 180, 80, 'beginner', 'endurance', 'paused')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
