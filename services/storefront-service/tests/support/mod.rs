use std::{env, time::Duration};

use anyhow::{Context, Result};
use argon2::{password_hash::SaltString, Argon2, PasswordHasher};
use dirs::cache_dir;
use pg_embed::pg_enums::PgAuthMethod;
use pg_embed::pg_fetch::{PgFetchSettings, PG_V13};
use pg_embed::postgres::{PgEmbed, PgSettings};
use portpicker::pick_unused_port;
use rand_core::OsRng;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Database for the feature-gated suites. `STOREFRONT_TEST_DATABASE_URL`
/// points at an external Postgres; without it an embedded instance boots
/// when `STOREFRONT_TEST_USE_EMBED=1`, and the caller skips otherwise.
/// Setup always applies the schema (every statement is IF NOT EXISTS) and
/// truncates the storefront tables so each test starts from an empty shop.
pub struct TestDatabase {
    pool: PgPool,
    embedded: Option<EmbeddedPg>,
}

impl TestDatabase {
    pub async fn setup() -> Result<Option<Self>> {
        let (pool, embedded) = match env::var("STOREFRONT_TEST_DATABASE_URL") {
            Ok(url) => (connect(&url).await?, None),
            Err(_) if env_flag_enabled("STOREFRONT_TEST_USE_EMBED") => {
                let embedded = EmbeddedPg::boot().await?;
                (connect(&embedded.url()).await?, Some(embedded))
            }
            Err(_) => {
                eprintln!(
                    "Skipping storefront integration tests: set STOREFRONT_TEST_DATABASE_URL or STOREFRONT_TEST_USE_EMBED=1 to run them.",
                );
                return Ok(None);
            }
        };

        apply_schema(&pool).await?;
        reset_storefront(&pool).await?;

        Ok(Some(Self { pool, embedded }))
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn teardown(self) -> Result<()> {
        if let Some(embedded) = self.embedded {
            embedded.shutdown().await;
        }
        Ok(())
    }
}

async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .context("connecting to the test database")
}

async fn apply_schema(pool: &PgPool) -> Result<()> {
    for statement in SCHEMA.split(';') {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            continue;
        }
        sqlx::query(trimmed).execute(pool).await?;
    }
    Ok(())
}

async fn reset_storefront(pool: &PgPool) -> Result<()> {
    sqlx::query("TRUNCATE cart_items, products, categories, accounts")
        .execute(pool)
        .await?;
    Ok(())
}

struct EmbeddedPg {
    pg: PgEmbed,
    _data_dir: TempDir,
}

impl EmbeddedPg {
    async fn boot() -> Result<Self> {
        if env_flag_enabled("STOREFRONT_TEST_EMBED_CLEAR_CACHE") {
            if let Some(cache) = cache_dir() {
                let _ = std::fs::remove_dir_all(cache.join("pg-embed"));
            }
        }

        let data_dir = tempdir()?;
        let port =
            pick_unused_port().context("no free port for embedded Postgres")?;

        let mut fetch_settings = PgFetchSettings::default();
        fetch_settings.version = PG_V13;

        let mut pg = PgEmbed::new(
            PgSettings {
                database_dir: data_dir.path().to_path_buf(),
                port,
                user: "postgres".to_string(),
                password: "postgres".to_string(),
                auth_method: PgAuthMethod::Plain,
                persistent: false,
                timeout: Some(Duration::from_secs(30)),
                migration_dir: None,
            },
            fetch_settings,
        )
        .await?;

        pg.setup().await?;
        pg.start_db().await?;

        Ok(Self {
            pg,
            _data_dir: data_dir,
        })
    }

    fn url(&self) -> String {
        format!("{}/postgres", self.pg.db_uri)
    }

    async fn shutdown(mut self) {
        let _ = self.pg.stop_db().await;
    }
}

#[allow(dead_code)]
pub struct SeededAccount {
    pub id: Uuid,
    pub email: String,
    pub password: String,
}

/// Insert an account directly, bypassing registration. This is the only way
/// to get an admin into a test database: admin is not self-assignable
/// through the public endpoint.
#[allow(dead_code)]
pub async fn seed_account(pool: &PgPool, username: &str, role: &str) -> Result<SeededAccount> {
    let id = Uuid::new_v4();
    let email = format!("{username}@example.com");
    let password = "CorrectHorseBatteryStaple!".to_string();
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();

    sqlx::query(
        "INSERT INTO accounts (id, username, email, password_hash, role)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(username)
    .bind(&email)
    .bind(&password_hash)
    .bind(role)
    .execute(pool)
    .await?;

    Ok(SeededAccount {
        id,
        email,
        password,
    })
}

fn env_flag_enabled(key: &str) -> bool {
    matches!(
        env::var(key).as_deref(),
        Ok("1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
    )
}
