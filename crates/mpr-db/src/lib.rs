//! mpr-db
//!
//! Postgres persistence for spot prices, formula variants and variant
//! configurations. [`PgStore`] implements the reconciliation store ports.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};

mod formulas;
mod spot;
mod store;
mod variants;

pub use formulas::{get_active_formula, list_formulas, set_active_formula};
pub use spot::{
    import_spot_prices, insert_spot_prices, latest_spot_price, read_spot_prices_csv,
    SpotImportReport,
};
pub use store::PgStore;
pub use variants::{get_variant_config, list_variant_configs, upsert_variant_config};

pub const ENV_DB_URL: &str = "MPR_DATABASE_URL";

/// Connect to Postgres using MPR_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL)
        .with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_schema: bool,
}

/// Connectivity plus schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = 'formula_variants'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_schema: exists,
    })
}

/// Postgres SQLSTATE of a database error, if any.
pub(crate) fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Unique violation (23505) on the named constraint or index.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505") && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
