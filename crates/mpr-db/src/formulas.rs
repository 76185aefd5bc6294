use anyhow::{anyhow, Context, Result};
use mpr_reconcile::StoreError;
use mpr_schemas::FormulaVariant;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::is_unique_violation;

fn row_to_formula(row: &PgRow) -> Result<FormulaVariant> {
    Ok(FormulaVariant {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        is_active: row.try_get("is_active")?,
    })
}

pub async fn list_formulas(pool: &PgPool) -> Result<Vec<FormulaVariant>> {
    let rows = sqlx::query("select id, code, is_active from formula_variants order by id")
        .fetch_all(pool)
        .await
        .context("list_formulas failed")?;
    rows.iter().map(row_to_formula).collect()
}

/// The active variant. The partial unique index guarantees at most one.
pub async fn get_active_formula(pool: &PgPool) -> Result<Option<FormulaVariant>> {
    let row = sqlx::query("select id, code, is_active from formula_variants where is_active")
        .fetch_optional(pool)
        .await
        .context("get_active_formula failed")?;
    row.as_ref().map(row_to_formula).transpose()
}

/// Make `id` the single active variant.
///
/// One transaction: lock every row, reject unknown ids, deactivate the rest,
/// activate the target. Two statements because the partial unique index is
/// checked per row.
pub async fn set_active_formula(pool: &PgPool, id: i64) -> Result<FormulaVariant, StoreError> {
    let mut tx = pool
        .begin()
        .await
        .context("set_active_formula begin failed")?;

    let ids: Vec<i64> =
        sqlx::query_scalar("select id from formula_variants order by id for update")
            .fetch_all(&mut *tx)
            .await
            .context("set_active_formula lock failed")?;
    if !ids.contains(&id) {
        tx.rollback()
            .await
            .context("set_active_formula rollback failed")?;
        return Err(StoreError::FormulaNotFound(id));
    }

    sqlx::query("update formula_variants set is_active = false where is_active and id <> $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("set_active_formula deactivate failed")?;

    let row = sqlx::query(
        r#"
        update formula_variants
        set is_active = true
        where id = $1
        returning id, code, is_active
        "#,
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "uq_formula_variants_single_active") {
            anyhow!("concurrent formula switch detected")
        } else {
            anyhow::Error::new(e).context("set_active_formula activate failed")
        }
    })?;
    let active = row_to_formula(&row)?;

    tx.commit()
        .await
        .context("set_active_formula commit failed")?;
    Ok(active)
}
