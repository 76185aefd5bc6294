//! Exactly one formula variant is active after every switch, including a
//! rejected switch to an unknown id.
//!
//! DB-backed test, skipped if MPR_DATABASE_URL is not set.

use anyhow::Result;
use mpr_reconcile::{FormulaRegistry, StoreError};

async fn active_count(pool: &sqlx::PgPool) -> Result<i64> {
    let (n,): (i64,) =
        sqlx::query_as("select count(*)::bigint from formula_variants where is_active")
            .fetch_one(pool)
            .await?;
    Ok(n)
}

#[tokio::test]
async fn set_active_leaves_exactly_one_active_row() -> Result<()> {
    let url = match std::env::var(mpr_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: MPR_DATABASE_URL not set");
            return Ok(());
        }
    };
    let pool = mpr_db::connect(&url).await?;
    mpr_db::migrate(&pool).await?;
    let store = mpr_db::PgStore::new(pool.clone());

    let all = FormulaRegistry::list_all(&store).await?;
    assert!(all.len() >= 4);
    let original = store.get_active().await?.map(|f| f.id);

    for f in all.iter().rev() {
        let active = store.set_active(f.id).await?;
        assert_eq!(active.id, f.id);
        assert!(active.is_active);
        assert_eq!(active_count(&pool).await?, 1);
    }

    let before = store.get_active().await?.map(|f| f.id);
    let err = store.set_active(i64::MAX).await.unwrap_err();
    assert!(matches!(err, StoreError::FormulaNotFound(_)), "{err}");
    assert_eq!(store.get_active().await?.map(|f| f.id), before);
    assert_eq!(active_count(&pool).await?, 1);

    // A second row flipped on bypassing the registry hits the partial index.
    let bypass = sqlx::query(
        "update formula_variants set is_active = true where id = (select min(id) from formula_variants where not is_active)",
    )
    .execute(&pool)
    .await;
    let db_err = bypass.unwrap_err();
    assert!(
        matches!(&db_err, sqlx::Error::Database(e) if e.code().as_deref() == Some("23505")),
        "{db_err}"
    );

    if let Some(id) = original {
        store.set_active(id).await?;
    }
    Ok(())
}
