//! `mpr formula` handlers.

use anyhow::Result;

pub async fn formula_list() -> Result<()> {
    let pool = mpr_db::connect_from_env().await?;
    for f in mpr_db::list_formulas(&pool).await? {
        println!("id={} code={} active={}", f.id, f.code, f.is_active);
    }
    Ok(())
}

pub async fn formula_activate(id: i64) -> Result<()> {
    let pool = mpr_db::connect_from_env().await?;
    let active = mpr_db::set_active_formula(&pool, id).await?;
    println!("activated=true id={} code={}", active.id, active.code);
    Ok(())
}
