use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::model::role::Role;

/// branch id -> ids of that branch's active managers.
/// Backs the submit-notification fan-out so every submission does not hit the
/// users table.
static MANAGER_CACHE: Lazy<Cache<u64, Arc<Vec<u64>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(Duration::from_secs(3600)) // 1h TTL
        .build()
});

pub async fn get(branch_id: u64) -> Option<Arc<Vec<u64>>> {
    MANAGER_CACHE.get(&branch_id).await
}

pub async fn put(branch_id: u64, manager_ids: Vec<u64>) {
    MANAGER_CACHE.insert(branch_id, Arc::new(manager_ids)).await;
}

/// Drop a branch entry after its manager roster changes.
pub async fn invalidate(branch_id: u64) {
    MANAGER_CACHE.invalidate(&branch_id).await;
}

/// Load every branch's manager roster into the cache (streamed).
pub async fn warmup(pool: &MySqlPool) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (u64, u64)>(
        r#"
        SELECT branch_id, id
        FROM users
        WHERE role_id = ?
        AND branch_id IS NOT NULL
        AND is_active = 1
        "#,
    )
    .bind(Role::BranchManager as u8)
    .fetch(pool);

    let mut rosters: HashMap<u64, Vec<u64>> = HashMap::new();
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (branch_id, manager_id) = row?;
        rosters.entry(branch_id).or_default().push(manager_id);
        total += 1;
    }

    let branches = rosters.len();
    for (branch_id, ids) in rosters {
        put(branch_id, ids).await;
    }

    tracing::info!(total, branches, "Manager cache warmup complete");

    Ok(())
}
