use crate::utils::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

/// 分區分批查詢：每批最多 `batch_size` 個鍵，逐批調用並合併結果
pub async fn partition_map_execute<K, V, F, Fut>(
    keys: &[K],
    batch_size: usize,
    mut fetch: F,
) -> Result<HashMap<K, V>>
where
    K: Eq + Hash + Clone,
    F: FnMut(Vec<K>) -> Fut,
    Fut: Future<Output = Result<HashMap<K, V>>>,
{
    let mut merged = HashMap::with_capacity(keys.len());
    if keys.is_empty() {
        return Ok(merged);
    }

    for batch in keys.chunks(batch_size.max(1)) {
        let part = fetch(batch.to_vec()).await?;
        merged.extend(part);
    }
    Ok(merged)
}
