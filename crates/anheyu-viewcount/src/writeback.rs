//! View-count writeback job (§4.4.1, daily 02:00 UTC+8).

use crate::keys;
use anheyu_cache::CacheAdapter;
use anheyu_id::Codec;
use anheyu_types::collaborators::ArticleRepository;
use anheyu_types::EntityType;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub struct Writeback {
    pub cache: Arc<dyn CacheAdapter>,
    pub codec: Arc<Codec>,
    pub article_repo: Arc<dyn ArticleRepository>,
}

impl Writeback {
    pub async fn run(&self) -> anyhow::Result<()> {
        let drained = self.cache.get_and_delete_many(&keys::article_view_count_scan_pattern()).await?;
        if drained.is_empty() {
            return Ok(());
        }

        let prefix = keys::view_count_key_prefix();
        let mut deltas: HashMap<u64, i64> = HashMap::new();
        for (key, value) in drained {
            let Some(public_id) = key.strip_prefix(&prefix) else {
                warn!(%key, "view-count key missing expected prefix, skipping");
                continue;
            };
            let db_id = match self.codec.decode_expect(public_id, EntityType::Article) {
                Ok(id) => id,
                Err(e) => {
                    warn!(%public_id, error = %e, "unparseable article public id, skipping");
                    continue;
                }
            };
            let delta: i64 = match value.parse() {
                Ok(d) => d,
                Err(_) => {
                    warn!(%public_id, %value, "non-integer view-count delta, skipping");
                    continue;
                }
            };
            *deltas.entry(db_id).or_insert(0) += delta;
        }

        if deltas.is_empty() {
            return Ok(());
        }
        self.article_repo.batch_increment_views(&deltas).await?;
        Ok(())
    }
}
