//! Background jobs. Call `spawn_all` once during startup.

use crate::database::DynStore;
use crate::services::{CatalogService, OutboxService};
use std::sync::Arc;
use std::time::Duration;

/// Spawn all background tasks. Detached via `tokio::spawn`; does not block.
pub fn spawn_all(
    outbox: Arc<OutboxService>,
    store: DynStore,
    catalog: CatalogService,
    interval_secs: u64,
) {
    let interval = Duration::from_secs(interval_secs.max(1));

    // 定期重放离线期间积压的记录
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            match outbox.drain(store.as_ref()).await {
                Ok(report) if report.delivered > 0 || report.remaining > 0 => log::info!(
                    "Outbox drain: delivered={}, remaining={}",
                    report.delivered,
                    report.remaining
                ),
                Ok(_) => {}
                Err(e) => log::error!("Failed to drain outbox: {e:?}"),
            }
        }
    });

    // 其他客户端直接写入后端的改动只能靠定期刷新看到
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            catalog.reload().await;
        }
    });
}
