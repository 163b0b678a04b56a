use tracing::debug;

use crate::adapter::Shared;
use crate::errors::LinkSyncResult;
use crate::inputs::StoreId;
use crate::utils::dedup_links;
use link_sync_integrity::Perspective;

/// Everything the repo currently holds. Reads the store directly and leaves
/// the cache untouched.
pub(crate) async fn render(shared: &Shared, store_id: &StoreId) -> LinkSyncResult<Perspective> {
    let statements = shared.context.store.list_statements(store_id).await?;
    debug!("render(): {} statement(s) in {}", statements.len(), store_id);
    let links = shared.proofs.attach_all(statements).await;
    Ok(Perspective {
        links: dedup_links(links),
    })
}
