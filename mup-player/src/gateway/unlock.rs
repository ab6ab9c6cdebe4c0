//! Unlock fallback across alternate providers

use super::StreamGateway;
use crate::config::UnlockProvider;
use futures::future::{select_ok, BoxFuture};
use futures::FutureExt;
use mup_common::models::Song;
use tracing::debug;

/// Query every provider concurrently and take the first URL returned
///
/// Providers that fail or have nothing are ignored; `None` when all of them
/// come back empty.
pub async fn race_unlock(
    gateway: &dyn StreamGateway,
    song: &Song,
    providers: &[UnlockProvider],
) -> Option<(UnlockProvider, String)> {
    if providers.is_empty() {
        return None;
    }

    let keyword = song.search_keyword();
    let id = song.resolution_id();

    let attempts: Vec<BoxFuture<'_, Result<(UnlockProvider, String), String>>> = providers
        .iter()
        .map(|&provider| {
            let keyword = keyword.clone();
            async move {
                match gateway.resolve_unlock_url(id, &keyword, provider).await {
                    Ok(Some(url)) if !url.is_empty() => Ok((provider, url)),
                    Ok(_) => Err(format!("{}: no url", provider)),
                    Err(e) => Err(format!("{}: {}", provider, e)),
                }
            }
            .boxed()
        })
        .collect();

    match select_ok(attempts).await {
        Ok((hit, _rest)) => Some(hit),
        Err(last) => {
            debug!("All unlock providers failed for '{}' (last: {})", song.name, last);
            None
        }
    }
}
