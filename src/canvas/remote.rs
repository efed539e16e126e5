//! Fail-soft boundary around [`RemoteApi`].
//!
//! Nothing past this point sees an `ApiError`: failed list calls become
//! empty lists plus a `FetchError` event, failed downloads become `None`
//! plus a `DownloadFailed` event. The caller carries on with the siblings.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::api::RemoteApi;
use super::error::ApiError;
use super::types::{Container, Item, SubContainer};
use crate::events::{EventSink, FetchScope, SyncEvent};

pub struct Remote<'a> {
    api: &'a dyn RemoteApi,
    sink: &'a dyn EventSink,
    fetch_errors: AtomicUsize,
}

impl<'a> Remote<'a> {
    pub fn new(api: &'a dyn RemoteApi, sink: &'a dyn EventSink) -> Self {
        Self {
            api,
            sink,
            fetch_errors: AtomicUsize::new(0),
        }
    }

    pub async fn list_containers(&self) -> Vec<Container> {
        match self.api.list_containers().await {
            Ok(containers) => containers,
            Err(e) => self.fetch_failed(FetchScope::Containers, None, &e),
        }
    }

    pub async fn list_sub_containers(&self, container_id: u64) -> Vec<SubContainer> {
        match self.api.list_sub_containers(container_id).await {
            Ok(folders) => folders,
            Err(e) => self.fetch_failed(FetchScope::SubContainers, Some(container_id), &e),
        }
    }

    pub async fn list_items(&self, sub_container_id: u64) -> Vec<Item> {
        match self.api.list_items(sub_container_id).await {
            Ok(items) => items,
            Err(e) => self.fetch_failed(FetchScope::Items, Some(sub_container_id), &e),
        }
    }

    /// Content of `item`, or `None` after emitting `DownloadFailed`.
    pub async fn download_bytes(&self, item: &Item) -> Option<Vec<u8>> {
        let result = match item.download_url.as_deref() {
            Some(url) => self.api.download_bytes(url).await,
            None => Err(ApiError::NoDownloadUrl),
        };
        match result {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("Download of file ID {} failed: {}", item.id, e);
                self.sink.emit(SyncEvent::DownloadFailed {
                    id: item.id,
                    name: item.display_name.clone(),
                });
                None
            }
        }
    }

    /// Number of list calls that failed so far.
    pub fn fetch_errors(&self) -> usize {
        self.fetch_errors.load(Ordering::Relaxed)
    }

    fn fetch_failed<T>(&self, scope: FetchScope, id: Option<u64>, e: &ApiError) -> Vec<T> {
        tracing::debug!("Fetching {} failed: {}", scope, e);
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
        self.sink.emit(SyncEvent::FetchError {
            scope,
            id,
            status: e.status(),
        });
        Vec::new()
    }
}
