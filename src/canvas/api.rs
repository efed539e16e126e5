use async_trait::async_trait;
use serde_json::Value;

use super::client::CanvasClient;
use super::error::{ApiError, MalformedRecordError};
use super::types::{Container, Item, SubContainer};

/// The remote calls the sync core needs. [`CanvasClient`] is the real
/// implementation; tests substitute an in-memory tree.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn list_containers(&self) -> Result<Vec<Container>, ApiError>;

    async fn list_sub_containers(&self, container_id: u64)
        -> Result<Vec<SubContainer>, ApiError>;

    async fn list_items(&self, sub_container_id: u64) -> Result<Vec<Item>, ApiError>;

    async fn download_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}

#[async_trait]
impl RemoteApi for CanvasClient {
    async fn list_containers(&self) -> Result<Vec<Container>, ApiError> {
        let records = self.list_courses().await?;
        Ok(parse_records(&records, Container::from_record))
    }

    async fn list_sub_containers(
        &self,
        container_id: u64,
    ) -> Result<Vec<SubContainer>, ApiError> {
        let records = self.list_folders(container_id).await?;
        Ok(parse_records(&records, |r| SubContainer::from_record(r).map(Some)))
    }

    async fn list_items(&self, sub_container_id: u64) -> Result<Vec<Item>, ApiError> {
        let records = self.list_files(sub_container_id).await?;
        Ok(parse_records(&records, |r| Item::from_record(r).map(Some)))
    }

    async fn download_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.download(url).await
    }
}

/// Convert raw records, keeping API order. Malformed records are logged and
/// skipped so one bad entry does not hide its siblings; `Ok(None)` records
/// are dropped silently.
fn parse_records<T, F>(records: &[Value], parse: F) -> Vec<T>
where
    F: Fn(&Value) -> Result<Option<T>, MalformedRecordError>,
{
    records
        .iter()
        .filter_map(|record| match parse(record) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping record: {}", e);
                None
            }
        })
        .collect()
}
