//! In-memory [`RemoteApi`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use super::api::RemoteApi;
use super::error::ApiError;
use super::types::{Container, Item, SubContainer};

#[derive(Default)]
struct State {
    courses: Vec<Container>,
    folders: HashMap<u64, Vec<SubContainer>>,
    files: HashMap<u64, Vec<Item>>,
    blobs: HashMap<String, Vec<u8>>,
    courses_status: Option<u16>,
    folders_status: HashMap<u64, u16>,
    files_status: HashMap<u64, u16>,
    failing_downloads: HashSet<String>,
    folder_requests: Vec<u64>,
    downloads: usize,
}

#[derive(Default)]
pub struct FakeCanvas {
    state: Mutex<State>,
}

impl FakeCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_course(&self, id: u64, name: &str, code: &str) {
        self.state().courses.push(Container {
            id,
            name: name.into(),
            code: code.into(),
            children: Vec::new(),
        });
    }

    pub fn add_folder(&self, course_id: u64, id: u64, full_name: &str) {
        self.state()
            .folders
            .entry(course_id)
            .or_default()
            .push(SubContainer {
                id,
                raw_path: full_name.into(),
                items: Vec::new(),
            });
    }

    /// Add a file or replace one with the same id, serving `content` from
    /// `http://x/{id}`.
    pub fn put_file(&self, folder_id: u64, id: u64, version: &str, name: &str, content: &[u8]) {
        let url = format!("http://x/{id}");
        let item = Item {
            id,
            version_token: version.into(),
            download_url: Some(url.clone()),
            display_name: name.into(),
        };
        let mut state = self.state();
        let files = state.files.entry(folder_id).or_default();
        match files.iter_mut().find(|f| f.id == id) {
            Some(existing) => *existing = item,
            None => files.push(item),
        }
        state.blobs.insert(url, content.to_vec());
    }

    pub fn add_locked_file(&self, folder_id: u64, id: u64, version: &str, name: &str) {
        self.state().files.entry(folder_id).or_default().push(Item {
            id,
            version_token: version.into(),
            download_url: None,
            display_name: name.into(),
        });
    }

    pub fn fail_courses(&self, status: u16) {
        self.state().courses_status = Some(status);
    }

    pub fn fail_folders(&self, course_id: u64, status: u16) {
        self.state().folders_status.insert(course_id, status);
    }

    pub fn fail_items(&self, folder_id: u64, status: u16) {
        self.state().files_status.insert(folder_id, status);
    }

    pub fn fail_download(&self, file_id: u64) {
        self.state()
            .failing_downloads
            .insert(format!("http://x/{file_id}"));
    }

    pub fn heal_download(&self, file_id: u64) {
        self.state()
            .failing_downloads
            .remove(&format!("http://x/{file_id}"));
    }

    pub fn download_count(&self) -> usize {
        self.state().downloads
    }

    /// Course ids whose folders were requested, in request order.
    pub fn folder_requests(&self) -> Vec<u64> {
        self.state().folder_requests.clone()
    }
}

fn http_error(status: u16, path: String) -> ApiError {
    ApiError::HttpStatus { status, path }
}

#[async_trait]
impl RemoteApi for FakeCanvas {
    async fn list_containers(&self) -> Result<Vec<Container>, ApiError> {
        let state = self.state();
        match state.courses_status {
            Some(status) => Err(http_error(status, "courses".into())),
            None => Ok(state.courses.clone()),
        }
    }

    async fn list_sub_containers(
        &self,
        container_id: u64,
    ) -> Result<Vec<SubContainer>, ApiError> {
        let mut state = self.state();
        state.folder_requests.push(container_id);
        if let Some(&status) = state.folders_status.get(&container_id) {
            return Err(http_error(status, format!("courses/{container_id}/folders")));
        }
        Ok(state.folders.get(&container_id).cloned().unwrap_or_default())
    }

    async fn list_items(&self, sub_container_id: u64) -> Result<Vec<Item>, ApiError> {
        let state = self.state();
        if let Some(&status) = state.files_status.get(&sub_container_id) {
            return Err(http_error(status, format!("folders/{sub_container_id}/files")));
        }
        Ok(state.files.get(&sub_container_id).cloned().unwrap_or_default())
    }

    async fn download_bytes(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let mut state = self.state();
        state.downloads += 1;
        if state.failing_downloads.contains(url) {
            return Err(ApiError::Body {
                path: url.into(),
                reason: "connection reset".into(),
            });
        }
        match state.blobs.get(url) {
            Some(bytes) if !bytes.is_empty() => Ok(bytes.clone()),
            _ => Err(ApiError::EmptyPayload { path: url.into() }),
        }
    }
}
