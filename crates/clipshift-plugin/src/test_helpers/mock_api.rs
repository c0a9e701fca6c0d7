//! In-memory platform API for testing

use crate::api::{ApiError, PluginApi};
use async_trait::async_trait;
use clipshift_core::{FileDescriptor, Post};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    files: HashMap<String, (FileDescriptor, Vec<u8>)>,
    unreadable: HashSet<String>,
    failing_uploads: HashSet<usize>,
    upload_calls: usize,
    reject_posts: bool,
    uploads: Vec<FileDescriptor>,
    posts: Vec<Post>,
}

/// Mock platform keeping files and posts in memory
#[derive(Default)]
pub struct MockPluginApi {
    state: Mutex<State>,
}

impl MockPluginApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, info: FileDescriptor, data: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(info.id.clone(), (info, data.to_vec()));
    }

    /// Metadata stays readable but fetching the bytes fails.
    pub fn make_unreadable(&self, file_id: &str) {
        self.state
            .lock()
            .unwrap()
            .unreadable
            .insert(file_id.to_string());
    }

    /// Fail the `call`-th upload (1-based).
    pub fn fail_upload_call(&self, call: usize) {
        self.state.lock().unwrap().failing_uploads.insert(call);
    }

    pub fn reject_posts(&self) {
        self.state.lock().unwrap().reject_posts = true;
    }

    pub fn uploads(&self) -> Vec<FileDescriptor> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn uploaded_bytes(&self, file_id: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(file_id)
            .map(|(_, data)| data.clone())
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().unwrap().posts.clone()
    }
}

#[async_trait]
impl PluginApi for MockPluginApi {
    async fn get_file_info(&self, file_id: &str) -> Result<FileDescriptor, ApiError> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(file_id)
            .map(|(info, _)| info.clone())
            .ok_or_else(|| ApiError::NotFound(file_id.to_string()))
    }

    async fn get_file(&self, file_id: &str) -> Result<Vec<u8>, ApiError> {
        let state = self.state.lock().unwrap();
        if state.unreadable.contains(file_id) {
            return Err(ApiError::Rejected(format!("unable to read {}", file_id)));
        }
        state
            .files
            .get(file_id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| ApiError::NotFound(file_id.to_string()))
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        channel_id: &str,
        name: &str,
    ) -> Result<FileDescriptor, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.upload_calls += 1;
        let call = state.upload_calls;
        if state.failing_uploads.contains(&call) {
            return Err(ApiError::Rejected("storage quota exceeded".to_string()));
        }

        let extension = name.rsplit('.').next().unwrap_or_default().to_string();
        let info = FileDescriptor {
            id: format!("upload{}", call),
            name: name.to_string(),
            extension,
            size: data.len() as i64,
            channel_id: Some(channel_id.to_string()),
            ..Default::default()
        };
        state.uploads.push(info.clone());
        state.files.insert(info.id.clone(), (info.clone(), data));
        Ok(info)
    }

    async fn create_post(&self, mut post: Post) -> Result<Post, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.reject_posts {
            return Err(ApiError::Rejected("channel is archived".to_string()));
        }
        post.id = format!("post{}", state.posts.len() + 1);
        state.posts.push(post.clone());
        Ok(post)
    }
}
