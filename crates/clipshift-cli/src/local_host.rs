use async_trait::async_trait;
use clipshift_core::{FileDescriptor, Post};
use clipshift_plugin::{ApiError, PluginApi};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const POSTS_FILE: &str = "posts.jsonl";

/// Directory-backed stand-in for the messaging platform.
///
/// Files live at `<root>/<id>/<name>` with metadata in `<root>/<id>.json`;
/// posts are appended to `<root>/posts.jsonl`, one JSON object per line.
#[derive(Debug, Clone)]
pub struct LocalHost {
    root: PathBuf,
}

impl LocalHost {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All posts in creation order.
    pub async fn posts(&self) -> Result<Vec<Post>, ApiError> {
        let path = self.root.join(POSTS_FILE);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(rejected("read posts", &path, e)),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| rejected("parse post", &path, e)))
            .collect()
    }

    /// Ids are generated here, so anything that could leave the root is unknown.
    fn id_dir(&self, file_id: &str) -> Result<PathBuf, ApiError> {
        if file_id.is_empty()
            || file_id.contains("..")
            || file_id.contains('/')
            || file_id.contains('\\')
        {
            return Err(ApiError::NotFound(file_id.to_string()));
        }
        Ok(self.root.join(file_id))
    }

    fn sidecar_path(&self, file_id: &str) -> Result<PathBuf, ApiError> {
        self.id_dir(file_id)?;
        Ok(self.root.join(format!("{}.json", file_id)))
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> Result<(), ApiError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| rejected("create directory", parent, e))?;
        }

        let mut file = fs::File::create(path)
            .await
            .map_err(|e| rejected("create file", path, e))?;
        file.write_all(data)
            .await
            .map_err(|e| rejected("write file", path, e))?;
        file.sync_all()
            .await
            .map_err(|e| rejected("sync file", path, e))?;
        Ok(())
    }
}

fn rejected(action: &str, path: &Path, e: impl std::fmt::Display) -> ApiError {
    ApiError::Rejected(format!("Failed to {} {}: {}", action, path.display(), e))
}

/// MIME type for the media extensions the hooks deal with.
pub fn mime_type_for(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "mov" => "video/quicktime",
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl PluginApi for LocalHost {
    async fn get_file_info(&self, file_id: &str) -> Result<FileDescriptor, ApiError> {
        let path = self.sidecar_path(file_id)?;
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ApiError::NotFound(file_id.to_string()))
            }
            Err(e) => return Err(rejected("read metadata", &path, e)),
        };
        serde_json::from_slice(&raw).map_err(|e| rejected("parse metadata", &path, e))
    }

    async fn get_file(&self, file_id: &str) -> Result<Vec<u8>, ApiError> {
        let info = self.get_file_info(file_id).await?;
        let path = self.id_dir(file_id)?.join(&info.name);
        let start = std::time::Instant::now();

        let data = fs::read(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ApiError::NotFound(file_id.to_string()),
            _ => rejected("read file", &path, e),
        })?;

        tracing::debug!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local host read file"
        );
        Ok(data)
    }

    async fn upload_file(
        &self,
        data: Vec<u8>,
        channel_id: &str,
        name: &str,
    ) -> Result<FileDescriptor, ApiError> {
        let name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::Rejected(format!("Invalid file name: {:?}", name)))?
            .to_string();
        let extension = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let id = Uuid::new_v4().simple().to_string();
        let dir = self.id_dir(&id)?;
        let path = dir.join(&name);
        self.write_file(&path, &data).await?;

        let info = FileDescriptor {
            id: id.clone(),
            mime_type: mime_type_for(&extension).to_string(),
            size: data.len() as i64,
            path: format!("{}/{}", id, name),
            channel_id: Some(channel_id.to_string()),
            create_at: chrono::Utc::now().timestamp_millis(),
            name,
            extension,
            ..Default::default()
        };

        let sidecar = serde_json::to_vec_pretty(&info)
            .map_err(|e| ApiError::Rejected(format!("Failed to serialize metadata: {}", e)))?;
        self.write_file(&self.sidecar_path(&id)?, &sidecar).await?;

        tracing::info!(
            file_id = %info.id,
            path = %path.display(),
            size_bytes = info.size,
            "Local host stored file"
        );
        Ok(info)
    }

    async fn create_post(&self, mut post: Post) -> Result<Post, ApiError> {
        if post.id.is_empty() {
            post.id = Uuid::new_v4().simple().to_string();
        }
        if post.create_at == 0 {
            post.create_at = chrono::Utc::now().timestamp_millis();
        }

        let mut line = serde_json::to_string(&post)
            .map_err(|e| ApiError::Rejected(format!("Failed to serialize post: {}", e)))?;
        line.push('\n');

        let path = self.root.join(POSTS_FILE);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| rejected("open", &path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| rejected("append to", &path, e))?;
        file.flush()
            .await
            .map_err(|e| rejected("flush", &path, e))?;

        tracing::info!(post_id = %post.id, root_id = %post.root_id, "Local host created post");
        Ok(post)
    }
}
