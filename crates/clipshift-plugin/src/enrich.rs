//! Post-commit enrichment: preview media for video attachments, posted as a
//! threaded reply to the original message.

use clipshift_core::{Configuration, PipelineError, Post};
use clipshift_processing::{NamePattern, PreviewProfile, ScratchWorkspace, Transcoder};

use crate::api::PluginApi;

/// Attachment extensions a preview is rendered for (case-insensitive).
pub const PREVIEW_EXTENSIONS: [&str; 3] = ["mp4", "m4v", "mov"];

/// What the hook did for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentOutcome {
    /// Preview creation is turned off; no platform calls were made.
    Disabled,
    /// No attachment produced an artifact, so no reply was posted.
    NoArtifacts,
    /// The reply as stored by the platform.
    Posted(Post),
    /// Artifacts were uploaded but the reply could not be created.
    PostFailed(String),
}

pub struct PreviewPipeline<'a> {
    api: &'a dyn PluginApi,
    transcoder: &'a dyn Transcoder,
    workspace: &'a ScratchWorkspace,
    profile: PreviewProfile,
}

impl<'a> PreviewPipeline<'a> {
    pub fn new(
        api: &'a dyn PluginApi,
        transcoder: &'a dyn Transcoder,
        workspace: &'a ScratchWorkspace,
        profile: PreviewProfile,
    ) -> Self {
        Self {
            api,
            transcoder,
            workspace,
            profile,
        }
    }

    /// Render previews for every supported attachment of `post`, one after
    /// another, and reply with all of them in a single post.
    ///
    /// A failing attachment is logged and skipped; it never affects the
    /// others or the original message.
    pub async fn enrich(&self, config: &Configuration, post: &Post) -> EnrichmentOutcome {
        if !config.create_preview_image {
            return EnrichmentOutcome::Disabled;
        }

        let mut file_ids = Vec::new();
        for file_id in &post.file_ids {
            match self.derive(config, &post.channel_id, file_id).await {
                Ok(Some(ids)) => file_ids.extend(ids),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        file_id = %file_id,
                        error_code = e.error_code(),
                        "{}",
                        e
                    );
                }
            }
        }

        if file_ids.is_empty() {
            return EnrichmentOutcome::NoArtifacts;
        }

        let count = file_ids.len();
        match self
            .api
            .create_post(Post::reply_with_files(post, file_ids))
            .await
        {
            Ok(reply) => {
                tracing::info!(
                    post_id = %post.id,
                    reply_id = %reply.id,
                    artifacts = count,
                    "Posted preview reply"
                );
                EnrichmentOutcome::Posted(reply)
            }
            Err(e) => {
                let message = PipelineError::storage("create post", e).to_string();
                tracing::warn!(post_id = %post.id, "{}", message);
                EnrichmentOutcome::PostFailed(message)
            }
        }
    }

    /// Ids of the uploaded artifacts for one attachment, or `None` when the
    /// attachment is not eligible.
    async fn derive(
        &self,
        config: &Configuration,
        channel_id: &str,
        file_id: &str,
    ) -> Result<Option<Vec<String>>, PipelineError> {
        let info = match self.api.get_file_info(file_id).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!(file_id = %file_id, error = %e, "No file info, skipping");
                return Ok(None);
            }
        };

        let extension = info.normalized_extension();
        if !PREVIEW_EXTENSIONS.contains(&extension.as_str()) {
            tracing::debug!(file_id = %file_id, extension = %extension, "Not a video, skipping");
            return Ok(None);
        }
        if config.exceeds_preview_limit(info.size) {
            tracing::debug!(file_id = %file_id, size = info.size, "Over preview size limit, skipping");
            return Ok(None);
        }

        let data = self
            .api
            .get_file(file_id)
            .await
            .map_err(|e| PipelineError::storage("get file", e))?;

        let source = self
            .workspace
            .stage(
                &NamePattern::new(format!("{}.", info.base_name()), format!(".{}", extension)),
                "preview",
                &data,
            )
            .await?;
        drop(data);

        let artifacts = self
            .profile
            .render(self.transcoder, self.workspace, &source)
            .await?;
        drop(source);

        let mut ids = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let uploaded = self
                .api
                .upload_file(artifact.bytes.to_vec(), channel_id, artifact.name)
                .await
                .map_err(|e| PipelineError::storage("upload preview image", e))?;
            tracing::debug!(
                file_id = %file_id,
                artifact_id = %uploaded.id,
                name = artifact.name,
                "Uploaded preview"
            );
            ids.push(uploaded.id);
        }
        Ok(Some(ids))
    }
}
