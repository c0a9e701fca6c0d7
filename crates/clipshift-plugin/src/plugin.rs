//! The plugin object the platform holds on to.

use std::sync::Arc;

use clipshift_core::{ConfigError, ConfigGate, Configuration, FileDescriptor, HookContext, Post};
use clipshift_processing::{PreviewProfile, ScratchWorkspace, Transcoder};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::api::PluginApi;
use crate::enrich::{EnrichmentOutcome, PreviewPipeline};
use crate::upload::{UploadDecision, UploadInterceptor};

/// Video conversion and preview plugin.
///
/// `Send + Sync`; the hooks may be called concurrently. Each hook reads the
/// configuration exactly once on entry, so a reload mid-invocation does not
/// affect it.
pub struct ClipshiftPlugin {
    api: Arc<dyn PluginApi>,
    config: ConfigGate,
    transcoder: Arc<dyn Transcoder>,
    workspace: ScratchWorkspace,
    profile: PreviewProfile,
}

impl ClipshiftPlugin {
    /// Plugin with both features off, the OS temp dir as scratch space and
    /// animated previews.
    pub fn new(api: Arc<dyn PluginApi>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            api,
            config: ConfigGate::default(),
            transcoder,
            workspace: ScratchWorkspace::default(),
            profile: PreviewProfile::default(),
        }
    }

    pub fn with_configuration(self, config: Configuration) -> Self {
        self.config.replace(config);
        self
    }

    pub fn with_workspace(mut self, workspace: ScratchWorkspace) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn with_preview_profile(mut self, profile: PreviewProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn configuration(&self) -> Arc<Configuration> {
        self.config.snapshot()
    }

    pub fn set_configuration(&self, config: Configuration) {
        self.config.replace(config);
    }

    pub fn preview_profile(&self) -> PreviewProfile {
        self.profile
    }

    /// Apply new plugin settings from the platform.
    ///
    /// On error the previous configuration stays active.
    pub fn on_configuration_change(&self, settings: &Value) -> Result<(), ConfigError> {
        let config = Configuration::from_settings(settings)?;
        tracing::info!(
            convert_mov_to_mp4 = config.convert_mov_to_mp4,
            create_preview_image = config.create_preview_image,
            conversion_file_size_limit = config.conversion_file_size_limit,
            preview_file_size_limit = config.preview_file_size_limit,
            "Configuration updated"
        );
        self.config.replace(config);
        Ok(())
    }

    /// Pre-commit hook, returning the `(descriptor, error)` pair the
    /// platform expects.
    ///
    /// `(None, "")` keeps the upload unchanged, `(Some(info), "")` commits
    /// the bytes written to `destination` with `info`, and a non-empty
    /// message rejects the upload.
    pub async fn file_will_be_uploaded<R, W>(
        &self,
        ctx: &HookContext,
        info: Option<&FileDescriptor>,
        source: &mut R,
        destination: &mut W,
    ) -> (Option<FileDescriptor>, String)
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.intercept_upload(ctx, info, source, destination)
            .await
            .into_host_reply()
    }

    /// Pre-commit hook with a typed result.
    #[tracing::instrument(skip_all, fields(
        request_id = %ctx.request_id,
        file.name = info.map(|i| i.name.as_str()).unwrap_or_default()
    ))]
    pub async fn intercept_upload<R, W>(
        &self,
        ctx: &HookContext,
        info: Option<&FileDescriptor>,
        source: &mut R,
        destination: &mut W,
    ) -> UploadDecision
    where
        R: AsyncRead + Unpin + ?Sized,
        W: AsyncWrite + Unpin + ?Sized,
    {
        let config = self.config.snapshot();
        UploadInterceptor::new(self.transcoder.as_ref(), &self.workspace)
            .intercept(&config, info, source, destination)
            .await
    }

    /// Post-commit hook. Failures are logged, never returned.
    pub async fn message_has_been_posted(&self, ctx: &HookContext, post: &Post) {
        self.enrich_post(ctx, post).await;
    }

    /// Post-commit hook with a typed result.
    #[tracing::instrument(skip_all, fields(
        request_id = %ctx.request_id,
        post_id = %post.id,
        attachments = post.file_ids.len()
    ))]
    pub async fn enrich_post(&self, ctx: &HookContext, post: &Post) -> EnrichmentOutcome {
        let config = self.config.snapshot();
        PreviewPipeline::new(
            self.api.as_ref(),
            self.transcoder.as_ref(),
            &self.workspace,
            self.profile,
        )
        .enrich(&config, post)
        .await
    }
}
