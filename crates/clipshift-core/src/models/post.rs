use serde::{Deserialize, Serialize};

/// A message in a channel, optionally carrying file attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub root_id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub file_ids: Vec<String>,
    #[serde(default)]
    pub create_at: i64,
}

impl Post {
    /// Reply in the thread of `original` carrying `file_ids`.
    ///
    /// Channel and author are copied from the original message.
    pub fn reply_with_files(original: &Post, file_ids: Vec<String>) -> Self {
        Self {
            root_id: original.id.clone(),
            parent_id: original.id.clone(),
            channel_id: original.channel_id.clone(),
            user_id: original.user_id.clone(),
            file_ids,
            ..Default::default()
        }
    }
}
