//! Commands for the keyword context.

use serde::Deserialize;
use uuid::Uuid;
use worldhub_core::command::Command;

macro_rules! impl_command {
    ($command:ty, $name:literal) => {
        impl Command for $command {
            fn command_type(&self) -> &'static str {
                $name
            }

            fn request_id(&self) -> Option<&str> {
                self.request_id.as_deref()
            }
        }
    };
}

/// Command to add one keyword.
#[derive(Debug, Clone)]
pub struct CreateKeyword {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The editing user.
    pub actor_id: Uuid,
    /// Grouping label; empty for none.
    pub category: String,
    /// Keyword text.
    pub content: String,
    /// Whether the keyword starts enabled.
    pub enabled: bool,
    /// Ordering key; appended after the last keyword when absent.
    pub position: Option<i32>,
}

impl_command!(CreateKeyword, "keywords.create");

/// Command to change fields of one keyword. Absent fields keep their value.
#[derive(Debug, Clone)]
pub struct UpdateKeyword {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The editing user.
    pub actor_id: Uuid,
    /// The keyword to change.
    pub keyword_id: Uuid,
    /// New grouping label.
    pub category: Option<String>,
    /// New text.
    pub content: Option<String>,
    /// New enabled flag.
    pub enabled: Option<bool>,
    /// New ordering key.
    pub position: Option<i32>,
}

impl_command!(UpdateKeyword, "keywords.update");

/// Command to delete one keyword.
#[derive(Debug, Clone)]
pub struct DeleteKeyword {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The editing user.
    pub actor_id: Uuid,
    /// The keyword to delete.
    pub keyword_id: Uuid,
}

impl_command!(DeleteKeyword, "keywords.delete");

/// Command to delete several keywords at once. Ids that do not belong to the
/// world are skipped.
#[derive(Debug, Clone)]
pub struct BulkDeleteKeywords {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The editing user.
    pub actor_id: Uuid,
    /// Keywords to delete.
    pub keyword_ids: Vec<Uuid>,
}

impl_command!(BulkDeleteKeywords, "keywords.bulk_delete");

/// New position for one keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordPosition {
    /// The keyword to move.
    pub keyword_id: Uuid,
    /// Its new ordering key.
    pub position: i32,
}

/// Command to rewrite keyword positions. Ids that do not belong to the world
/// are skipped.
#[derive(Debug, Clone)]
pub struct ReorderKeywords {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The editing user.
    pub actor_id: Uuid,
    /// Requested positions.
    pub items: Vec<KeywordPosition>,
}

impl_command!(ReorderKeywords, "keywords.reorder");

/// How an import treats the existing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Delete every existing keyword, then insert the batch.
    Replace,
    /// Update drafts whose id exists, insert the rest.
    #[default]
    Additive,
}

/// One keyword of an import batch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordDraft {
    /// Existing id to update in additive mode.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Grouping label.
    #[serde(default)]
    pub category: String,
    /// Keyword text.
    pub content: String,
    /// Enabled flag, default `true`.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Ordering key; appended in batch order when absent.
    #[serde(default)]
    pub position: Option<i32>,
}

fn enabled_by_default() -> bool {
    true
}

/// Command to import a batch of keywords.
#[derive(Debug, Clone)]
pub struct ImportKeywords {
    /// Caller-supplied request id.
    pub request_id: Option<String>,
    /// The world.
    pub world_id: Uuid,
    /// The editing user.
    pub actor_id: Uuid,
    /// Replace or merge.
    pub mode: ImportMode,
    /// The batch.
    pub items: Vec<KeywordDraft>,
}

impl_command!(ImportKeywords, "keywords.import");
