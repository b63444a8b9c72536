use serde::Serialize;

use crate::domain::message::LastMessageSummary;

/// Semantic kind of a dialog, as reported to tool callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogType {
    Person,
    Bot,
    Group,
    Channel,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogSummary {
    /// Handle accepted back by every tool that takes a dialog name.
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub dialog_type: DialogType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessageSummary>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_empty: bool,
}
