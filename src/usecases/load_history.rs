use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::{
        message::{format_unix_seconds, MessageSummary},
        peer::InputPeer,
    },
    telegram::{
        entities::EntityIndex,
        resolve::DisplayEntity,
        tl::{MessageClass, MessagesResponse, Peer},
        UpstreamError,
    },
    usecases::resolve_dialog::{resolve_dialog, PeerLookup, ResolveDialogError},
};

const HISTORY_PAGE_SIZE: i32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadHistoryQuery {
    pub name: String,
    /// Only messages older than this id are returned; 0 starts from the newest.
    pub offset_id: i32,
}

impl LoadHistoryQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            offset_id: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadHistoryOutput {
    pub messages: Vec<MessageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i32>,
}

pub trait HistorySource {
    fn get_history(
        &self,
        peer: InputPeer,
        offset_id: i32,
        limit: i32,
    ) -> Result<MessagesResponse, UpstreamError>;
}

impl<T> HistorySource for &T
where
    T: HistorySource + ?Sized,
{
    fn get_history(
        &self,
        peer: InputPeer,
        offset_id: i32,
        limit: i32,
    ) -> Result<MessagesResponse, UpstreamError> {
        (*self).get_history(peer, offset_id, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadHistoryError {
    #[error(transparent)]
    Dialog(ResolveDialogError),
    #[error("failed to get history: {0}")]
    Upstream(UpstreamError),
    #[error("failed to process history: unexpected response shape")]
    UnexpectedShape,
    #[error("call cancelled")]
    Cancelled,
}

pub fn load_history(
    lookup: &dyn PeerLookup,
    source: &dyn HistorySource,
    query: LoadHistoryQuery,
) -> Result<LoadHistoryOutput, LoadHistoryError> {
    let peer = resolve_dialog(lookup, &query.name).map_err(map_resolve_error)?;
    let response = source
        .get_history(peer, query.offset_id, HISTORY_PAGE_SIZE)
        .map_err(map_source_error)?;
    let page = build_history(&response)?;

    Ok(LoadHistoryOutput {
        messages: page.messages,
        offset: (page.next_offset != 0).then_some(page.next_offset),
    })
}

fn map_resolve_error(error: ResolveDialogError) -> LoadHistoryError {
    match error {
        ResolveDialogError::Cancelled => LoadHistoryError::Cancelled,
        other => LoadHistoryError::Dialog(other),
    }
}

fn map_source_error(error: UpstreamError) -> LoadHistoryError {
    match error {
        UpstreamError::Cancelled => LoadHistoryError::Cancelled,
        other => LoadHistoryError::Upstream(other),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    pub messages: Vec<MessageSummary>,
    /// Id of the last real message received, 0 when the page had none.
    pub next_offset: i32,
}

pub fn build_history(response: &MessagesResponse) -> Result<HistoryPage, LoadHistoryError> {
    let (messages, users) = match response {
        MessagesResponse::Messages(payload)
        | MessagesResponse::Slice(payload)
        | MessagesResponse::ChannelMessages(payload) => (&payload.messages, &payload.users),
        MessagesResponse::Unknown => return Err(LoadHistoryError::UnexpectedShape),
    };

    let index = EntityIndex::users_only(users);
    let real: Vec<_> = messages.iter().filter_map(MessageClass::as_message).collect();

    let summaries = real
        .iter()
        .map(|message| MessageSummary {
            who: sender_handle(message.from_id, &index),
            when: format_unix_seconds(message.date),
            text: message.message.clone(),
            timestamp: message.date,
        })
        .collect();

    Ok(HistoryPage {
        messages: summaries,
        next_offset: real.last().map_or(0, |message| message.id),
    })
}

fn sender_handle(from: Option<Peer>, index: &EntityIndex<'_>) -> String {
    match from {
        Some(Peer::User { user_id }) => index
            .user(user_id)
            .map(|user| user.handle())
            .unwrap_or_default(),
        _ => String::new(),
    }
}
