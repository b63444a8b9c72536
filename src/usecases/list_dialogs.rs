use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::{
        cursor::{Cursor, DialogsOffset, InvalidCursor, END_CURSOR},
        dialog::{DialogSummary, DialogType},
        message::{format_unix_seconds, truncate_words, LastMessageSummary},
    },
    telegram::{
        entities::EntityIndex,
        resolve::{resolve, ResolveError},
        tl::{ChatClass, Dialog, DialogClass, DialogsResponse, MessageClass, Peer, UserClass},
        UpstreamError,
    },
};

const DIALOGS_PAGE_SIZE: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListDialogsQuery {
    /// Token from a previous page; empty starts from the top.
    pub offset: String,
    pub only_unread: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListDialogsOutput {
    pub dialogs: Vec<DialogSummary>,
    pub offset: String,
}

pub trait DialogsSource {
    fn get_dialogs(
        &self,
        offset: DialogsOffset,
        limit: i32,
    ) -> Result<DialogsResponse, UpstreamError>;
}

impl<T: DialogsSource + ?Sized> DialogsSource for &T {
    fn get_dialogs(
        &self,
        offset: DialogsOffset,
        limit: i32,
    ) -> Result<DialogsResponse, UpstreamError> {
        (*self).get_dialogs(offset, limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListDialogsError {
    #[error(transparent)]
    InvalidCursor(#[from] InvalidCursor),
    #[error("failed to get dialogs: {0}")]
    Upstream(UpstreamError),
    #[error("failed to get dialogs: unexpected response shape")]
    UnexpectedShape,
    #[error("call cancelled")]
    Cancelled,
}

pub fn list_dialogs(
    source: &dyn DialogsSource,
    query: ListDialogsQuery,
) -> Result<ListDialogsOutput, ListDialogsError> {
    let offset = query.offset.trim();
    if offset == END_CURSOR {
        return Ok(ListDialogsOutput {
            dialogs: Vec::new(),
            offset: END_CURSOR.to_owned(),
        });
    }

    let offset = if offset.is_empty() {
        DialogsOffset::default()
    } else {
        Cursor::decode(offset)?.to_offset()
    };

    let response = source
        .get_dialogs(offset, DIALOGS_PAGE_SIZE)
        .map_err(map_source_error)?;
    let page = build_dialogs(&response, query.only_unread)?;

    tracing::debug!(
        dialogs = page.dialogs.len(),
        only_unread = query.only_unread,
        next = %page.next,
        last_page = page.next.is_end(),
        "dialog page built"
    );

    Ok(ListDialogsOutput {
        dialogs: page.dialogs,
        offset: page.next.encode(),
    })
}

fn map_source_error(error: UpstreamError) -> ListDialogsError {
    match error {
        UpstreamError::Cancelled => ListDialogsError::Cancelled,
        other => ListDialogsError::Upstream(other),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogPage {
    pub dialogs: Vec<DialogSummary>,
    pub next: Cursor,
}

/// Canonical shape every dialog-list reply is reduced to.
#[derive(Debug, Default)]
struct DialogsView<'a> {
    dialogs: &'a [DialogClass],
    messages: &'a [MessageClass],
    chats: &'a [ChatClass],
    users: &'a [UserClass],
}

fn normalize(response: &DialogsResponse) -> Result<DialogsView<'_>, ListDialogsError> {
    match response {
        DialogsResponse::Dialogs(full) => Ok(DialogsView {
            dialogs: &full.dialogs,
            messages: &full.messages,
            chats: &full.chats,
            users: &full.users,
        }),
        DialogsResponse::Slice(slice) => Ok(DialogsView {
            dialogs: &slice.dialogs,
            messages: &slice.messages,
            chats: &slice.chats,
            users: &slice.users,
        }),
        DialogsResponse::NotModified { .. } => Ok(DialogsView::default()),
        DialogsResponse::Unknown => Err(ListDialogsError::UnexpectedShape),
    }
}

/// Flattens one dialog-list reply into summaries, in server order.
pub fn build_dialogs(
    response: &DialogsResponse,
    only_unread: bool,
) -> Result<DialogPage, ListDialogsError> {
    let view = normalize(response)?;
    let index = EntityIndex::build(view.users, view.chats, view.messages);

    let mut dialogs = Vec::with_capacity(view.dialogs.len());
    for raw in view.dialogs {
        let DialogClass::Dialog(dialog) = raw else {
            tracing::debug!(dialog = ?raw, "skipping non-dialog record");
            continue;
        };

        if only_unread && dialog.unread_count == 0 {
            continue;
        }

        match summarize_dialog(dialog, &index) {
            Ok(summary) if summary.title.is_empty() => {
                tracing::debug!(name = %summary.name, "dropping dialog without a title");
            }
            Ok(summary) => dialogs.push(summary),
            Err(error) => {
                tracing::debug!(error = %error, peer = ?dialog.peer, "failed to process dialog");
            }
        }
    }

    Ok(DialogPage {
        dialogs,
        next: next_cursor(view.dialogs, &index),
    })
}

#[derive(Debug, Error)]
enum DialogError {
    #[error("dialog has no peer")]
    MissingPeer,
    #[error("dialog peer: {0}")]
    Peer(ResolveError),
    #[error("last message sender: {0}")]
    Sender(ResolveError),
}

fn summarize_dialog(
    dialog: &Dialog,
    index: &EntityIndex<'_>,
) -> Result<DialogSummary, DialogError> {
    let peer = dialog.peer.ok_or(DialogError::MissingPeer)?;
    let resolved = resolve(peer, index).map_err(DialogError::Peer)?;
    let last_message = summarize_last_message(dialog, index).map_err(DialogError::Sender)?;

    Ok(DialogSummary {
        name: resolved.handle,
        title: resolved.title,
        dialog_type: classify(peer, index),
        is_empty: last_message.is_none(),
        last_message,
    })
}

pub fn classify(peer: Peer, index: &EntityIndex<'_>) -> DialogType {
    match peer {
        Peer::Channel { .. } => DialogType::Channel,
        Peer::Chat { .. } => DialogType::Group,
        Peer::User { user_id } => match index.user(user_id) {
            Some(user) if user.bot => DialogType::Bot,
            Some(_) => DialogType::Person,
            None => {
                tracing::debug!(user_id, "dialog user missing from entities, assuming person");
                DialogType::Person
            }
        },
        Peer::Unknown => DialogType::Unknown,
    }
}

/// Preview of the newest message addressed to the dialog's peer, if the reply
/// carried one. A sender that cannot be resolved is an error, not an absence.
pub fn summarize_last_message(
    dialog: &Dialog,
    index: &EntityIndex<'_>,
) -> Result<Option<LastMessageSummary>, ResolveError> {
    let Some(message) = dialog.peer_ref().and_then(|peer| index.preview(peer)) else {
        return Ok(None);
    };

    let who = match message.from_id {
        Some(sender) => resolve(sender, index)?.title,
        None => String::new(),
    };

    Ok(Some(LastMessageSummary {
        who,
        when: format_unix_seconds(message.date),
        text: truncate_words(&message.message),
        is_unread: dialog.unread_count > 0,
        timestamp: message.date,
    }))
}

/// Cursor pointing after the last dialog of the page that has a preview
/// message; `end` when none does.
fn next_cursor(dialogs: &[DialogClass], index: &EntityIndex<'_>) -> Cursor {
    dialogs
        .iter()
        .rev()
        .filter_map(|raw| match raw {
            DialogClass::Dialog(dialog) => dialog.peer_ref(),
            DialogClass::Folder | DialogClass::Unknown => None,
        })
        .find_map(|peer| {
            index
                .preview(peer)
                .map(|message| Cursor::new(peer, message.id, message.date))
        })
        .unwrap_or_else(Cursor::end)
}
