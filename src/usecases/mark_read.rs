use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::peer::InputPeer,
    telegram::UpstreamError,
    usecases::resolve_dialog::{resolve_dialog, PeerLookup, ResolveDialogError},
};

pub const READ_DONE: &str = "done";
pub const READ_NOTHING_UNREAD: &str = "unread messages not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkReadCommand {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkReadOutput {
    pub result: &'static str,
}

pub trait HistoryReader {
    /// Marks a user or basic-group dialog read; returns the affected-messages
    /// count reported by the upstream.
    fn read_history(&self, peer: InputPeer) -> Result<i32, UpstreamError>;

    fn read_channel_history(
        &self,
        channel_id: i64,
        access_hash: i64,
    ) -> Result<bool, UpstreamError>;
}

impl<T: HistoryReader + ?Sized> HistoryReader for &T {
    fn read_history(&self, peer: InputPeer) -> Result<i32, UpstreamError> {
        (*self).read_history(peer)
    }

    fn read_channel_history(
        &self,
        channel_id: i64,
        access_hash: i64,
    ) -> Result<bool, UpstreamError> {
        (*self).read_channel_history(channel_id, access_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkReadError {
    #[error(transparent)]
    Dialog(ResolveDialogError),
    #[error("cannot mark {0:?} as read")]
    UnsupportedPeer(InputPeer),
    #[error("failed to mark dialog read: {0}")]
    Upstream(UpstreamError),
    #[error("call cancelled")]
    Cancelled,
}

pub fn mark_read(
    lookup: &dyn PeerLookup,
    reader: &dyn HistoryReader,
    command: MarkReadCommand,
) -> Result<MarkReadOutput, MarkReadError> {
    let peer = resolve_dialog(lookup, &command.name).map_err(map_resolve_error)?;

    let anything_read = match peer {
        InputPeer::User { .. } | InputPeer::Chat { .. } => {
            reader.read_history(peer).map_err(map_source_error)? > 0
        }
        InputPeer::Channel {
            channel_id,
            access_hash,
        } => reader
            .read_channel_history(channel_id, access_hash)
            .map_err(map_source_error)?,
        InputPeer::Empty | InputPeer::SelfPeer => return Err(MarkReadError::UnsupportedPeer(peer)),
    };

    Ok(MarkReadOutput {
        result: if anything_read {
            READ_DONE
        } else {
            READ_NOTHING_UNREAD
        },
    })
}

fn map_resolve_error(error: ResolveDialogError) -> MarkReadError {
    match error {
        ResolveDialogError::Cancelled => MarkReadError::Cancelled,
        other => MarkReadError::Dialog(other),
    }
}

fn map_source_error(error: UpstreamError) -> MarkReadError {
    match error {
        UpstreamError::Cancelled => MarkReadError::Cancelled,
        other => MarkReadError::Upstream(other),
    }
}
