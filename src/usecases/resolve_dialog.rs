use thiserror::Error;

use crate::{
    domain::peer::{InputPeer, PeerRef},
    telegram::{
        entities::EntityIndex,
        resolve::{parse_dialog_name, DialogName, InvalidDialogName},
        tl::ResolvedPeer,
        UpstreamError,
    },
};

const USERNAME_ERROR_PREFIX: &str = "USERNAME_";

pub trait PeerLookup {
    fn resolve_username(&self, username: &str) -> Result<ResolvedPeer, UpstreamError>;
}

impl<T: PeerLookup + ?Sized> PeerLookup for &T {
    fn resolve_username(&self, username: &str) -> Result<ResolvedPeer, UpstreamError> {
        (*self).resolve_username(username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveDialogError {
    #[error(transparent)]
    InvalidName(#[from] InvalidDialogName),
    #[error("dialog {0:?} not found")]
    NotFound(String),
    #[error("failed to resolve dialog name: {0}")]
    Upstream(UpstreamError),
    #[error("call cancelled")]
    Cancelled,
}

/// Turns a dialog name handed out by the dialog list (or typed by a caller)
/// into an input peer usable by any per-dialog upstream call.
pub fn resolve_dialog(
    lookup: &dyn PeerLookup,
    name: &str,
) -> Result<InputPeer, ResolveDialogError> {
    match parse_dialog_name(name)? {
        DialogName::Direct(peer) => Ok(peer),
        DialogName::Username(username) => {
            let resolved = lookup
                .resolve_username(&username)
                .map_err(|error| map_source_error(error, &username))?;
            input_peer_from(&resolved).ok_or(ResolveDialogError::NotFound(username))
        }
    }
}

fn map_source_error(error: UpstreamError, username: &str) -> ResolveDialogError {
    match error {
        UpstreamError::Cancelled => ResolveDialogError::Cancelled,
        UpstreamError::Rpc { ref message, .. } if message.starts_with(USERNAME_ERROR_PREFIX) => {
            tracing::debug!(username, error = %error, "username lookup rejected");
            ResolveDialogError::NotFound(username.to_owned())
        }
        other => ResolveDialogError::Upstream(other),
    }
}

/// Access hashes come from the entities side-loaded with the lookup reply.
fn input_peer_from(resolved: &ResolvedPeer) -> Option<InputPeer> {
    let index = EntityIndex::build(&resolved.users, &resolved.chats, &[]);

    match resolved.peer.to_ref()? {
        PeerRef::User(user_id) => index.user(user_id).map(|user| InputPeer::User {
            user_id,
            access_hash: user.access_hash.unwrap_or_default(),
        }),
        PeerRef::Chat(chat_id) => index.chat(chat_id).map(|_| InputPeer::Chat { chat_id }),
        PeerRef::Channel(channel_id) => index.channel(channel_id).map(|channel| InputPeer::Channel {
            channel_id,
            access_hash: channel.access_hash,
        }),
    }
}
