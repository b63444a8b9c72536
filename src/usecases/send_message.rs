//! Use case for posting text into a dialog.
//!
//! This module provides the `MessageSender` trait and the `send_message`
//! function, which either sends the text right away or parks it as the
//! dialog's draft.

use serde::Serialize;
use thiserror::Error;

use crate::{
    domain::peer::InputPeer,
    telegram::UpstreamError,
    usecases::resolve_dialog::{resolve_dialog, PeerLookup, ResolveDialogError},
};

/// Command to post text into a dialog addressed by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub name: String,
    pub text: String,
    /// Send immediately instead of saving a draft.
    pub send: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SendMessageOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sent: bool,
}

/// Domain-level errors for the send operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendMessageError {
    /// Message text is empty after trimming whitespace.
    #[error("message text is empty")]
    EmptyMessage,
    #[error(transparent)]
    Dialog(ResolveDialogError),
    #[error("failed to send message: {0}")]
    Send(UpstreamError),
    #[error("failed to save draft: {0}")]
    SaveDraft(UpstreamError),
    #[error("call cancelled")]
    Cancelled,
}

/// Upstream operations that put text into a dialog.
pub trait MessageSender {
    /// Sends a text message to the dialog.
    ///
    /// # Errors
    /// Returns `UpstreamError` if the message could not be delivered.
    fn send_text(&self, peer: InputPeer, text: &str) -> Result<(), UpstreamError>;

    /// Replaces the dialog's draft with `text`; an empty text clears it.
    /// Returns whether the upstream acknowledged the change.
    fn save_draft(&self, peer: InputPeer, text: &str) -> Result<bool, UpstreamError>;
}

impl<T: MessageSender + ?Sized> MessageSender for &T {
    fn send_text(&self, peer: InputPeer, text: &str) -> Result<(), UpstreamError> {
        (*self).send_text(peer, text)
    }

    fn save_draft(&self, peer: InputPeer, text: &str) -> Result<bool, UpstreamError> {
        (*self).save_draft(peer, text)
    }
}

/// Sends a message to, or saves a draft in, the named dialog.
///
/// Sent text must not be empty after trimming and goes out trimmed. Drafts
/// are forwarded untouched, so an empty draft clears the existing one.
///
/// # Errors
/// Returns `SendMessageError::EmptyMessage` before any upstream call if a send
/// is requested with blank text. Resolution and upstream failures are mapped
/// to their own variants; cancellation is reported as `Cancelled`.
pub fn send_message(
    lookup: &dyn PeerLookup,
    sender: &dyn MessageSender,
    command: SendMessageCommand,
) -> Result<SendMessageOutput, SendMessageError> {
    let text = command.text.trim();
    if command.send && text.is_empty() {
        return Err(SendMessageError::EmptyMessage);
    }

    let peer = resolve_dialog(lookup, &command.name).map_err(map_resolve_error)?;

    if command.send {
        sender
            .send_text(peer, text)
            .map_err(|error| map_source_error(error, SendMessageError::Send))?;

        return Ok(SendMessageOutput {
            success: true,
            sent: true,
        });
    }

    let success = sender
        .save_draft(peer, &command.text)
        .map_err(|error| map_source_error(error, SendMessageError::SaveDraft))?;

    Ok(SendMessageOutput {
        success,
        sent: false,
    })
}

fn map_resolve_error(error: ResolveDialogError) -> SendMessageError {
    match error {
        ResolveDialogError::Cancelled => SendMessageError::Cancelled,
        other => SendMessageError::Dialog(other),
    }
}

fn map_source_error(
    error: UpstreamError,
    wrap: fn(UpstreamError) -> SendMessageError,
) -> SendMessageError {
    match error {
        UpstreamError::Cancelled => SendMessageError::Cancelled,
        other => wrap(other),
    }
}
