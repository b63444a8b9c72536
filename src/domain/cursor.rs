//! Opaque pagination token for the dialog list.
//!
//! Wire format: `<kind>-<peer id>-<message id>-<unix date>` with kind one of
//! `user`, `chat`, `chan`, or the literal `end` when no further page exists.
//! Numbers keep their sign, so a negative field shows up as a doubled dash
//! (`user-1--1-5`). Callers echo the token back verbatim.

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::domain::peer::{InputPeer, PeerRef};

pub const END_CURSOR: &str = "end";

const FIELD_SEPARATOR: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub peer: Option<PeerRef>,
    pub message_id: i32,
    pub date: i64,
}

/// Offsets fed to the upstream dialog-list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DialogsOffset {
    pub peer: InputPeer,
    pub message_id: i32,
    pub date: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cursor {input:?}: {reason}")]
pub struct InvalidCursor {
    pub input: String,
    pub reason: &'static str,
}

impl Cursor {
    pub fn new(peer: PeerRef, message_id: i32, date: i64) -> Self {
        Self {
            peer: Some(peer),
            message_id,
            date,
        }
    }

    pub fn end() -> Self {
        Self::default()
    }

    pub fn is_end(&self) -> bool {
        self.peer.map_or(true, |peer| peer.id() == 0)
    }

    pub fn encode(&self) -> String {
        let Some(peer) = self.peer.filter(|peer| peer.id() != 0) else {
            return END_CURSOR.to_owned();
        };

        let kind = match peer {
            PeerRef::User(_) => "user",
            PeerRef::Chat(_) => "chat",
            PeerRef::Channel(_) => "chan",
        };

        format!(
            "{kind}{sep}{id}{sep}{msg}{sep}{date}",
            sep = FIELD_SEPARATOR,
            id = peer.id(),
            msg = self.message_id,
            date = self.date,
        )
    }

    pub fn decode(input: &str) -> Result<Self, InvalidCursor> {
        let invalid = |reason| InvalidCursor {
            input: input.to_owned(),
            reason,
        };

        let Some((kind, numbers)) = input.split_once(FIELD_SEPARATOR) else {
            return Err(invalid("expected four dash-separated fields"));
        };
        let [id, message_id, date] = split_numbers(numbers)
            .ok_or_else(|| invalid("expected three integers after the peer kind"))?;

        let id: i64 = id.parse().map_err(|_| invalid("peer id is not an integer"))?;
        let peer = match kind {
            "user" => PeerRef::User(id),
            "chat" => PeerRef::Chat(id),
            "chan" => PeerRef::Channel(id),
            _ => return Err(invalid("unknown peer kind")),
        };

        let message_id = message_id
            .parse()
            .map_err(|_| invalid("message id is not an integer"))?;
        let date = date
            .parse()
            .map_err(|_| invalid("date is not an integer"))?;

        Ok(Self::new(peer, message_id, date))
    }

    pub fn to_offset(&self) -> DialogsOffset {
        DialogsOffset {
            peer: self.peer.map(PeerRef::to_input_peer).unwrap_or_default(),
            message_id: self.message_id,
            date: self.date,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Splits `a-b-c` where each field is an optionally negative run of digits.
fn split_numbers(input: &str) -> Option<[&str; 3]> {
    let mut fields = [""; 3];
    let mut rest = input;

    for (position, field) in fields.iter_mut().enumerate() {
        if position > 0 {
            rest = rest.strip_prefix(FIELD_SEPARATOR)?;
        }

        let sign_len = usize::from(rest.starts_with('-'));
        let end = rest[sign_len..]
            .find(|c: char| !c.is_ascii_digit())
            .map_or(rest.len(), |digits| sign_len + digits);
        if end == sign_len {
            return None;
        }

        *field = &rest[..end];
        rest = &rest[end..];
    }

    rest.is_empty().then_some(fields)
}

impl FromStr for Cursor {
    type Err = InvalidCursor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
