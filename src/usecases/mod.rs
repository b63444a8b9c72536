//! Use case layer: one workflow per tool, each consuming its own narrow
//! upstream source trait.

pub mod bootstrap;
pub mod context;
pub mod get_me;
pub mod list_dialogs;
pub mod load_history;
pub mod mark_read;
pub mod resolve_dialog;
pub mod send_message;
