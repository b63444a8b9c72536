//! Domain layer: view models returned to tool callers and the pagination token.

pub mod cursor;
pub mod dialog;
pub mod message;
pub mod peer;
