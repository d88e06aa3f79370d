//! Command implementations for the scriptvol CLI.
//!
//! Each command resolves its paths through the [`Session`](crate::session::Session),
//! runs one registry operation and prints a serializable report in the
//! requested format. Commands that can change a harddisk save the images
//! before returning.

pub mod completions;
pub mod files;
pub mod transfer;
pub mod volumes;
