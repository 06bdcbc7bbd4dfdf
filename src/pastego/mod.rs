// SPDX-License-Identifier: MIT

//! Paste feed watcher built on the [`crate::query`] language
//!
//! - [config] - settings from defaults, YAML, environment and CLI
//! - [feed] - scraping API client
//! - [search] - configured search alternatives
//! - [store] - saved matches on disk
//! - [watcher] - the polling loop
//! - [server] - HTTP review API

pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod search;
pub mod server;
pub mod store;
pub mod watcher;

pub use error::{PastegoError, Result};
