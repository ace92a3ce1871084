//! Headless core of the Genie chat widget.
//!
//! The crate knows nothing about a concrete UI. A surface implements
//! [`View`], feeds user input into a [`WidgetController`] and displays the
//! [`ChatEntry`] values the controller appends.
//!
//! ```text
//! InputEvent ─► WidgetController ─► GenieApi (ProxyClient) ─► genie-server
//!                     │                   ▲
//!                     ├── poll_message ───┘
//!                     └── Renderer ─► ChatEntry::Markup ─► View
//! ```

pub mod api;
pub mod client;
pub mod controller;
pub mod error;
pub mod log;
pub mod poll;
pub mod render;

#[cfg(test)]
pub(crate) mod testing;

pub use api::GenieApi;
pub use client::ProxyClient;
pub use controller::{
    InputEvent, Key, SendOutcome, WidgetController, WidgetCopy, WidgetOptions,
};
pub use error::{ApiError, WidgetError};
pub use log::{ChatEntry, ChatLog, EntryBody, LogView, Role, View};
pub use poll::{await_condition, poll_message, AwaitOutcome, Check, PollConfig, PollOutcome};
pub use render::{RenderOptions, Renderer};
