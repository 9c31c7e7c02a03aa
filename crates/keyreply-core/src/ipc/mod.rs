//! Daemon IPC: Unix domain socket transport for CLI control.
//!
//! The daemon exposes an HTTP/JSON API over a Unix socket. The CLI connects
//! as a client to query status, request shutdown, read the live
//! configuration and commit new reply settings.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐         Unix socket        ┌──────────────┐
//! │   CLI    │───────────────────────────▶│  IPC Server  │
//! │          │  HTTP/1.1 + JSON           │  (axum)      │
//! └──────────┘                            └──────┬───────┘
//!                                                │
//!                                         ┌──────▼───────┐
//!                                         │    Daemon    │
//!                                         │ ReplyEngine  │
//!                                         └──────────────┘
//! ```

pub mod client;
pub mod server;
pub mod types;

pub use client::{IpcClient, IpcClientError};
pub use server::{DEFAULT_SOCKET_PATH, IpcState, router, serve, socket_path_from_config};
pub use types::*;
