//! Unofficial client for NotebookLM's batched RPC API.
//!
//! Authentication happens once through an interactive browser login
//! ([`login::interactive_login`]); the captured cookie bundle is persisted
//! and every later [`Client`] drives notebook, source, chat, and artifact
//! operations programmatically over the batchexecute wire protocol.
//!
//! ```no_run
//! # async fn demo() -> notebooklm::Result<()> {
//! let client = notebooklm::Client::from_storage(None)?;
//! for notebook in client.list_notebooks().await? {
//!     println!("{}  {}", notebook.id, notebook.title);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod error;
pub mod login;
pub mod parse;
pub mod rpc;
pub mod storage;
pub mod types;

pub use client::Client;
pub use error::{Error, Result};
pub use storage::AuthTokens;
pub use types::{
    Artifact, ArtifactType, AskResult, AudioFormat, AudioLength, GenerationStatus, Notebook,
    Source, SourceStatus, SourceType, VideoFormat, VideoStyle,
};
