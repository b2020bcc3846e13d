//! parley: one conversational interface over the OpenAI and Anthropic chat APIs.
//!
//! Messages, tool calls and streamed deltas share one model regardless of the
//! backend. A conversation can be persisted with [`codec::encode`] and restored
//! for whichever backend is active later with [`codec::decode`].
//!
//! # Quick Start
//!
//! ```no_run
//! use parley::prelude::*;
//!
//! # async fn example() -> parley::error::Result<()> {
//! let config = ParleyConfig::from_env();
//! let provider = create_provider(&Backend::Anthropic, "claude-sonnet-4-20250514", &config)?;
//!
//! let cancel = CancellationToken::new();
//! let options = ChatOptions::builder().max_tokens(1024).build();
//! let response = provider
//!     .complete(&cancel, &[Message::user("Hello!")], &options)
//!     .await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod stream;
pub mod tools;
pub mod types;
pub mod util;
