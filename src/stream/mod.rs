//! Streaming support: observer callbacks, tool-call accumulation and the
//! frame loop shared by every adapter.

pub mod accumulator;
pub(crate) mod aggregator;
pub mod observer;

use futures::stream::BoxStream;

use crate::error::Result;

pub use accumulator::ToolCallAccumulator;
pub use observer::{NoopObserver, StreamObserver};

/// Native frames produced by a transport, ended by end-of-stream or an error item.
pub type FrameStream<T> = BoxStream<'static, Result<T>>;
