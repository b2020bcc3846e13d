//! Core types for parley.

pub mod message;
pub mod options;
pub mod response;
pub mod tool_call;
pub mod usage;

pub use message::*;
pub use options::*;
pub use response::*;
pub use tool_call::*;
pub use usage::*;
