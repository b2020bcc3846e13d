//! Tool definitions and parameter schemas for function calling.

pub mod definition;
pub mod schema;

pub use definition::{FunctionDefinition, ToolDefinition};
pub use schema::{empty_schema, normalize_schema, ParameterBuilder, ToolParameters};
