//! Core logic including the agent turn loop, tool registry, capability
//! sources and conversations.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod source;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentError, ChatRequest, ChatResponse, ToolCallInfo,
};
pub use model_client::{ModelClient, ModelClientResponse};
