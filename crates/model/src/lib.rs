//! An abstraction layer for the language model service.
//!
//! This crate establishes an unified protocol for the agent to interact
//! with the model service: chat requests with callable tools, and text
//! embeddings for retrieval. The agent can switch between services
//! without modifying the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod embedding;
mod error;
mod provider;
mod request;
mod response;

pub use embedding::*;
pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
