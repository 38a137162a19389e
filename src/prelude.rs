//! Convenient re-exports for common usage patterns.
//!
//! ```rust
//! use llmbridge::prelude::*;
//! ```

// Essential types
pub use crate::{
    BuildError, CallStatus, FunctionCall, FunctionDecl, FunctionResponse, InputSchema, Router,
    RouterConfig, SchemaType, Service,
};

// Macros
pub use crate::service;

// Commonly used external types
pub use serde_json::{Value, json};

// Re-export commonly needed traits for doc examples
pub use serde::{Deserialize, Serialize};
