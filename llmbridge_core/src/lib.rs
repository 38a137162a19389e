#![deny(unsafe_code)]
//! Schema extraction and function-call dispatch for LLM-exposed services.
//!
//! A [`Service`] publishes a table of [`ExposedMethod`]s. Each method takes at
//! most one [`InputSchema`] structure and returns a string. The [`Router`]
//! turns those tables into OpenAI-style function descriptors and routes the
//! model's calls back to the right method.

pub mod error;
pub mod models;
pub mod router;
pub mod schema;
pub mod validate;

#[doc(hidden)]
pub mod __private {
    pub use crate::private::{DefaultOf, SerializedDefault, UnpublishedDefault};
}
mod private;

// Re-exported for use in generated code
pub use once_cell;
pub use serde_json;

pub use error::{
    BuildError, CallError, ContractError, FieldIssue, MethodError, RegistrationError, SchemaError,
};
pub use models::{
    CallId, CallStatus, ExposedMethod, FunctionCall, FunctionDecl, FunctionDetails,
    FunctionResponse, IntoMethodResult, MethodHandler, Service,
};
pub use router::{Router, RouterBuilder, RouterConfig};
pub use schema::{FieldKind, FieldSpec, FieldsFn, InputSchema, SchemaType, extract};
pub use validate::validate_arguments;
