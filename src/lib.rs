//! # llmbridge
//!
//! Expose ordinary Rust services to an LLM's function-calling interface.
//!
//! Mark an inherent `impl` block with [`service`], tag the methods the model
//! may call with `#[expose]`, and describe each argument structure with
//! `#[derive(InputSchema)]`. A [`Router`] built from those services publishes
//! OpenAI-style function descriptors and routes the model's calls back.
//!
//! ```rust
//! use llmbridge::prelude::*;
//!
//! #[derive(Deserialize, InputSchema)]
//! struct AddInput {
//!     /// Left operand
//!     a: i64,
//!     /// Right operand
//!     b: i64,
//! }
//!
//! struct Calculator;
//!
//! #[service]
//! impl Calculator {
//!     /// Adds two integers.
//!     #[expose(name = "addNumbers")]
//!     fn add(&self, input: AddInput) -> String {
//!         (input.a + input.b).to_string()
//!     }
//! }
//!
//! let router = Router::builder().service(Calculator).build().unwrap();
//! assert_eq!(router.function_names(), ["addNumbers"]);
//!
//! let out = router.handle_function("addNumbers", json!({ "a": 2, "b": 3 })).unwrap();
//! assert_eq!(out, "5");
//! ```

extern crate self as llmbridge;

pub mod prelude;

pub use llmbridge_core::{
    BuildError, CallError, CallId, CallStatus, ContractError, ExposedMethod, FieldIssue,
    FieldKind, FieldSpec, FieldsFn, FunctionCall, FunctionDecl, FunctionDetails,
    FunctionResponse, InputSchema, IntoMethodResult, MethodError, MethodHandler,
    RegistrationError, Router, RouterBuilder, RouterConfig, SchemaError, SchemaType, Service,
    extract, validate_arguments,
};
pub use llmbridge_macros::{InputSchema, service};

// Re-exported for use in generated code
pub use llmbridge_core::{once_cell, serde_json};
#[doc(hidden)]
pub use llmbridge_core::__private;
