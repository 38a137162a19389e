//! Core data models: services, exposed methods and the call/response records
//! exchanged with the conversation loop.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::MethodError;
use crate::schema::{FieldsFn, InputSchema};

/// A service whose methods can be called by an LLM.
///
/// Implemented by `#[service]`, or by hand when the method table is built
/// explicitly.
pub trait Service: Send + Sync + 'static {
    /// Name used for qualified function names and diagnostics.
    fn name(&self) -> &str {
        short_type_name::<Self>()
    }

    /// The methods this service exposes, in declaration order.
    fn methods() -> Vec<ExposedMethod<Self>>
    where
        Self: Sized;

    /// Instructions the conversation loop may add to its system prompt.
    fn system_message(&self) -> Option<&str> {
        None
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Erased handler: receives the service and the already validated arguments.
pub type MethodHandler<S> = dyn Fn(&S, Value) -> Result<Value, MethodError> + Send + Sync;

/// One entry in a service's method table.
pub struct ExposedMethod<S> {
    name: &'static str,
    description: &'static str,
    input: Option<FieldsFn>,
    handler: Arc<MethodHandler<S>>,
}

impl<S> Clone for ExposedMethod<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            description: self.description,
            input: self.input,
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S> fmt::Debug for ExposedMethod<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExposedMethod")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("has_input", &self.input.is_some())
            .finish()
    }
}

impl<S: 'static> ExposedMethod<S> {
    /// A method taking one structured input `I`.
    pub fn new<I, O, F>(name: &'static str, description: &'static str, method: F) -> Self
    where
        I: InputSchema + DeserializeOwned,
        O: IntoMethodResult,
        F: Fn(&S, I) -> O + Send + Sync + 'static,
    {
        Self::raw(name, description, Some(I::fields), move |service, args| {
            let input: I = serde_json::from_value(args)?;
            method(service, input).into_method_result()
        })
    }

    /// A method without arguments.
    pub fn no_input<O, F>(name: &'static str, description: &'static str, method: F) -> Self
    where
        O: IntoMethodResult,
        F: Fn(&S) -> O + Send + Sync + 'static,
    {
        Self::raw(name, description, None, move |service, _| {
            method(service).into_method_result()
        })
    }

    /// A method with a hand-written handler working on JSON directly.
    pub fn raw<F>(
        name: &'static str,
        description: &'static str,
        input: Option<FieldsFn>,
        handler: F,
    ) -> Self
    where
        F: Fn(&S, Value) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        Self {
            name,
            description,
            input,
            handler: Arc::new(handler),
        }
    }

    /// Re-exposes this method on a service `P` that embeds `S`.
    pub fn delegate<P: 'static>(self, project: fn(&P) -> &S) -> ExposedMethod<P> {
        let handler = self.handler;
        ExposedMethod {
            name: self.name,
            description: self.description,
            input: self.input,
            handler: Arc::new(move |outer: &P, args: Value| handler(project(outer), args)),
        }
    }
}

impl<S> ExposedMethod<S> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn input(&self) -> Option<FieldsFn> {
        self.input
    }

    pub fn invoke(&self, service: &S, args: Value) -> Result<Value, MethodError> {
        (self.handler)(service, args)
    }
}

/// Conversion of a method's return value into the router's JSON result.
///
/// Anything other than a JSON string is rejected by the router as a
/// contract violation.
pub trait IntoMethodResult {
    fn into_method_result(self) -> Result<Value, MethodError>;
}

impl IntoMethodResult for String {
    fn into_method_result(self) -> Result<Value, MethodError> {
        Ok(Value::String(self))
    }
}

impl IntoMethodResult for &'static str {
    fn into_method_result(self) -> Result<Value, MethodError> {
        Ok(Value::String(self.to_string()))
    }
}

impl IntoMethodResult for Value {
    fn into_method_result(self) -> Result<Value, MethodError> {
        Ok(self)
    }
}

impl<T: Serialize> IntoMethodResult for Option<T> {
    fn into_method_result(self) -> Result<Value, MethodError> {
        serde_json::to_value(self).map_err(MethodError::failed)
    }
}

impl<T, E> IntoMethodResult for Result<T, E>
where
    T: Serialize,
    E: fmt::Display,
{
    fn into_method_result(self) -> Result<Value, MethodError> {
        match self {
            Ok(value) => serde_json::to_value(value).map_err(MethodError::failed),
            Err(err) => Err(MethodError::failed(err)),
        }
    }
}

/// Provider-assigned identifier of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// A fresh random id, for calls that arrive without one.
    pub fn new() -> Self {
        Self(format!("call_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for CallId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A function call requested by the model.
///
/// `arguments` is either a JSON object or a JSON-encoded string holding one,
/// which is how chat-completion APIs deliver them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CallId>,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<CallId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Outcome category of a handled call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    NotFound,
    InvalidArguments,
    Failed,
}

impl CallStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

/// The text result of a call, ready to be fed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: CallId,
    pub name: String,
    pub content: String,
    pub status: CallStatus,
}

impl FunctionResponse {
    /// The `tool` role message chat-completion APIs expect after a call.
    pub fn to_tool_message(&self) -> Value {
        json!({
            "role": "tool",
            "tool_call_id": self.id,
            "content": self.content,
        })
    }
}

/// `FunctionDecl` – one function descriptor in OpenAI function-calling
/// format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    #[serde(rename = "type")]
    pub function_type: String,
    pub function: FunctionDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDetails {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            function_type: "function".to_string(),
            function: FunctionDetails {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// The descriptor as a JSON object, in the same shape serde produces.
    pub fn to_json(&self) -> Value {
        json!({
            "type": self.function_type,
            "function": {
                "name": self.function.name,
                "description": self.function.description,
                "parameters": self.function.parameters,
            }
        })
    }

    /// Names listed under `parameters.required`.
    pub fn required(&self) -> Vec<&str> {
        self.function.parameters["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}
