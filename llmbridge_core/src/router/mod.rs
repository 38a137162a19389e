//! The dispatch router: aggregates function descriptors and executes calls.

mod config;

pub use config::RouterConfig;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{
    BuildError, CallError, ContractError, FieldIssue, MethodError, RegistrationError, SchemaError,
};
use crate::models::{CallStatus, FunctionCall, FunctionDecl, FunctionResponse, Service};
use crate::schema::{self, FieldsFn};
use crate::validate::{json_type_name, validate_arguments};

type Invoker = dyn Fn(Value) -> Result<Value, MethodError> + Send + Sync;

type Registration =
    Box<dyn FnOnce(&RouterConfig) -> Result<(ServiceEntry, Vec<Route>), SchemaError> + Send>;

struct ServiceEntry {
    name: String,
    system_message: Option<String>,
}

struct Route {
    service: usize,
    decl: FunctionDecl,
    input: Option<FieldsFn>,
    invoke: Box<Invoker>,
}

/// Collects services; [`build`](RouterBuilder::build) turns them into a
/// [`Router`] or fails as a whole.
#[derive(Default)]
pub struct RouterBuilder {
    config: RouterConfig,
    pending: Vec<Registration>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn service<S: Service>(self, service: S) -> Self {
        self.shared_service(Arc::new(service))
    }

    /// Registers a service the caller keeps a handle to.
    pub fn shared_service<S: Service>(mut self, service: Arc<S>) -> Self {
        self.pending
            .push(Box::new(move |config: &RouterConfig| routes_for(service, config)));
        self
    }

    pub fn build(self) -> Result<Router, BuildError> {
        let RouterBuilder { config, pending } = self;

        let mut services: Vec<ServiceEntry> = Vec::with_capacity(pending.len());
        let mut routes: Vec<Route> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for register in pending {
            let (entry, service_routes) = register(&config)?;
            let service = services.len();
            services.push(entry);

            for mut route in service_routes {
                route.service = service;
                let name = route.decl.name().to_string();
                if let Some(&existing) = index.get(&name) {
                    return Err(RegistrationError::DuplicateFunction {
                        name,
                        first: services[routes[existing].service].name.clone(),
                        second: services[service].name.clone(),
                    }
                    .into());
                }
                debug!(function = %name, service = %services[service].name, "registered function");
                index.insert(name, routes.len());
                routes.push(route);
            }
        }

        debug!(
            services = services.len(),
            functions = routes.len(),
            "function router ready"
        );

        Ok(Router {
            config,
            services,
            routes,
            index,
        })
    }
}

fn routes_for<S: Service>(
    service: Arc<S>,
    config: &RouterConfig,
) -> Result<(ServiceEntry, Vec<Route>), SchemaError> {
    let entry = ServiceEntry {
        name: service.name().to_string(),
        system_message: service.system_message().map(str::to_string),
    };

    let routes = S::methods()
        .into_iter()
        .map(|method| {
            let name = config.public_name(&entry.name, method.name());
            let decl = schema::describe(&name, &method)?;
            let input = method.input();
            let service = Arc::clone(&service);
            Ok(Route {
                service: 0,
                decl,
                input,
                invoke: Box::new(move |args: Value| method.invoke(&service, args)),
            })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok((entry, routes))
}

/// Routes function calls by name to the services it was built from.
///
/// The mapping is fixed at build time; the router is `Send + Sync` and may be
/// shared between conversation turns.
pub struct Router {
    config: RouterConfig,
    services: Vec<ServiceEntry>,
    routes: Vec<Route>,
    index: HashMap<String, usize>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("services", &self.service_names())
            .field("functions", &self.function_names())
            .finish()
    }
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Every descriptor, in service registration order then method
    /// declaration order.
    pub fn function_schemas(&self) -> Vec<FunctionDecl> {
        self.routes.iter().map(|route| route.decl.clone()).collect()
    }

    /// [`function_schemas`](Self::function_schemas) as one JSON array, ready
    /// for the `tools` field of a chat-completion request.
    pub fn function_schemas_json(&self) -> Value {
        Value::Array(self.routes.iter().map(|route| route.decl.to_json()).collect())
    }

    pub fn function_names(&self) -> Vec<&str> {
        self.routes.iter().map(|route| route.decl.name()).collect()
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|service| service.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The services' system messages joined by blank lines, if any service
    /// provides one.
    pub fn system_message(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .services
            .iter()
            .filter_map(|service| service.system_message.as_deref())
            .filter(|message| !message.trim().is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join("\n\n"))
    }

    /// Calls function `name` with `params` and returns its text result.
    ///
    /// Unknown names, invalid arguments and method failures come back as
    /// `Ok` error strings meant for the model. Only a method that breaks the
    /// string-return contract yields `Err`.
    pub fn handle_function(&self, name: &str, params: Value) -> Result<String, ContractError> {
        Ok(self
            .dispatch(name, params)?
            .unwrap_or_else(|err| err.to_string()))
    }

    /// Like [`handle_function`](Self::handle_function), for a call record
    /// coming straight from the model. Keeps the call id (generating one if
    /// absent) and reports the outcome category.
    pub fn handle_call(&self, call: FunctionCall) -> Result<FunctionResponse, ContractError> {
        let FunctionCall {
            id,
            name,
            arguments,
        } = call;

        let (content, status) = match self.dispatch(&name, arguments)? {
            Ok(text) => (text, CallStatus::Success),
            Err(err) => (err.to_string(), err.status()),
        };

        Ok(FunctionResponse {
            id: id.unwrap_or_default(),
            name,
            content,
            status,
        })
    }

    fn dispatch(
        &self,
        name: &str,
        params: Value,
    ) -> Result<Result<String, CallError>, ContractError> {
        let span = tracing::info_span!("llmbridge.function.call", function = %name);
        let _entered = span.enter();

        let Some(route) = self.index.get(name).map(|&i| &self.routes[i]) else {
            warn!("function not found");
            return Ok(Err(CallError::NotFound {
                name: name.to_string(),
            }));
        };

        let args = match route.input {
            Some(fields) => {
                let checked = decode_arguments(params)
                    .and_then(|params| validate_arguments(fields(), &params));
                match checked {
                    Ok(args) => args,
                    Err(issues) => {
                        warn!(issues = issues.len(), "rejected invalid arguments");
                        return Ok(Err(CallError::InvalidArguments {
                            name: name.to_string(),
                            issues,
                        }));
                    }
                }
            }
            None => Value::Null,
        };

        match self.invoke(route, args) {
            Ok(Value::String(text)) => {
                debug!(bytes = text.len(), "function succeeded");
                Ok(Ok(text))
            }
            Ok(other) => {
                let found = json_type_name(&other);
                error!(found, "function broke the string-return contract");
                Err(ContractError {
                    function: name.to_string(),
                    found,
                })
            }
            Err(err) => {
                warn!(error = %err, "function failed");
                Ok(Err(CallError::from_method(name, err)))
            }
        }
    }

    fn invoke(&self, route: &Route, args: Value) -> Result<Value, MethodError> {
        if !self.config.catch_panics {
            return (route.invoke)(args);
        }

        panic::catch_unwind(AssertUnwindSafe(|| (route.invoke)(args))).unwrap_or_else(|payload| {
            Err(MethodError::Failed(format!(
                "panicked: {}",
                panic_message(&*payload)
            )))
        })
    }
}

/// Chat-completion APIs deliver arguments as a JSON-encoded string.
fn decode_arguments(params: Value) -> Result<Value, Vec<FieldIssue>> {
    match params {
        Value::String(raw) if raw.trim().is_empty() => Ok(Value::Null),
        Value::String(raw) => serde_json::from_str(&raw).map_err(|err| {
            vec![FieldIssue::new(
                "",
                format!("arguments are not valid JSON: {err}"),
            )]
        }),
        other => Ok(other),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
