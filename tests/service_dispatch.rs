use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use llmbridge::prelude::*;
use llmbridge::{CallId, ContractError, RegistrationError, SchemaError};

#[derive(Deserialize, InputSchema)]
struct AddInput {
    /// First operand
    a: i64,
    /// Second operand
    b: i64,
}

#[derive(Deserialize, InputSchema)]
struct DivideInput {
    numerator: f64,
    denominator: f64,
}

#[derive(Default)]
struct Calculator {
    calls: AtomicUsize,
}

#[service(
    name = "calculator",
    system_message = "Use the calculator for any arithmetic."
)]
impl Calculator {
    /// Adds two integers and returns the sum.
    #[expose(name = "addNumbers")]
    fn add_numbers(&self, input: AddInput) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (input.a + input.b).to_string()
    }

    /// Divides two numbers.
    #[expose]
    fn divide(&self, input: DivideInput) -> Result<String, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if input.denominator == 0.0 {
            return Err("division by zero".to_string());
        }
        Ok((input.numerator / input.denominator).to_string())
    }

    /// Always blows up.
    #[expose]
    fn boom(&self) -> String {
        panic!("boom")
    }

    /// Returns nothing useful.
    #[expose]
    fn nothing(&self) -> Option<String> {
        None
    }
}

#[derive(Deserialize, InputSchema)]
struct QueryInput {
    /// What to look for
    query: String,
}

struct WebSearch;

#[service]
impl WebSearch {
    /// Searches the web.
    #[expose]
    fn search(&self, input: QueryInput) -> String {
        format!("web results for {}", input.query)
    }
}

struct DocSearch;

#[service(system_message = "Prefer internal documents.")]
impl DocSearch {
    /// Searches internal documents.
    #[expose]
    fn search(&self, input: QueryInput) -> String {
        format!("doc results for {}", input.query)
    }
}

fn calculator_router() -> Router {
    Router::builder()
        .service(Calculator::default())
        .build()
        .unwrap()
}

#[test]
fn adds_numbers() {
    let router = calculator_router();
    let out = router
        .handle_function("addNumbers", json!({ "a": 2, "b": 3 }))
        .unwrap();
    assert_eq!(out, "5");
}

#[test]
fn coerces_string_numbers() {
    let router = calculator_router();
    let out = router
        .handle_function("addNumbers", json!({ "a": "40", "b": 2 }))
        .unwrap();
    assert_eq!(out, "42");
}

#[test]
fn unknown_function_is_reported_in_text() {
    let router = calculator_router();
    let out = router.handle_function("multiply", json!({})).unwrap();
    assert_eq!(out, "Error: function 'multiply' not found.");
}

#[test]
fn invalid_arguments_are_reported_in_text() {
    let router = calculator_router();
    let out = router
        .handle_function("addNumbers", json!({ "a": "two" }))
        .unwrap();

    assert!(out.starts_with("Error: invalid arguments for function 'addNumbers'"));
    assert!(out.contains("a: expected integer, got string"));
    assert!(out.contains("b: field required"));
}

#[test]
fn method_failures_are_reported_in_text() {
    let router = calculator_router();
    let out = router
        .handle_function("divide", json!({ "numerator": 1, "denominator": 0 }))
        .unwrap();
    assert_eq!(out, "Error: function 'divide' failed: division by zero");

    let ok = router
        .handle_function("divide", json!({ "numerator": 9, "denominator": 2 }))
        .unwrap();
    assert_eq!(ok, "4.5");
}

#[test]
fn panics_are_contained() {
    let router = calculator_router();
    let out = router.handle_function("boom", Value::Null).unwrap();
    assert_eq!(out, "Error: function 'boom' failed: panicked: boom");

    // The router keeps working afterwards.
    let out = router
        .handle_function("addNumbers", json!({ "a": 1, "b": 1 }))
        .unwrap();
    assert_eq!(out, "2");
}

#[test]
fn non_string_results_break_the_contract() {
    let router = calculator_router();
    let err = router.handle_function("nothing", json!({})).unwrap_err();
    assert_eq!(
        err,
        ContractError {
            function: "nothing".into(),
            found: "null",
        }
    );
}

#[test]
fn handle_call_keeps_ids_and_status() {
    let router = calculator_router();

    let call = FunctionCall::new("addNumbers", json!(r#"{"a": 20, "b": 22}"#)).with_id("call_abc");
    let response = router.handle_call(call).unwrap();
    assert_eq!(response.id, CallId::from("call_abc"));
    assert_eq!(response.content, "42");
    assert_eq!(response.status, CallStatus::Success);
    assert_eq!(
        response.to_tool_message(),
        json!({ "role": "tool", "tool_call_id": "call_abc", "content": "42" })
    );

    let missing = router
        .handle_call(FunctionCall::new("nope", json!({})))
        .unwrap();
    assert_eq!(missing.status, CallStatus::NotFound);
    assert!(missing.id.as_str().starts_with("call_"));

    let invalid = router
        .handle_call(FunctionCall::new("addNumbers", json!("{not json")))
        .unwrap();
    assert_eq!(invalid.status, CallStatus::InvalidArguments);
    assert!(invalid.content.contains("arguments are not valid JSON"));
}

#[test]
fn shared_services_keep_their_state() {
    let calculator = Arc::new(Calculator::default());
    let router = Router::builder()
        .shared_service(Arc::clone(&calculator))
        .build()
        .unwrap();

    for _ in 0..3 {
        router
            .handle_function("addNumbers", json!({ "a": 1, "b": 2 }))
            .unwrap();
    }
    assert_eq!(calculator.calls.load(Ordering::SeqCst), 3);
}

#[test]
fn duplicate_function_names_are_rejected() {
    let err = Router::builder()
        .service(WebSearch)
        .service(DocSearch)
        .build()
        .unwrap_err();

    assert_eq!(
        err,
        BuildError::Registration(RegistrationError::DuplicateFunction {
            name: "search".into(),
            first: "WebSearch".into(),
            second: "DocSearch".into(),
        })
    );
}

#[test]
fn qualified_names_resolve_collisions() {
    let router = Router::builder()
        .config(RouterConfig::qualified())
        .service(WebSearch)
        .service(DocSearch)
        .build()
        .unwrap();

    assert_eq!(
        router.function_names(),
        ["WebSearch-search", "DocSearch-search"]
    );
    let out = router
        .handle_function("DocSearch-search", json!({ "query": "onboarding" }))
        .unwrap();
    assert_eq!(out, "doc results for onboarding");
}

#[test]
fn schemas_cover_every_registered_service() {
    let router = Router::builder()
        .service(Calculator::default())
        .service(WebSearch)
        .build()
        .unwrap();

    assert_eq!(router.service_names(), ["calculator", "WebSearch"]);
    assert_eq!(router.function_schemas(), router.function_schemas());
    assert_eq!(router.len(), 5);
    assert!(router.contains("search"));

    let schemas = router.function_schemas_json();
    let names: Vec<_> = schemas
        .as_array()
        .unwrap()
        .iter()
        .map(|decl| decl["function"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["addNumbers", "divide", "boom", "nothing", "search"]);
    assert_eq!(
        schemas[0]["function"]["parameters"]["required"],
        json!(["a", "b"])
    );
}

#[test]
fn system_messages_are_joined() {
    let router = Router::builder()
        .config(RouterConfig::qualified())
        .service(Calculator::default())
        .service(WebSearch)
        .service(DocSearch)
        .build()
        .unwrap();

    assert_eq!(
        router.system_message().as_deref(),
        Some("Use the calculator for any arithmetic.\n\nPrefer internal documents.")
    );

    let plain = Router::builder().service(WebSearch).build().unwrap();
    assert_eq!(plain.system_message(), None);
}

#[derive(Debug, Default, Deserialize, InputSchema)]
#[serde(rename_all = "lowercase")]
enum Mode {
    #[default]
    Fast,
    Thorough,
}

#[derive(Deserialize, InputSchema)]
struct ScanInput {
    /// Directory to scan
    path: String,
    /// How hard to look
    #[serde(default)]
    mode: Mode,
    /// Maximum findings to report
    #[serde(alias = "limit")]
    max_results: u8,
}

struct Scanner;

#[service]
impl Scanner {
    /// Scans a directory for problems.
    #[expose]
    fn scan(&self, input: ScanInput) -> String {
        format!("{} {:?} {}", input.path, input.mode, input.max_results)
    }
}

#[test]
fn aliased_keys_reach_the_method() {
    let router = Router::builder().service(Scanner).build().unwrap();

    let out = router
        .handle_function("scan", json!({ "path": "/srv", "limit": 3 }))
        .unwrap();
    assert_eq!(out, "/srv Fast 3");

    let out = router
        .handle_function("scan", json!({ "path": "/srv", "max_results": "2", "mode": "THOROUGH" }))
        .unwrap();
    assert_eq!(out, "/srv Thorough 2");
}

#[test]
fn defaults_of_non_serializable_types_are_applied_but_not_published() {
    let router = Router::builder().service(Scanner).build().unwrap();
    let schemas = router.function_schemas_json();
    let parameters = &schemas[0]["function"]["parameters"];

    assert_eq!(parameters["required"], json!(["path", "max_results"]));
    assert_eq!(
        parameters["properties"]["mode"],
        json!({
            "type": "string",
            "enum": ["fast", "thorough"],
            "description": "How hard to look"
        })
    );
}

struct Misnamed;

#[service]
impl Misnamed {
    /// Does nothing, under an unusable name.
    #[expose(name = "has space")]
    fn noop(&self) -> String {
        String::new()
    }
}

struct Archive;

#[service(name = "long_term_document_archive_service_for_records")]
impl Archive {
    /// Retrieves an archived record by its identifier.
    #[expose]
    fn retrieve_archived_record_by_id(&self) -> String {
        String::new()
    }
}

#[test]
fn invalid_function_names_fail_the_build() {
    let err = Router::builder().service(Misnamed).build().unwrap_err();
    assert_eq!(
        err,
        BuildError::Schema(SchemaError::InvalidName {
            function: "has space".into()
        })
    );
}

#[test]
fn over_long_qualified_names_fail_the_build() {
    assert!(Router::builder().service(Archive).build().is_ok());

    let err = Router::builder()
        .config(RouterConfig::qualified())
        .service(Archive)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        BuildError::Schema(SchemaError::InvalidName {
            function: "long_term_document_archive_service_for_records-retrieve_archived_record_by_id"
                .into()
        })
    );
}
