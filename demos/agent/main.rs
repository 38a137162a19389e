//! A scripted tool-calling loop.
//!
//! Stands in for a chat-completion client: the "model" replies are canned
//! OpenAI-style `tool_calls`, each dispatched through the router and answered
//! with a `role: tool` message.

use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use llmbridge::CallId;
use llmbridge::prelude::*;
use tracing_subscriber::EnvFilter;

struct Clock;

#[derive(Deserialize, InputSchema)]
struct DaysUntilInput {
    /// Target date as YYYY-MM-DD
    date: String,
}

#[service(system_message = "Dates are always given as YYYY-MM-DD.")]
impl Clock {
    /// Returns the current UTC date and time in RFC 3339 format.
    #[expose]
    fn now(&self) -> String {
        Utc::now().to_rfc3339()
    }

    /// Counts the days from today until the given date.
    #[expose]
    fn days_until(&self, input: DaysUntilInput) -> Result<String, String> {
        let target = NaiveDate::parse_from_str(&input.date, "%Y-%m-%d")
            .map_err(|err| format!("'{}' is not a date: {err}", input.date))?;
        let days = (target - Utc::now().date_naive()).num_days();
        Ok(days.to_string())
    }
}

#[derive(Serialize, Deserialize, InputSchema)]
#[serde(rename_all = "lowercase")]
enum Priority {
    Low,
    Normal,
    High,
}

#[derive(Deserialize, InputSchema)]
struct AddNoteInput {
    /// Note text
    text: String,
    #[serde(default = "normal")]
    priority: Priority,
}

fn normal() -> Priority {
    Priority::Normal
}

#[derive(Default)]
struct Notes {
    entries: Mutex<Vec<(String, &'static str)>>,
}

#[service(system_message = "Save anything the user asks you to remember as a note.")]
impl Notes {
    /// Saves a note for later.
    #[expose]
    fn add_note(&self, input: AddNoteInput) -> Result<String, String> {
        let priority = match input.priority {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        };
        let mut entries = self.entries.lock().map_err(|err| err.to_string())?;
        entries.push((input.text, priority));
        Ok(format!("saved note #{}", entries.len()))
    }

    /// Lists every saved note, newest last.
    #[expose]
    fn list_notes(&self) -> Result<String, String> {
        let entries = self.entries.lock().map_err(|err| err.to_string())?;
        if entries.is_empty() {
            return Ok("no notes".to_string());
        }
        Ok(entries
            .iter()
            .enumerate()
            .map(|(i, (text, priority))| format!("{}. [{priority}] {text}", i + 1))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// Canned assistant turns, one batch of tool calls per turn.
fn scripted_turns() -> Vec<Value> {
    vec![
        json!([
            { "id": "call_1", "type": "function",
              "function": { "name": "now", "arguments": "{}" } },
            { "id": "call_2", "type": "function",
              "function": { "name": "days_until", "arguments": "{\"date\": \"2030-01-01\"}" } }
        ]),
        json!([
            { "id": "call_3", "type": "function",
              "function": { "name": "add_note", "arguments": "{\"text\": \"book flights\", \"priority\": \"HIGH\"}" } },
            { "id": "call_4", "type": "function",
              "function": { "name": "add_note", "arguments": "{\"priority\": \"urgent\"}" } },
            { "id": "call_5", "type": "function",
              "function": { "name": "send_email", "arguments": "{}" } }
        ]),
        json!([
            { "id": "call_6", "type": "function",
              "function": { "name": "list_notes", "arguments": "" } }
        ]),
    ]
}

fn to_function_call(tool_call: &Value) -> FunctionCall {
    let function = &tool_call["function"];
    let call = FunctionCall::new(
        function["name"].as_str().unwrap_or_default(),
        function["arguments"].clone(),
    );
    match tool_call["id"].as_str() {
        Some(id) => call.with_id(CallId::from(id)),
        None => call,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("llmbridge_core=debug")),
        )
        .init();

    let router = Router::builder()
        .service(Clock)
        .service(Notes::default())
        .build()?;

    let mut history = vec![json!({
        "role": "system",
        "content": router.system_message().unwrap_or_default(),
    })];
    println!("tools: {}", router.function_schemas_json());

    for (turn, tool_calls) in scripted_turns().into_iter().enumerate() {
        tracing::info!(turn, "assistant requested tools");
        history.push(json!({ "role": "assistant", "tool_calls": tool_calls.clone() }));

        for tool_call in tool_calls.as_array().into_iter().flatten() {
            let response = router.handle_call(to_function_call(tool_call))?;
            println!(
                "[{:?}] {} → {}",
                response.status, response.name, response.content
            );
            history.push(response.to_tool_message());
        }
    }

    println!("\n{} messages in history", history.len());
    Ok(())
}
