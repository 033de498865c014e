//! Tools offered to the researcher model.
//!
//! Every tool declares its name, description and a JSON Schema for its input
//! (derived with schemars from the `morphic_types` input structs). Server
//! tools run in `execute`; client tools (`askQuestion`) are answered by the
//! browser, so the agent loop stops when the model calls one.

pub mod fetch;
pub mod question;
pub mod search;
pub mod todo;

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use morphic_types::error::ToolError;
use morphic_types::llm::ToolDefinition;
use morphic_types::model::SearchMode;

use crate::fetch::PageFetcher;
use crate::search::SearchProvider;

pub use fetch::FetchTool;
pub use question::QuestionTool;
pub use search::SearchTool;
pub use todo::{TodoList, TodoReadTool, TodoWriteTool};

/// Per-invocation context handed to [`AgentTool::execute`].
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub tool_call_id: String,
}

#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Name the model calls the tool by.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema of the tool input.
    fn input_schema(&self) -> Value;

    /// Client tools have no server-side execution.
    fn is_client_side(&self) -> bool {
        false
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<Value, ToolError>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// JSON Schema for a tool input type.
pub(crate) fn schema_of<T: JsonSchema>() -> Value {
    schemars::schema_for!(T).to_value()
}

/// Deserialize a tool input, mapping failures to `ToolError::InvalidInput`.
pub(crate) fn parse_input<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

pub(crate) fn to_output<T: serde::Serialize>(output: &T) -> Result<Value, ToolError> {
    serde_json::to_value(output).map_err(|e| ToolError::InvalidInput(e.to_string()))
}

// ---------------------------------------------------------------------------
// ToolSet
// ---------------------------------------------------------------------------

/// The tools active for one researcher run.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn AgentTool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl AgentTool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    /// Tools for a search mode.
    ///
    /// Quick mode gets `search` (forced to optimized results) and `fetch`.
    /// Planning and adaptive add the todo tools and `askQuestion`, sharing
    /// one fresh todo list.
    pub fn for_mode(
        mode: SearchMode,
        search: Arc<dyn SearchProvider>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        let set = ToolSet::new()
            .with(SearchTool::new(search).force_optimized(mode == SearchMode::Quick))
            .with(FetchTool::new(fetcher));
        match mode {
            SearchMode::Quick => set,
            SearchMode::Planning | SearchMode::Adaptive => {
                let todos = TodoList::new();
                set.with(TodoWriteTool::new(todos.clone()))
                    .with(TodoReadTool::new(todos))
                    .with(QuestionTool)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn AgentTool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
