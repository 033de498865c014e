//! Task list types used by the planning tools (`todoWrite`, `todoRead`).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TodoItem {
    /// Unique identifier for the todo item
    pub id: String,
    /// The task description
    pub content: String,
    /// Current status of the task
    pub status: TodoStatus,
    /// Priority level of the task
    #[serde(default)]
    pub priority: TodoPriority,
    /// ISO timestamp when the todo was created
    pub timestamp: String,
}

/// Input of `todoWrite`: the full replacement list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodoWriteInput {
    /// The complete list of todos
    pub todos: Vec<TodoItem>,
    /// A brief message about the current progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
}

/// `todoRead` takes no arguments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct TodoReadInput {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoWriteOutput {
    pub success: bool,
    pub message: String,
    pub completed_count: usize,
    pub total_count: usize,
    pub todos: Vec<TodoItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoReadOutput {
    pub todos: Vec<TodoItem>,
    pub summary: String,
    pub completed_count: usize,
    pub total_count: usize,
}
