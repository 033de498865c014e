//! `todoWrite` / `todoRead`: a task list scoped to one researcher run.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use morphic_types::error::ToolError;
use morphic_types::todo::{
    TodoItem, TodoReadInput, TodoReadOutput, TodoStatus, TodoWriteInput, TodoWriteOutput,
};

use super::{AgentTool, ToolContext, parse_input, schema_of, to_output};

/// Shared task list. Cloning shares the underlying list.
#[derive(Clone, Default)]
pub struct TodoList {
    items: Arc<Mutex<Vec<TodoItem>>>,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<TodoItem> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }

    fn replace(&self, todos: Vec<TodoItem>) {
        if let Ok(mut items) = self.items.lock() {
            *items = todos;
        }
    }
}

fn completed(todos: &[TodoItem]) -> usize {
    todos.iter().filter(|t| t.status == TodoStatus::Completed).count()
}

// ---------------------------------------------------------------------------
// todoWrite
// ---------------------------------------------------------------------------

pub struct TodoWriteTool {
    list: TodoList,
}

impl TodoWriteTool {
    pub fn new(list: TodoList) -> Self {
        Self { list }
    }
}

#[async_trait]
impl AgentTool for TodoWriteTool {
    fn name(&self) -> &'static str {
        "todoWrite"
    }

    fn description(&self) -> &'static str {
        "Create or update todos to track progress on complex tasks. Use this to maintain a list of action items."
    }

    fn input_schema(&self) -> Value {
        schema_of::<TodoWriteInput>()
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let input: TodoWriteInput = parse_input(input)?;
        let total = input.todos.len();
        let done = completed(&input.todos);
        self.list.replace(input.todos.clone());

        to_output(&TodoWriteOutput {
            success: true,
            message: input
                .progress_message
                .unwrap_or_else(|| format!("Updated {total} todos")),
            completed_count: done,
            total_count: total,
            todos: input.todos,
        })
    }
}

// ---------------------------------------------------------------------------
// todoRead
// ---------------------------------------------------------------------------

pub struct TodoReadTool {
    list: TodoList,
}

impl TodoReadTool {
    pub fn new(list: TodoList) -> Self {
        Self { list }
    }
}

#[async_trait]
impl AgentTool for TodoReadTool {
    fn name(&self) -> &'static str {
        "todoRead"
    }

    fn description(&self) -> &'static str {
        "Read the current list of todos and their status"
    }

    fn input_schema(&self) -> Value {
        schema_of::<TodoReadInput>()
    }

    async fn execute(&self, _input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let todos = self.list.snapshot();
        let total = todos.len();
        let done = completed(&todos);
        let summary = if total == 0 {
            "No tasks created yet".to_string()
        } else {
            format!("{done} of {total} tasks completed")
        };

        to_output(&TodoReadOutput {
            todos,
            summary,
            completed_count: done,
            total_count: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ToolContext {
        ToolContext {
            tool_call_id: "call_t".into(),
        }
    }

    fn todo(id: &str, status: &str) -> Value {
        json!({"id": id, "content": format!("task {id}"), "status": status, "timestamp": "2025-01-01T00:00:00Z"})
    }

    #[tokio::test]
    async fn test_read_before_write() {
        let read = TodoReadTool::new(TodoList::new());
        let out = read.execute(json!({}), &ctx()).await.unwrap();
        assert_eq!(out["summary"], "No tasks created yet");
        assert_eq!(out["totalCount"], 0);
    }

    #[tokio::test]
    async fn test_write_then_read_shares_list() {
        let list = TodoList::new();
        let write = TodoWriteTool::new(list.clone());
        let read = TodoReadTool::new(list.clone());

        let out = write
            .execute(
                json!({"todos": [todo("1", "completed"), todo("2", "pending"), todo("3", "in_progress")]}),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["message"], "Updated 3 todos");
        assert_eq!(out["completedCount"], 1);
        assert_eq!(out["totalCount"], 3);

        let out = read.execute(json!({}), &ctx()).await.unwrap();
        assert_eq!(out["summary"], "1 of 3 tasks completed");
        assert_eq!(out["todos"][1]["id"], "2");
        assert_eq!(out["todos"][1]["priority"], "medium");
    }

    #[tokio::test]
    async fn test_write_replaces_and_uses_progress_message() {
        let list = TodoList::new();
        let write = TodoWriteTool::new(list.clone());
        write
            .execute(json!({"todos": [todo("1", "pending"), todo("2", "pending")]}), &ctx())
            .await
            .unwrap();
        let out = write
            .execute(
                json!({"todos": [todo("1", "completed")], "progressMessage": "Search done"}),
                &ctx(),
            )
            .await
            .unwrap();
        assert_eq!(out["message"], "Search done");
        assert_eq!(list.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_unknown_status() {
        let write = TodoWriteTool::new(TodoList::new());
        let err = write
            .execute(json!({"todos": [todo("1", "blocked")]}), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
