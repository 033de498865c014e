//! `askQuestion`: a clarifying question rendered and answered by the client.

use async_trait::async_trait;
use serde_json::Value;

use morphic_types::error::ToolError;
use morphic_types::search::QuestionInput;

use super::{AgentTool, ToolContext, parse_input, schema_of};

pub struct QuestionTool;

#[async_trait]
impl AgentTool for QuestionTool {
    fn name(&self) -> &'static str {
        "askQuestion"
    }

    fn description(&self) -> &'static str {
        "Ask a clarifying question with multiple options when more information is needed"
    }

    fn input_schema(&self) -> Value {
        schema_of::<QuestionInput>()
    }

    fn is_client_side(&self) -> bool {
        true
    }

    /// Validates the question; the answer arrives with the next user turn.
    async fn execute(&self, input: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let _: QuestionInput = parse_input(input.clone())?;
        Ok(input)
    }
}
