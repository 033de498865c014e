//! `morphic show`: print a saved chat as a readable transcript.
//!
//! Assistant text gets its `[n](#)` citations resolved against the search
//! results of the same message, followed by the numbered source list.

use anyhow::{Result, bail};
use console::style;

use morphic_core::chat::reasoning::filter_reasoning_parts;
use morphic_core::chat::repository::ChatRepository;
use morphic_core::util::citation::{extract_citation_map, process_citations};
use morphic_core::util::domain::display_url_name;
use morphic_infra::sqlite::{DatabasePool, SqliteChatRepository};
use morphic_types::chat::ChatWithMessages;
use morphic_types::message::{MessagePart, MessageRole, UiMessage};

/// One message ready for the terminal.
#[derive(Debug, PartialEq)]
pub struct RenderedMessage {
    pub role: MessageRole,
    pub reasoning: Vec<String>,
    pub body: String,
    /// `[n] site - title` lines for the cited search results.
    pub sources: Vec<String>,
}

pub fn render_messages(messages: &[UiMessage], include_reasoning: bool) -> Vec<RenderedMessage> {
    let messages = if include_reasoning {
        messages.to_vec()
    } else {
        filter_reasoning_parts(messages)
    };

    messages
        .iter()
        .map(|message| {
            let citations = extract_citation_map(message);
            let mut reasoning = Vec::new();
            let mut texts = Vec::new();
            for part in &message.parts {
                match part {
                    MessagePart::Text { text } => texts.push(process_citations(text, citations.as_ref())),
                    MessagePart::Reasoning { text } => reasoning.push(text.trim().to_string()),
                    _ => {}
                }
            }

            let sources = citations
                .iter()
                .flatten()
                .map(|(n, item)| format!("[{n}] {} - {}", display_url_name(&item.url), item.title))
                .collect();

            RenderedMessage {
                role: message.role,
                reasoning,
                body: texts.join("\n\n"),
                sources,
            }
        })
        .collect()
}

pub async fn show_chat(pool: DatabasePool, chat_id: &str, include_reasoning: bool, json: bool) -> Result<()> {
    let repo = SqliteChatRepository::new(pool);
    let Some(chat) = repo.get_chat(chat_id).await? else {
        bail!("chat '{chat_id}' not found");
    };
    let messages = repo.load_messages(chat_id).await?;

    if json {
        let messages = if include_reasoning {
            messages
        } else {
            filter_reasoning_parts(&messages)
        };
        println!("{}", serde_json::to_string_pretty(&ChatWithMessages { chat, messages })?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style(&chat.title).bold(), style(format!("({})", chat.id)).dim());
    println!(
        "  {} · {}",
        style(&chat.user_id).yellow(),
        style(chat.created_at.format("%Y-%m-%d %H:%M")).dim()
    );

    for message in render_messages(&messages, include_reasoning) {
        println!();
        let label = match message.role {
            MessageRole::User => style("You").cyan().bold(),
            MessageRole::Assistant => style("Morphic").green().bold(),
            MessageRole::System | MessageRole::Tool => style("System").dim(),
        };
        println!("  {label}");
        for thought in &message.reasoning {
            println!("  {}", style(thought).dim().italic());
        }
        for line in message.body.lines() {
            println!("  {line}");
        }
        if !message.sources.is_empty() {
            println!();
            for source in &message.sources {
                println!("    {}", style(source).dim());
            }
        }
    }
    println!();
    Ok(())
}
