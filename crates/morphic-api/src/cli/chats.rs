//! `morphic chats`: list a user's saved chats.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use morphic_core::chat::repository::ChatRepository;
use morphic_infra::sqlite::{DatabasePool, SqliteChatRepository};
use morphic_types::chat::{Chat, Visibility};

const TITLE_WIDTH: usize = 50;

fn shorten(title: &str) -> String {
    if title.chars().count() > TITLE_WIDTH {
        let head: String = title.chars().take(TITLE_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

pub fn render_table(chats: &[Chat]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Visibility").fg(Color::White),
        Cell::new("Created").fg(Color::White),
    ]);

    for chat in chats {
        let visibility = match chat.visibility {
            Visibility::Public => Cell::new("● public").fg(Color::Green),
            Visibility::Private => Cell::new("○ private").fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(&chat.id).fg(Color::Cyan),
            Cell::new(shorten(&chat.title)),
            visibility,
            Cell::new(chat.created_at.format("%Y-%m-%d %H:%M").to_string()).fg(Color::DarkGrey),
        ]);
    }
    table
}

pub async fn list_chats(pool: DatabasePool, user_id: &str, limit: u32, json: bool) -> Result<()> {
    let chats = SqliteChatRepository::new(pool).list_chats(user_id, limit, 0).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chats)?);
        return Ok(());
    }

    if chats.is_empty() {
        println!();
        println!("  {} No chats found for {}", style("i").blue().bold(), style(user_id).yellow());
        println!();
        return Ok(());
    }

    println!();
    println!("{}", render_table(&chats));
    println!();
    println!(
        "  {} chat{}",
        style(chats.len()).bold(),
        if chats.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}
