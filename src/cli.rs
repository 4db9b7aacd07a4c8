//! CLI module
//!
//! This module provides the command-line interface for the outliner tool: running the
//! server, and inspecting or changing an outline held by a running server.

use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;

use crate::{
    api::{serve, Client, ClientConfig, HttpClient, ServerConfig},
    config::OutlineConfig,
    events::EventRecord,
    models::{ItemId, ItemRecord, ItemSeed, Timestamp},
    operation::{Dispatched, Operation},
    outline::{Core, Outcome, Outline},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API server URL
    #[arg(short, long, default_value = "http://localhost:3000", env = "OUTLINER_SERVER")]
    server: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the outliner API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// JSON configuration (status labels, assignees, tags, current user, features)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON file with the initial item tree
        #[arg(short, long, conflicts_with = "example")]
        items: Option<PathBuf>,

        /// Populate with an example outline for UI testing
        #[arg(long)]
        example: bool,
    },

    /// Print the outline
    Tree,

    /// Print events emitted after a sequence number
    Events {
        #[arg(long, default_value_t = 0)]
        since: u64,
    },

    /// Item commands
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add an item at the end of a list
    Add {
        text: String,

        /// Parent id; omitted adds at the top level
        #[arg(long)]
        parent: Option<String>,
    },

    /// Add a sibling right after an item
    #[command(name = "add-after")]
    AddAfter { id: String, text: String },

    /// Cycle the status forward
    Forward { id: String },

    /// Cycle the status backward
    Backward { id: String },

    /// Toggle between open and done
    Toggle { id: String },

    /// Set the status to a label, `none`, or `status-N`
    #[command(name = "set-status")]
    SetStatus { id: String, status: String },

    /// Nest under the previous sibling
    Indent { id: String },

    /// Move out to the parent's list, right after the parent
    Outdent { id: String },

    /// Move to a position in a list
    Move {
        id: String,

        /// Position in the destination list
        index: usize,

        /// Destination parent id; omitted targets the top level
        #[arg(long)]
        parent: Option<String>,
    },

    /// Swap with the previous sibling
    Up { id: String },

    /// Swap with the next sibling
    Down { id: String },

    /// Remove an item and its subtree
    Archive { id: String },

    /// Toggle the priority flag
    Priority { id: String },

    /// Toggle the blocked flag
    Blocked { id: String },

    /// Set the due date (YYYY-MM-DD or YYYY-MM-DD HH:MM); omitted clears it
    Due { id: String, date: Option<String> },

    /// Set the schedule date; omitted clears it
    Schedule { id: String, date: Option<String> },

    /// Assign to someone; omitted unassigns
    Assign { id: String, assignee: Option<String> },

    /// Replace the tag list
    Tags { id: String, tags: Vec<String> },

    /// Add or remove one tag
    Tag {
        id: String,
        tag: String,

        /// Remove the tag instead of adding it
        #[arg(long)]
        off: bool,
    },

    /// Append a comment
    Comment { id: String, text: String },

    /// Append a worklog entry
    Worklog { id: String, text: String },

    /// Replace the item text
    Edit { id: String, text: String },
}

impl ItemCommands {
    fn into_operation(self) -> Result<Operation, chrono::ParseError> {
        let op = match self {
            ItemCommands::Add { text, parent } => Operation::Add {
                text,
                parent: parent.map(ItemId::from),
            },
            ItemCommands::AddAfter { id, text } => Operation::AddAfter { id: id.into(), text },
            ItemCommands::Forward { id } => Operation::CycleForward { id: id.into() },
            ItemCommands::Backward { id } => Operation::CycleBackward { id: id.into() },
            ItemCommands::Toggle { id } => Operation::Toggle { id: id.into() },
            ItemCommands::SetStatus { id, status } => Operation::SetStatus {
                id: id.into(),
                status,
            },
            ItemCommands::Indent { id } => Operation::Indent { id: id.into() },
            ItemCommands::Outdent { id } => Operation::Outdent { id: id.into() },
            ItemCommands::Move { id, index, parent } => Operation::Move {
                id: id.into(),
                parent: parent.map(ItemId::from),
                index,
            },
            ItemCommands::Up { id } => Operation::MoveUp { id: id.into() },
            ItemCommands::Down { id } => Operation::MoveDown { id: id.into() },
            ItemCommands::Archive { id } => Operation::Archive { id: id.into() },
            ItemCommands::Priority { id } => Operation::TogglePriority { id: id.into() },
            ItemCommands::Blocked { id } => Operation::ToggleBlocked { id: id.into() },
            ItemCommands::Due { id, date } => Operation::SetDue {
                id: id.into(),
                due: date.as_deref().map(str::parse::<Timestamp>).transpose()?,
            },
            ItemCommands::Schedule { id, date } => Operation::SetSchedule {
                id: id.into(),
                schedule: date.as_deref().map(str::parse::<Timestamp>).transpose()?,
            },
            ItemCommands::Assign { id, assignee } => Operation::Assign {
                id: id.into(),
                assignee,
            },
            ItemCommands::Tags { id, tags } => Operation::SetTags { id: id.into(), tags },
            ItemCommands::Tag { id, tag, off } => Operation::ToggleTag {
                id: id.into(),
                tag,
                on: !off,
            },
            ItemCommands::Comment { id, text } => Operation::Comment { id: id.into(), text },
            ItemCommands::Worklog { id, text } => Operation::Worklog { id: id.into(), text },
            ItemCommands::Edit { id, text } => Operation::EditText { id: id.into(), text },
        };
        Ok(op)
    }
}

/// Run the CLI application
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            config,
            items,
            example,
        } => {
            let outline_config = match &config {
                Some(path) => OutlineConfig::load(path)?,
                None => OutlineConfig::default(),
            };

            let seeds = if example {
                println!("Populating with example outline for UI testing...");
                example_items()
            } else if let Some(path) = &items {
                load_items(path)?
            } else {
                Vec::new()
            };

            let core = Core::new(Outline::new(outline_config).with_items(seeds));

            // Create a server configuration with the specified port
            let server_config = ServerConfig {
                address: ([127, 0, 0, 1], port).into(),
            };

            println!("Starting outliner API server on port {}...", port);
            serve(core, server_config).await?;
            Ok(())
        }

        Commands::Tree => {
            let client = create_client(&cli.server);
            let records = client.outline().await?;
            if records.is_empty() {
                println!("No items yet. Add some with 'outliner item add'");
            }
            for record in &records {
                print_record(record, 0);
            }
            Ok(())
        }

        Commands::Events { since } => {
            let client = create_client(&cli.server);
            for record in client.events_since(since).await? {
                print_event(&record);
            }
            Ok(())
        }

        Commands::Item { command } => {
            let client = create_client(&cli.server);
            let dispatched = client.dispatch(command.into_operation()?).await?;
            print_dispatched(&dispatched)?;
            Ok(())
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            generate(shell, &mut cmd, bin_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn create_client(server_url: &str) -> HttpClient {
    let config = ClientConfig {
        base_url: server_url.to_string(),
    };

    HttpClient::with_config(config)
}

fn load_items(path: &Path) -> Result<Vec<ItemSeed>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn print_dispatched(dispatched: &Dispatched) -> Result<(), serde_json::Error> {
    match &dispatched.outcome {
        Outcome::Applied(effect) => {
            println!("{} {}", "applied".green().bold(), serde_json::to_string(effect)?)
        }
        Outcome::Unchanged(reason) => {
            println!("{} {}", "unchanged".yellow().bold(), serde_json::to_string(reason)?)
        }
        Outcome::Rejected(rejection) => println!("{} {}", "rejected".red().bold(), rejection),
    }
    for record in &dispatched.events {
        print_event(record);
    }
    Ok(())
}

fn print_event(record: &EventRecord) {
    let detail = serde_json::to_value(&record.event)
        .ok()
        .and_then(|value| value.get("detail").cloned())
        .map(|detail| detail.to_string())
        .unwrap_or_default();
    println!(
        "  {} {} {}",
        format!("#{}", record.seq).dimmed(),
        record.event.name().cyan(),
        detail
    );
}

/// Recursively prints an item and its children with two spaces per depth level
fn print_record(record: &ItemRecord, depth: usize) {
    let item = &record.item;
    let mut line = "  ".repeat(depth);

    match &record.label {
        Some(label) if record.completed => line.push_str(&format!("{} ", label.green().bold())),
        Some(label) => line.push_str(&format!("{} ", label.yellow().bold())),
        None => {}
    }
    if record.completed {
        line.push_str(&item.text().dimmed().to_string());
    } else {
        line.push_str(item.text());
    }
    if let Some(progress) = record.progress {
        line.push_str(&format!(" [{}]", progress).blue().to_string());
    }
    if item.is_priority() {
        line.push_str(&" !".red().bold().to_string());
    }
    if item.is_blocked() {
        line.push_str(&" blocked".red().to_string());
    }
    if let Some(due) = item.due() {
        line.push_str(&format!(" due:{}", due).magenta().to_string());
    }
    if let Some(schedule) = item.schedule() {
        line.push_str(&format!(" scheduled:{}", schedule).magenta().to_string());
    }
    if let Some(assignee) = item.assignee() {
        line.push_str(&format!(" @{}", assignee).cyan().to_string());
    }
    for tag in item.tags() {
        line.push_str(&format!(" #{}", tag).cyan().to_string());
    }
    if !item.is_editable() {
        line.push_str(&" (read-only)".dimmed().to_string());
    }
    line.push_str(&format!("  {}", item.id()).dimmed().to_string());
    println!("{}", line);

    for child in &record.children {
        print_record(child, depth + 1);
    }
}

/// A small project outline that touches every display feature
fn example_items() -> Vec<ItemSeed> {
    let mut research = ItemSeed::new("Research competing products").with_status("DONE");
    research.tags = vec!["research".to_string()];

    let mut wireframes = ItemSeed::new("Sketch wireframes");
    wireframes.priority = true;
    wireframes.assignee = Some("alice".to_string());

    let mut api = ItemSeed::new("Define the HTTP API");
    api.blocked = true;
    api.due = "2026-11-02".parse().ok();

    let mut review = ItemSeed::new("Legal review").read_only();
    review.schedule = "2026-11-10 14:00".parse().ok();

    vec![
        ItemSeed::new("Design phase").with_children(vec![research, wireframes]),
        ItemSeed::new("Build phase").with_children(vec![
            api,
            ItemSeed::new("Implement the engine").with_children(vec![
                ItemSeed::new("Status cycling").with_status("DONE"),
                ItemSeed::new("Hierarchy moves"),
            ]),
        ]),
        ItemSeed::new("Launch notes").with_status("none").with_children(vec![review]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_item_commands() {
        let cli = Cli::try_parse_from([
            "outliner", "item", "move", "abc", "2", "--parent", "root",
        ])
        .unwrap();
        let Commands::Item { command } = cli.command else {
            panic!("expected item command");
        };
        assert_eq!(
            command.into_operation().unwrap(),
            Operation::Move {
                id: ItemId::from("abc"),
                parent: Some(ItemId::from("root")),
                index: 2,
            }
        );
    }

    #[test]
    fn test_due_dates_are_parsed_and_validated() {
        let ok = ItemCommands::Due {
            id: "a".to_string(),
            date: Some("2026-01-31".to_string()),
        };
        assert!(matches!(
            ok.into_operation().unwrap(),
            Operation::SetDue { due: Some(Timestamp::Date(_)), .. }
        ));

        let bad = ItemCommands::Due {
            id: "a".to_string(),
            date: Some("tomorrow".to_string()),
        };
        assert!(bad.into_operation().is_err());
    }

    #[test]
    fn test_example_outline_loads_consistently() {
        let outline = Outline::with_seed(OutlineConfig::default(), 1).with_items(example_items());
        let records = outline.records();
        assert_eq!(records.len(), 3);
        // one of two children done
        assert_eq!(records[0].progress.map(|p| (p.done, p.total)), Some((1, 2)));
        assert!(crate::aggregate::stale_items(outline.tree(), outline.labels()).is_empty());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
