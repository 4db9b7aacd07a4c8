//! Example client for the outliner API
//!
//! Expects `outliner serve` running on localhost:3000.

use outliner::api::{Client, HttpClient};
use outliner::operation::{Effect, Operation};
use outliner::outline::Outcome;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::new();
    println!("Outliner API Client Example");
    println!("---------------------------");

    let config = client.config().await?;
    let labels: Vec<&str> = config.status_labels.iter().map(|l| l.label()).collect();
    println!("Status labels: {}", labels.join(", "));

    println!("\nAdding a parent with one child...");
    let parent = match client
        .dispatch(Operation::Add {
            text: "Client example".to_string(),
            parent: None,
        })
        .await?
        .outcome
    {
        Outcome::Applied(Effect::Item(id)) => id,
        other => return Err(format!("unexpected outcome: {:?}", other).into()),
    };
    let child = match client
        .dispatch(Operation::Add {
            text: "Child task".to_string(),
            parent: Some(parent.clone()),
        })
        .await?
        .outcome
    {
        Outcome::Applied(Effect::Item(id)) => id,
        other => return Err(format!("unexpected outcome: {:?}", other).into()),
    };

    println!("\nTrying to complete the parent before its child...");
    let dispatched = client
        .dispatch(Operation::CycleForward { id: parent.clone() })
        .await?;
    println!("Outcome: {:?}", dispatched.outcome);

    println!("\nCompleting the child...");
    client
        .dispatch(Operation::CycleForward { id: child })
        .await?;
    let record = client.item(&parent).await?;
    if let Some(progress) = record.progress {
        println!("Parent progress: {}", progress);
    }

    println!("\nRecent events:");
    for event in client.events_since(0).await? {
        println!("  #{} {}", event.seq, event.event.name());
    }

    Ok(())
}
