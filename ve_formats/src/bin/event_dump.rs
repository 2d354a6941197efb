use std::env;

use anyhow::{Context, Result};
use ve_formats::EventDocument;

fn main() -> Result<()> {
    let path = env::args().nth(1).context("usage: event_dump <.ve.xml file>")?;
    let document = EventDocument::from_path(&path)?;
    println!(
        "{} ({} actions, {} variables, trigger {})",
        document.event_name(),
        document.actions.len(),
        document.variables.len(),
        document.trigger_type.as_deref().unwrap_or("-")
    );

    println!("\nActions:");
    for action in document.actions.iter() {
        println!(
            "{id:>5} {kind:<20} {comment}",
            id = action.id,
            kind = action.tag,
            comment = action.comment.as_deref().unwrap_or("")
        );
        for link in action.output_links() {
            let target = link
                .target
                .map(|id| id.to_string())
                .unwrap_or_else(|| String::from("-"));
            println!("        -> {:<16} {target}", link.name);
        }
        for link in action.variable_links() {
            let variable = link
                .variable
                .map(|id| id.to_string())
                .unwrap_or_else(|| String::from("-"));
            println!(
                "        $  {:<16} {variable:<5} {}",
                link.name, link.expected_type
            );
        }
    }

    println!("\nVariables:");
    for slot in document.variables.iter() {
        let content = slot
            .content
            .as_ref()
            .map(|value| value.to_string())
            .unwrap_or_else(|| String::from("-"));
        println!(
            "{id:>5} {kind:<12} {content}",
            id = slot.id,
            kind = slot.declared_type.name()
        );
    }
    Ok(())
}
