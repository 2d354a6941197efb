use log::info;
use ve_formats::{ActionKind, EventDocument, EventError, Result, START_ACTION_ID};

use crate::nodes::{Generator, UnsupportedAction};

/// Python source generated for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub event_name: String,
    lines: Vec<String>,
    pub unsupported: Vec<UnsupportedAction>,
}

impl Script {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// Runs one generation pass over `document`.
///
/// Names are bound into a copy of the variable table, so the document is left
/// as it was and repeated calls produce identical scripts.
pub fn to_script(document: &EventDocument) -> Result<Script> {
    let start = document.actions.get(START_ACTION_ID).ok_or_else(|| {
        EventError::MalformedGraph(format!(
            "{} has no start action (id {START_ACTION_ID})",
            document.source
        ))
    })?;
    if start.kind != ActionKind::Start {
        return Err(EventError::MalformedGraph(format!(
            "action {START_ACTION_ID} of {} is a {} action, not a start action",
            document.source, start.tag
        )));
    }

    let event_name = document.event_name();
    let mut generator = Generator::new(&document.actions, document.variables.clone());
    let lines = generator.emit_start(start, &event_name)?;
    let unsupported = generator.into_unsupported();
    info!(
        "Generated {} lines for event {event_name} ({} unsupported actions)",
        lines.len(),
        unsupported.len()
    );

    Ok(Script {
        event_name,
        lines: lines.into_lines(),
        unsupported,
    })
}
