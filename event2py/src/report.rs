use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use ve_formats::EventDocument;

use crate::nodes::UnsupportedAction;
use crate::script::Script;

/// Outcome of translating one event file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventReport {
    pub source: PathBuf,
    pub event_name: Option<String>,
    pub trigger_type: Option<String>,
    pub action_count: usize,
    pub variable_count: usize,
    pub line_count: usize,
    pub output: Option<PathBuf>,
    pub unsupported_actions: Vec<UnsupportedAction>,
    pub error: Option<String>,
}

impl EventReport {
    pub fn translated(
        source: &Path,
        document: &EventDocument,
        script: &Script,
        output: Option<PathBuf>,
    ) -> Self {
        EventReport {
            source: source.to_path_buf(),
            event_name: Some(script.event_name.clone()),
            trigger_type: document.trigger_type.clone(),
            action_count: document.actions.len(),
            variable_count: document.variables.len(),
            line_count: script.lines().len(),
            output,
            unsupported_actions: script.unsupported.clone(),
            error: None,
        }
    }

    pub fn failed(source: &Path, error: &anyhow::Error) -> Self {
        EventReport {
            source: source.to_path_buf(),
            event_name: None,
            trigger_type: None,
            action_count: 0,
            variable_count: 0,
            line_count: 0,
            output: None,
            unsupported_actions: Vec::new(),
            error: Some(format!("{error:#}")),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationReport {
    pub events: Vec<EventReport>,
}

#[derive(Serialize)]
struct ReportManifest<'a> {
    translated: usize,
    failed: usize,
    unsupported_kinds: BTreeMap<String, usize>,
    events: &'a [EventReport],
}

impl TranslationReport {
    pub fn push(&mut self, event: EventReport) {
        self.events.push(event);
    }

    pub fn failures(&self) -> usize {
        self.events.iter().filter(|event| event.is_failure()).count()
    }

    /// Unsupported action occurrences per kind across every event.
    pub fn unsupported_kind_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for action in self
            .events
            .iter()
            .flat_map(|event| event.unsupported_actions.iter())
        {
            *counts.entry(action.kind.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let failed = self.failures();
        let manifest = ReportManifest {
            translated: self.events.len() - failed,
            failed,
            unsupported_kinds: self.unsupported_kind_counts(),
            events: &self.events,
        };
        let json = serde_json::to_string_pretty(&manifest)
            .context("serializing translation report to JSON")?;
        fs::write(path, json)
            .with_context(|| format!("writing translation report to {}", path.display()))?;
        info!("Saved translation report to {}", path.display());
        Ok(())
    }
}
