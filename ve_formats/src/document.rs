use std::fs;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use log::{debug, info};
use roxmltree::{Document, Node};

use crate::actions::ActionGraph;
use crate::cast;
use crate::error::Result;
use crate::variables::VariableTable;

pub const EVENT_FILE_SUFFIX: &str = ".ve.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    TriggerType,
    Actions,
    Variables,
}

/// Top-level tags (underscores removed) and the sub-model each feeds.
const SECTIONS: &[(&str, Section)] = &[
    ("TriggerType", Section::TriggerType),
    ("SeqObjects", Section::Actions),
    ("SeqVars", Section::Variables),
];

/// One parsed `.ve.xml` event: the action graph, its variables and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDocument {
    pub trigger_type: Option<String>,
    pub actions: ActionGraph,
    pub variables: VariableTable,
    /// File path or other identifier the event name is derived from.
    pub source: String,
}

impl EventDocument {
    pub fn from_path<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading event file {}", path.display()))?;
        Self::parse_str(&text, path.to_string_lossy())
    }

    pub fn parse_str(text: &str, source: impl Into<String>) -> AnyResult<Self> {
        let source = source.into();
        let xml = Document::parse(text).with_context(|| format!("parsing XML of {source}"))?;
        let document = Self::parse(xml.root_element(), source.clone())
            .with_context(|| format!("reading event model from {source}"))?;
        Ok(document)
    }

    pub fn parse(root: Node<'_, '_>, source: impl Into<String>) -> Result<Self> {
        let mut document = EventDocument {
            trigger_type: None,
            actions: ActionGraph::new(),
            variables: VariableTable::new(),
            source: source.into(),
        };

        for elem in cast::element_children(root) {
            let tag = elem.tag_name().name().replace('_', "");
            let section = SECTIONS
                .iter()
                .find(|(section_tag, _)| *section_tag == tag)
                .map(|(_, section)| *section);
            match section {
                Some(Section::TriggerType) => {
                    document.trigger_type = elem
                        .text()
                        .map(str::trim)
                        .filter(|text| !text.is_empty())
                        .map(str::to_string);
                }
                Some(Section::Actions) => document.actions.extend_from_element(elem)?,
                Some(Section::Variables) => document.variables.extend_from_element(elem)?,
                None => debug!("Ignoring top-level element <{}>", elem.tag_name().name()),
            }
        }

        document.actions.validate()?;
        info!(
            "Parsed event {} ({} actions, {} variables)",
            document.event_name(),
            document.actions.len(),
            document.variables.len()
        );
        Ok(document)
    }

    pub fn event_name(&self) -> String {
        event_name_from_source(&self.source)
    }
}

/// File name without directories and without the `.ve.xml` suffix.
pub fn event_name_from_source(source: &str) -> String {
    let file_name = source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source);
    file_name
        .strip_suffix(EVENT_FILE_SUFFIX)
        .or_else(|| file_name.strip_suffix(".xml"))
        .unwrap_or(file_name)
        .to_string()
}
