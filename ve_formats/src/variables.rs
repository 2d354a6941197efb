use std::collections::BTreeMap;
use std::fmt;

use log::{debug, warn};
use roxmltree::Node;
use serde::Serialize;

use crate::cast::{self, Value};
use crate::error::{EventError, Result};

pub type VariableId = u32;

const VARIABLE_TAG_PREFIX: &str = "SeqVar_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum VariableType {
    Int,
    Float,
    Bool,
    String,
    Double,
    ObjectList,
    Other(std::string::String),
}

impl VariableType {
    pub fn from_tag(tag: &str) -> Self {
        let name = tag.strip_prefix(VARIABLE_TAG_PREFIX).unwrap_or(tag);
        match name {
            "Int" => VariableType::Int,
            "Float" => VariableType::Float,
            "Bool" => VariableType::Bool,
            "String" => VariableType::String,
            "Double" => VariableType::Double,
            "ObjectList" => VariableType::ObjectList,
            other => VariableType::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VariableType::Int => "Int",
            VariableType::Float => "Float",
            VariableType::Bool => "Bool",
            VariableType::String => "String",
            VariableType::Double => "Double",
            VariableType::ObjectList => "ObjectList",
            VariableType::Other(name) => name,
        }
    }

    /// Child tag holding the literal, or `None` for types without one.
    pub fn content_tag(&self) -> Option<&str> {
        match self {
            VariableType::ObjectList => None,
            VariableType::String => Some("Str"),
            VariableType::Double => Some("Dbl"),
            other => Some(other.name()),
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Categories produced by the gender list filter, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum GenderCategory {
    Males,
    Females,
    Futanaris,
}

impl GenderCategory {
    pub const ALL: [GenderCategory; 3] = [
        GenderCategory::Males,
        GenderCategory::Females,
        GenderCategory::Futanaris,
    ];

    /// Variable link name on the filter node.
    pub fn link_name(self) -> &'static str {
        match self {
            GenderCategory::Males => "Males",
            GenderCategory::Females => "Females",
            GenderCategory::Futanaris => "Futanaris",
        }
    }

    pub fn name_prefix(self) -> &'static str {
        match self {
            GenderCategory::Males => "males",
            GenderCategory::Females => "females",
            GenderCategory::Futanaris => "futanaris",
        }
    }

    /// Value of the runtime person's `gender` field.
    pub fn gender(self) -> &'static str {
        match self {
            GenderCategory::Males => "male",
            GenderCategory::Females => "female",
            GenderCategory::Futanaris => "futanari",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilteredNames {
    pub males: Option<String>,
    pub females: Option<String>,
    pub futanaris: Option<String>,
}

impl FilteredNames {
    pub fn get(&self, category: GenderCategory) -> Option<&str> {
        match category {
            GenderCategory::Males => self.males.as_deref(),
            GenderCategory::Females => self.females.as_deref(),
            GenderCategory::Futanaris => self.futanaris.as_deref(),
        }
    }

    fn slot_mut(&mut self, category: GenderCategory) -> &mut Option<String> {
        match category {
            GenderCategory::Males => &mut self.males,
            GenderCategory::Females => &mut self.females,
            GenderCategory::Futanaris => &mut self.futanaris,
        }
    }
}

/// Which generated-name slot of a variable an update targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKey {
    GeneratedName,
    Filtered(GenderCategory),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSlot {
    pub id: VariableId,
    pub declared_type: VariableType,
    pub content: Option<Value>,
    generated_name: Option<String>,
    filtered_names: FilteredNames,
}

impl VariableSlot {
    pub fn new(id: VariableId, declared_type: VariableType, content: Option<Value>) -> Self {
        VariableSlot {
            id,
            declared_type,
            content,
            generated_name: None,
            filtered_names: FilteredNames::default(),
        }
    }

    pub fn from_element(elem: Node<'_, '_>) -> Result<Self> {
        let declared_type = VariableType::from_tag(elem.tag_name().name());
        let id = cast::to_id(&cast::read_child_text(elem, "ID", None)?)?;

        let content = match declared_type.content_tag() {
            None => None,
            Some(tag) => match cast::child(elem, tag).and_then(|node| node.text()) {
                Some(text) => Some(cast::coerce_text(text)),
                None => {
                    // Int slots are routinely left empty when a node writes them.
                    if declared_type != VariableType::Int {
                        warn!("Could not parse content of {declared_type} variable {id}");
                    }
                    None
                }
            },
        };

        Ok(VariableSlot::new(id, declared_type, content))
    }

    pub fn generated_name(&self) -> Option<&str> {
        self.generated_name.as_deref()
    }

    pub fn filtered_name(&self, category: GenderCategory) -> Option<&str> {
        self.filtered_names.get(category)
    }

    fn slot_mut(&mut self, key: SlotKey) -> &mut Option<String> {
        match key {
            SlotKey::GeneratedName => &mut self.generated_name,
            SlotKey::Filtered(category) => self.filtered_names.slot_mut(category),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    slots: BTreeMap<VariableId, VariableSlot>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every `SeqVar_*` child of the variable sequence container.
    pub fn from_element(elem: Node<'_, '_>) -> Result<Self> {
        let mut table = VariableTable::new();
        table.extend_from_element(elem)?;
        Ok(table)
    }

    pub fn extend_from_element(&mut self, elem: Node<'_, '_>) -> Result<()> {
        for var_elem in cast::element_children(elem) {
            debug!("Parse variable {}", var_elem.tag_name().name());
            self.register(VariableSlot::from_element(var_elem)?)?;
        }
        Ok(())
    }

    pub fn get(&self, id: VariableId) -> Option<&VariableSlot> {
        self.slots.get(&id)
    }

    pub fn register(&mut self, slot: VariableSlot) -> Result<()> {
        if self.slots.contains_key(&slot.id) {
            return Err(EventError::MalformedGraph(format!(
                "variable id {} is declared more than once",
                slot.id
            )));
        }
        self.slots.insert(slot.id, slot);
        Ok(())
    }

    /// Binds `name` into the slot selected by `key` and returns the name now in effect.
    ///
    /// Names are memoized: once a slot holds a name it keeps it, so a second
    /// request for a different name gets the existing one back.
    pub fn update(&mut self, id: VariableId, key: SlotKey, name: String) -> Result<String> {
        let slot = self.slots.get_mut(&id).ok_or_else(|| {
            EventError::UnresolvedReference(format!("variable {id} is not declared"))
        })?;
        let target = slot.slot_mut(key);
        if let Some(existing) = target.as_deref() {
            if existing != name {
                warn!("variable {id} is already bound to '{existing}', ignoring '{name}' ({key:?})");
            }
            return Ok(existing.to_string());
        }
        *target = Some(name.clone());
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableSlot> {
        self.slots.values()
    }
}
