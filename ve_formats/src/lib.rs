pub mod actions;
pub mod cast;
pub mod document;
pub mod error;
pub mod variables;

pub use actions::{
    ActionGraph, ActionId, ActionKind, ActionNode, ActionParams, OutputLink, START_ACTION_ID,
    VariableLink,
};
pub use cast::Value;
pub use document::{EventDocument, event_name_from_source};
pub use error::{EventError, Result};
pub use variables::{GenderCategory, SlotKey, VariableId, VariableSlot, VariableTable, VariableType};
