//! Generates Python scripts from HHS+ visual events.

pub mod cli;
pub mod lines;
pub mod nodes;
pub mod report;
pub mod script;
pub mod translate;

pub use lines::ScriptLines;
pub use nodes::{Generator, UnsupportedAction};
pub use report::{EventReport, TranslationReport};
pub use script::{to_script, Script};
