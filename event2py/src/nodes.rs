//! Python emission for every action kind.
//!
//! A [`Generator`] walks the action graph from the start node, pulling in
//! downstream nodes through their output links, and binds Python names into
//! its own copy of the variable table as it goes.

use std::collections::BTreeSet;

use log::{debug, warn};
use serde::Serialize;
use ve_formats::{
    ActionGraph, ActionId, ActionKind, ActionNode, EventError, GenderCategory, Result, SlotKey,
    Value, VariableId, VariableSlot, VariableTable,
};

use crate::lines::ScriptLines;

/// Inserted ahead of everything else by the start node.
const PRELUDE: [&str; 4] = [
    "# import game interface",
    "from events import GameInterface",
    "",
    "",
];

const DAYLIGHT_PHASES: [&str; 4] = ["Day", "Night", "Sunrise", "Sunset"];

/// Column the image set entries are aligned to.
const IMAGE_SET_INDENT: &str = "         ";

/// An action whose kind has no emission; the script only carries its header.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnsupportedAction {
    pub id: ActionId,
    pub kind: String,
}

pub struct Generator<'a> {
    graph: &'a ActionGraph,
    variables: VariableTable,
    unsupported: BTreeSet<UnsupportedAction>,
}

impl<'a> Generator<'a> {
    /// `variables` is consumed by this pass; callers hand in a copy to keep
    /// their own table untouched.
    pub fn new(graph: &'a ActionGraph, variables: VariableTable) -> Self {
        Generator {
            graph,
            variables,
            unsupported: BTreeSet::new(),
        }
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    pub fn into_unsupported(self) -> Vec<UnsupportedAction> {
        self.unsupported.into_iter().collect()
    }

    /// Emits the whole script rooted at `node`, which must be the start node.
    pub fn emit_start(&mut self, node: &ActionNode, event_name: &str) -> Result<ScriptLines> {
        if node.kind != ActionKind::Start {
            return Err(EventError::MalformedGraph(format!(
                "action {} ({}) is not a start action",
                node.id, node.tag
            )));
        }
        debug!("Translate start action {}", node.id);

        let mut lines = ScriptLines::new();
        emit_header(node, &mut lines);
        for (index, line) in PRELUDE.iter().enumerate() {
            lines.insert_at(index, line, 0);
        }

        lines.append("def try_():");
        self.emit_body(node, &mut lines, "Try")?;
        lines.close_function();

        lines.append("def execute():");
        self.emit_body(node, &mut lines, "Execute")?;
        lines.close_function();

        lines.append("# define variables");
        lines.append("game = GameInterface()");
        lines.append(format!("eventname = \"{}\"", escape_quotes(event_name)));
        lines.append("");
        Ok(lines)
    }

    /// Emits one non-start node and everything reachable through the outputs it follows.
    pub fn emit_node(&mut self, node: &ActionNode) -> Result<ScriptLines> {
        debug!("Translate action {} ({})", node.id, node.tag);
        let mut lines = ScriptLines::new();
        emit_header(node, &mut lines);

        match node.kind {
            ActionKind::Start => {
                return Err(EventError::MalformedGraph(format!(
                    "start action {} is reached through an output link",
                    node.id
                )));
            }
            ActionKind::Todo => self.emit_todo(node, &mut lines)?,
            ActionKind::GetPersonList => self.emit_get_person_list(node, &mut lines)?,
            ActionKind::GetListCount => self.emit_get_list_count(node, &mut lines)?,
            ActionKind::AcceptEvent => lines.append("return True  # accept event"),
            ActionKind::ClearObjectList => {
                let list = self.bound_name(node, "List")?;
                lines.append(format!("{list} = []"));
                self.emit_all_outputs(node, &mut lines)?;
            }
            ActionKind::CompareIntSplit => self.emit_compare_int_split(node, &mut lines)?,
            ActionKind::IsScheduledForToday => {
                self.emit_branch(
                    node,
                    &mut lines,
                    "if game.is_scheduled_for_today(eventname) is False:",
                    "False",
                )?;
                self.emit_branch(node, &mut lines, "else:", "True")?;
            }
            ActionKind::CheckDaylight => self.emit_check_daylight(node, &mut lines)?,
            ActionKind::ShowRandomImage => self.emit_show_random_image(node, &mut lines)?,
            ActionKind::ShowText => {
                let text = self.content(node, "Text")?;
                lines.append(format!(
                    "game.show_text(\"\"\"{}\"\"\")",
                    escape_quotes(&text.to_string())
                ));
                self.emit_named_output(node, &mut lines, "Out")?;
            }
            ActionKind::PassTime => self.emit_pass_time(node, &mut lines)?,
            ActionKind::RandomChance => self.emit_random_chance(node, &mut lines)?,
            ActionKind::MinObjListElements => {
                let list = self.bound_name(node, "List")?;
                let min = self.content(node, "Min")?;
                self.emit_branch(node, &mut lines, &format!("if len({list}) < {min}:"), "<")?;
                self.emit_branch(node, &mut lines, "else:", ">=")?;
            }
            ActionKind::ListFilterGender => self.emit_list_filter_gender(node, &mut lines)?,
            ActionKind::SetSchedule => {
                let days = self.content(node, "Days")?;
                lines.append(format!("game.set_schedule(eventname, days={days})"));
            }
            ActionKind::Unsupported => {
                warn!(
                    "No translation for action {} ({}), emitting its header only",
                    node.id, node.tag
                );
                self.unsupported.insert(UnsupportedAction {
                    id: node.id,
                    kind: node.tag.clone(),
                });
            }
        }
        Ok(lines)
    }

    /// Follows every connected output in declaration order.
    pub fn emit_all_outputs(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let graph = self.graph;
        for target in node.targets() {
            let next = graph.resolve(target)?;
            lines.extend(self.emit_node(next)?);
        }
        Ok(())
    }

    /// Follows the output called `name`; an unconnected one ends the function.
    pub fn emit_named_output(
        &mut self,
        node: &ActionNode,
        lines: &mut ScriptLines,
        name: &str,
    ) -> Result<()> {
        let graph = self.graph;
        match node.output_link(name)?.target {
            None => lines.append("return"),
            Some(target) => {
                let next = graph.resolve(target)?;
                lines.extend(self.emit_node(next)?);
            }
        }
        Ok(())
    }

    /// Output `name` as the body of an already opened block.
    fn emit_body(&mut self, node: &ActionNode, lines: &mut ScriptLines, name: &str) -> Result<()> {
        let mut body = ScriptLines::new();
        self.emit_named_output(node, &mut body, name)?;
        if !body.has_statements() {
            body.append("pass");
        }
        lines.extend(body);
        Ok(())
    }

    fn emit_branch(
        &mut self,
        node: &ActionNode,
        lines: &mut ScriptLines,
        condition: &str,
        output: &str,
    ) -> Result<()> {
        lines.append(condition);
        self.emit_body(node, lines, output)?;
        lines.dedent();
        Ok(())
    }

    fn emit_todo(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let message = self.content(node, "Message")?;
        lines.append(format!(
            "print(\"\"\"{}\"\"\")",
            escape_quotes(&message.to_string())
        ));
        Ok(())
    }

    fn emit_get_person_list(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let list_id = linked_variable_id(node, "List")?;
        let kind = node.params.list_kind.as_deref().ok_or_else(|| {
            EventError::MissingContent(format!("action {} has no <ListKind>", node.id))
        })?;
        let name = self.bind(list_id, format!("person_list_{list_id}"))?;
        lines.append(format!(
            "{name} = game.get_person_list(\"{}\")",
            escape_quotes(kind)
        ));
        self.emit_all_outputs(node, lines)
    }

    fn emit_get_list_count(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let list = self.bound_name(node, "List")?;
        let count_id = linked_variable_id(node, "Count")?;
        let count = self.bind(count_id, format!("len_{list}"))?;
        lines.append(format!("{count} = len({list})  # var id {count_id}"));
        self.emit_all_outputs(node, lines)
    }

    fn emit_compare_int_split(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let var = self.bound_name(node, "Var")?;
        let splits = &node.params.split_points;
        let Some(last) = splits.last() else {
            return Err(EventError::MissingContent(format!(
                "action {} has no split points",
                node.id
            )));
        };

        for (index, split) in splits.iter().enumerate() {
            let keyword = if index == 0 { "if" } else { "elif" };
            self.emit_branch(
                node,
                lines,
                &format!("{keyword} {var} < {split}:"),
                &format!("< {split}"),
            )?;
        }
        self.emit_branch(node, lines, "else:", &format!(">= {last}"))
    }

    fn emit_check_daylight(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        lines.append("daylight_check = game.check_daylight()");
        for (index, phase) in DAYLIGHT_PHASES.iter().enumerate() {
            let keyword = if index == 0 { "if" } else { "elif" };
            self.emit_branch(
                node,
                lines,
                &format!("{keyword} daylight_check == \"{phase}\":"),
                phase,
            )?;
        }
        Ok(())
    }

    fn emit_show_random_image(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let images = &node.params.images;
        if images.is_empty() {
            return Err(EventError::MissingContent(format!(
                "action {} has no images",
                node.id
            )));
        }

        lines.append("import random");
        lines.append("");
        lines.append("images = {");
        let last = images.len() - 1;
        for (index, path) in images.iter().enumerate() {
            let separator = if index < last { "," } else { "" };
            lines.append(format!(
                "{IMAGE_SET_INDENT}\"{}\"{separator}",
                escape_quotes(path)
            ));
        }
        lines.append(format!("{IMAGE_SET_INDENT}}}"));
        lines.append("game.show_image(random.choice(list(images)))");
        lines.append("");
        self.emit_named_output(node, lines, "Out")
    }

    fn emit_pass_time(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let hours = self.optional_content(node, "Hours").unwrap_or(Value::Int(0));
        let minutes = self.optional_content(node, "Minutes").unwrap_or(Value::Int(0));
        let pass_type = node.params.time_pass_type.as_deref().ok_or_else(|| {
            EventError::MissingContent(format!("action {} has no <TimePassType>", node.id))
        })?;
        lines.append(format!(
            "game.pass_time({hours}, {minutes}, \"{}\")",
            escape_quotes(&pass_type.to_lowercase())
        ));
        self.emit_named_output(node, lines, "Out")
    }

    fn emit_random_chance(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let chance = self.content(node, "Chance")?;
        if !chance.as_int().is_some_and(|percent| (1..=100).contains(&percent)) {
            warn!(
                "Chance {chance} on action {} is not a percentage between 1 and 100",
                node.id
            );
        }

        lines.append("from random import randint");
        lines.append("");
        self.emit_branch(
            node,
            lines,
            &format!("if {chance} < randint(1, 100):  # not passed"),
            "Not Passed",
        )?;
        self.emit_branch(node, lines, "else:", "Passed")
    }

    fn emit_list_filter_gender(&mut self, node: &ActionNode, lines: &mut ScriptLines) -> Result<()> {
        let source_id = linked_variable_id(node, "List Source")?;
        let source = self.bound_name(node, "List Source")?;

        for category in GenderCategory::ALL {
            let Some(id) = node
                .find_variable_link(category.link_name())
                .and_then(|link| link.variable)
            else {
                continue;
            };
            if self.variables.get(id).is_none() {
                debug!(
                    "Skipping {} of action {}: variable {id} is not declared",
                    category.link_name(),
                    node.id
                );
                continue;
            }

            let name = self.bind(id, format!("{}_{source}", category.name_prefix()))?;
            self.variables
                .update(source_id, SlotKey::Filtered(category), name.clone())?;
            lines.append(format!(
                "{name} = [p for p in {source} if p.gender == \"{}\"]",
                category.gender()
            ));
        }
        self.emit_named_output(node, lines, "Out")
    }

    fn variable(&self, node: &ActionNode, link: &str) -> Result<&VariableSlot> {
        let id = linked_variable_id(node, link)?;
        self.variables.get(id).ok_or_else(|| {
            EventError::UnresolvedReference(format!(
                "action {} links '{link}' to undeclared variable {id}",
                node.id
            ))
        })
    }

    fn content(&self, node: &ActionNode, link: &str) -> Result<Value> {
        let slot = self.variable(node, link)?;
        slot.content.clone().ok_or_else(|| {
            EventError::MissingContent(format!(
                "variable {} linked as '{link}' on action {} has no content",
                slot.id, node.id
            ))
        })
    }

    /// Content behind `link`, or `None` when any step of the lookup fails.
    fn optional_content(&self, node: &ActionNode, link: &str) -> Option<Value> {
        let id = node.find_variable_link(link)?.variable?;
        self.variables.get(id)?.content.clone()
    }

    /// Python name already bound to the variable behind `link`.
    fn bound_name(&self, node: &ActionNode, link: &str) -> Result<String> {
        let slot = self.variable(node, link)?;
        slot.generated_name().map(str::to_string).ok_or_else(|| {
            EventError::UnresolvedReference(format!(
                "variable {} linked as '{link}' on action {} is read before any action assigns it",
                slot.id, node.id
            ))
        })
    }

    fn bind(&mut self, id: VariableId, name: String) -> Result<String> {
        self.variables.update(id, SlotKey::GeneratedName, name)
    }
}

pub fn emit_header(node: &ActionNode, lines: &mut ScriptLines) {
    match &node.comment {
        Some(comment) => lines.append(format!("# action {}: {comment}", node.id)),
        None => lines.append(format!("# action {}", node.id)),
    }
}

fn linked_variable_id(node: &ActionNode, link: &str) -> Result<VariableId> {
    node.variable_link(link)?.variable.ok_or_else(|| {
        EventError::UnresolvedReference(format!(
            "variable link '{link}' of action {} is not connected",
            node.id
        ))
    })
}

/// Escapes backslashes and double quotes for a Python string literal.
fn escape_quotes(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
