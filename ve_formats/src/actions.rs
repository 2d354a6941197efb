//! Action nodes of an event graph and the closed catalogue of node kinds.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use log::{debug, warn};
use roxmltree::Node;
use serde::Serialize;

use crate::cast::{self, Value};
use crate::error::{EventError, Result};
use crate::variables::VariableId;

pub type ActionId = u32;

/// Id of the entry node every event graph must declare.
pub const START_ACTION_ID: ActionId = 0;

/// Conditions and latent actions are translated like plain actions.
const STRIPPED_PREFIXES: [&str; 3] = ["SeqAct_", "SeqActLat_", "SeqCond_"];
const ENTRY_TAG: &str = "SeqEvent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ActionKind {
    Start,
    Todo,
    GetPersonList,
    GetListCount,
    AcceptEvent,
    ClearObjectList,
    CompareIntSplit,
    IsScheduledForToday,
    CheckDaylight,
    ShowRandomImage,
    ShowText,
    PassTime,
    RandomChance,
    MinObjListElements,
    ListFilterGender,
    SetSchedule,
    Unsupported,
}

/// Normalized element tag → kind. Anything missing here becomes `Unsupported`.
const KIND_REGISTRY: &[(&str, ActionKind)] = &[
    ("Start", ActionKind::Start),
    ("TODO", ActionKind::Todo),
    ("GetPersonList", ActionKind::GetPersonList),
    ("GetListCount", ActionKind::GetListCount),
    ("AcceptEvent", ActionKind::AcceptEvent),
    ("ClearObjectList", ActionKind::ClearObjectList),
    ("CompareIntSplit", ActionKind::CompareIntSplit),
    ("IsScheduledForToday", ActionKind::IsScheduledForToday),
    ("CheckDaylight", ActionKind::CheckDaylight),
    ("ShowRandomImage", ActionKind::ShowRandomImage),
    ("ShowText", ActionKind::ShowText),
    ("PassTime", ActionKind::PassTime),
    ("RandomChance", ActionKind::RandomChance),
    ("MinObjListElements", ActionKind::MinObjListElements),
    ("ListFilterGender", ActionKind::ListFilterGender),
    ("SetSchedule", ActionKind::SetSchedule),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Comment,
    OutputLinks,
    VariableLinks,
    ListKind,
    TimePassType,
    SplitPoints,
    Images,
}

const COMMON_FIELDS: &[(&str, Field)] = &[
    ("ID", Field::Id),
    ("Comment", Field::Comment),
    ("OutputLinks", Field::OutputLinks),
    ("VariableLinks", Field::VariableLinks),
];

impl ActionKind {
    pub fn resolve(normalized_tag: &str) -> Option<Self> {
        KIND_REGISTRY
            .iter()
            .find(|(tag, _)| *tag == normalized_tag)
            .map(|(_, kind)| *kind)
    }

    pub fn name(self) -> &'static str {
        KIND_REGISTRY
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(tag, _)| *tag)
            .unwrap_or("Unsupported")
    }

    fn extra_fields(self) -> &'static [(&'static str, Field)] {
        match self {
            ActionKind::GetPersonList => &[("ListKind", Field::ListKind)],
            ActionKind::PassTime => &[("TimePassType", Field::TimePassType)],
            ActionKind::CompareIntSplit => &[("SplitPoints", Field::SplitPoints)],
            ActionKind::ShowRandomImage => &[("Images", Field::Images)],
            _ => &[],
        }
    }

    fn field(self, tag: &str) -> Option<Field> {
        COMMON_FIELDS
            .iter()
            .chain(self.extra_fields())
            .find(|(field_tag, _)| *field_tag == tag)
            .map(|(_, field)| *field)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn normalize_kind_tag(tag: &str) -> String {
    let stripped = STRIPPED_PREFIXES
        .iter()
        .find_map(|prefix| tag.strip_prefix(*prefix))
        .unwrap_or(tag);
    match stripped.strip_prefix(ENTRY_TAG) {
        Some(rest) => format!("Start{rest}"),
        None => stripped.to_string(),
    }
}

/// Collapses `\` and `/` separated image paths into `/` separated ones.
pub fn normalize_image_path(raw: &str) -> String {
    let trimmed = raw.trim();
    let separators: &[char] = &['/', '\\'];
    let joined = trimmed
        .split(separators)
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/");
    if trimmed.starts_with(separators) {
        format!("/{joined}")
    } else {
        joined
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLink {
    pub name: String,
    /// `None` ends control flow on this link.
    pub target: Option<ActionId>,
}

impl OutputLink {
    fn from_element(elem: Node<'_, '_>) -> Result<Option<Self>> {
        let Some(name) = link_name(elem) else {
            warn!("Ignoring output link without a name");
            return Ok(None);
        };
        let target = cast::extract_linked_id(elem, "OutputIDs")?;
        Ok(Some(OutputLink { name, target }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableLink {
    pub name: String,
    pub variable: Option<VariableId>,
    pub expected_type: String,
    pub read_only: bool,
    pub write_only: bool,
}

impl VariableLink {
    fn from_element(elem: Node<'_, '_>) -> Result<Option<Self>> {
        let Some(name) = link_name(elem) else {
            warn!("Ignoring variable link without a name");
            return Ok(None);
        };
        let variable = cast::extract_linked_id(elem, "VariableIDs")?;
        let expected_type = cast::read_child_text(elem, "ExpectedType", None)?.to_string();
        let read_only = read_flag(elem, "bReadOnly")?;
        let write_only = read_flag(elem, "bWriteOnly")?;
        Ok(Some(VariableLink {
            name,
            variable,
            expected_type,
            read_only,
            write_only,
        }))
    }
}

fn link_name(elem: Node<'_, '_>) -> Option<String> {
    cast::child(elem, "Name")
        .and_then(|node| node.text())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn read_flag(elem: Node<'_, '_>, tag: &str) -> Result<bool> {
    let value = cast::read_child_text(elem, tag, Some(Value::Bool(false)))?;
    Ok(value.as_flag().unwrap_or_else(|| {
        warn!("Treating unrecognized <{tag}> value '{value}' as false");
        false
    }))
}

/// Kind-specific settings; only the fields of the node's kind are ever filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActionParams {
    pub list_kind: Option<String>,
    pub time_pass_type: Option<String>,
    /// Ascending and free of duplicates.
    pub split_points: Vec<i64>,
    pub images: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionNode {
    pub id: ActionId,
    pub kind: ActionKind,
    /// Element tag after prefix normalization.
    pub tag: String,
    pub comment: Option<String>,
    output_links: Vec<OutputLink>,
    variable_links: Vec<VariableLink>,
    pub params: ActionParams,
}

impl ActionNode {
    pub fn new(id: ActionId, kind: ActionKind) -> Self {
        ActionNode {
            id,
            kind,
            tag: kind.name().to_string(),
            comment: None,
            output_links: Vec::new(),
            variable_links: Vec::new(),
            params: ActionParams::default(),
        }
    }

    pub fn from_element(elem: Node<'_, '_>) -> Result<Self> {
        let tag = normalize_kind_tag(elem.tag_name().name());
        debug!("Parse action {tag}");
        let kind = ActionKind::resolve(&tag).unwrap_or_else(|| {
            warn!("No model for action {tag}");
            ActionKind::Unsupported
        });

        let mut id = None;
        let mut node = ActionNode::new(START_ACTION_ID, kind);
        node.tag = tag;

        for field_elem in cast::element_children(elem) {
            let field_tag = field_elem.tag_name().name();
            let Some(field) = kind.field(field_tag) else {
                debug!("Ignoring <{field_tag}> on action {}", node.tag);
                continue;
            };
            match field {
                Field::Id => id = Some(cast::to_id(&cast::element_text(field_elem, None)?)?),
                Field::Comment => {
                    node.comment = field_elem
                        .text()
                        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
                        .filter(|text| !text.is_empty());
                }
                Field::OutputLinks => {
                    for link_elem in cast::element_children(field_elem) {
                        if let Some(link) = OutputLink::from_element(link_elem)? {
                            node.add_output_link(link)?;
                        }
                    }
                }
                Field::VariableLinks => {
                    for link_elem in cast::element_children(field_elem) {
                        if let Some(link) = VariableLink::from_element(link_elem)? {
                            node.add_variable_link(link)?;
                        }
                    }
                }
                Field::ListKind => {
                    node.params.list_kind = Some(cast::element_text(field_elem, None)?.to_string());
                }
                Field::TimePassType => {
                    node.params.time_pass_type =
                        Some(cast::element_text(field_elem, None)?.to_string());
                }
                Field::SplitPoints => node.params.split_points = parse_split_points(field_elem)?,
                Field::Images => node.params.images = parse_images(field_elem)?,
            }
        }

        node.id = id.ok_or_else(|| {
            EventError::MissingContent(format!("action {} has no <ID>", node.tag))
        })?;
        Ok(node)
    }

    pub fn add_output_link(&mut self, link: OutputLink) -> Result<()> {
        if self.output_links.iter().any(|existing| existing.name == link.name) {
            return Err(EventError::MalformedGraph(format!(
                "action {} declares output link '{}' twice",
                self.tag, link.name
            )));
        }
        self.output_links.push(link);
        Ok(())
    }

    pub fn add_variable_link(&mut self, link: VariableLink) -> Result<()> {
        if self.variable_links.iter().any(|existing| existing.name == link.name) {
            return Err(EventError::MalformedGraph(format!(
                "action {} declares variable link '{}' twice",
                self.tag, link.name
            )));
        }
        self.variable_links.push(link);
        Ok(())
    }

    pub fn output_links(&self) -> &[OutputLink] {
        &self.output_links
    }

    pub fn variable_links(&self) -> &[VariableLink] {
        &self.variable_links
    }

    pub fn find_output_link(&self, name: &str) -> Option<&OutputLink> {
        self.output_links.iter().find(|link| link.name == name)
    }

    pub fn find_variable_link(&self, name: &str) -> Option<&VariableLink> {
        self.variable_links.iter().find(|link| link.name == name)
    }

    /// A missing link means the node was built with the wrong kind for its element.
    pub fn output_link(&self, name: &str) -> Result<&OutputLink> {
        self.find_output_link(name).ok_or_else(|| {
            EventError::UnresolvedReference(format!(
                "action {} ({}) has no output link named '{name}'",
                self.id, self.tag
            ))
        })
    }

    pub fn variable_link(&self, name: &str) -> Result<&VariableLink> {
        self.find_variable_link(name).ok_or_else(|| {
            EventError::UnresolvedReference(format!(
                "action {} ({}) has no variable link named '{name}'",
                self.id, self.tag
            ))
        })
    }

    /// Connected output targets in declaration order.
    pub fn targets(&self) -> impl Iterator<Item = ActionId> + '_ {
        self.output_links.iter().filter_map(|link| link.target)
    }
}

fn parse_split_points(elem: Node<'_, '_>) -> Result<Vec<i64>> {
    let mut points = cast::read_children_texts(elem, &["int"])?
        .into_iter()
        .map(|value| {
            value.as_int().ok_or_else(|| {
                EventError::MissingContent(format!("split point '{value}' is not an integer"))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if !points.windows(2).all(|pair| pair[0] < pair[1]) {
        warn!("Split points {points:?} are not strictly ascending, sorting them");
        points.sort_unstable();
        points.dedup();
    }
    Ok(points)
}

fn parse_images(elem: Node<'_, '_>) -> Result<BTreeSet<String>> {
    let mut images = BTreeSet::new();
    for image_elem in cast::element_children(elem).filter(|node| node.has_tag_name("FilteredImage")) {
        let path = cast::read_child_text(image_elem, "ImagePath", None)?;
        images.insert(normalize_image_path(&path.to_string()));
    }
    Ok(images)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionGraph {
    nodes: BTreeMap<ActionId, ActionNode>,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every action child of the action sequence container.
    pub fn from_element(elem: Node<'_, '_>) -> Result<Self> {
        let mut graph = ActionGraph::new();
        graph.extend_from_element(elem)?;
        Ok(graph)
    }

    pub fn extend_from_element(&mut self, elem: Node<'_, '_>) -> Result<()> {
        for action_elem in cast::element_children(elem) {
            self.register(ActionNode::from_element(action_elem)?)?;
        }
        Ok(())
    }

    pub fn get(&self, id: ActionId) -> Option<&ActionNode> {
        self.nodes.get(&id)
    }

    pub fn resolve(&self, id: ActionId) -> Result<&ActionNode> {
        self.get(id).ok_or_else(|| {
            EventError::UnresolvedReference(format!("action {id} is not declared"))
        })
    }

    pub fn register(&mut self, node: ActionNode) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(EventError::MalformedGraph(format!(
                "action id {} is declared more than once",
                node.id
            )));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Rejects output-link cycles, which code generation would follow forever.
    ///
    /// Links to undeclared actions are left for code generation to report.
    pub fn validate(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<ActionId, Mark> = HashMap::new();
        for &root in self.nodes.keys() {
            if marks.contains_key(&root) {
                continue;
            }
            marks.insert(root, Mark::Active);
            let mut stack: Vec<(ActionId, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (id, cursor) = *frame;
                match self.nodes[&id].targets().nth(cursor) {
                    Some(target) => {
                        frame.1 += 1;
                        match marks.get(&target) {
                            Some(Mark::Active) => {
                                return Err(EventError::MalformedGraph(format!(
                                    "output links form a cycle: action {id} leads back to action {target}"
                                )));
                            }
                            Some(Mark::Done) => {}
                            None if self.nodes.contains_key(&target) => {
                                marks.insert(target, Mark::Active);
                                stack.push((target, 0));
                            }
                            None => {}
                        }
                    }
                    None => {
                        marks.insert(id, Mark::Done);
                        stack.pop();
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionNode> {
        self.nodes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    fn parse_node(xml: &str) -> Result<ActionNode> {
        let doc = Document::parse(xml).unwrap();
        ActionNode::from_element(doc.root_element())
    }

    fn linked(id: ActionId, targets: &[(&str, Option<ActionId>)]) -> ActionNode {
        let mut node = ActionNode::new(id, ActionKind::ShowText);
        for (name, target) in targets {
            node.add_output_link(OutputLink {
                name: name.to_string(),
                target: *target,
            })
            .unwrap();
        }
        node
    }

    #[test]
    fn normalizes_kind_tags() {
        assert_eq!(normalize_kind_tag("SeqAct_ShowText"), "ShowText");
        assert_eq!(normalize_kind_tag("SeqActLat_PassTime"), "PassTime");
        assert_eq!(normalize_kind_tag("SeqCond_RandomChance"), "RandomChance");
        assert_eq!(normalize_kind_tag("SeqEvent"), "Start");
        assert_eq!(ActionKind::resolve("Start"), Some(ActionKind::Start));
        assert_eq!(ActionKind::resolve("TODO"), Some(ActionKind::Todo));
        assert_eq!(ActionKind::resolve("PlaySound"), None);
        assert_eq!(ActionKind::Todo.name(), "TODO");
    }

    #[test]
    fn parses_links_and_comment() {
        let node = parse_node(
            r#"<SeqAct_GetListCount>
                <ID>4</ID>
                <Comment>  count the
                    people </Comment>
                <Position><X>1</X></Position>
                <OutputLinks>
                    <OutputLink><Name>Out</Name><OutputIDs><unsignedInt>5</unsignedInt></OutputIDs></OutputLink>
                    <OutputLink><Name>Failed</Name></OutputLink>
                </OutputLinks>
                <VariableLinks>
                    <VariableLink>
                        <Name>List</Name>
                        <VariableIDs><unsignedInt>7</unsignedInt></VariableIDs>
                        <ExpectedType>SeqVar_ObjectList</ExpectedType>
                        <bReadOnly>true</bReadOnly>
                    </VariableLink>
                    <VariableLink>
                        <Name>Count</Name>
                        <VariableIDs><unsignedInt>12</unsignedInt></VariableIDs>
                        <ExpectedType>SeqVar_Int</ExpectedType>
                        <bWriteOnly>true</bWriteOnly>
                    </VariableLink>
                </VariableLinks>
            </SeqAct_GetListCount>"#,
        )
        .unwrap();

        assert_eq!(node.id, 4);
        assert_eq!(node.kind, ActionKind::GetListCount);
        assert_eq!(node.comment.as_deref(), Some("count the people"));
        assert_eq!(node.output_links().len(), 2);
        assert_eq!(node.output_link("Out").unwrap().target, Some(5));
        assert_eq!(node.output_link("Failed").unwrap().target, None);
        assert_eq!(node.targets().collect::<Vec<_>>(), vec![5]);

        let list = node.variable_link("List").unwrap();
        assert_eq!(list.variable, Some(7));
        assert!(list.read_only);
        assert!(!list.write_only);
        let count = node.variable_link("Count").unwrap();
        assert_eq!(count.expected_type, "SeqVar_Int");
        assert!(count.write_only);

        assert!(matches!(
            node.variable_link("Message"),
            Err(EventError::UnresolvedReference(_))
        ));
        assert!(matches!(
            node.output_link("True"),
            Err(EventError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn kind_specific_fields_follow_the_field_table() {
        let split = parse_node(
            "<SeqCond_CompareIntSplit><ID>5</ID><SplitPoints><int>3</int><int>1</int><int>3</int></SplitPoints><ListKind>Present</ListKind></SeqCond_CompareIntSplit>",
        )
        .unwrap();
        assert_eq!(split.params.split_points, vec![1, 3]);
        // ListKind only belongs to GetPersonList.
        assert_eq!(split.params.list_kind, None);

        let images = parse_node(
            r#"<SeqAct_ShowRandomImage><ID>8</ID><Images>
                <FilteredImage><ImagePath>c\d.png</ImagePath></FilteredImage>
                <FilteredImage><ImagePath>a/b.png</ImagePath></FilteredImage>
                <FilteredImage><ImagePath>a//b.png</ImagePath></FilteredImage>
            </Images></SeqAct_ShowRandomImage>"#,
        )
        .unwrap();
        assert_eq!(
            images.params.images.iter().collect::<Vec<_>>(),
            vec!["a/b.png", "c/d.png"]
        );
    }

    #[test]
    fn unknown_kinds_become_unsupported() {
        let node = parse_node("<SeqAct_PlaySound><ID>9</ID><Sound>x.ogg</Sound></SeqAct_PlaySound>")
            .unwrap();
        assert_eq!(node.kind, ActionKind::Unsupported);
        assert_eq!(node.tag, "PlaySound");
    }

    #[test]
    fn missing_id_is_missing_content() {
        let err = parse_node("<SeqAct_AcceptEvent><Comment>x</Comment></SeqAct_AcceptEvent>")
            .unwrap_err();
        assert!(matches!(err, EventError::MissingContent(_)));
    }

    #[test]
    fn duplicate_link_names_are_malformed() {
        let err = parse_node(
            "<SeqAct_ShowText><ID>1</ID><OutputLinks><L><Name>Out</Name></L><L><Name>Out</Name></L></OutputLinks></SeqAct_ShowText>",
        )
        .unwrap_err();
        assert!(matches!(err, EventError::MalformedGraph(_)));
    }

    #[test]
    fn graph_lookup_and_registration() {
        let mut graph = ActionGraph::new();
        graph.register(linked(0, &[("Out", Some(1))])).unwrap();
        graph.register(linked(1, &[("Out", None)])).unwrap();

        assert!(graph.get(42).is_none());
        assert_eq!(graph.get(1).map(|node| node.id), Some(1));
        assert!(matches!(
            graph.resolve(42),
            Err(EventError::UnresolvedReference(_))
        ));
        assert!(matches!(
            graph.register(linked(1, &[])),
            Err(EventError::MalformedGraph(_))
        ));
        graph.validate().unwrap();
    }

    #[test]
    fn validation_rejects_cycles() {
        let mut graph = ActionGraph::new();
        graph.register(linked(0, &[("Try", Some(1)), ("Execute", Some(2))])).unwrap();
        graph.register(linked(1, &[("Out", Some(2))])).unwrap();
        graph.register(linked(2, &[("Out", Some(3))])).unwrap();
        graph.register(linked(3, &[("Out", Some(1))])).unwrap();
        assert!(matches!(
            graph.validate(),
            Err(EventError::MalformedGraph(_))
        ));

        let mut self_loop = ActionGraph::new();
        self_loop.register(linked(0, &[("Out", Some(0))])).unwrap();
        assert!(self_loop.validate().is_err());
    }

    #[test]
    fn validation_accepts_shared_targets_and_dangling_links() {
        let mut graph = ActionGraph::new();
        graph.register(linked(0, &[("Try", Some(1)), ("Execute", Some(1))])).unwrap();
        graph.register(linked(1, &[("Out", Some(77))])).unwrap();
        graph.validate().unwrap();
    }

    #[test]
    fn image_paths_are_normalized() {
        assert_eq!(normalize_image_path(r"Images\Beach\sun.png"), "Images/Beach/sun.png");
        assert_eq!(normalize_image_path("./a/b.png"), "a/b.png");
        assert_eq!(normalize_image_path("/abs//x.png"), "/abs/x.png");
    }
}
