//! Node type determination.
//!
//! A node's effective type is its explicit type when one is declared, and
//! otherwise the first matching inference rule:
//!
//! 1. a `prompt` attribute makes it a `task`
//! 2. any of `input`, `output`, `parameters`, `schema`, `returns` makes it a `tool`
//! 3. a context-like name, or at least one attribute and none of `prompt`,
//!    `meta`, `condition`, `action`, makes it `context`
//! 4. with edge information: no incoming and at least one outgoing control
//!    edge makes it `init`
//!
//! When nothing matches the type is `None`. There is no fallback type.

use std::fmt;

use indexmap::IndexMap;
use log::{debug, trace};
use serde::{Serialize, Serializer};

use machina_core::{
    ast::Node,
    identifier::QualifiedName,
    index::{Hop, MachineIndex, NodeId},
};

/// Explicit type names that mean `context`.
const CONTEXT_SYNONYMS: [&str; 7] = [
    "context", "data", "input", "output", "result", "entity", "resource",
];

/// Attributes that make a node a tool.
const TOOL_ATTRIBUTES: [&str; 5] = ["input", "output", "parameters", "schema", "returns"];

/// Attributes that keep an attributed node from being inferred as context.
const BEHAVIOR_ATTRIBUTES: [&str; 4] = ["prompt", "meta", "condition", "action"];

/// Name fragments that mark a node as context-like.
const CONTEXT_NAME_HINTS: [&str; 6] = ["context", "output", "input", "data", "result", "config"];

/// A node's effective type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    Task,
    Tool,
    Context,
    Init,
    State,
    Note,
    /// Any other explicit type, lowercased.
    Custom(String),
}

impl NodeType {
    /// Normalizes an explicitly declared type.
    pub fn from_explicit(declared: &str) -> Self {
        let lowered = declared.trim().to_ascii_lowercase();
        if CONTEXT_SYNONYMS.contains(&lowered.as_str()) {
            return NodeType::Context;
        }
        match lowered.as_str() {
            "task" => NodeType::Task,
            "tool" => NodeType::Tool,
            "init" => NodeType::Init,
            "state" => NodeType::State,
            "note" => NodeType::Note,
            _ => NodeType::Custom(lowered),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Task => "task",
            NodeType::Tool => "tool",
            NodeType::Context => "context",
            NodeType::Init => "init",
            NodeType::State => "state",
            NodeType::Note => "note",
            NodeType::Custom(name) => name,
        }
    }

    pub fn is_context(&self) -> bool {
        *self == NodeType::Context
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Incoming and outgoing control edge counts of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDegree {
    pub incoming: usize,
    pub outgoing: usize,
}

/// Returns `true` if a node name reads like a data store.
pub fn is_context_like_name(name: &str) -> bool {
    let lowered = name.to_ascii_lowercase();
    CONTEXT_NAME_HINTS.iter().any(|hint| lowered.contains(hint))
        || (lowered.contains("state") && lowered != "state")
}

/// Explicit type if declared, inferred type otherwise (without edge information).
pub fn get_node_type(node: &Node) -> Option<NodeType> {
    match &node.node_type {
        Some(declared) => Some(NodeType::from_explicit(declared)),
        None => infer_type(node, None),
    }
}

/// Infers a type for a node without an explicit one.
pub fn infer_type(node: &Node, degree: Option<EdgeDegree>) -> Option<NodeType> {
    infer_from_shape(node).or_else(|| {
        degree
            .filter(|d| d.incoming == 0 && d.outgoing > 0)
            .map(|_| NodeType::Init)
    })
}

/// Rules 1 to 3, which need nothing but the node itself.
fn infer_from_shape(node: &Node) -> Option<NodeType> {
    if node.has_attribute("prompt") {
        return Some(NodeType::Task);
    }
    if TOOL_ATTRIBUTES.iter().any(|a| node.has_attribute(a)) {
        return Some(NodeType::Tool);
    }
    let plain_data = !node.attributes.is_empty()
        && !BEHAVIOR_ATTRIBUTES.iter().any(|a| node.has_attribute(a));
    if is_context_like_name(&node.name) || plain_data {
        return Some(NodeType::Context);
    }
    None
}

/// Returns `true` if the node's `meta` attribute is exactly `true`.
pub fn has_meta(node: &Node) -> bool {
    node.attribute("meta")
        .and_then(|a| a.value.as_ref())
        .and_then(|v| v.as_text())
        .is_some_and(|text| text.trim().eq_ignore_ascii_case("true"))
}

/// Decides whether leaving a node needs an agent's choice.
///
/// `outgoing` holds the labels of the node's outgoing edges. `is_automatic`
/// marks edges that fire without a decision; without it, every edge counts.
pub fn requires_agent_decision(
    node: &Node,
    outgoing: &[Option<&str>],
    is_automatic: Option<&dyn Fn(Option<&str>) -> bool>,
) -> bool {
    match get_node_type(node) {
        Some(NodeType::Task) if node.has_attribute("prompt") => true,
        Some(NodeType::State) => false,
        _ => {
            let manual = outgoing
                .iter()
                .filter(|label| is_automatic.is_none_or(|auto| !auto(**label)))
                .count();
            manual > 1
        }
    }
}

/// Effective types for every node of an indexed machine.
///
/// Edge-dependent inference counts control edges only: hops that carry an
/// attribute path or touch a node whose shape already makes it context are
/// ignored.
#[derive(Debug)]
pub struct NodeTypeChecker<'a> {
    index: &'a MachineIndex<'a>,
    types: Vec<Option<NodeType>>,
    degrees: Vec<EdgeDegree>,
}

impl<'a> NodeTypeChecker<'a> {
    pub fn new(index: &'a MachineIndex<'a>) -> Self {
        let static_types: Vec<Option<NodeType>> = index
            .nodes()
            .map(|(_, indexed)| get_node_type(indexed.node()))
            .collect();

        let mut degrees = vec![EdgeDegree::default(); index.len()];
        for hop in index.hops() {
            if !is_static_control_hop(&hop, &static_types) {
                continue;
            }
            degrees[hop.source.node.index()].outgoing += 1;
            degrees[hop.target.node.index()].incoming += 1;
        }

        let types = index
            .nodes()
            .map(|(id, indexed)| {
                let node = indexed.node();
                match &static_types[id.index()] {
                    Some(node_type) => Some(node_type.clone()),
                    None => {
                        let inferred = infer_type(node, Some(degrees[id.index()]));
                        trace!(node = indexed.qualified_name().as_str(), inferred:?; "Inferred node type");
                        inferred
                    }
                }
            })
            .collect::<Vec<_>>();

        debug!(
            nodes = types.len(),
            typed = types.iter().filter(|t| t.is_some()).count();
            "Determined node types"
        );
        Self {
            index,
            types,
            degrees,
        }
    }

    pub fn node_type(&self, id: NodeId) -> Option<&NodeType> {
        self.types[id.index()].as_ref()
    }

    pub fn is_context(&self, id: NodeId) -> bool {
        self.node_type(id).is_some_and(NodeType::is_context)
    }

    pub fn is_init(&self, id: NodeId) -> bool {
        self.node_type(id) == Some(&NodeType::Init)
    }

    pub fn is_task(&self, id: NodeId) -> bool {
        self.node_type(id) == Some(&NodeType::Task)
    }

    /// Control edge counts used for `init` inference.
    pub fn degree(&self, id: NodeId) -> EdgeDegree {
        self.degrees[id.index()]
    }

    /// [`requires_agent_decision`] with the node's outgoing hops as edges.
    pub fn requires_agent_decision(
        &self,
        id: NodeId,
        is_automatic: Option<&dyn Fn(Option<&str>) -> bool>,
    ) -> bool {
        let hops = self.index.hops();
        let labels: Vec<Option<&str>> = hops
            .iter()
            .filter(|hop| hop.source.node == id && !hop.target.has_attribute_path())
            .map(|hop| hop.label)
            .collect();
        requires_agent_decision(self.index.node(id).node(), &labels, is_automatic)
    }

    /// Effective types keyed by qualified name, in document order.
    pub fn types(&self) -> IndexMap<QualifiedName, Option<NodeType>> {
        self.index
            .nodes()
            .map(|(id, indexed)| (indexed.qualified_name().clone(), self.types[id.index()].clone()))
            .collect()
    }
}

fn is_static_control_hop(hop: &Hop<'_>, static_types: &[Option<NodeType>]) -> bool {
    let is_context = |id: NodeId| {
        static_types[id.index()]
            .as_ref()
            .is_some_and(NodeType::is_context)
    };
    !hop.source.has_attribute_path()
        && !hop.target.has_attribute_path()
        && !is_context(hop.source.node)
        && !is_context(hop.target.node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use machina_core::ast::{Attribute, AttributeValue, Edge, Machine};

    #[test]
    fn test_explicit_type_normalization() {
        for synonym in ["data", "Input", "OUTPUT", "result", "entity", "resource", "context"] {
            assert_eq!(NodeType::from_explicit(synonym), NodeType::Context, "{synonym}");
        }
        assert_eq!(NodeType::from_explicit("Task"), NodeType::Task);
        assert_eq!(
            NodeType::from_explicit("Workflow"),
            NodeType::Custom("workflow".to_string())
        );
    }

    #[test]
    fn test_explicit_type_wins_over_inference() {
        let node = Node::new("step")
            .with_type("state")
            .with_attribute(Attribute::new("prompt", "do it"));
        assert_eq!(get_node_type(&node), Some(NodeType::State));
    }

    #[test]
    fn test_inference_priority() {
        let task = Node::new("analyze")
            .with_attribute(Attribute::new("prompt", "go"))
            .with_attribute(Attribute::new("schema", "{}"));
        assert_eq!(infer_type(&task, None), Some(NodeType::Task));

        let tool = Node::new("search").with_attribute(Attribute::new("parameters", "q"));
        assert_eq!(infer_type(&tool, None), Some(NodeType::Tool));

        let by_name = Node::new("userData");
        assert_eq!(infer_type(&by_name, None), Some(NodeType::Context));

        let by_attributes = Node::new("limits").with_attribute(Attribute::new("max", "3"));
        assert_eq!(infer_type(&by_attributes, None), Some(NodeType::Context));

        let behavior = Node::new("gate").with_attribute(Attribute::new("condition", "x > 1"));
        assert_eq!(infer_type(&behavior, None), None);
    }

    #[test]
    fn test_state_name_heuristic() {
        assert!(!is_context_like_name("state"));
        assert!(is_context_like_name("appState"));
        assert!(is_context_like_name("stateStore"));
        assert!(is_context_like_name("Config"));
        assert!(!is_context_like_name("review"));
    }

    #[test]
    fn test_init_inference_requires_edges() {
        let node = Node::new("start");
        assert_eq!(infer_type(&node, None), None);

        let entry = EdgeDegree {
            incoming: 0,
            outgoing: 1,
        };
        assert_eq!(infer_type(&node, Some(entry)), Some(NodeType::Init));

        let middle = EdgeDegree {
            incoming: 1,
            outgoing: 1,
        };
        assert_eq!(infer_type(&node, Some(middle)), None);
        assert_eq!(infer_type(&node, Some(EdgeDegree::default())), None);
    }

    #[test]
    fn test_has_meta() {
        let meta = Node::new("n").with_attribute(Attribute::new("meta", AttributeValue::boolean(true)));
        let bare = Node::new("n").with_attribute(Attribute::new("meta", AttributeValue::bare("TRUE")));
        let off = Node::new("n").with_attribute(Attribute::new("meta", "yes"));

        assert!(has_meta(&meta));
        assert!(has_meta(&bare));
        assert!(!has_meta(&off));
        assert!(!has_meta(&Node::new("n")));
    }

    #[test]
    fn test_requires_agent_decision() {
        let task = Node::new("t").with_attribute(Attribute::new("prompt", "p"));
        assert!(requires_agent_decision(&task, &[], None));

        let state = Node::new("s").with_type("state");
        assert!(!requires_agent_decision(&state, &[None, None, None], None));

        let router = Node::new("router");
        assert!(requires_agent_decision(&router, &[None, Some("when: ok")], None));
        assert!(!requires_agent_decision(&router, &[None], None));

        let labeled_is_automatic = |label: Option<&str>| label.is_some();
        assert!(!requires_agent_decision(
            &router,
            &[None, Some("when: ok")],
            Some(&labeled_is_automatic)
        ));
    }

    #[test]
    fn test_checker_infers_init_from_control_edges() {
        let machine = Machine::new("m")
            .with_node(Node::new("start"))
            .with_node(Node::new("end"))
            .with_node(Node::new("userData").with_attribute(Attribute::new("name", "x")))
            .with_edge(Edge::between("start", "end"))
            .with_edge(Edge::between("userData", "end"));
        let index = MachineIndex::new(&machine);
        let checker = NodeTypeChecker::new(&index);

        let start = index.lookup("start").unwrap();
        let end = index.lookup("end").unwrap();
        let data = index.lookup("userData").unwrap();

        assert!(checker.is_init(start));
        assert_eq!(checker.node_type(end), None);
        assert!(checker.is_context(data));
        // The data edge from `userData` does not count toward `end`.
        assert_eq!(checker.degree(end).incoming, 1);

        let types = checker.types();
        assert_eq!(types.len(), 3);
        assert_eq!(types.get_index(0).unwrap().1, &Some(NodeType::Init));
    }

    #[test]
    fn test_checker_requires_agent_decision_on_branching() {
        let machine = Machine::new("m")
            .with_node(Node::new("choose"))
            .with_node(Node::new("left"))
            .with_node(Node::new("right"))
            .with_edge(Edge::new(["choose"]).to(["left", "right"]));
        let index = MachineIndex::new(&machine);
        let checker = NodeTypeChecker::new(&index);

        let choose = index.lookup("choose").unwrap();
        let left = index.lookup("left").unwrap();
        assert!(checker.requires_agent_decision(choose, None));
        assert!(!checker.requires_agent_decision(left, None));
    }

    #[test]
    fn test_node_type_display() {
        assert_eq!(NodeType::Custom("workflow".into()).to_string(), "workflow");
        assert_eq!(NodeType::Context.to_string(), "context");
    }
}
