//! Machine AST types
//!
//! This module defines the data structures representing a parsed machine.
//! They are produced once by the external parser and rewritten in place by
//! the expansion and linking passes; every later pass only reads them.
//!
//! ## Shape
//!
//! - [`Machine`] - the document root: title, annotations, root nodes and edges
//! - [`Node`] - a possibly nested node with attributes, child nodes and edges
//! - [`Edge`] - one or more sources followed by an ordered list of [`EdgeSegment`]s
//! - [`Attribute`] - a named, optionally typed [`AttributeValue`]
//! - [`TypeDef`] - a declared attribute type (`Array<string>?`, `'a' | 'b'`)

use std::{borrow::Cow, fmt};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::identifier::QualifiedName;

/// Name of the machine-level annotation that enables strict mode.
pub const STRICT_MODE_ANNOTATION: &str = "StrictMode";

/// An `@Name` or `@Name("value")` annotation.
///
/// The leading `@` is not part of the stored name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: Option<String>,
}

impl Annotation {
    /// Create an annotation without a value. A leading `@` is stripped.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = name.strip_prefix('@').map(str::to_string).unwrap_or(name);
        Self { name, value: None }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// The document root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Machine {
    pub title: Option<String>,
    pub annotations: Vec<Annotation>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Machine {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Returns `true` if a machine-level annotation with this name exists.
    pub fn has_annotation(&self, name: &str) -> bool {
        let name = name.strip_prefix('@').unwrap_or(name);
        self.annotations.iter().any(|a| a.name == name)
    }

    /// Returns `true` if the machine carries the `@StrictMode` annotation.
    pub fn is_strict(&self) -> bool {
        self.has_annotation(STRICT_MODE_ANNOTATION)
    }

    /// Finds a node by its qualified name by walking the tree.
    ///
    /// This expects an expanded tree: each path segment is matched against
    /// the simple names of one nesting level.
    pub fn find_node(&self, qualified_name: &str) -> Option<&Node> {
        let mut segments = qualified_name.split(crate::identifier::SEPARATOR);
        let first = segments.next()?;
        let mut current = self.nodes.iter().find(|n| n.name == first)?;
        for segment in segments {
            current = current.child(segment)?;
        }
        Some(current)
    }

    /// Returns the total number of nodes in the tree, at every depth.
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.nodes)).sum()
        }
        count(&self.nodes)
    }

    /// Visits every node in document (pre-order) order together with its
    /// qualified name.
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&QualifiedName, &Node),
    {
        fn walk_nodes<F>(nodes: &[Node], parent: &QualifiedName, visit: &mut F)
        where
            F: FnMut(&QualifiedName, &Node),
        {
            for node in nodes {
                let qualified = parent.create_nested(&node.name);
                visit(&qualified, node);
                walk_nodes(&node.nodes, &qualified, visit);
            }
        }
        walk_nodes(&self.nodes, &QualifiedName::default(), &mut visit);
    }
}

/// A node declaration.
///
/// Before expansion `name` may be dotted (`team.lead`); afterwards it is
/// always a simple name and the node's position in the tree defines its
/// qualified name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub node_type: Option<String>,
    pub title: Option<String>,
    pub annotations: Vec<Annotation>,
    pub attributes: Vec<Attribute>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Returns the last attribute with this name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().rev().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Returns the direct child with this simple name.
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Returns `true` if the node carries nothing but its name.
    pub fn is_empty(&self) -> bool {
        self.node_type.is_none()
            && self.title.is_none()
            && self.annotations.is_empty()
            && self.attributes.is_empty()
            && self.nodes.is_empty()
            && self.edges.is_empty()
    }
}

/// One hop of an edge chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeSegment {
    pub targets: Vec<String>,
    pub label: Option<String>,
}

/// An edge statement such as `a, b -> c -"when: ready"-> d`.
///
/// The sources of segment *i + 1* are the targets of segment *i*.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Edge {
    pub sources: Vec<String>,
    pub segments: Vec<EdgeSegment>,
}

impl Edge {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            segments: Vec::new(),
        }
    }

    /// Shorthand for a single unlabeled hop `source -> target`.
    pub fn between(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new([source.into()]).to([target.into()])
    }

    /// Append an unlabeled segment.
    pub fn to<I, S>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_segment(targets, None)
    }

    /// Append a labeled segment.
    pub fn to_labeled<I, S>(self, targets: I, label: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_segment(targets, Some(label.into()))
    }

    fn push_segment<I, S>(mut self, targets: I, label: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.segments.push(EdgeSegment {
            targets: targets.into_iter().map(Into::into).collect(),
            label,
        });
        self
    }

    /// Iterates over every reference text in this edge, sources first.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .chain(self.segments.iter().flat_map(|s| s.targets.iter()))
            .map(String::as_str)
    }
}

/// A scalar value.
///
/// `Bare` holds unquoted text exactly as written, so `Bare("42")` and
/// `Bare("true")` still carry text even though they read as a number and a
/// boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    String(String),
    Bare(String),
    Number(f64),
    Boolean(bool),
    Null,
}

impl Primitive {
    /// Returns the textual form of the value, without quotes.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Primitive::String(s) | Primitive::Bare(s) => Cow::Borrowed(s),
            Primitive::Number(n) => Cow::Owned(n.to_string()),
            Primitive::Boolean(b) => Cow::Owned(b.to_string()),
            Primitive::Null => Cow::Borrowed("null"),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::String(s) => write!(f, "\"{s}\""),
            other => write!(f, "{}", other.as_text()),
        }
    }
}

/// An attribute value: a primitive, an array or an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Primitive(Primitive),
    Array(Vec<AttributeValue>),
    Object(IndexMap<String, AttributeValue>),
}

impl AttributeValue {
    /// A quoted string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Primitive(Primitive::String(value.into()))
    }

    /// An unquoted text value.
    pub fn bare(value: impl Into<String>) -> Self {
        Self::Primitive(Primitive::Bare(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Self::Primitive(Primitive::Number(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::Primitive(Primitive::Boolean(value))
    }

    pub fn null() -> Self {
        Self::Primitive(Primitive::Null)
    }

    pub fn array(items: impl IntoIterator<Item = AttributeValue>) -> Self {
        Self::Array(items.into_iter().collect())
    }

    pub fn object<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: Into<String>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            AttributeValue::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Returns the text of a primitive value, or `None` for arrays and objects.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        self.as_primitive().map(Primitive::as_text)
    }

    /// Collects the text of every primitive in this value, depth first.
    pub fn texts(&self) -> Vec<Cow<'_, str>> {
        let mut out = Vec::new();
        self.collect_texts(&mut out);
        out
    }

    fn collect_texts<'a>(&'a self, out: &mut Vec<Cow<'a, str>>) {
        match self {
            AttributeValue::Primitive(p) => out.push(p.as_text()),
            AttributeValue::Array(items) => items.iter().for_each(|v| v.collect_texts(out)),
            AttributeValue::Object(entries) => {
                entries.values().for_each(|v| v.collect_texts(out))
            }
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::boolean(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Primitive(p) => write!(f, "{p}"),
            AttributeValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            AttributeValue::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A declared attribute type.
///
/// Either a named type with optional generic parameters (`Map<string, number>`)
/// or, when `literals` is non-empty, a literal union (`'low' | 'high'`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeDef {
    pub base: String,
    pub generics: Vec<TypeDef>,
    pub optional: bool,
    pub literals: Vec<String>,
}

impl TypeDef {
    pub fn named(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Self::default()
        }
    }

    pub fn generic(base: impl Into<String>, generics: impl IntoIterator<Item = TypeDef>) -> Self {
        Self {
            base: base.into(),
            generics: generics.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn literal_union<I, S>(literals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            literals: literals.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Mark the type optional (`?`).
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn is_literal_union(&self) -> bool {
        !self.literals.is_empty()
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_literal_union() {
            for (i, literal) in self.literals.iter().enumerate() {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "'{literal}'")?;
            }
        } else {
            write!(f, "{}", self.base)?;
            if !self.generics.is_empty() {
                write!(f, "<")?;
                for (i, param) in self.generics.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ">")?;
            }
        }
        if self.optional {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// A node attribute: `name<Type>: value`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub type_def: Option<TypeDef>,
    pub value: Option<AttributeValue>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Self {
            name: name.into(),
            type_def: None,
            value: Some(value.into()),
        }
    }

    /// An attribute that declares a type but carries no value.
    pub fn declared(name: impl Into<String>, type_def: TypeDef) -> Self {
        Self {
            name: name.into(),
            type_def: Some(type_def),
            value: None,
        }
    }

    pub fn with_type(mut self, type_def: TypeDef) -> Self {
        self.type_def = Some(type_def);
        self
    }
}
