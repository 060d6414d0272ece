//! Configuration node tree with change tracking
//!
//! Every node carries the [`TimeStamp`] of its last modification. A
//! subtree's modification time is the newest stamp among its nodes, which
//! lets the render loop skip the verify/commit traversal when nothing has
//! changed since the previous commit.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::foundation::math::{Vec2i, Vec3};

static CLOCK: AtomicU64 = AtomicU64::new(0);

/// Monotonic modification stamp shared by every node in the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeStamp(u64);

impl TimeStamp {
    /// Stamp older than any issued by [`TimeStamp::now`]
    pub const ZERO: Self = Self(0);

    /// Issue a stamp strictly newer than every stamp issued before
    pub fn now() -> Self {
        Self(CLOCK.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Declared type of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Group node without a value
    Group,
    /// Free text
    String,
    /// Single float
    Float,
    /// Single integer
    Int,
    /// Boolean
    Bool,
    /// Three floats
    Vec3f,
    /// Two integers
    Vec2i,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Group => "group",
            Self::String => "string",
            Self::Float => "float",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Vec3f => "vec3f",
            Self::Vec2i => "vec2i",
        };
        f.write_str(name)
    }
}

/// Value stored in a leaf node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    /// Free text
    String(String),
    /// Single float
    Float(f32),
    /// Single integer
    Int(i32),
    /// Boolean
    Bool(bool),
    /// Three floats
    Vec3f(Vec3),
    /// Two integers
    Vec2i(Vec2i),
}

impl NodeValue {
    /// Type tag of this value
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::String(_) => NodeType::String,
            Self::Float(_) => NodeType::Float,
            Self::Int(_) => NodeType::Int,
            Self::Bool(_) => NodeType::Bool,
            Self::Vec3f(_) => NodeType::Vec3f,
            Self::Vec2i(_) => NodeType::Vec2i,
        }
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "\"{s}\""),
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Vec3f(v) => write!(f, "{}, {}, {}", v.x, v.y, v.z),
            Self::Vec2i(v) => write!(f, "{}, {}", v.x, v.y),
        }
    }
}

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    /// No node at the requested path
    #[error("no node at '{0}'")]
    NotFound(String),

    /// Value type does not match the node's declared type
    #[error("node '{name}' is {expected}, got {found}")]
    TypeMismatch {
        /// Node name
        name: String,
        /// Declared type
        expected: NodeType,
        /// Offered type
        found: NodeType,
    },

    /// Numeric value outside the node's declared range
    #[error("node '{name}' value {value} outside [{min}, {max}]")]
    OutOfRange {
        /// Node name
        name: String,
        /// Offending value
        value: f32,
        /// Lower bound
        min: f32,
        /// Upper bound
        max: f32,
    },

    /// Value not in the node's whitelist
    #[error("node '{name}' does not accept {value}")]
    NotAllowed {
        /// Node name
        name: String,
        /// Offending value
        value: String,
    },

    /// Leaf node was never given a value
    #[error("node '{0}' has no value")]
    MissingValue(String),
}

/// A named, typed, settable configuration node
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    node_type: NodeType,
    value: Option<NodeValue>,
    range: Option<(f32, f32)>,
    whitelist: Vec<String>,
    children: Vec<Node>,
    last_modified: TimeStamp,
    last_committed: TimeStamp,
}

impl Node {
    /// Group node with no value
    pub fn group(name: impl Into<String>) -> Self {
        Self::with_type(name, NodeType::Group, None)
    }

    /// Leaf node whose declared type is taken from its initial value
    pub fn leaf(name: impl Into<String>, value: NodeValue) -> Self {
        let node_type = value.node_type();
        Self::with_type(name, node_type, Some(value))
    }

    fn with_type(name: impl Into<String>, node_type: NodeType, value: Option<NodeValue>) -> Self {
        Self {
            name: name.into(),
            node_type,
            value,
            range: None,
            whitelist: Vec::new(),
            children: Vec::new(),
            last_modified: TimeStamp::now(),
            last_committed: TimeStamp::ZERO,
        }
    }

    /// Add a child (builder style)
    pub fn with_child(mut self, child: Node) -> Self {
        self.add_child(child);
        self
    }

    /// Restrict a numeric leaf to `[min, max]` (checked by `verify`)
    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Restrict a string leaf to a set of values (checked by `verify`)
    pub fn with_whitelist<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = values.into_iter().map(Into::into).collect();
        self
    }

    /// Append a child node
    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
        self.mark_as_modified();
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    /// Current value, if any
    pub fn value(&self) -> Option<&NodeValue> {
        self.value.as_ref()
    }

    /// Child nodes in insertion order
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Direct child by name
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Direct child by name (mutable)
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Descendant by path of child names
    pub fn find<S: AsRef<str>>(&self, path: &[S]) -> Option<&Node> {
        path.iter().try_fold(self, |node, name| node.child(name.as_ref()))
    }

    /// Descendant by path of child names (mutable)
    pub fn find_mut<S: AsRef<str>>(&mut self, path: &[S]) -> Option<&mut Node> {
        let mut node = self;
        for name in path {
            node = node.child_mut(name.as_ref())?;
        }
        Some(node)
    }

    /// Set the value, enforcing the declared type
    ///
    /// Setting an equal value still counts as a modification.
    pub fn set_value(&mut self, value: NodeValue) -> Result<(), NodeError> {
        if value.node_type() != self.node_type {
            return Err(NodeError::TypeMismatch {
                name: self.name.clone(),
                expected: self.node_type,
                found: value.node_type(),
            });
        }
        self.value = Some(value);
        self.mark_as_modified();
        Ok(())
    }

    /// Set the value of a descendant
    pub fn set<S: AsRef<str>>(&mut self, path: &[S], value: NodeValue) -> Result<(), NodeError> {
        self.find_mut(path)
            .ok_or_else(|| NodeError::NotFound(join_path(path)))?
            .set_value(value)
    }

    /// Force this node to count as changed without touching its value
    pub fn mark_as_modified(&mut self) {
        self.last_modified = TimeStamp::now();
    }

    /// Stamp of this node's own last modification
    pub fn last_modified(&self) -> TimeStamp {
        self.last_modified
    }

    /// Newest modification stamp in this subtree
    pub fn subtree_last_modified(&self) -> TimeStamp {
        self.children
            .iter()
            .map(Node::subtree_last_modified)
            .fold(self.last_modified, TimeStamp::max)
    }

    /// Stamp of this node's last commit
    pub fn last_committed(&self) -> TimeStamp {
        self.last_committed
    }

    /// Check every node in the subtree
    ///
    /// Leaves must hold a value, numeric leaves must respect their range and
    /// string leaves their whitelist.
    pub fn verify(&self) -> Result<(), NodeError> {
        if self.node_type != NodeType::Group {
            let value = self.value.as_ref().ok_or_else(|| NodeError::MissingValue(self.name.clone()))?;
            self.verify_value(value)?;
        }
        self.children.iter().try_for_each(Node::verify)
    }

    fn verify_value(&self, value: &NodeValue) -> Result<(), NodeError> {
        let numeric = match value {
            NodeValue::Float(v) => Some(*v),
            NodeValue::Int(v) => Some(*v as f32),
            _ => None,
        };
        if let (Some(v), Some((min, max))) = (numeric, self.range) {
            if !(min..=max).contains(&v) {
                return Err(NodeError::OutOfRange { name: self.name.clone(), value: v, min, max });
            }
        }
        if let NodeValue::String(s) = value {
            if !self.whitelist.is_empty() && !self.whitelist.iter().any(|w| w == s) {
                return Err(NodeError::NotAllowed { name: self.name.clone(), value: s.clone() });
            }
        }
        Ok(())
    }

    /// Commit pending changes in the subtree
    ///
    /// Returns the number of nodes that had changed since their previous
    /// commit.
    pub fn commit(&mut self) -> usize {
        let stamp = TimeStamp::now();
        self.commit_at(stamp)
    }

    fn commit_at(&mut self, stamp: TimeStamp) -> usize {
        let mut committed = 0;
        if self.last_modified > self.last_committed {
            self.last_committed = stamp;
            committed += 1;
        }
        for child in &mut self.children {
            committed += child.commit_at(stamp);
        }
        committed
    }

    /// Typed lookup of a Vec3f leaf
    pub fn get_vec3<S: AsRef<str>>(&self, path: &[S]) -> Result<Vec3, NodeError> {
        match self.lookup(path)? {
            NodeValue::Vec3f(v) => Ok(*v),
            other => Err(self.mismatch(path, NodeType::Vec3f, other)),
        }
    }

    /// Typed lookup of a Float leaf
    pub fn get_f32<S: AsRef<str>>(&self, path: &[S]) -> Result<f32, NodeError> {
        match self.lookup(path)? {
            NodeValue::Float(v) => Ok(*v),
            other => Err(self.mismatch(path, NodeType::Float, other)),
        }
    }

    /// Typed lookup of an Int leaf
    pub fn get_i32<S: AsRef<str>>(&self, path: &[S]) -> Result<i32, NodeError> {
        match self.lookup(path)? {
            NodeValue::Int(v) => Ok(*v),
            other => Err(self.mismatch(path, NodeType::Int, other)),
        }
    }

    /// Typed lookup of a Bool leaf
    pub fn get_bool<S: AsRef<str>>(&self, path: &[S]) -> Result<bool, NodeError> {
        match self.lookup(path)? {
            NodeValue::Bool(v) => Ok(*v),
            other => Err(self.mismatch(path, NodeType::Bool, other)),
        }
    }

    /// Typed lookup of a String leaf
    pub fn get_str<S: AsRef<str>>(&self, path: &[S]) -> Result<&str, NodeError> {
        match self.lookup(path)? {
            NodeValue::String(v) => Ok(v.as_str()),
            other => Err(self.mismatch(path, NodeType::String, other)),
        }
    }

    fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Result<&NodeValue, NodeError> {
        let node = self.find(path).ok_or_else(|| NodeError::NotFound(join_path(path)))?;
        node.value.as_ref().ok_or_else(|| NodeError::MissingValue(join_path(path)))
    }

    fn mismatch<S: AsRef<str>>(&self, path: &[S], expected: NodeType, found: &NodeValue) -> NodeError {
        NodeError::TypeMismatch {
            name: join_path(path),
            expected,
            found: found.node_type(),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{} <{}>", "", self.name, self.node_type, indent = depth * 2)?;
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        writeln!(f)?;
        self.children.iter().try_for_each(|c| c.fmt_tree(f, depth + 1))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(":")
}
