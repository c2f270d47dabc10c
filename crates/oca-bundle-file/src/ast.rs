//! Syntax tree of an OCAfile.

use oca_bundle_core::NestedAttrType;

/// A parsed OCAfile: optional `--name=` header plus commands in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OcaFile {
    pub name: Option<String>,
    pub commands: Vec<Command>,
}

impl OcaFile {
    /// Command kinds without source lines, for structural comparisons.
    pub fn kinds(&self) -> Vec<&CommandKind> {
        self.commands.iter().map(|c| &c.kind).collect()
    }
}

/// One top-level command with the line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub line: usize,
    pub kind: CommandKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// `ADD CLASSIFICATION <value>`
    AddClassification(String),
    /// `ADD ATTRIBUTE <name>=<Type> ...`
    AddAttribute(Vec<(String, NestedAttrType)>),
    /// `ADD OVERLAY <name>` and its block.
    AddOverlay {
        name: String,
        properties: Vec<Property>,
    },
}

/// One line of an overlay block, with its nested block if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: PropertyValue,
    /// Source line; zero for properties built in code.
    pub line: usize,
}

impl Property {
    pub fn new(key: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            key: key.into(),
            value,
            line: 0,
        }
    }

    /// `key="text"`
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(key, PropertyValue::Text(text.into()))
    }

    /// Bare `key` with no value.
    pub fn bare(key: impl Into<String>) -> Self {
        Self::new(key, PropertyValue::Empty)
    }

    /// `key` followed by an indented block.
    pub fn block(key: impl Into<String>, children: Vec<Property>) -> Self {
        Self::new(key, PropertyValue::Block(children))
    }

    /// Copy of this property with all source lines cleared.
    pub fn without_lines(&self) -> Self {
        let value = match &self.value {
            PropertyValue::Block(children) => {
                PropertyValue::Block(children.iter().map(Property::without_lines).collect())
            }
            other => other.clone(),
        };
        Self::new(self.key.clone(), value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Bare key: a list element, or a parent whose block is empty.
    Empty,
    Text(String),
    Array(Vec<String>),
    Block(Vec<Property>),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&[Property]> {
        match self {
            Self::Block(children) => Some(children),
            _ => None,
        }
    }

    /// Short shape description for error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Empty => "bare key",
            Self::Text(_) => "text value",
            Self::Array(_) => "array",
            Self::Block(_) => "nested block",
        }
    }
}
