//! Attribute types of a capture base.
//!
//! Text syntax (OCAfile and attribute listings):
//! `Text | Numeric | Boolean | DateTime | Binary | Array[<type>] | refs:<said> | refn:<name>`.
//!
//! Wire syntax (bundle JSON): primitives and references are strings, arrays
//! are one-element JSON arrays, e.g. `["Numeric"]`.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::digest::Said;
use crate::error::CoreError;

/// Primitive attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Text,
    Numeric,
    Boolean,
    DateTime,
    Binary,
}

impl AttributeType {
    /// All primitive types, in canonical order.
    pub const ALL: [AttributeType; 5] = [
        Self::Text,
        Self::Numeric,
        Self::Boolean,
        Self::DateTime,
        Self::Binary,
    ];

    /// Canonical name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Numeric => "Numeric",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Binary => "Binary",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a reference attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RefValue {
    /// Reference to a bundle by digest.
    Said(Said),
    /// Reference to a bundle by its local name.
    Name(String),
}

impl fmt::Display for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Said(said) => write!(f, "refs:{said}"),
            Self::Name(name) => write!(f, "refn:{name}"),
        }
    }
}

/// A possibly nested attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NestedAttrType {
    Value(AttributeType),
    Array(Box<NestedAttrType>),
    Reference(RefValue),
}

impl NestedAttrType {
    /// Innermost non-array type.
    pub fn element_type(&self) -> &NestedAttrType {
        match self {
            Self::Array(inner) => inner.element_type(),
            other => other,
        }
    }

    /// True if this is an array type.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// True if this is the given primitive, or an array (of arrays) of it.
    pub fn is_of(&self, ty: AttributeType) -> bool {
        matches!(self.element_type(), Self::Value(t) if *t == ty)
    }
}

impl From<AttributeType> for NestedAttrType {
    fn from(ty: AttributeType) -> Self {
        Self::Value(ty)
    }
}

impl fmt::Display for NestedAttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(ty) => write!(f, "{ty}"),
            Self::Array(inner) => write!(f, "Array[{inner}]"),
            Self::Reference(r) => write!(f, "{r}"),
        }
    }
}

impl FromStr for NestedAttrType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || CoreError::InvalidAttributeType(s.to_string());

        if let Some(rest) = strip_prefix_ignore_case(s, "array[") {
            let inner = rest.strip_suffix(']').ok_or_else(invalid)?;
            return Ok(Self::Array(Box::new(inner.parse()?)));
        }
        if let Some(said) = strip_prefix_ignore_case(s, "refs:") {
            let said = said.parse().map_err(|_| invalid())?;
            return Ok(Self::Reference(RefValue::Said(said)));
        }
        if let Some(name) = strip_prefix_ignore_case(s, "refn:") {
            if name.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::Reference(RefValue::Name(name.to_string())));
        }

        AttributeType::from_name(s).map(Self::Value).ok_or_else(invalid)
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

impl Serialize for NestedAttrType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Array(inner) => {
                let mut seq = serializer.serialize_seq(Some(1))?;
                seq.serialize_element(inner.as_ref())?;
                seq.end()
            }
            other => serializer.collect_str(other),
        }
    }
}

impl<'de> Deserialize<'de> for NestedAttrType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NestedVisitor;

        impl<'de> Visitor<'de> for NestedVisitor {
            type Value = NestedAttrType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an attribute type string or a one-element array")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let inner: NestedAttrType = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(2, &self));
                }
                Ok(NestedAttrType::Array(Box::new(inner)))
            }
        }

        deserializer.deserialize_any(NestedVisitor)
    }
}
