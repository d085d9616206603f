//! Protocol types and message definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Opaque sensor frame payload, passed through as received
pub type FrameData = serde_json::Value;

/// The frame paired with gestures that arrive without one
pub fn empty_frame() -> FrameData {
    FrameData::Object(serde_json::Map::new())
}

/// Gesture categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Single hand configuration ("pose")
    Static,
    /// Motion across several frames
    Dynamic,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Static, Category::Dynamic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Static => "static",
            Category::Dynamic => "dynamic",
        }
    }

    /// Operation that asks the server to start recognizing a gesture of this category
    pub fn add_op(&self) -> OpKind {
        match self {
            Category::Static => OpKind::AddPose,
            Category::Dynamic => OpKind::AddGesture,
        }
    }

    /// Operation that asks the server to stop recognizing a gesture of this category
    pub fn remove_op(&self) -> OpKind {
        match self {
            Category::Static => OpKind::RemovePose,
            Category::Dynamic => OpKind::RemoveGesture,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Category::Static),
            "dynamic" => Ok(Category::Dynamic),
            other => Err(Error::UnknownCategory(other.to_string())),
        }
    }
}

/// Registration operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpKind {
    AddPose,
    AddGesture,
    RemovePose,
    RemoveGesture,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::AddPose => "addPose",
            OpKind::AddGesture => "addGesture",
            OpKind::RemovePose => "removePose",
            OpKind::RemoveGesture => "removeGesture",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registration record inside an operation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "type")]
    pub op: OpKind,
    pub name: String,
}

impl Operation {
    pub fn new(op: OpKind, name: impl Into<String>) -> Self {
        Self {
            op,
            name: name.into(),
        }
    }

    /// Build `add` records for every name in a category
    pub fn adds<'a>(category: Category, names: impl IntoIterator<Item = &'a String>) -> Vec<Self> {
        names
            .into_iter()
            .map(|name| Operation::new(category.add_op(), name.clone()))
            .collect()
    }

    /// Build `remove` records for every name in a category
    pub fn removes<'a>(
        category: Category,
        names: impl IntoIterator<Item = &'a String>,
    ) -> Vec<Self> {
        names
            .into_iter()
            .map(|name| Operation::new(category.remove_op(), name.clone()))
            .collect()
    }
}

/// Client to server messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// Batch of registration changes
    Operation(Vec<Operation>),
}

/// A gesture recognized by the server
#[derive(Debug, Clone, PartialEq)]
pub struct GestureOccurrence {
    pub category: Category,
    pub name: String,
    pub data: serde_json::Value,
}
