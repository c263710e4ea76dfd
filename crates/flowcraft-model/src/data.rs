//! The item shape that flows between nodes, and the dead-branch signal.

use serde::{Deserialize, Serialize};

/// A single unit of data passed between nodes.
///
/// All data between nodes flows as an ordered sequence of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
  /// The item's JSON payload.
  pub json: serde_json::Value,
  /// Optional binary attachment (files, images).
  #[serde(skip_serializing_if = "Option::is_none")]
  pub binary: Option<Vec<u8>>,
}

impl NodeData {
  /// Build an item from a JSON value with no binary attachment.
  pub fn from_json(json: serde_json::Value) -> Self {
    Self { json, binary: None }
  }
}

/// What a node output edge carries.
///
/// `DeadBranch` is the distinguished payload a branching node (If, Switch) emits on an output it
/// did not select, so that a downstream join does not wait forever for data that will never arrive
/// ("reachable fan-in"). A bare `null` output from a node body is treated identically to
/// `DeadBranch` by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
  /// Live data items.
  Items(Vec<NodeData>),
  /// This branch did not fire.
  DeadBranch,
}

impl Payload {
  /// Construct a payload from an optional item list; `None` becomes `DeadBranch`.
  pub fn from_items(items: Option<Vec<NodeData>>) -> Self {
    match items {
      Some(items) => Self::Items(items),
      None => Self::DeadBranch,
    }
  }

  /// `true` if this payload is the dead-branch signal.
  pub fn is_dead(&self) -> bool {
    matches!(self, Self::DeadBranch)
  }

  /// Borrow the live items, if any.
  pub fn items(&self) -> Option<&[NodeData]> {
    match self {
      Self::Items(items) => Some(items),
      Self::DeadBranch => None,
    }
  }

  /// Take ownership of the live items, if any.
  pub fn into_items(self) -> Option<Vec<NodeData>> {
    match self {
      Self::Items(items) => Some(items),
      Self::DeadBranch => None,
    }
  }
}
