use std::fmt;

use serde::{Deserialize, Serialize};

/// Variable namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Local,
    Global,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the variable tree
///
/// `full_name` is the expression the server understands for this variable
/// (e.g. `$user->address['city']`) and identifies the node for lazy
/// `property_get` fetches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableNode {
    pub full_name: String,
    pub display_name: String,
    pub var_type: String,
    pub access_modifier: String,
    pub value: String,
    pub is_composite: bool,
    pub has_loaded_children: bool,
    pub children: Vec<VariableNode>,
}

impl VariableNode {
    /// Type description with the access modifier, e.g. `string (private)`
    pub fn type_label(&self) -> String {
        if self.access_modifier.is_empty() {
            self.var_type.clone()
        } else {
            format!("{} ({})", self.var_type, self.access_modifier)
        }
    }
}

/// Depth-first search for a node by full name
pub fn find_variable_mut<'a>(
    nodes: &'a mut [VariableNode],
    full_name: &str,
) -> Option<&'a mut VariableNode> {
    for node in nodes.iter_mut() {
        if node.full_name == full_name {
            return Some(node);
        }
        if let Some(found) = find_variable_mut(&mut node.children, full_name) {
            return Some(found);
        }
    }
    None
}
