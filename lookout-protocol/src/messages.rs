//! Push-stream and bootstrap message types
//!
//! Every message the server pushes (and every element of the bootstrap
//! snapshot) has the same JSON shape:
//!
//! ```json
//! {
//!   "MessageType": "response",
//!   "State": "break",
//!   "Properties": { "Command": "step_over", "Filename": "index.php", "LineNumber": 16 },
//!   "Breakpoints": [ { "Id": 3, "Filename": "index.php", "LineNo": 16 } ],
//!   "Context": { "Local": [ { "FullName": "$a", "VarType": "int", "Value": "1" } ], "Global": null },
//!   "Stacktrace": [ { "Where": "{main}", "Filename": "index.php", "LineNo": 16 } ]
//! }
//! ```
//!
//! Any field may be missing. Missing payload fields decode to `None` so the
//! client can tell "no data" apart from "empty data".

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::*;

/// Error decoding a server message
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("breakpoint {id} has no filename")]
    MissingFilename { id: String },

    #[error("breakpoint {id} has invalid line number {line}")]
    InvalidLine { id: String, line: u32 },

    #[error("breakpoint entry has no id")]
    MissingId,
}

// ==================== Envelope ====================

/// Kind of server message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Response,
    Init,
    #[default]
    #[serde(other)]
    Unknown,
}

/// A message pushed by the server
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServerMessage {
    pub message_type: MessageType,
    /// Raw execution state; empty when the message does not change it
    pub state: String,
    pub properties: Properties,
    pub breakpoints: Option<BreakpointListing>,
    pub context: Option<Context>,
    pub stacktrace: Option<Vec<WireFrame>>,
}

impl ServerMessage {
    pub fn is_response(&self) -> bool {
        self.message_type == MessageType::Response
    }

    /// The command this message answers, if any
    pub fn command(&self) -> Option<&str> {
        let command = self.properties.command.trim();
        if command.is_empty() {
            None
        } else {
            Some(command)
        }
    }

    /// Parsed execution state; `None` when empty or unrecognised
    pub fn execution_state(&self) -> Option<ExecutionState> {
        ExecutionState::from_wire(self.state.trim())
    }

    /// Location carried in `Properties`, if the filename is present
    pub fn location(&self) -> Option<Location> {
        let filename = self.properties.filename.trim();
        if filename.is_empty() {
            None
        } else {
            Some(Location::new(filename, self.properties.line_number))
        }
    }
}

/// Command-specific properties of a response
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Properties {
    pub command: String,
    pub filename: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub line_number: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub error_code: u32,
    pub error_message: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub tx_id: u32,
}

// ==================== Breakpoints ====================

/// Breakpoint listing as sent by the server
///
/// Some server versions send an array, others an object keyed by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BreakpointListing {
    List(Vec<WireBreakpoint>),
    Keyed(IndexMap<String, WireBreakpoint>),
}

impl BreakpointListing {
    /// Convert to domain breakpoints, one result per wire entry
    pub fn into_breakpoints(self) -> Vec<Result<Breakpoint, ProtocolError>> {
        match self {
            Self::List(list) => list.into_iter().map(|bp| bp.into_breakpoint(None)).collect(),
            Self::Keyed(map) => map
                .into_iter()
                .map(|(key, bp)| bp.into_breakpoint(Some(key)))
                .collect(),
        }
    }
}

impl From<Vec<WireBreakpoint>> for BreakpointListing {
    fn from(list: Vec<WireBreakpoint>) -> Self {
        Self::List(list)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WireBreakpoint {
    pub id: Option<BreakpointId>,
    pub filename: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub line_no: u32,
}

impl WireBreakpoint {
    fn into_breakpoint(self, key: Option<String>) -> Result<Breakpoint, ProtocolError> {
        let id = self
            .id
            .or_else(|| key.map(BreakpointId::new))
            .ok_or(ProtocolError::MissingId)?;

        if self.filename.trim().is_empty() {
            return Err(ProtocolError::MissingFilename { id: id.to_string() });
        }
        if self.line_no == 0 {
            return Err(ProtocolError::InvalidLine {
                id: id.to_string(),
                line: self.line_no,
            });
        }

        Ok(Breakpoint {
            id,
            filepath: self.filename,
            line: self.line_no,
        })
    }
}

// ==================== Variables ====================

/// Variables of both scopes, keyed by full name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Context {
    #[serde(deserialize_with = "lenient_variables")]
    pub local: IndexMap<String, WireVariable>,
    #[serde(deserialize_with = "lenient_variables")]
    pub global: IndexMap<String, WireVariable>,
}

impl Context {
    pub fn scope(&self, scope: Scope) -> &IndexMap<String, WireVariable> {
        match scope {
            Scope::Local => &self.local,
            Scope::Global => &self.global,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WireVariable {
    pub full_name: String,
    pub var_type: String,
    pub access_modifier: String,
    pub display_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub value: String,
    pub is_composite_type: bool,
    pub has_loaded_children: bool,
    #[serde(deserialize_with = "lenient_variables")]
    pub children: IndexMap<String, WireVariable>,
}

impl WireVariable {
    /// Key for a variable that arrived in an array
    fn list_key(&self) -> Option<String> {
        [&self.full_name, &self.display_name]
            .into_iter()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
            .map(str::to_string)
    }
}

/// Convert a keyed variable map into tree nodes, preserving server order
pub fn variable_nodes(vars: &IndexMap<String, WireVariable>) -> Vec<VariableNode> {
    vars.iter()
        .map(|(full_name, var)| VariableNode {
            full_name: full_name.clone(),
            display_name: if var.display_name.is_empty() {
                full_name.clone()
            } else {
                var.display_name.clone()
            },
            var_type: var.var_type.clone(),
            access_modifier: var.access_modifier.clone(),
            value: var.value.clone(),
            is_composite: var.is_composite_type,
            has_loaded_children: var.has_loaded_children,
            children: variable_nodes(&var.children),
        })
        .collect()
}

// ==================== Call Stack ====================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WireFrame {
    #[serde(rename = "Where")]
    pub location: String,
    pub filename: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub line_no: u32,
}

impl From<WireFrame> for StackFrame {
    fn from(frame: WireFrame) -> Self {
        Self {
            location: frame.location,
            filepath: frame.filename,
            line: frame.line_no,
        }
    }
}

// ==================== Decoding ====================

/// Decode one push-stream message
pub fn decode_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

/// Decode a bootstrap snapshot
///
/// The outer array must be valid; each element decodes independently so one
/// bad element does not discard the rest.
pub fn decode_snapshot(text: &str) -> Result<Vec<Result<ServerMessage, ProtocolError>>, ProtocolError> {
    let elements: Vec<serde_json::Value> = serde_json::from_str(text)?;
    Ok(elements
        .into_iter()
        .map(|value| serde_json::from_value(value).map_err(ProtocolError::from))
        .collect())
}

// Numbers sometimes arrive as strings; null means zero.
fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.trim().is_empty() => Ok(0),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null(()) => Ok(0),
    }
}

// Variable collections arrive as an array, an object keyed by full name, or
// null when the scope has no variables.
fn lenient_variables<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<IndexMap<String, WireVariable>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Keyed(IndexMap<String, WireVariable>),
        List(Vec<WireVariable>),
        Null(()),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Keyed(map) => map,
        Raw::List(list) => list
            .into_iter()
            .filter_map(|var| var.list_key().map(|key| (key, var)))
            .collect(),
        Raw::Null(()) => IndexMap::new(),
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_break_message() {
        let msg = decode_message(
            r#"{"MessageType":"response","State":"break",
                "Properties":{"Command":"step_over","Filename":"index.php","LineNumber":16}}"#,
        )
        .unwrap();

        assert!(msg.is_response());
        assert_eq!(msg.command(), Some("step_over"));
        assert_eq!(msg.execution_state(), Some(ExecutionState::Break));
        assert_eq!(msg.location(), Some(Location::new("index.php", 16)));
        assert!(msg.breakpoints.is_none());
        assert!(msg.context.is_none());
    }

    #[test]
    fn test_decode_minimal_message() {
        let msg = decode_message(r#"{"MessageType":"init"}"#).unwrap();
        assert_eq!(msg.message_type, MessageType::Init);
        assert_eq!(msg.command(), None);
        assert_eq!(msg.execution_state(), None);
        assert_eq!(msg.location(), None);
    }

    #[test]
    fn test_decode_unknown_message_type() {
        let msg = decode_message(r#"{"MessageType":"notify","State":"running"}"#).unwrap();
        assert_eq!(msg.message_type, MessageType::Unknown);
        assert_eq!(msg.execution_state(), Some(ExecutionState::Running));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode_message("{not json"), Err(ProtocolError::Json(_))));
        assert!(decode_message(r#"{"Properties":{"LineNumber":"sixteen"}}"#).is_err());
    }

    #[test]
    fn test_breakpoints_as_array() {
        let msg = decode_message(
            r#"{"MessageType":"response","Properties":{"Command":"breakpoint_list"},
                "Breakpoints":[{"Id":2,"Filename":"a.php","LineNo":20},
                               {"Id":"3","Filename":"b.php","LineNo":"5"}]}"#,
        )
        .unwrap();

        let bps: Vec<_> = msg
            .breakpoints
            .unwrap()
            .into_breakpoints()
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(
            bps,
            vec![
                Breakpoint::new("2", "a.php", 20),
                Breakpoint::new("3", "b.php", 5),
            ]
        );
    }

    #[test]
    fn test_breakpoints_keyed_by_id() {
        let msg = decode_message(
            r#"{"Breakpoints":{"7":{"Filename":"a.php","LineNo":3},
                               "9":{"Id":9,"Filename":"c.php","LineNo":1}}}"#,
        )
        .unwrap();

        let bps: Vec<_> = msg
            .breakpoints
            .unwrap()
            .into_breakpoints()
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(bps[0], Breakpoint::new("7", "a.php", 3));
        assert_eq!(bps[1], Breakpoint::new("9", "c.php", 1));
    }

    #[test]
    fn test_empty_breakpoint_list_is_not_missing() {
        let msg = decode_message(r#"{"Breakpoints":[]}"#).unwrap();
        assert_eq!(msg.breakpoints, Some(BreakpointListing::List(vec![])));

        let msg = decode_message(r#"{"Breakpoints":null}"#).unwrap();
        assert!(msg.breakpoints.is_none());
    }

    #[test]
    fn test_invalid_breakpoint_entries_reported() {
        let listing = BreakpointListing::List(vec![
            WireBreakpoint {
                id: Some("1".into()),
                filename: String::new(),
                line_no: 4,
            },
            WireBreakpoint {
                id: Some("2".into()),
                filename: "a.php".into(),
                line_no: 0,
            },
            WireBreakpoint {
                id: None,
                filename: "a.php".into(),
                line_no: 4,
            },
        ]);

        let results = listing.into_breakpoints();
        assert!(matches!(results[0], Err(ProtocolError::MissingFilename { .. })));
        assert!(matches!(results[1], Err(ProtocolError::InvalidLine { line: 0, .. })));
        assert!(matches!(results[2], Err(ProtocolError::MissingId)));
    }

    #[test]
    fn test_context_to_nodes() {
        let msg = decode_message(
            r#"{"Properties":{"Command":"context_get"},
                "Context":{"Local":{
                    "$user":{"VarType":"object","DisplayName":"$user","IsCompositeType":true,
                             "HasLoadedChildren":true,
                             "Children":{"$user->name":{"VarType":"string","AccessModifier":"private",
                                                        "DisplayName":"name","Value":"Ada"}}},
                    "$count":{"VarType":"int","Value":3}
                }}}"#,
        )
        .unwrap();

        let context = msg.context.unwrap();
        assert!(context.global.is_empty());

        let nodes = variable_nodes(&context.local);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].full_name, "$user");
        assert!(nodes[0].is_composite);
        assert_eq!(nodes[0].children[0].full_name, "$user->name");
        assert_eq!(nodes[0].children[0].type_label(), "string (private)");
        assert_eq!(nodes[1].display_name, "$count");
        assert_eq!(nodes[1].value, "3");
    }

    #[test]
    fn test_null_context_scopes_are_empty() {
        let msg = decode_message(
            r#"{"MessageType":"response","State":"break",
                "Properties":{"Command":"step_over","Filename":"index.php","LineNumber":7},
                "Context":{"Local":null,"Global":null},"Stacktrace":null}"#,
        )
        .unwrap();

        assert_eq!(msg.location(), Some(Location::new("index.php", 7)));
        let context = msg.context.unwrap();
        assert!(context.local.is_empty());
        assert!(context.global.is_empty());
        assert!(msg.stacktrace.is_none());
    }

    #[test]
    fn test_context_as_arrays() {
        let msg = decode_message(
            r#"{"Properties":{"Command":"context_get"},
                "Context":{"Local":[],
                           "Global":[{"FullName":"$_GET","DisplayName":"$_GET","VarType":"array",
                                      "IsCompositeType":true,"Children":null},
                                     {"DisplayName":"$argc","VarType":"int","Value":1},
                                     {"VarType":"int","Value":2}]}}"#,
        )
        .unwrap();

        let context = msg.context.unwrap();
        assert!(context.local.is_empty());

        let nodes = variable_nodes(context.scope(Scope::Global));
        let names: Vec<_> = nodes.iter().map(|n| n.full_name.as_str()).collect();
        assert_eq!(names, vec!["$_GET", "$argc"]);
        assert!(nodes[0].is_composite);
        assert!(nodes[0].children.is_empty());
        assert_eq!(nodes[1].value, "1");
    }

    #[test]
    fn test_children_as_array() {
        let msg = decode_message(
            r#"{"Properties":{"Command":"property_get"},
                "Context":{"Local":[{"FullName":"$user","VarType":"object","IsCompositeType":true,
                                     "HasLoadedChildren":true,
                                     "Children":[{"FullName":"$user->name","DisplayName":"name",
                                                  "VarType":"string","Value":"Ada"}]}]}}"#,
        )
        .unwrap();

        let nodes = variable_nodes(&msg.context.unwrap().local);
        assert_eq!(nodes[0].children.len(), 1);
        assert_eq!(nodes[0].children[0].full_name, "$user->name");
        assert_eq!(nodes[0].children[0].display_name, "name");
    }

    #[test]
    fn test_stacktrace_frames() {
        let msg = decode_message(
            r#"{"Stacktrace":[{"Where":"foo","Filename":"lib.php","LineNo":8},
                              {"Where":"{main}","Filename":"index.php","LineNo":16}]}"#,
        )
        .unwrap();

        let frames: Vec<StackFrame> = msg.stacktrace.unwrap().into_iter().map(Into::into).collect();
        assert_eq!(frames[0].location, "foo");
        assert_eq!(frames[1].filepath, "index.php");
        assert_eq!(frames[1].line, 16);
    }

    #[test]
    fn test_decode_snapshot_keeps_good_elements() {
        let snapshot = decode_snapshot(
            r#"[{"MessageType":"response","State":"break","Properties":{"Filename":"a.php","LineNumber":3}},
                {"MessageType":"response","Properties":{"LineNumber":[]}},
                {"MessageType":"response","Properties":{"Command":"breakpoint_list"},"Breakpoints":[]}]"#,
        )
        .unwrap();

        assert_eq!(snapshot.len(), 3);
        assert!(snapshot[0].is_ok());
        assert!(snapshot[1].is_err());
        assert!(snapshot[2].is_ok());
    }

    #[test]
    fn test_decode_snapshot_rejects_non_array() {
        assert!(decode_snapshot(r#"{"MessageType":"response"}"#).is_err());
    }
}
