use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ==================== Breakpoint Id ====================

/// Server-assigned breakpoint identifier
///
/// Opaque to the client. The server may send it as a number or a string;
/// both normalise to the same textual id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct BreakpointId(String);

impl BreakpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BreakpointId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for BreakpointId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for BreakpointId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => Self(n.to_string()),
            RawId::Text(s) => Self(s),
        })
    }
}

// ==================== Location ====================

/// A line in a source file, as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub filepath: String,
    pub line: u32,
}

impl Location {
    pub fn new(filepath: impl Into<String>, line: u32) -> Self {
        Self {
            filepath: filepath.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filepath, self.line)
    }
}

// ==================== Breakpoint ====================

/// A line breakpoint confirmed by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: BreakpointId,
    pub filepath: String,
    pub line: u32,
}

impl Breakpoint {
    pub fn new(id: impl Into<BreakpointId>, filepath: impl Into<String>, line: u32) -> Self {
        Self {
            id: id.into(),
            filepath: filepath.into(),
            line,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.filepath.clone(), self.line)
    }

    /// Same breakpoint at the same place
    pub fn same_place(&self, other: &Breakpoint) -> bool {
        self.filepath == other.filepath && self.line == other.line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint_id_from_number_and_string() {
        let from_number: BreakpointId = serde_json::from_str("42").unwrap();
        let from_string: BreakpointId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_string);
        assert_eq!(from_number.as_str(), "42");
    }

    #[test]
    fn test_breakpoint_id_opaque_text() {
        let id: BreakpointId = serde_json::from_str("\"bp-7f3a\"").unwrap();
        assert_eq!(id.to_string(), "bp-7f3a");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"bp-7f3a\"");
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::new("lib/a.php", 10).to_string(), "lib/a.php:10");
    }

    #[test]
    fn test_breakpoint_same_place() {
        let a = Breakpoint::new("1", "a.php", 10);
        let b = Breakpoint::new("2", "a.php", 10);
        let c = Breakpoint::new("1", "a.php", 11);
        assert!(a.same_place(&b));
        assert!(!a.same_place(&c));
        assert_eq!(a.location(), Location::new("a.php", 10));
    }
}
