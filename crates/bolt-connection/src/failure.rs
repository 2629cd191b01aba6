use bolt_packstream::Value;
use std::fmt;

/// The payload of a wire FAILURE message: `code` + human-readable
/// `message` (spec.md §3 Message, §7). This is the unit everything
/// downstream — observers, the routing layer's error classifier, the
/// retry executor — keys its decisions off of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub code: String,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Failure {
    /// Parse the `{code, message}` metadata map a FAILURE response
    /// carries. Missing fields fall back to a generic classifier so a
    /// malformed server response still surfaces as *some* failure rather
    /// than silently vanishing.
    pub fn from_metadata(metadata: &indexmap::IndexMap<String, Value>) -> Self {
        let code = metadata
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("Neo.DatabaseError.General.UnknownError")
            .to_owned();
        let message = metadata
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no message provided")
            .to_owned();
        Failure { code, message }
    }
}
