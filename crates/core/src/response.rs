//! Projection of an observed context into a response value.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::context::Context;

/// The key every demonstration reads back.
pub const DEMO_KEY: &str = "key";

/// What a handler observed on its side of a bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextResponse {
    Empty,
    /// Non-empty context; `None` when it lacks [`DEMO_KEY`].
    HasValue(Option<String>),
}

impl ContextResponse {
    pub fn project(ctx: &Context) -> Self {
        if ctx.is_empty() {
            Self::Empty
        } else {
            Self::HasValue(ctx.get(DEMO_KEY).map(str::to_owned))
        }
    }
}

impl fmt::Display for ContextResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Context is empty"),
            Self::HasValue(value) => {
                write!(f, "Context has value: {}", value.as_deref().unwrap_or("null"))
            }
        }
    }
}

impl Serialize for ContextResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_projects_to_empty() {
        let response = ContextResponse::project(&Context::empty());
        assert_eq!(response, ContextResponse::Empty);
        assert_eq!(response.to_string(), "Context is empty");
    }

    #[test]
    fn populated_context_projects_its_value() {
        let response = ContextResponse::project(&Context::of("key", "value"));
        assert_eq!(response, ContextResponse::HasValue(Some("value".into())));
        assert_eq!(response.to_string(), "Context has value: value");
    }

    #[test]
    fn missing_demo_key_renders_null() {
        let response = ContextResponse::project(&Context::of("tenant", "acme"));
        assert_eq!(response.to_string(), "Context has value: null");
    }

    #[test]
    fn serializes_as_display_string() {
        let json = serde_json::to_string(&ContextResponse::Empty).unwrap();
        assert_eq!(json, r#""Context is empty""#);
    }
}
