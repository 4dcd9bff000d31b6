//! Output schema handed to the model.

use serde::{Deserialize, Serialize};

/// A named JSON Schema describing the structured payload the caller expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    definition: serde_json::Value,
}

impl Schema {
    /// Wrap a hand-written JSON Schema document.
    ///
    /// # Example
    ///
    /// ```
    /// use stencil_types::Schema;
    ///
    /// let schema = Schema::new("movie_review", serde_json::json!({
    ///     "type": "object",
    ///     "properties": { "rating": { "type": "integer" } },
    ///     "required": ["rating"]
    /// }));
    /// assert_eq!(schema.name(), "movie_review");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, definition: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            definition,
        }
    }

    /// Derive the schema from a Rust type.
    ///
    /// The schema name is the type's schema name as reported by `schemars`.
    #[must_use]
    pub fn for_type<T: schemars::JsonSchema>() -> Self {
        let root = schemars::schema_for!(T);
        let definition = serde_json::to_value(&root).unwrap_or(serde_json::Value::Null);
        Self::new(T::schema_name(), definition)
    }

    /// Set a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The schema description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The JSON Schema document.
    #[must_use]
    pub fn definition(&self) -> &serde_json::Value {
        &self.definition
    }

    /// The JSON Schema document, pretty-printed for prompt embedding.
    #[must_use]
    pub fn to_pretty_string(&self) -> String {
        serde_json::to_string_pretty(&self.definition).unwrap_or_else(|_| self.definition.to_string())
    }
}
