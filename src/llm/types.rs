use serde::{Deserialize, Serialize};

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// The standard system + user pair every pipeline prompt is built from.
    pub fn pair(system: impl Into<String>, user: impl Into<String>) -> Vec<Message> {
        vec![Self::system(system), Self::user(user)]
    }
}

/// JSON schema the model must conform to in structured mode.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    /// Short identifier (`[a-zA-Z0-9_-]`), used as the schema/tool name
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// Derive the schema for `T` from its `JsonSchema` implementation.
    pub fn of<T: schemars::JsonSchema>(name: &str, description: &str) -> Self {
        let root = schemars::schema_for!(T);
        let mut schema = serde_json::to_value(&root).unwrap_or_else(|_| serde_json::json!({}));
        if let Some(obj) = schema.as_object_mut() {
            // Providers reject the meta-schema URI.
            obj.remove("$schema");
        }

        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
        }
    }
}
