//! Conversion from declared tool schemas to model tool descriptors.

use std::collections::BTreeMap;

use relay_agent_model::ModelTool;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `type` of a property, either `"string"` or `["string", "null"]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyType {
    /// A single type name.
    Single(String),
    /// A union of type names.
    Union(Vec<String>),
}

/// A parameter of a tool.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Property {
    /// The JSON type of the parameter.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<PropertyType>,
    /// Description of the parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Allowed values of the parameter.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<Vec<Value>>,
}

/// The parameters object of a model tool.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameters {
    #[serde(rename = "type")]
    ty: &'static str,
    /// Names of the required parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Parameters by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Property>>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            ty: "object",
            required: None,
            properties: None,
        }
    }
}

/// Extracts the parameters from a declared schema.
///
/// Only `required` and the `type`, `description` and `enum` of each
/// property are kept. Anything malformed is left out, a schema that is
/// not an object yields empty parameters.
pub fn parameters_of(schema: &Value) -> Parameters {
    let mut parameters = Parameters::default();
    let Some(schema) = schema.as_object() else {
        return parameters;
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        parameters.required = Some(
            required
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
        );
    }

    if let Some(props) = schema.get("properties").and_then(Value::as_object) {
        let properties = props
            .iter()
            .filter_map(|(name, prop)| {
                let prop = prop.as_object()?;
                Some((
                    name.clone(),
                    Property {
                        ty: prop
                            .get("type")
                            .cloned()
                            .and_then(|ty| serde_json::from_value(ty).ok()),
                        description: prop
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_owned),
                        enumeration: prop
                            .get("enum")
                            .and_then(Value::as_array)
                            .cloned(),
                    },
                ))
            })
            .collect();
        parameters.properties = Some(properties);
    }

    parameters
}

/// Builds the model tool descriptor of a declared tool.
pub fn convert(name: &str, description: &str, schema: &Value) -> ModelTool {
    let parameters = serde_json::to_value(parameters_of(schema))
        .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
    ModelTool {
        name: name.to_owned(),
        description: description.to_owned(),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_convert() {
        let schema = json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "required": ["path", 42],
            "properties": {
                "path": { "type": "string", "description": "File path." },
                "mode": { "type": "string", "enum": ["r", "w"], "default": "r" },
                "limit": { "type": ["integer", "null"] },
                "weird": { "type": { "nested": true } },
                "broken": "not an object"
            },
            "additionalProperties": false
        });
        let tool = convert("read_file", "Reads a file.", &schema);
        assert_eq!(tool.name, "read_file");
        assert_eq!(
            tool.parameters,
            json!({
                "type": "object",
                "required": ["path"],
                "properties": {
                    "path": { "type": "string", "description": "File path." },
                    "mode": { "type": "string", "enum": ["r", "w"] },
                    "limit": { "type": ["integer", "null"] },
                    "weird": {}
                }
            })
        );
    }

    #[test]
    fn test_malformed_schema() {
        for schema in [Value::Null, json!("object"), json!([1, 2])] {
            let tool = convert("noop", "", &schema);
            assert_eq!(tool.parameters, json!({ "type": "object" }));
        }
        // Required names are not checked against the properties.
        let tool = convert("noop", "", &json!({ "required": ["ghost"] }));
        assert_eq!(
            tool.parameters,
            json!({ "type": "object", "required": ["ghost"] })
        );
    }
}
