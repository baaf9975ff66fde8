//! Field projection between the public (tool-facing) and canonical (document)
//! shapes of an entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A public field name and the canonical document field it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAlias {
    pub public: String,
    pub canonical: String,
}

/// Projection rules for one entity family (or one nested collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    /// Canonical fields never exposed through the tools.
    #[serde(default)]
    pub hidden: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<FieldAlias>,
    /// Projection of nested collections, keyed by document array field.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, ProjectionSpec>,
}

impl ProjectionSpec {
    fn public_name(&self, canonical: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|a| a.canonical == canonical)
            .map(|a| a.public.as_str())
    }

    fn canonical_name(&self, public: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|a| a.public == public)
            .map(|a| a.canonical.as_str())
    }

    fn is_hidden(&self, field: &str) -> bool {
        self.hidden.iter().any(|h| h == field)
    }
}

/// Applies a [`ProjectionSpec`] to JSON values.
///
/// Both directions build a new value; the input is never modified.
#[derive(Debug, Clone, Copy)]
pub struct PropertyProjector<'a> {
    spec: &'a ProjectionSpec,
}

impl<'a> PropertyProjector<'a> {
    pub fn new(spec: &'a ProjectionSpec) -> Self {
        Self { spec }
    }

    /// Canonical -> public: drop hidden fields, rename aliased fields.
    ///
    /// If a value carries both a canonical field and its public alias, the
    /// canonical value wins. Arrays are projected element-wise.
    pub fn to_public(&self, entity: &Value) -> Value {
        match entity {
            Value::Object(map) => Value::Object(self.project_out(map)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.to_public(v)).collect()),
            other => other.clone(),
        }
    }

    fn project_out(&self, map: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        let mut renamed = Vec::new();

        for (key, value) in map {
            if self.spec.is_hidden(key) {
                continue;
            }
            let value = self.child_out(key, value);
            match self.spec.public_name(key) {
                Some(public) => renamed.push((public.to_string(), value)),
                None => {
                    out.insert(key.clone(), value);
                }
            }
        }
        for (public, value) in renamed {
            out.insert(public, value);
        }
        out
    }

    fn child_out(&self, key: &str, value: &Value) -> Value {
        match self.spec.children.get(key) {
            Some(child) => PropertyProjector::new(child).to_public(value),
            None => value.clone(),
        }
    }

    /// Public -> canonical: rename aliases, drop hidden fields, keep unknown keys.
    pub fn to_canonical(&self, payload: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        let mut renamed = Vec::new();

        for (key, value) in payload {
            match self.spec.canonical_name(key) {
                Some(canonical) => renamed.push((canonical.to_string(), value)),
                None if self.spec.is_hidden(key) => {}
                None => {
                    let value = self.child_in(key, value);
                    out.insert(key.clone(), value);
                }
            }
        }
        for (canonical, value) in renamed {
            if self.spec.is_hidden(&canonical) {
                continue;
            }
            let value = self.child_in(&canonical, value);
            out.insert(canonical, value);
        }
        out
    }

    /// Rewrite a JSON Schema of the canonical record into the public shape.
    ///
    /// Hidden properties disappear, aliased ones are renamed (in `required`
    /// too), and array item schemas follow the nested projections.
    pub fn to_public_schema(&self, schema: &Value) -> Value {
        let mut out = schema.clone();
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            let mut public = Map::new();
            for (name, property) in properties {
                if self.spec.is_hidden(name) {
                    continue;
                }
                let mut property = property.clone();
                if let (Some(child), Some(items)) =
                    (self.spec.children.get(name), property.get("items"))
                {
                    property["items"] = PropertyProjector::new(child).to_public_schema(items);
                }
                let key = self.spec.public_name(name).unwrap_or(name);
                public.insert(key.to_string(), property);
            }
            out["properties"] = Value::Object(public);
        }
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            let required: Vec<Value> = required
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| !self.spec.is_hidden(name))
                .map(|name| Value::from(self.spec.public_name(name).unwrap_or(name)))
                .collect();
            out["required"] = Value::Array(required);
        }
        out
    }

    /// Rename a canonical violation path (`reportColumn[2].sqlServerDBDataType`)
    /// to the names the caller used (`reportColumn[2].dataType`).
    pub fn public_path(&self, path: &str) -> String {
        let mut spec = Some(self.spec);
        let mut out = Vec::new();
        for segment in path.split('.') {
            let (name, index) = match segment.find('[') {
                Some(at) => segment.split_at(at),
                None => (segment, ""),
            };
            let public = spec.and_then(|s| s.public_name(name)).unwrap_or(name);
            out.push(format!("{public}{index}"));
            spec = spec.and_then(|s| s.children.get(name));
        }
        out.join(".")
    }

    fn child_in(&self, key: &str, value: &Value) -> Value {
        match (self.spec.children.get(key), value) {
            (Some(child), Value::Array(items)) => {
                let projector = PropertyProjector::new(child);
                Value::Array(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::Object(map) => Value::Object(projector.to_canonical(map)),
                            other => other.clone(),
                        })
                        .collect(),
                )
            }
            (Some(child), Value::Object(map)) => {
                Value::Object(PropertyProjector::new(child).to_canonical(map))
            }
            _ => value.clone(),
        }
    }
}
