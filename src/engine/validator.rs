//! Schema and business-rule validation of tool payloads.
//!
//! Entity schemas are declared per family in the catalog YAML, compiled to JSON
//! Schema once, and checked with `jsonschema`. Library errors are rendered into
//! `field: reason` violations with a flattened field path
//! (`reportColumn[2].name`). Business rules run after the schema check.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};

/// Reason reported for an empty partial update.
pub const EMPTY_UPDATE_REASON: &str = "at least one property must be provided";

/// One failed check, rendered as `field: reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Number,
    Array,
    Object,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Item schema for arrays of records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<EntitySchema>>,
}

impl FieldSpec {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            allowed: None,
            pattern: None,
            required: false,
            description: None,
            items: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| json!(v)).collect());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.field_type.as_str()));
        if let Some(allowed) = &self.allowed {
            schema.insert("enum".into(), Value::Array(allowed.clone()));
        }
        if let Some(pattern) = &self.pattern {
            schema.insert("pattern".into(), json!(pattern));
        }
        if let Some(description) = &self.description {
            schema.insert("description".into(), json!(description));
        }
        if let Some(items) = &self.items {
            schema.insert("items".into(), items.to_json_schema(true));
        }
        Value::Object(schema)
    }
}

/// Declarative record schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Accept properties not declared in `fields`.
    #[serde(default = "default_allow_unknown")]
    pub allow_unknown: bool,
}

fn default_allow_unknown() -> bool {
    true
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.required)
    }

    /// JSON Schema for this record; `enforce_required` is false for partial updates.
    pub fn to_json_schema(&self, enforce_required: bool) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.to_json_schema()))
            .collect();
        let mut schema = json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": self.allow_unknown,
        });
        if enforce_required {
            let required: Vec<&str> = self.required_fields().map(|f| f.name.as_str()).collect();
            if !required.is_empty() {
                schema["required"] = json!(required);
            }
        }
        schema
    }
}

/// Whether a payload is a complete record or a set of field updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Add or replace: the complete schema applies, required fields included.
    Full,
    /// Update: only the fields present are checked; at least one is needed.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub equals: Value,
}

impl Condition {
    fn holds(&self, record: &Map<String, Value>) -> bool {
        record.get(&self.field) == Some(&self.equals)
    }
}

/// `when <field> == <value> require <field>`, optionally applied to each item
/// of an array field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub when: Condition,
    pub require: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BusinessRule {
    fn reason(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            let expected = match &self.when.equals {
                Value::String(s) => format!("\"{s}\""),
                other => other.to_string(),
            };
            format!("is required when {} is {expected}", self.when.field)
        })
    }

    fn check(&self, record: &Map<String, Value>, prefix: &str, out: &mut Vec<Violation>) {
        if self.when.holds(record) && !is_present(record.get(&self.require)) {
            out.push(Violation::new(
                join_path(prefix, &self.require),
                self.reason(),
            ));
        }
    }

    fn evaluate(&self, payload: &Map<String, Value>, out: &mut Vec<Violation>) {
        match &self.scope {
            None => self.check(payload, "", out),
            Some(scope) => {
                if let Some(Value::Array(items)) = payload.get(scope) {
                    for (index, item) in items.iter().enumerate() {
                        if let Value::Object(record) = item {
                            self.check(record, &format!("{scope}[{index}]"), out);
                        }
                    }
                }
            }
        }
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

#[derive(Debug, Error)]
#[error("invalid entity schema: {0}")]
pub struct SchemaError(String);

/// Compiled schema plus business rules for one record kind.
pub struct UpdateValidator {
    full: Validator,
    partial: Validator,
    rules: Vec<BusinessRule>,
}

impl std::fmt::Debug for UpdateValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateValidator")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl UpdateValidator {
    pub fn compile(schema: &EntitySchema, rules: &[BusinessRule]) -> Result<Self, SchemaError> {
        let compile = |enforce_required: bool| {
            jsonschema::validator_for(&schema.to_json_schema(enforce_required))
                .map_err(|e| SchemaError(e.to_string()))
        };
        Ok(Self {
            full: compile(true)?,
            partial: compile(false)?,
            rules: rules.to_vec(),
        })
    }

    /// Check `payload`, returning every violation found (empty when valid).
    pub fn validate(&self, payload: &Value, mode: UpdateMode) -> Vec<Violation> {
        let Some(record) = payload.as_object() else {
            return vec![Violation::new("payload", "must be an object")];
        };
        if mode == UpdateMode::Partial && record.is_empty() {
            return vec![Violation::new("updates", EMPTY_UPDATE_REASON)];
        }

        let validator = match mode {
            UpdateMode::Full => &self.full,
            UpdateMode::Partial => &self.partial,
        };
        let mut violations: Vec<Violation> =
            validator.iter_errors(payload).flat_map(render_error).collect();

        for rule in &self.rules {
            rule.evaluate(record, &mut violations);
        }
        violations
    }
}

/// Render one `jsonschema` error as violations.
fn render_error(error: ValidationError<'_>) -> Vec<Violation> {
    let path = pointer_to_path(&error.instance_path.to_string());
    match &error.kind {
        ValidationErrorKind::Enum { options } => {
            vec![Violation::new(path, format!("must be one of: {}", list_values(options)))]
        }
        ValidationErrorKind::Pattern { pattern } => {
            vec![Violation::new(path, format!("must match pattern {pattern}"))]
        }
        ValidationErrorKind::Required { property } => {
            let property = property.as_str().map(str::to_string).unwrap_or_else(|| property.to_string());
            vec![Violation::new(join_path(&path, &property), "is required")]
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => unexpected
            .iter()
            .map(|p| Violation::new(join_path(&path, p), "is not a recognized property"))
            .collect(),
        _ => vec![Violation::new(
            if path.is_empty() { "payload".to_string() } else { path },
            error.to_string(),
        )],
    }
}

fn list_values(options: &Value) -> String {
    match options {
        Value::Array(values) => values
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// `/reportColumn/2/name` -> `reportColumn[2].name`
fn pointer_to_path(pointer: &str) -> String {
    let mut path = String::new();
    for segment in pointer.split('/').skip(1) {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        if !path.is_empty() && segment.parse::<usize>().is_ok() {
            path.push('[');
            path.push_str(&segment);
            path.push(']');
        } else {
            path = join_path(&path, &segment);
        }
    }
    path
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}
