//! Per-family schema catalogs.
//!
//! Each family has a YAML catalog (`config/catalogs/*.yaml`) declaring its
//! record schema, projection (hidden fields and aliases), business rules and
//! nested collections. The built-in catalogs are embedded and compiled once.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use serde::Deserialize;
use thiserror::Error;

use appmodel_types::{ChildKind, Family};

use crate::engine::validator::{FieldSpec, FieldType, SchemaError};
use crate::engine::{BusinessRule, EntitySchema, ProjectionSpec, UpdateValidator};

const BUILTIN_SOURCES: [(&str, &str); 6] = [
    ("data_object.yaml", include_str!("../../config/catalogs/data_object.yaml")),
    ("report.yaml", include_str!("../../config/catalogs/report.yaml")),
    ("workflow.yaml", include_str!("../../config/catalogs/workflow.yaml")),
    ("general_flow.yaml", include_str!("../../config/catalogs/general_flow.yaml")),
    ("page_init_flow.yaml", include_str!("../../config/catalogs/page_init_flow.yaml")),
    ("user_story.yaml", include_str!("../../config/catalogs/user_story.yaml")),
];

static BUILTIN: LazyLock<Result<Arc<Catalogs>, String>> = LazyLock::new(|| {
    Catalogs::from_sources(BUILTIN_SOURCES.iter().copied())
        .map(Arc::new)
        .map_err(|e| e.to_string())
});

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog {source_name}: {source}")]
    Yaml {
        source_name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("catalog {source_name}: {source}")]
    Schema {
        source_name: String,
        #[source]
        source: SchemaError,
    },

    #[error("catalog {source_name}: {kind} items are not nested under a {family}")]
    UnsupportedChild {
        source_name: String,
        family: Family,
        kind: ChildKind,
    },

    #[error("catalog for {0} declared more than once")]
    DuplicateFamily(Family),

    #[error("no catalog declared for {0}")]
    MissingFamily(Family),

    #[error("built-in catalogs failed to load: {0}")]
    Builtin(String),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "CATALOG_IO",
            Self::Yaml { .. } => "CATALOG_YAML",
            Self::Schema { .. } => "CATALOG_SCHEMA",
            Self::UnsupportedChild { .. } => "CATALOG_UNSUPPORTED_CHILD",
            Self::DuplicateFamily(_) => "CATALOG_DUPLICATE_FAMILY",
            Self::MissingFamily(_) => "CATALOG_MISSING_FAMILY",
            Self::Builtin(_) => "CATALOG_BUILTIN",
        }
    }
}

/// Catalog file as written in YAML.
#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    family: Family,
    #[serde(default)]
    description: String,
    schema: EntitySchema,
    #[serde(default)]
    projection: ProjectionSpec,
    #[serde(default)]
    rules: Vec<BusinessRule>,
    #[serde(default)]
    children: Vec<ChildFile>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChildFile {
    kind: ChildKind,
    schema: EntitySchema,
    #[serde(default)]
    projection: ProjectionSpec,
    #[serde(default)]
    rules: Vec<BusinessRule>,
}

/// Schema, projection and rules for one nested collection.
#[derive(Debug)]
pub struct ChildCatalog {
    pub kind: ChildKind,
    /// Document array holding the items, e.g. `reportColumn`.
    pub collection_field: &'static str,
    pub schema: EntitySchema,
    pub projection: ProjectionSpec,
    pub rules: Vec<BusinessRule>,
    pub validator: UpdateValidator,
}

/// Compiled catalog for one entity family.
#[derive(Debug)]
pub struct FamilyCatalog {
    pub family: Family,
    pub description: String,
    /// Record schema, including one array field per nested collection.
    pub schema: EntitySchema,
    /// Record projection, including the projection of each nested collection.
    pub projection: ProjectionSpec,
    pub rules: Vec<BusinessRule>,
    pub validator: UpdateValidator,
    pub children: Vec<ChildCatalog>,
}

impl FamilyCatalog {
    pub fn child(&self, kind: ChildKind) -> Option<&ChildCatalog> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn child_kinds(&self) -> impl Iterator<Item = ChildKind> + '_ {
        self.children.iter().map(|c| c.kind)
    }

    fn compile(source_name: &str, file: CatalogFile) -> Result<Self, CatalogError> {
        let family = file.family;
        let schema_err = |source| CatalogError::Schema {
            source_name: source_name.to_string(),
            source,
        };

        let mut schema = file.schema;
        let mut projection = file.projection;
        let mut rules = file.rules;
        let mut children = Vec::with_capacity(file.children.len());

        for child in file.children {
            let collection_field = child.kind.collection_field(family).ok_or_else(|| {
                CatalogError::UnsupportedChild {
                    source_name: source_name.to_string(),
                    family,
                    kind: child.kind,
                }
            })?;

            if schema.field(collection_field).is_none() {
                let mut field = FieldSpec::new(collection_field, FieldType::Array);
                field.items = Some(Box::new(child.schema.clone()));
                schema.fields.push(field);
            }
            projection
                .children
                .insert(collection_field.to_string(), child.projection.clone());
            // Item rules also apply to each item of a full record.
            rules.extend(
                child
                    .rules
                    .iter()
                    .filter(|rule| rule.scope.is_none())
                    .map(|rule| BusinessRule {
                        scope: Some(collection_field.to_string()),
                        ..rule.clone()
                    }),
            );

            let validator =
                UpdateValidator::compile(&child.schema, &child.rules).map_err(schema_err)?;
            children.push(ChildCatalog {
                kind: child.kind,
                collection_field,
                schema: child.schema,
                projection: child.projection,
                rules: child.rules,
                validator,
            });
        }

        let validator = UpdateValidator::compile(&schema, &rules).map_err(schema_err)?;
        Ok(Self {
            family,
            description: file.description,
            schema,
            projection,
            rules,
            validator,
            children,
        })
    }
}

/// The full set of family catalogs.
#[derive(Debug)]
pub struct Catalogs {
    families: HashMap<Family, Arc<FamilyCatalog>>,
}

impl Catalogs {
    /// Embedded catalogs, parsed on first use.
    pub fn builtin() -> Result<Arc<Catalogs>, CatalogError> {
        BUILTIN
            .as_ref()
            .map(Arc::clone)
            .map_err(|e| CatalogError::Builtin(e.clone()))
    }

    /// Parse `(source name, YAML text)` pairs; every family must appear exactly once.
    pub fn from_sources<'a>(
        sources: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, CatalogError> {
        let mut families = HashMap::new();
        for (source_name, text) in sources {
            let file: CatalogFile =
                serde_yaml::from_str(text).map_err(|source| CatalogError::Yaml {
                    source_name: source_name.to_string(),
                    source,
                })?;
            let catalog = FamilyCatalog::compile(source_name, file)?;
            let family = catalog.family;
            if families.insert(family, Arc::new(catalog)).is_some() {
                return Err(CatalogError::DuplicateFamily(family));
            }
            tracing::debug!(source = source_name, %family, "catalog loaded");
        }
        if let Some(missing) = Family::ALL.into_iter().find(|f| !families.contains_key(f)) {
            return Err(CatalogError::MissingFamily(missing));
        }
        Ok(Self { families })
    }

    /// Load every `*.yaml` catalog in a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let io_err = |source| CatalogError::Io {
            path: dir.display().to_string(),
            source,
        };
        let mut texts = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
            texts.push((path.display().to_string(), text));
        }
        Self::from_sources(texts.iter().map(|(n, t)| (n.as_str(), t.as_str())))
    }

    pub fn family(&self, family: Family) -> Result<Arc<FamilyCatalog>, CatalogError> {
        self.families
            .get(&family)
            .cloned()
            .ok_or(CatalogError::MissingFamily(family))
    }
}
