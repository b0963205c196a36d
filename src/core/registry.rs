//! Field registry: the filterable fields of each searchable entity
//!
//! Schemas are declared once (see `crate::entities`) and registered into a
//! [`FieldRegistry`]. Registration validates every identifier and every
//! aggregate reference, so a broken declaration fails at startup instead of
//! at query time.

use crate::core::aggregate::AggregateDefinition;
use crate::core::error::{ConfigError, FilterError, SieveError};
use crate::core::field::{FieldKind, FilterField, JoinPath, is_valid_identifier};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Searchable entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Startup,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Startup => "startup",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = SieveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "users" => Ok(EntityKind::User),
            "startup" | "startups" => Ok(EntityKind::Startup),
            other => Err(SieveError::Internal(format!("Unknown entity kind: {}", other))),
        }
    }
}

/// A text column searched by the free-text global query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchColumn {
    pub path: JoinPath,
    pub column: String,
}

/// Filterable fields, aggregates and search columns of one entity
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub kind: EntityKind,
    /// Root table
    pub table: String,
    pub primary_key: String,
    fields: IndexMap<String, FilterField>,
    aggregates: HashMap<String, AggregateDefinition>,
    global_search: Vec<SearchColumn>,
    sortable: Vec<String>,
}

impl EntitySchema {
    pub fn new(kind: EntityKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            primary_key: "id".to_string(),
            fields: IndexMap::new(),
            aggregates: HashMap::new(),
            global_search: Vec::new(),
            sortable: Vec::new(),
        }
    }

    pub fn field(mut self, field: FilterField) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn aggregate(mut self, aggregate: AggregateDefinition) -> Self {
        self.aggregates.insert(aggregate.name.clone(), aggregate);
        self
    }

    /// Search a root column with the global query
    pub fn search(self, column: impl Into<String>) -> Self {
        self.search_via(JoinPath::root(), column)
    }

    /// Search a related column with the global query
    pub fn search_via(mut self, path: impl Into<JoinPath>, column: impl Into<String>) -> Self {
        self.global_search.push(SearchColumn {
            path: path.into(),
            column: column.into(),
        });
        self
    }

    /// Allow sorting on root columns
    pub fn sortable(mut self, columns: &[&str]) -> Self {
        self.sortable.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Look up a field by request name
    pub fn get(&self, name: &str) -> Option<&FilterField> {
        self.fields.get(name)
    }

    /// Look up a field, failing with `UnknownField`
    pub fn resolve(&self, name: &str) -> Result<&FilterField, FilterError> {
        self.get(name).ok_or_else(|| FilterError::UnknownField {
            entity: self.kind.to_string(),
            field: name.to_string(),
        })
    }

    pub fn aggregate_definition(&self, name: &str) -> Option<&AggregateDefinition> {
        self.aggregates.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FilterField> {
        self.fields.values()
    }

    pub fn search_columns(&self) -> &[SearchColumn] {
        &self.global_search
    }

    pub fn is_sortable(&self, column: &str) -> bool {
        self.sortable.iter().any(|c| c == column)
    }

    /// Check identifiers and aggregate references
    pub fn validate(&self) -> Result<(), SieveError> {
        let invalid = |field: &str, value: &str| {
            SieveError::Config(ConfigError::InvalidValue {
                field: field.to_string(),
                value: value.to_string(),
                message: format!("not a valid identifier in {} schema", self.kind),
            })
        };

        for name in [&self.table, &self.primary_key] {
            if !is_valid_identifier(name) {
                return Err(invalid("table", name));
            }
        }

        for field in self.fields.values() {
            if let Some(name) = field.path.invalid_identifier() {
                return Err(invalid(&field.name, name));
            }
            match &field.kind {
                FieldKind::Boolean { condition } => {
                    if let Some(name) = condition.invalid_identifier() {
                        return Err(invalid(&field.name, name));
                    }
                }
                FieldKind::AggregateCount { aggregate, .. } => {
                    if !self.aggregates.contains_key(aggregate) {
                        return Err(FilterError::UnsupportedAggregateField {
                            entity: self.kind.to_string(),
                            field: field.name.clone(),
                        }
                        .into());
                    }
                }
                _ => {
                    if !is_valid_identifier(&field.column) {
                        return Err(invalid(&field.name, &field.column));
                    }
                }
            }
        }

        for aggregate in self.aggregates.values() {
            let columns = [&aggregate.table, &aggregate.foreign_key]
                .into_iter()
                .chain(aggregate.conditions.iter().map(|c| &c.column));
            for name in columns {
                if !is_valid_identifier(name) {
                    return Err(invalid(&aggregate.name, name));
                }
            }
        }

        for search in &self.global_search {
            let bad = search
                .path
                .invalid_identifier()
                .or((!is_valid_identifier(&search.column)).then_some(search.column.as_str()));
            if let Some(name) = bad {
                return Err(invalid("globalQuery", name));
            }
        }

        for column in &self.sortable {
            if !is_valid_identifier(column) {
                return Err(invalid("sort", column));
            }
        }

        Ok(())
    }
}

/// Process-wide registry of entity schemas
///
/// Read-only once built; share it by reference across requests.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    schemas: HashMap<EntityKind, EntitySchema>,
}

impl FieldRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Validate and register a schema, replacing any schema of the same kind
    pub fn register(mut self, schema: EntitySchema) -> Result<Self, SieveError> {
        schema.validate()?;
        self.schemas.insert(schema.kind, schema);
        Ok(self)
    }

    /// Registry with the built-in user and startup schemas
    pub fn standard() -> Result<Self, SieveError> {
        Self::new()
            .register(crate::entities::user::schema())?
            .register(crate::entities::startup::schema())
    }

    /// The shared standard registry, built on first use
    pub fn global() -> &'static FieldRegistry {
        static REGISTRY: OnceLock<FieldRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| Self::standard().expect("built-in schemas are valid"))
    }

    pub fn schema(&self, kind: EntityKind) -> Option<&EntitySchema> {
        self.schemas.get(&kind)
    }

    /// Resolve a request field name to its metadata
    pub fn resolve(&self, kind: EntityKind, name: &str) -> Result<&FilterField, FilterError> {
        match self.schema(kind) {
            Some(schema) => schema.resolve(name),
            None => Err(FilterError::UnknownField {
                entity: kind.to_string(),
                field: name.to_string(),
            }),
        }
    }

    /// Get all registered entity kinds
    pub fn entity_kinds(&self) -> Vec<EntityKind> {
        self.schemas.keys().copied().collect()
    }
}
