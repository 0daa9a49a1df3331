//! Entity metadata: tables, fields, keys and links.
//!
//! An [`EntityModel`] is the read-only description of one business entity as the
//! query builder sees it. Links are declared on the referencing side; the
//! catalog derives the inverse back-references when it is built.

use serde::{Deserialize, Serialize};

/// SQL storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SqlType {
    Blob,
    Boolean,
    Char,
    Clob,
    Date,
    Decimal,
    Integer,
    Time,
    Timestamp,
    Varchar,
    Varchar2,
}

impl SqlType {
    /// Types compared through the dialect's upper function in case-insensitive mode.
    pub fn is_short_text(&self) -> bool {
        matches!(self, SqlType::Varchar2 | SqlType::Varchar | SqlType::Char)
    }

    /// Types that can be concatenated without a cast.
    pub fn is_textual(&self) -> bool {
        self.is_short_text() || matches!(self, SqlType::Clob)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, SqlType::Date | SqlType::Time | SqlType::Timestamp)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, SqlType::Integer | SqlType::Decimal)
    }
}

/// Where the value of a field lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Memory {
    /// Plain database column.
    #[default]
    No,
    /// Computed in memory, never read from the database.
    Always,
    /// Not stored anywhere.
    Never,
    /// Computed by a SQL expression at query time.
    Sql,
}

/// A coded value of an enumerated field (`code` is what callers pass, `value`
/// is what the database stores).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinedValue {
    pub code: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldModel {
    pub name: String,
    /// Column name; derived from `name` when left empty.
    #[serde(default)]
    pub sql_name: String,
    pub sql_type: SqlType,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub memory: Memory,
    /// SQL expression for `memory: sql` fields; `:tableAlias` is replaced by the
    /// alias of the table the field is read from.
    #[serde(default)]
    pub sql_expr: Option<String>,
    #[serde(default)]
    pub defined_values: Vec<DefinedValue>,
}

impl FieldModel {
    pub fn new(name: impl Into<String>, sql_name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_name: sql_name.into(),
            sql_type,
            size: 0,
            precision: 0,
            memory: Memory::No,
            sql_expr: None,
            defined_values: Vec::new(),
        }
    }

    pub fn with_size(mut self, size: u32, precision: u32) -> Self {
        self.size = size;
        self.precision = precision;
        self
    }

    pub fn with_sql_expr(mut self, expr: impl Into<String>) -> Self {
        self.memory = Memory::Sql;
        self.sql_expr = Some(expr.into());
        self
    }

    pub fn with_memory(mut self, memory: Memory) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_defined_value(mut self, code: impl Into<String>, value: impl Into<String>) -> Self {
        self.defined_values.push(DefinedValue {
            code: code.into(),
            value: value.into(),
        });
        self
    }

    /// True when the field is selected from the database (plain column or SQL expression).
    pub fn is_from_database(&self) -> bool {
        matches!(self.memory, Memory::No | Memory::Sql)
    }

    pub fn is_sql_expression(&self) -> bool {
        self.memory == Memory::Sql
    }

    pub fn defined_value(&self, code: &str) -> Option<&DefinedValue> {
        self.defined_values.iter().find(|dv| dv.code == code)
    }
}

/// An ordered list of field names forming a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyModel {
    pub fields: Vec<String>,
}

impl KeyModel {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A foreign-key relation from `entity` (the referencing side) to `ref_entity`.
///
/// The same value is stored on `entity` as a link and on `ref_entity` as a
/// back-reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkModel {
    pub name: String,
    /// Referencing entity; filled in by the catalog for declared links.
    #[serde(default)]
    pub entity: String,
    pub ref_entity: String,
    /// Foreign-key fields on `entity`, in the order of the referenced primary key.
    pub fields: Vec<String>,
    /// No physical constraint backs this link; join resolution ignores it.
    #[serde(default)]
    pub transient: bool,
}

impl LinkModel {
    pub fn new<I, S>(
        name: impl Into<String>,
        entity: impl Into<String>,
        ref_entity: impl Into<String>,
        fields: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            entity: entity.into(),
            ref_entity: ref_entity.into(),
            fields: fields.into_iter().map(Into::into).collect(),
            transient: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityModel {
    pub name: String,
    pub table: String,
    /// Logical schema id, resolved to a physical schema at compile time.
    #[serde(default, rename = "schema")]
    pub schema_id: Option<String>,
    #[serde(default)]
    pub primary_key: KeyModel,
    #[serde(default)]
    pub fields: Vec<FieldModel>,
    #[serde(default)]
    pub links: Vec<LinkModel>,
    #[serde(skip)]
    pub back_refs: Vec<LinkModel>,
    /// Many-to-many association entity.
    #[serde(default)]
    pub associative: bool,
}

impl EntityModel {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            schema_id: None,
            primary_key: KeyModel::default(),
            fields: Vec::new(),
            links: Vec::new(),
            back_refs: Vec::new(),
            associative: false,
        }
    }

    pub fn with_schema(mut self, schema_id: impl Into<String>) -> Self {
        self.schema_id = Some(schema_id.into());
        self
    }

    pub fn with_primary_key<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = KeyModel::new(fields);
        self
    }

    pub fn with_field(mut self, field: FieldModel) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare a link to `ref_entity` carried by `fields` of this entity.
    pub fn with_link<I, S>(
        mut self,
        name: impl Into<String>,
        ref_entity: impl Into<String>,
        fields: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let link = LinkModel::new(name, self.name.clone(), ref_entity, fields);
        self.links.push(link);
        self
    }

    pub fn associative(mut self) -> Self {
        self.associative = true;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look a field up by name, falling back to its column name.
    pub fn field_by_name_or_sql_name(&self, name: &str) -> Option<&FieldModel> {
        self.field(name)
            .or_else(|| self.fields.iter().find(|f| f.sql_name == name))
    }

    pub fn link(&self, name: &str) -> Option<&LinkModel> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn back_ref(&self, name: &str) -> Option<&LinkModel> {
        self.back_refs.iter().find(|l| l.name == name)
    }

    /// Fields selected from the database, in declaration order.
    pub fn db_fields(&self) -> impl Iterator<Item = &FieldModel> {
        self.fields.iter().filter(|f| f.is_from_database())
    }

    /// For an associative entity reached through `via_link`, the link leading to
    /// the entity on the other side of the association.
    pub fn associated_link(&self, via_link: &str) -> Option<&LinkModel> {
        if !self.associative {
            return None;
        }
        self.links.iter().find(|l| l.name != via_link)
    }
}
