//! Record definitions for every entity and relation table
//!
//! Records borrow from the ingested facts; they only exist long enough to be
//! handed to [`resolve`](super::resolve).

use crate::ingest::{AdTrackingFacts, ModuleFile, Technology, UseCase};
use crate::storage::traits::Record;
use rusqlite::types::Value;

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn opt_text(s: Option<&str>) -> Value {
    s.map(text).unwrap_or(Value::Null)
}

fn opt_int<T: Into<i64>>(n: Option<T>) -> Value {
    n.map(|n| Value::Integer(n.into())).unwrap_or(Value::Null)
}

fn flag(b: bool) -> Value {
    Value::Integer(b as i64)
}

fn joined(items: &[String]) -> Value {
    if items.is_empty() {
        Value::Null
    } else {
        Value::Text(items.join(";"))
    }
}

/// A crawled page
#[derive(Debug, Clone, Copy)]
pub struct SiteRecord<'a> {
    pub name: &'a str,
    pub url: &'a str,
    /// Url of the parent page or `"seed"`
    pub root: &'a str,
    /// Visit date (`YYYY-MM-DD`), only written on insert
    pub visited: &'a str,
}

impl Record for SiteRecord<'_> {
    fn table(&self) -> &'static str {
        "website"
    }

    fn id_column(&self) -> &'static str {
        "website_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["name", "url", "root"]
    }

    fn key_values(&self) -> Vec<Value> {
        vec![text(self.name), text(self.url), text(self.root)]
    }

    fn extra_columns(&self) -> &'static [&'static str] {
        &["visited"]
    }

    fn extra_values(&self) -> Vec<Value> {
        vec![text(self.visited)]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HyperlinkRecord<'a> {
    pub url: &'a str,
    pub inner_text: &'a str,
    pub already_visited: bool,
}

impl Record for HyperlinkRecord<'_> {
    fn table(&self) -> &'static str {
        "hyperlink"
    }

    fn id_column(&self) -> &'static str {
        "hyperlink_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["url", "inner_html"]
    }

    fn key_values(&self) -> Vec<Value> {
        vec![text(self.url), text(self.inner_text)]
    }

    fn extra_columns(&self) -> &'static [&'static str] {
        &["already_visited"]
    }

    fn extra_values(&self) -> Vec<Value> {
        vec![flag(self.already_visited)]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LanguageRecord<'a> {
    pub name: &'a str,
}

impl Record for LanguageRecord<'_> {
    fn table(&self) -> &'static str {
        "src_language"
    }

    fn id_column(&self) -> &'static str {
        "src_language_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["name"]
    }

    fn key_values(&self) -> Vec<Value> {
        vec![text(self.name)]
    }
}

const TECHNOLOGY_KEY: &[&str] = &["name", "url", "category", "version", "confidence"];

fn technology_key(tech: &Technology) -> Vec<Value> {
    vec![
        text(&tech.name),
        text(&tech.url),
        text(&tech.category),
        text(&tech.version),
        Value::Integer(tech.confidence.into()),
    ]
}

#[derive(Debug, Clone, Copy)]
pub struct LibraryRecord<'a>(pub &'a Technology);

impl Record for LibraryRecord<'_> {
    fn table(&self) -> &'static str {
        "library"
    }

    fn id_column(&self) -> &'static str {
        "library_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        TECHNOLOGY_KEY
    }

    fn key_values(&self) -> Vec<Value> {
        technology_key(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameworkRecord<'a>(pub &'a Technology);

impl Record for FrameworkRecord<'_> {
    fn table(&self) -> &'static str {
        "framework"
    }

    fn id_column(&self) -> &'static str {
        "framework_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        TECHNOLOGY_KEY
    }

    fn key_values(&self) -> Vec<Value> {
        technology_key(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModuleFileRecord<'a>(pub &'a ModuleFile);

impl Record for ModuleFileRecord<'_> {
    fn table(&self) -> &'static str {
        "embedded_module_file"
    }

    fn id_column(&self) -> &'static str {
        "embedded_module_file_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["local_file_name", "source_file_name", "source_script_name"]
    }

    fn key_values(&self) -> Vec<Value> {
        vec![
            text(&self.0.local_name),
            text(&self.0.source_file_name),
            text(&self.0.source_script_name),
        ]
    }

    fn extra_columns(&self) -> &'static [&'static str] {
        &[
            "file_size",
            "imports",
            "exports",
            "tables",
            "memory",
            "num_global",
            "num_func",
            "num_type",
        ]
    }

    fn extra_values(&self) -> Vec<Value> {
        let file = self.0;
        vec![
            // SQLite integers are signed; sizes past i64::MAX are not real files
            opt_int(file.file_size.and_then(|s| i64::try_from(s).ok())),
            joined(&file.imports),
            joined(&file.exports),
            joined(&file.tables),
            joined(&file.memory),
            opt_int(file.num_global),
            opt_int(file.num_func),
            opt_int(file.num_type),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModuleFunctionRecord<'a> {
    pub symbol: &'a str,
}

impl Record for ModuleFunctionRecord<'_> {
    fn table(&self) -> &'static str {
        "embedded_module_function"
    }

    fn id_column(&self) -> &'static str {
        "embedded_module_function_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["symbol"]
    }

    fn key_values(&self) -> Vec<Value> {
        vec![text(self.symbol)]
    }
}

/// Use of an embedded module file by a site
#[derive(Debug, Clone, Copy)]
pub struct ModuleUsageRecord {
    pub file_id: i64,
    pub site_id: i64,
    pub used: bool,
    pub use_case: UseCase,
}

impl Record for ModuleUsageRecord {
    fn table(&self) -> &'static str {
        "embedded_module"
    }

    fn id_column(&self) -> &'static str {
        "embedded_module_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["embedded_module_file_id", "website_id", "used", "use_case"]
    }

    fn key_values(&self) -> Vec<Value> {
        vec![
            Value::Integer(self.file_id),
            Value::Integer(self.site_id),
            flag(self.used),
            text(self.use_case.to_db_string()),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdTrackingRecord<'a> {
    pub facts: &'a AdTrackingFacts,
    pub site_id: i64,
}

impl Record for AdTrackingRecord<'_> {
    fn table(&self) -> &'static str {
        "ad_tracking"
    }

    fn id_column(&self) -> &'static str {
        "ad_tracking_id"
    }

    fn key_columns(&self) -> &'static [&'static str] {
        &["used", "cookies", "tracking_pixel", "utm_links", "website_id"]
    }

    fn key_values(&self) -> Vec<Value> {
        vec![
            flag(self.facts.used),
            opt_text(self.facts.cookies.as_deref()),
            opt_text(self.facts.tracking_pixel.as_deref()),
            opt_text(self.facts.utm_links.as_deref()),
            Value::Integer(self.site_id),
        ]
    }
}

/// Many-to-many associations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Site ↔ Library
    ContainsLibrary,
    /// Site ↔ Framework
    ContainsFramework,
    /// Site ↔ Language
    ImplementsLanguage,
    /// Site ↔ Hyperlink
    HasHyperlink,
    /// Module function ↔ module file
    HasModuleFunction,
}

impl Relation {
    pub fn table(&self) -> &'static str {
        match self {
            Self::ContainsLibrary => "contains_library",
            Self::ContainsFramework => "contains_framework",
            Self::ImplementsLanguage => "implements_language",
            Self::HasHyperlink => "has_hyperlink",
            Self::HasModuleFunction => "has_module_function",
        }
    }

    fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::ContainsLibrary => &["website_id", "library_id"],
            Self::ContainsFramework => &["website_id", "framework_id"],
            Self::ImplementsLanguage => &["website_id", "src_language_id"],
            Self::HasHyperlink => &["website_id", "hyperlink_id"],
            Self::HasModuleFunction => &["embedded_module_function_id", "embedded_module_file_id"],
        }
    }
}

/// One junction row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRecord {
    pub relation: Relation,
    pub left: i64,
    pub right: i64,
}

impl Record for RelationRecord {
    fn table(&self) -> &'static str {
        self.relation.table()
    }

    fn key_columns(&self) -> &'static [&'static str] {
        self.relation.columns()
    }

    fn key_values(&self) -> Vec<Value> {
        vec![Value::Integer(self.left), Value::Integer(self.right)]
    }
}
