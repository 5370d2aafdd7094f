//! Dimension definition registry
//!
//! Describes, per human-effects table, the ordered columns an editor sees:
//! built-in disaggregation dimensions, table-specific dimensions, tenant
//! custom dimensions, then the count metrics. Enum/boolean columns are
//! dimensions (part of a row's dimension tuple); number columns are metrics.
//!
//! Tenants extend the built-ins with a versioned custom-dimension blob and may
//! hide dimensions. Hidden dimensions disappear from [`DimensionRegistry::definitions_for`]
//! but stay known to [`DimensionRegistry::all_definitions_for`] so historical
//! rows that use them are still accepted.

use crate::db::settings::{get_tenant_setting, CUSTOM_DISAGGREGATIONS_KEY, HIDDEN_COLUMNS_KEY};
use crate::{HeError, HeResult};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// Human-effects tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableId {
    Deaths,
    Injured,
    Missing,
    Affected,
    Displaced,
    DisplacementStocks,
}

impl TableId {
    pub const ALL: [TableId; 6] = [
        TableId::Deaths,
        TableId::Injured,
        TableId::Missing,
        TableId::Affected,
        TableId::Displaced,
        TableId::DisplacementStocks,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableId::Deaths => "Deaths",
            TableId::Injured => "Injured",
            TableId::Missing => "Missing",
            TableId::Affected => "Affected",
            TableId::Displaced => "Displaced",
            TableId::DisplacementStocks => "DisplacementStocks",
        }
    }

    /// Count columns (key, label) stored for this table
    pub fn metrics(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            TableId::Deaths => &[("deaths", "Deaths")],
            TableId::Injured => &[("injured", "Injured")],
            TableId::Missing => &[("missing", "Missing")],
            TableId::Affected => &[("direct", "Directly affected"), ("indirect", "Indirectly affected")],
            TableId::Displaced => &[("displaced", "Displaced")],
            TableId::DisplacementStocks => &[("displacement_stocks", "Displacement stocks")],
        }
    }

    pub fn has_metric(&self, key: &str) -> bool {
        self.metrics().iter().any(|(k, _)| *k == key)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableId {
    type Err = HeError;

    fn from_str(s: &str) -> HeResult<Self> {
        TableId::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HeError::UnknownTable(s.to_string()))
    }
}

/// Column value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Enum,
    Number,
    Boolean,
}

/// One selectable value of an enum column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    pub key: String,
    pub label: String,
}

/// One column of an editable human-effects table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub key: String,
    pub label: String,
    pub kind: ColumnKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<EnumOption>>,
    /// Defined by tenant configuration rather than built in
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub custom: bool,
}

/// A parsed cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Dimension selection; `None` is "unset"
    Dimension(Option<String>),
    /// Count; `None` is "not entered"
    Metric(Option<i64>),
}

impl ColumnDef {
    fn enumeration(key: &str, label: &str, options: &[(&str, &str)], custom: bool) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ColumnKind::Enum,
            domain: Some(
                options
                    .iter()
                    .map(|(k, l)| EnumOption {
                        key: k.to_string(),
                        label: l.to_string(),
                    })
                    .collect(),
            ),
            custom,
        }
    }

    fn number(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ColumnKind::Number,
            domain: None,
            custom: false,
        }
    }

    pub fn is_dimension(&self) -> bool {
        self.kind != ColumnKind::Number
    }

    /// Parse and validate a wire value for this column
    ///
    /// `null` and `""` mean unset. Enum values must be in the domain, booleans
    /// accept JSON bools or "true"/"false", counts must be non-negative integers
    /// given as numbers or numeric strings.
    pub fn parse(&self, value: &Value) -> HeResult<Cell> {
        match self.kind {
            ColumnKind::Enum => self.parse_enum(value).map(Cell::Dimension),
            ColumnKind::Boolean => self.parse_boolean(value).map(Cell::Dimension),
            ColumnKind::Number => self.parse_count(value).map(Cell::Metric),
        }
    }

    fn parse_enum(&self, value: &Value) -> HeResult<Option<String>> {
        let raw = match value {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(HeError::invalid(&self.key, format!("expected a category, got {}", other)))
            }
        };

        let in_domain = self
            .domain
            .as_ref()
            .map(|d| d.iter().any(|o| o.key == raw))
            .unwrap_or(false);
        if !in_domain {
            return Err(HeError::invalid(&self.key, format!("'{}' is not an allowed value", raw)));
        }
        Ok(Some(raw))
    }

    fn parse_boolean(&self, value: &Value) -> HeResult<Option<String>> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::String(s) => match s.trim() {
                "" => Ok(None),
                "true" => Ok(Some("true".to_string())),
                "false" => Ok(Some("false".to_string())),
                other => Err(HeError::invalid(&self.key, format!("'{}' is not true/false", other))),
            },
            other => Err(HeError::invalid(&self.key, format!("'{}' is not true/false", other))),
        }
    }

    fn parse_count(&self, value: &Value) -> HeResult<Option<i64>> {
        let parsed = match value {
            Value::Null => return Ok(None),
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
            _ => None,
        };

        match parsed {
            Some(n) if n < 0 => Err(HeError::invalid(&self.key, "counts must not be negative")),
            Some(n) => Ok(Some(n)),
            None => Err(HeError::invalid(&self.key, format!("'{}' is not a whole number", value))),
        }
    }
}

struct BuiltinDimension {
    key: &'static str,
    label: &'static str,
    options: &'static [(&'static str, &'static str)],
    /// Empty slice means every table
    tables: &'static [TableId],
}

const BUILTIN_DIMENSIONS: &[BuiltinDimension] = &[
    BuiltinDimension {
        key: "sex",
        label: "Sex",
        options: &[("m", "Male"), ("f", "Female"), ("other", "Other / non-binary")],
        tables: &[],
    },
    BuiltinDimension {
        key: "age",
        label: "Age",
        options: &[("0-14", "Children (0-14)"), ("15-64", "Adults (15-64)"), ("65+", "Elderly (65+)")],
        tables: &[],
    },
    BuiltinDimension {
        key: "disability",
        label: "Disability",
        options: &[
            ("none", "No disability"),
            ("physical", "Physical"),
            ("sensory", "Sensory"),
            ("intellectual", "Intellectual"),
            ("psychosocial", "Psychosocial"),
            ("multiple", "Multiple"),
        ],
        tables: &[],
    },
    BuiltinDimension {
        key: "global_poverty_line",
        label: "Global poverty line",
        options: &[("below", "Below"), ("above", "Above")],
        tables: &[],
    },
    BuiltinDimension {
        key: "national_poverty_line",
        label: "National poverty line",
        options: &[("below", "Below"), ("above", "Above")],
        tables: &[],
    },
    BuiltinDimension {
        key: "assisted",
        label: "Assisted",
        options: &[("assisted", "Assisted"), ("not_assisted", "Not assisted")],
        tables: &[TableId::Displaced, TableId::DisplacementStocks],
    },
    BuiltinDimension {
        key: "timing",
        label: "Timing",
        options: &[("pre_emptive", "Pre-emptive"), ("reactive", "Reactive")],
        tables: &[TableId::Displaced],
    },
    BuiltinDimension {
        key: "duration",
        label: "Duration",
        options: &[
            ("short", "Short term (< 10 days)"),
            ("medium_short", "Medium short term (10-30 days)"),
            ("medium_long", "Medium long term (1-3 months)"),
            ("long", "Long term (> 3 months)"),
            ("permanent", "Permanent"),
        ],
        tables: &[TableId::Displaced],
    },
];

/// Built-in dimension columns per table, in display order
static BUILTIN_COLUMNS: Lazy<BTreeMap<TableId, Vec<ColumnDef>>> = Lazy::new(|| {
    TableId::ALL
        .into_iter()
        .map(|table| {
            let dims = BUILTIN_DIMENSIONS
                .iter()
                .filter(|d| d.tables.is_empty() || d.tables.contains(&table))
                .map(|d| ColumnDef::enumeration(d.key, d.label, d.options, false))
                .collect();
            (table, dims)
        })
        .collect()
});

fn is_builtin_key(key: &str) -> bool {
    BUILTIN_DIMENSIONS.iter().any(|d| d.key == key)
        || TableId::ALL.iter().any(|t| t.has_metric(key))
}

/// Supported custom-dimension envelope version
pub const CUSTOM_CONFIG_VERSION: u32 = 1;

/// Kind of a tenant custom dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomKind {
    #[default]
    Enum,
    Boolean,
}

/// One tenant-defined dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomDimension {
    pub ui_name: String,
    pub db_name: String,
    #[serde(default)]
    pub kind: CustomKind,
    #[serde(default, rename = "enum")]
    pub options: Vec<EnumOption>,
}

/// Versioned tenant custom-dimension configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomDimensionConfig {
    pub version: u32,
    #[serde(default)]
    pub dimensions: Vec<CustomDimension>,
}

#[derive(Deserialize)]
struct VersionHeader {
    version: Option<u32>,
}

impl CustomDimensionConfig {
    /// Parse and validate a stored/submitted blob; unknown versions are rejected
    pub fn from_json(json: &str) -> HeResult<Self> {
        let header: VersionHeader = serde_json::from_str(json)
            .map_err(|e| HeError::Config(format!("Custom disaggregations are not valid JSON: {}", e)))?;
        match header.version {
            Some(CUSTOM_CONFIG_VERSION) => {}
            Some(v) => {
                return Err(HeError::Config(format!(
                    "Unsupported custom disaggregation config version {}",
                    v
                )))
            }
            None => return Err(HeError::Config("Custom disaggregation config has no version".into())),
        }

        let config: CustomDimensionConfig = serde_json::from_str(json)
            .map_err(|e| HeError::Config(format!("Invalid custom disaggregation config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HeResult<()> {
        if self.version != CUSTOM_CONFIG_VERSION {
            return Err(HeError::Config(format!(
                "Unsupported custom disaggregation config version {}",
                self.version
            )));
        }

        let mut seen = BTreeSet::new();
        for dim in &self.dimensions {
            let name = dim.db_name.as_str();
            let valid_ident = name
                .chars()
                .next()
                .map(|c| c.is_ascii_lowercase())
                .unwrap_or(false)
                && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
                && name.len() <= 64;
            if !valid_ident {
                return Err(HeError::Config(format!("Invalid dimension name '{}'", name)));
            }
            if is_builtin_key(name) {
                return Err(HeError::Config(format!("Dimension '{}' clashes with a built-in column", name)));
            }
            if !seen.insert(name) {
                return Err(HeError::Config(format!("Dimension '{}' defined twice", name)));
            }
            if dim.ui_name.trim().is_empty() {
                return Err(HeError::Config(format!("Dimension '{}' has no display name", name)));
            }

            match dim.kind {
                CustomKind::Enum => {
                    if dim.options.is_empty() {
                        return Err(HeError::Config(format!("Dimension '{}' has no values", name)));
                    }
                    let mut keys = BTreeSet::new();
                    for opt in &dim.options {
                        if opt.key.trim().is_empty() || !keys.insert(opt.key.as_str()) {
                            return Err(HeError::Config(format!(
                                "Dimension '{}' has an empty or repeated value '{}'",
                                name, opt.key
                            )));
                        }
                    }
                }
                CustomKind::Boolean => {
                    if !dim.options.is_empty() {
                        return Err(HeError::Config(format!(
                            "Boolean dimension '{}' must not list values",
                            name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn columns(&self) -> Vec<ColumnDef> {
        self.dimensions
            .iter()
            .map(|d| ColumnDef {
                key: d.db_name.clone(),
                label: d.ui_name.clone(),
                kind: match d.kind {
                    CustomKind::Enum => ColumnKind::Enum,
                    CustomKind::Boolean => ColumnKind::Boolean,
                },
                domain: match d.kind {
                    CustomKind::Enum => Some(d.options.clone()),
                    CustomKind::Boolean => None,
                },
                custom: true,
            })
            .collect()
    }
}

/// Tenant list of dimensions hidden from editors
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HiddenColumns {
    #[serde(default)]
    pub cols: Vec<String>,
}

impl HiddenColumns {
    pub fn from_json(json: &str) -> HeResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| HeError::Config(format!("Invalid hidden columns config: {}", e)))
    }
}

/// Registry of columns per table for one tenant
#[derive(Debug, Clone, Default)]
pub struct DimensionRegistry {
    custom: Vec<ColumnDef>,
    hidden: BTreeSet<String>,
}

impl DimensionRegistry {
    /// Built-in columns only
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn new(custom: &CustomDimensionConfig, hidden: &HiddenColumns) -> HeResult<Self> {
        custom.validate()?;
        Ok(Self {
            custom: custom.columns(),
            hidden: hidden.cols.iter().cloned().collect(),
        })
    }

    /// Columns visible to editors, in positional order
    pub fn definitions_for(&self, table: TableId) -> Vec<ColumnDef> {
        self.all_definitions_for(table)
            .into_iter()
            .filter(|c| !(c.is_dimension() && self.hidden.contains(&c.key)))
            .collect()
    }

    /// Every column including hidden dimensions
    pub fn all_definitions_for(&self, table: TableId) -> Vec<ColumnDef> {
        let mut columns: Vec<ColumnDef> = BUILTIN_COLUMNS.get(&table).cloned().unwrap_or_default();
        columns.extend(self.custom.iter().cloned());
        columns.extend(table.metrics().iter().map(|(k, l)| ColumnDef::number(k, l)));
        columns
    }

    /// Look up a column (hidden included)
    pub fn column(&self, table: TableId, key: &str) -> HeResult<ColumnDef> {
        self.all_definitions_for(table)
            .into_iter()
            .find(|c| c.key == key)
            .ok_or_else(|| HeError::UnknownDimension(key.to_string()))
    }

    /// Dimension keys of a table, optionally including hidden ones
    pub fn dimension_keys(&self, table: TableId, include_hidden: bool) -> Vec<String> {
        let columns = if include_hidden {
            self.all_definitions_for(table)
        } else {
            self.definitions_for(table)
        };
        columns.into_iter().filter(|c| c.is_dimension()).map(|c| c.key).collect()
    }

    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden.contains(key)
    }

    /// Reject hidden-column lists naming metrics or unknown dimensions
    pub fn validate_hidden(&self, hidden: &HiddenColumns) -> HeResult<()> {
        for col in &hidden.cols {
            let known = TableId::ALL.iter().any(|t| {
                self.all_definitions_for(*t)
                    .iter()
                    .any(|c| c.is_dimension() && &c.key == col)
            });
            if !known {
                return Err(HeError::UnknownDimension(col.clone()));
            }
        }
        Ok(())
    }
}

/// Load a tenant's registry from `tenant_settings`
///
/// A stored blob that no longer validates is logged and ignored so editors
/// keep working with the built-in columns.
pub async fn load_registry(pool: &SqlitePool, country_accounts_id: &str) -> HeResult<DimensionRegistry> {
    let custom = match get_tenant_setting(pool, country_accounts_id, CUSTOM_DISAGGREGATIONS_KEY).await? {
        Some(json) => match CustomDimensionConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                warn!(tenant = %country_accounts_id, error = %e, "Ignoring stored custom disaggregations");
                CustomDimensionConfig::default()
            }
        },
        None => CustomDimensionConfig::default(),
    };

    let hidden = match get_tenant_setting(pool, country_accounts_id, HIDDEN_COLUMNS_KEY).await? {
        Some(json) => HiddenColumns::from_json(&json).unwrap_or_else(|e| {
            warn!(tenant = %country_accounts_id, error = %e, "Ignoring stored hidden columns");
            HiddenColumns::default()
        }),
        None => HiddenColumns::default(),
    };

    debug!(
        tenant = %country_accounts_id,
        custom = custom.dimensions.len(),
        hidden = hidden.cols.len(),
        "Loaded dimension registry"
    );

    Ok(DimensionRegistry {
        custom: custom.columns(),
        hidden: hidden.cols.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn custom_config() -> CustomDimensionConfig {
        CustomDimensionConfig::from_json(
            r#"{
                "version": 1,
                "dimensions": [
                    {"uiName": "Ethnicity", "dbName": "ethnicity",
                     "enum": [{"key": "a", "label": "Group A"}, {"key": "b", "label": "Group B"}]},
                    {"uiName": "Migrant", "dbName": "migrant", "kind": "boolean"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_table_id_parse() {
        assert_eq!("DisplacementStocks".parse::<TableId>().unwrap(), TableId::DisplacementStocks);
        assert!(matches!("Casualties".parse::<TableId>(), Err(HeError::UnknownTable(_))));
    }

    #[test]
    fn test_builtin_definitions_order() {
        let registry = DimensionRegistry::builtin();
        let keys: Vec<String> = registry
            .definitions_for(TableId::Deaths)
            .into_iter()
            .map(|c| c.key)
            .collect();
        assert_eq!(
            keys,
            vec!["sex", "age", "disability", "global_poverty_line", "national_poverty_line", "deaths"]
        );
    }

    #[test]
    fn test_table_specific_dimensions() {
        let registry = DimensionRegistry::builtin();
        let displaced = registry.dimension_keys(TableId::Displaced, false);
        assert!(displaced.contains(&"timing".to_string()));
        assert!(displaced.contains(&"duration".to_string()));

        let affected = registry.definitions_for(TableId::Affected);
        assert!(!affected.iter().any(|c| c.key == "timing"));
        let metrics: Vec<&str> = affected
            .iter()
            .filter(|c| !c.is_dimension())
            .map(|c| c.key.as_str())
            .collect();
        assert_eq!(metrics, vec!["direct", "indirect"]);
    }

    #[test]
    fn test_custom_dimensions_precede_metrics() {
        let registry = DimensionRegistry::new(&custom_config(), &HiddenColumns::default()).unwrap();
        let defs = registry.definitions_for(TableId::Injured);
        let keys: Vec<&str> = defs.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(&keys[keys.len() - 3..], &["ethnicity", "migrant", "injured"]);
        assert!(defs.iter().find(|c| c.key == "migrant").unwrap().kind == ColumnKind::Boolean);
    }

    #[test]
    fn test_hidden_filtered_but_still_known() {
        let hidden = HiddenColumns {
            cols: vec!["sex".to_string(), "ethnicity".to_string()],
        };
        let registry = DimensionRegistry::new(&custom_config(), &hidden).unwrap();

        let visible = registry.definitions_for(TableId::Deaths);
        assert!(!visible.iter().any(|c| c.key == "sex" || c.key == "ethnicity"));

        assert!(registry.column(TableId::Deaths, "sex").is_ok());
        assert!(registry.dimension_keys(TableId::Deaths, true).contains(&"ethnicity".to_string()));
    }

    #[test]
    fn test_unknown_column_lookup() {
        let registry = DimensionRegistry::builtin();
        assert!(matches!(
            registry.column(TableId::Deaths, "timing"),
            Err(HeError::UnknownDimension(_))
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let err = CustomDimensionConfig::from_json(r#"{"version": 2, "dimensions": []}"#).unwrap_err();
        assert!(matches!(err, HeError::Config(msg) if msg.contains("version 2")));

        let err = CustomDimensionConfig::from_json(r#"{"dimensions": []}"#).unwrap_err();
        assert!(matches!(err, HeError::Config(_)));
    }

    #[test]
    fn test_unknown_envelope_fields_rejected() {
        let err = CustomDimensionConfig::from_json(r#"{"version": 1, "config": []}"#).unwrap_err();
        assert!(matches!(err, HeError::Config(_)));
    }

    #[test]
    fn test_custom_clash_with_builtin_rejected() {
        let err = CustomDimensionConfig::from_json(
            r#"{"version": 1, "dimensions": [{"uiName": "Sex", "dbName": "sex", "enum": [{"key": "x", "label": "X"}]}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HeError::Config(_)));
    }

    #[test]
    fn test_custom_enum_requires_values() {
        let err = CustomDimensionConfig::from_json(
            r#"{"version": 1, "dimensions": [{"uiName": "Caste", "dbName": "caste"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, HeError::Config(_)));
    }

    #[test]
    fn test_validate_hidden_rejects_metrics() {
        let registry = DimensionRegistry::builtin();
        assert!(registry
            .validate_hidden(&HiddenColumns { cols: vec!["age".into()] })
            .is_ok());
        assert!(registry
            .validate_hidden(&HiddenColumns { cols: vec!["deaths".into()] })
            .is_err());
    }

    #[test]
    fn test_parse_enum_values() {
        let registry = DimensionRegistry::builtin();
        let sex = registry.column(TableId::Deaths, "sex").unwrap();

        assert_eq!(sex.parse(&json!("f")).unwrap(), Cell::Dimension(Some("f".into())));
        assert_eq!(sex.parse(&json!(null)).unwrap(), Cell::Dimension(None));
        assert_eq!(sex.parse(&json!("")).unwrap(), Cell::Dimension(None));
        assert!(matches!(sex.parse(&json!("x")), Err(HeError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_counts() {
        let registry = DimensionRegistry::builtin();
        let deaths = registry.column(TableId::Deaths, "deaths").unwrap();

        assert_eq!(deaths.parse(&json!(12)).unwrap(), Cell::Metric(Some(12)));
        assert_eq!(deaths.parse(&json!("7")).unwrap(), Cell::Metric(Some(7)));
        assert_eq!(deaths.parse(&json!(3.0)).unwrap(), Cell::Metric(Some(3)));
        assert_eq!(deaths.parse(&json!(null)).unwrap(), Cell::Metric(None));
        assert!(matches!(deaths.parse(&json!(-1)), Err(HeError::InvalidValue { .. })));
        assert!(matches!(deaths.parse(&json!("-1")), Err(HeError::InvalidValue { .. })));
        assert!(matches!(deaths.parse(&json!(1.5)), Err(HeError::InvalidValue { .. })));
        assert!(matches!(deaths.parse(&json!("many")), Err(HeError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_boolean() {
        let registry = DimensionRegistry::new(&custom_config(), &HiddenColumns::default()).unwrap();
        let migrant = registry.column(TableId::Deaths, "migrant").unwrap();

        assert_eq!(migrant.parse(&json!(true)).unwrap(), Cell::Dimension(Some("true".into())));
        assert_eq!(migrant.parse(&json!("false")).unwrap(), Cell::Dimension(Some("false".into())));
        assert!(migrant.parse(&json!("yes")).is_err());
    }
}
