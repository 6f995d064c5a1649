//! Normalized schema description and the graph the layout engine consumes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One column as reported by a database catalog.
///
/// `key` carries the vendor key annotation (`PRI`, `UNI`, `MUL`, ...). A
/// caller may also tag a column with `FK`, alone or comma-separated
/// (`"PRI,FK"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub column: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub null: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub extra: String,
}

impl ColumnDescriptor {
    pub fn new(column: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            data_type: data_type.into(),
            null: String::new(),
            key: String::new(),
            default: None,
            extra: String::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    fn has_key(&self, tag: &str) -> bool {
        self.key.split(',').any(|k| k.trim().eq_ignore_ascii_case(tag))
    }

    pub fn is_primary_key(&self) -> bool {
        self.has_key("PRI")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

/// Table name -> description, in request order.
pub type TablesData = IndexMap<String, TableInfo>;

/// A directed foreign-key reference between two selected tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub to_table: String,
    pub from_column: String,
    pub to_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_type: Option<String>,
}

/// Derive relationships from each table's foreign keys, keeping only those
/// whose referenced table is part of `tables`.
pub fn relationships_within(tables: &TablesData) -> Vec<Relationship> {
    tables
        .iter()
        .flat_map(|(name, info)| {
            info.foreign_keys
                .iter()
                .filter(|fk| tables.contains_key(&fk.referenced_table))
                .map(move |fk| Relationship {
                    from_table: name.clone(),
                    to_table: fk.referenced_table.clone(),
                    from_column: fk.column.clone(),
                    to_column: fk.referenced_column.clone(),
                    relationship_type: None,
                })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct GraphIR {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub typ: String,
    pub is_pk: bool,
    pub is_fk: bool,
}

impl Column {
    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.typ)
    }
}

impl GraphIR {
    pub fn from_tables(tables: &TablesData, relationships: &[Relationship]) -> Self {
        let tables = tables
            .iter()
            .map(|(name, info)| {
                let columns = info
                    .schema
                    .iter()
                    .map(|c| {
                        let is_fk = c.has_key("FK")
                            || info.foreign_keys.iter().any(|fk| fk.column == c.column);
                        Column {
                            name: c.column.clone(),
                            typ: c.data_type.clone(),
                            is_pk: c.is_primary_key(),
                            is_fk,
                        }
                    })
                    .collect();

                Table {
                    name: name.clone(),
                    columns,
                }
            })
            .collect();

        GraphIR {
            tables,
            relationships: relationships.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fk(column: &str, table: &str, referenced: &str) -> ForeignKey {
        ForeignKey {
            column: column.to_string(),
            referenced_table: table.to_string(),
            referenced_column: referenced.to_string(),
        }
    }

    fn sample() -> TablesData {
        let mut tables = TablesData::new();
        tables.insert(
            "users".to_string(),
            TableInfo {
                schema: vec![
                    ColumnDescriptor::new("id", "int").with_key("PRI"),
                    ColumnDescriptor::new("email", "varchar(255)").with_key("UNI"),
                ],
                foreign_keys: vec![],
            },
        );
        tables.insert(
            "orders".to_string(),
            TableInfo {
                schema: vec![
                    ColumnDescriptor::new("id", "int").with_key("PRI"),
                    ColumnDescriptor::new("user_id", "int").with_key("MUL"),
                    ColumnDescriptor::new("coupon_id", "int"),
                ],
                foreign_keys: vec![
                    fk("user_id", "users", "id"),
                    fk("coupon_id", "coupons", "id"),
                ],
            },
        );
        tables
    }

    #[test]
    fn test_relationships_within_drops_unselected_targets() {
        let rels = relationships_within(&sample());
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].from_table, "orders");
        assert_eq!(rels[0].from_column, "user_id");
        assert_eq!(rels[0].to_table, "users");
        assert_eq!(rels[0].to_column, "id");
    }

    #[test]
    fn test_ir_key_flags() {
        let tables = sample();
        let ir = GraphIR::from_tables(&tables, &relationships_within(&tables));

        let orders = &ir.tables[1];
        assert_eq!(orders.name, "orders");
        assert!(orders.columns[0].is_pk);
        assert!(!orders.columns[0].is_fk);
        assert!(orders.columns[1].is_fk);
        assert!(orders.columns[2].is_fk);

        let users = &ir.tables[0];
        assert!(!users.columns[1].is_pk);
        assert!(!users.columns[1].is_fk);
    }

    #[test]
    fn test_ir_preserves_order() {
        let ir = GraphIR::from_tables(&sample(), &[]);
        let names: Vec<&str> = ir.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["users", "orders"]);
        let cols: Vec<&str> = ir.tables[1].columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(cols, ["id", "user_id", "coupon_id"]);
    }

    #[test]
    fn test_combined_key_tags() {
        let c = ColumnDescriptor::new("tenant_id", "int").with_key("PRI, FK");
        assert!(c.is_primary_key());
        assert!(c.has_key("fk"));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{
            "schema": [{"column": "id", "type": "INTEGER", "key": "PRI"}],
            "foreign_keys": []
        }"#;
        let info: TableInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.schema[0].data_type, "INTEGER");
        assert!(info.schema[0].is_primary_key());

        let out = serde_json::to_value(&info.schema[0]).unwrap();
        assert_eq!(out["type"], "INTEGER");
    }
}
