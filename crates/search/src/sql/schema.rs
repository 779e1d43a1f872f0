//! DDL for the tables a registry describes.

use std::collections::BTreeMap;

use crate::schema::{EntityDef, JoinKey, ScalarType, SchemaRegistry};

use super::query_builder::quote_ident;

fn column_type(scalar_type: ScalarType) -> &'static str {
    match scalar_type {
        ScalarType::Integer | ScalarType::Boolean => "INTEGER",
        ScalarType::Float => "REAL",
        ScalarType::String | ScalarType::Date | ScalarType::Datetime => "TEXT",
    }
}

/// Columns of one table, in declaration order.
#[derive(Default)]
struct TableDef {
    primary_key: Option<String>,
    columns: Vec<(String, &'static str)>,
}

impl TableDef {
    fn add(&mut self, name: &str, sql_type: &'static str) {
        if !self.columns.iter().any(|(c, _)| c == name) {
            self.columns.push((name.to_string(), sql_type));
        }
    }

    fn to_sql(&self, table: &str) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|(name, sql_type)| {
                let pk = if self.primary_key.as_deref() == Some(name.as_str()) {
                    " PRIMARY KEY"
                } else {
                    ""
                };
                format!("{} {}{}", quote_ident(name), sql_type, pk)
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_ident(table),
            columns.join(", ")
        )
    }
}

fn primary_key_type(entity: &EntityDef) -> &'static str {
    entity
        .primary_key_attribute()
        .map(|a| column_type(a.scalar_type))
        .unwrap_or("INTEGER")
}

/// Returns one `CREATE TABLE IF NOT EXISTS` statement per entity table and
/// association table, including foreign key and back-reference columns.
pub fn schema_ddl(registry: &SchemaRegistry) -> Vec<String> {
    let mut tables: BTreeMap<String, TableDef> = BTreeMap::new();

    for entity in registry.entities() {
        let table = tables.entry(entity.table().to_string()).or_default();
        table.primary_key = Some(entity.primary_key().to_string());
        for attribute in entity.attributes() {
            table.add(&attribute.name, column_type(attribute.scalar_type));
        }
    }

    for entity in registry.entities() {
        let source_pk = primary_key_type(entity);
        for relation in entity.relations() {
            let Some(target) = registry.entity(&relation.target) else {
                continue;
            };
            let target_pk = primary_key_type(target);
            match &relation.join {
                JoinKey::ForeignKey { column } => {
                    tables
                        .entry(entity.table().to_string())
                        .or_default()
                        .add(column, target_pk);
                }
                JoinKey::Reverse { column } => {
                    tables
                        .entry(target.table().to_string())
                        .or_default()
                        .add(column, source_pk);
                }
                JoinKey::Association {
                    table,
                    source_column,
                    target_column,
                } => {
                    let link = tables.entry(table.clone()).or_default();
                    link.add(source_column, source_pk);
                    link.add(target_column, target_pk);
                }
            }
        }
    }

    tables
        .iter()
        .map(|(name, table)| table.to_sql(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builtin::old_schema;

    #[test]
    fn test_old_schema_ddl() {
        let ddl = schema_ddl(&old_schema().unwrap());
        let form = ddl
            .iter()
            .find(|s| s.starts_with("CREATE TABLE IF NOT EXISTS \"form\" "))
            .unwrap();
        assert!(form.contains("\"id\" INTEGER PRIMARY KEY"));
        assert!(form.contains("\"enterer_id\" INTEGER"));
        assert!(form.contains("\"transcription\" TEXT"));

        let formfile = ddl
            .iter()
            .find(|s| s.contains("\"formfile\""))
            .unwrap();
        assert_eq!(
            formfile,
            "CREATE TABLE IF NOT EXISTS \"formfile\" (\"file_id\" INTEGER, \"form_id\" INTEGER)"
        );

        let language = ddl
            .iter()
            .find(|s| s.starts_with("CREATE TABLE IF NOT EXISTS \"language\" "))
            .unwrap();
        assert!(language.contains("\"Id\" TEXT PRIMARY KEY"));
    }

    #[test]
    fn test_reverse_column_declared_once() {
        let ddl = schema_ddl(&old_schema().unwrap());
        let translation = ddl.iter().find(|s| s.contains("\"translation\"")).unwrap();
        assert_eq!(translation.matches("\"form_id\"").count(), 1);
    }
}
