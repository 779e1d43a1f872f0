//! SQL Query Builder.
//!
//! Renders a [`LogicalQueryPlan`] into a parameterized SQLite `SELECT`.
//!
//! - Every traversal becomes a correlated `EXISTS` subquery, one per leaf.
//!   The `FROM` clause holds the root table only, so a root row is never
//!   repeated and `NOT` over a traversal matches roots with no related row.
//! - Table and column names come from the registry only; every operand is a
//!   bound `?N` parameter.

use std::collections::HashMap;

use crate::error::RenderError;
use crate::filter::Comparison;
use crate::planner::{AliasId, ColumnRef, LogicalQueryPlan, Predicate, ScalarValue};
use crate::schema::{EntityDef, JoinKey, RelationDef, SchemaRegistry};

/// Text format of datetime values in the store.
pub const DATETIME_STORAGE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Text format of date values in the store.
pub const DATE_STORAGE_FORMAT: &str = "%Y-%m-%d";

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL text.
    pub sql: String,
    /// Bound parameter values, in placeholder order.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl From<&ScalarValue> for SqlParam {
    fn from(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Null => SqlParam::Null,
            ScalarValue::Integer(i) => SqlParam::Integer(*i),
            ScalarValue::Float(f) => SqlParam::Float(*f),
            ScalarValue::String(s) => SqlParam::String(s.clone()),
            ScalarValue::Boolean(b) => SqlParam::Integer(i64::from(*b)),
            ScalarValue::Date(d) => SqlParam::String(d.format(DATE_STORAGE_FORMAT).to_string()),
            ScalarValue::Datetime(dt) => {
                SqlParam::String(dt.format(DATETIME_STORAGE_FORMAT).to_string())
            }
        }
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Adds a parameter and returns its placeholder.
    pub fn add_param(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("?{}", self.params.len())
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Quotes an identifier.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn comparison_sql(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Eq => "=",
        Comparison::Ne => "<>",
        Comparison::Like => "LIKE",
        Comparison::Regex => "REGEXP",
        Comparison::Lt => "<",
        Comparison::Le => "<=",
        Comparison::Gt => ">",
        Comparison::Ge => ">=",
        Comparison::In => "IN",
    }
}

/// Renders logical plans into SQL for one registry.
pub struct SqlRenderer<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> SqlRenderer<'a> {
    /// Creates a renderer.
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Renders the query returning the primary keys of matching root rows,
    /// ordered and paginated as the plan says.
    pub fn render(&self, plan: &LogicalQueryPlan) -> Result<SqlFragment, RenderError> {
        let mut ctx = RenderContext::new(self.registry, plan)?;
        let select = format!(
            "SELECT {}.{}",
            AliasId::ROOT,
            quote_ident(ctx.root.primary_key())
        );
        let from = ctx.from_clause();
        let filter = ctx.predicate(&plan.predicate)?;

        let mut sql = format!("{} FROM {} WHERE {}", select, from, filter);

        if !plan.order_by.is_empty() {
            let keys = plan
                .order_by
                .iter()
                .map(|spec| {
                    let column = ctx.column(&spec.column)?;
                    let collate = if spec.case_insensitive {
                        " COLLATE NOCASE"
                    } else {
                        ""
                    };
                    Ok(format!("{}{} {}", column, collate, spec.direction.as_sql()))
                })
                .collect::<Result<Vec<_>, RenderError>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(pagination) = &plan.pagination {
            let limit = ctx.bind(SqlParam::integer(to_i64(pagination.limit())));
            let offset = ctx.bind(SqlParam::integer(to_i64(pagination.offset())));
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        Ok(ctx.finish(sql))
    }

    /// Renders a query counting every matching root row, ignoring order and
    /// pagination.
    pub fn render_count(&self, plan: &LogicalQueryPlan) -> Result<SqlFragment, RenderError> {
        let mut ctx = RenderContext::new(self.registry, plan)?;
        let from = ctx.from_clause();
        let filter = ctx.predicate(&plan.predicate)?;
        Ok(ctx.finish(format!("SELECT COUNT(*) FROM {} WHERE {}", from, filter)))
    }
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// A join entry bound to its registry definitions. Every traversal starts
/// at the root, so the source row is always `t0`.
struct JoinBinding<'a> {
    source: &'a EntityDef,
    relation: &'a RelationDef,
    target: &'a EntityDef,
}

struct RenderContext<'a> {
    root: &'a EntityDef,
    joins: Vec<(AliasId, JoinBinding<'a>)>,
    by_alias: HashMap<AliasId, usize>,
    out: SqlFragment,
}

impl<'a> RenderContext<'a> {
    fn new(registry: &'a SchemaRegistry, plan: &LogicalQueryPlan) -> Result<Self, RenderError> {
        let entity = |name: &str| {
            registry
                .entity(name)
                .ok_or_else(|| RenderError::UnknownEntity {
                    entity: name.to_string(),
                })
        };

        let root = entity(&plan.root_entity)?;
        let mut joins = Vec::with_capacity(plan.joins.len());
        let mut by_alias = HashMap::new();

        for entry in &plan.joins {
            let source = entity(&entry.source_entity)?;
            let relation =
                source
                    .relation(&entry.relation_name)
                    .ok_or_else(|| RenderError::UnknownRelation {
                        entity: entry.source_entity.clone(),
                        relation: entry.relation_name.clone(),
                    })?;
            let target = entity(&relation.target)?;
            by_alias.insert(entry.alias, joins.len());
            joins.push((
                entry.alias,
                JoinBinding {
                    source,
                    relation,
                    target,
                },
            ));
        }

        Ok(Self {
            root,
            joins,
            by_alias,
            out: SqlFragment::new(""),
        })
    }

    fn finish(mut self, sql: String) -> SqlFragment {
        self.out.sql = sql;
        self.out
    }

    fn bind(&mut self, param: SqlParam) -> String {
        self.out.add_param(param)
    }

    fn binding(&self, alias: AliasId) -> Result<&JoinBinding<'a>, RenderError> {
        self.by_alias
            .get(&alias)
            .map(|i| &self.joins[*i].1)
            .ok_or_else(|| RenderError::UnknownAlias {
                alias: alias.to_string(),
            })
    }

    fn entity_of(&self, alias: AliasId) -> Result<&'a EntityDef, RenderError> {
        if alias.is_root() {
            Ok(self.root)
        } else {
            self.binding(alias).map(|b| b.target)
        }
    }

    /// `"form" AS t0`.
    fn from_clause(&self) -> String {
        format!("{} AS {}", quote_ident(self.root.table()), AliasId::ROOT)
    }

    fn column(&self, column: &ColumnRef) -> Result<String, RenderError> {
        let entity = self.entity_of(column.alias)?;
        if entity.attribute(&column.attribute).is_none() {
            return Err(RenderError::UnknownColumn {
                entity: entity.name().to_string(),
                attribute: column.attribute.clone(),
            });
        }
        Ok(format!("{}.{}", column.alias, quote_ident(&column.attribute)))
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String, RenderError> {
        Ok(match predicate {
            Predicate::Compare {
                column,
                comparison,
                value,
            } => {
                let column = self.column(column)?;
                let placeholder = self.bind(SqlParam::from(value));
                format!("{} {} {}", column, comparison_sql(*comparison), placeholder)
            }
            Predicate::In { column, values } => {
                let column = self.column(column)?;
                if values.is_empty() {
                    "0".to_string()
                } else {
                    let placeholders: Vec<String> = values
                        .iter()
                        .map(|v| self.bind(SqlParam::from(v)))
                        .collect();
                    format!("{} IN ({})", column, placeholders.join(", "))
                }
            }
            Predicate::IsNull { column } => format!("{} IS NULL", self.column(column)?),
            Predicate::IsNotNull { column } => format!("{} IS NOT NULL", self.column(column)?),
            Predicate::Exists { alias, predicate } => {
                let inner = self.predicate(predicate)?;
                let binding = self.binding(*alias)?;
                format!("EXISTS ({} AND ({}))", correlated_select(*alias, binding), inner)
            }
            Predicate::Related { alias, exists } => {
                let binding = self.binding(*alias)?;
                match &binding.relation.join {
                    JoinKey::ForeignKey { column } => format!(
                        "{}.{} IS {}NULL",
                        AliasId::ROOT,
                        quote_ident(column),
                        if *exists { "NOT " } else { "" }
                    ),
                    _ => format!(
                        "{}EXISTS ({})",
                        if *exists { "" } else { "NOT " },
                        correlated_select(*alias, binding)
                    ),
                }
            }
            Predicate::Not { predicate } => format!("NOT ({})", self.predicate(predicate)?),
            Predicate::And { predicates } => self.join_predicates(predicates, " AND ", "1")?,
            Predicate::Or { predicates } => self.join_predicates(predicates, " OR ", "0")?,
        })
    }

    fn join_predicates(
        &mut self,
        predicates: &[Predicate],
        separator: &str,
        empty: &str,
    ) -> Result<String, RenderError> {
        if predicates.is_empty() {
            return Ok(empty.to_string());
        }
        let parts = predicates
            .iter()
            .map(|p| self.predicate(p).map(|sql| format!("({})", sql)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(separator))
    }
}

/// `SELECT 1 FROM ... WHERE <correlation to the source row>` for a traversal,
/// leaving room for an `AND` condition.
fn correlated_select(alias: AliasId, binding: &JoinBinding<'_>) -> String {
    let source_pk = format!(
        "{}.{}",
        AliasId::ROOT,
        quote_ident(binding.source.primary_key())
    );
    let target = quote_ident(binding.target.table());

    match &binding.relation.join {
        JoinKey::Reverse { column } => format!(
            "SELECT 1 FROM {} AS {} WHERE {}.{} = {}",
            target,
            alias,
            alias,
            quote_ident(column),
            source_pk
        ),
        JoinKey::Association {
            table,
            source_column,
            target_column,
        } => {
            let link = format!("{}_link", alias);
            format!(
                "SELECT 1 FROM {} AS {} JOIN {} AS {} ON {}.{} = {}.{} WHERE {}.{} = {}",
                quote_ident(table),
                link,
                target,
                alias,
                alias,
                quote_ident(binding.target.primary_key()),
                link,
                quote_ident(target_column),
                link,
                quote_ident(source_column),
                source_pk
            )
        }
        JoinKey::ForeignKey { column } => format!(
            "SELECT 1 FROM {} AS {} WHERE {}.{} = {}.{}",
            target,
            alias,
            alias,
            quote_ident(binding.target.primary_key()),
            AliasId::ROOT,
            quote_ident(column)
        ),
    }
}
