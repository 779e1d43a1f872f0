//! Search compiler entry point.
//!
//! [`SearchCompiler`] ties the stages together: it parses the request,
//! resolves it against the shared registry, plans joins, lowers the predicate,
//! compiles the ordering and returns one [`LogicalQueryPlan`]. Compilation is
//! synchronous and pure; the compiler can be shared freely across threads.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::CompilerConfig;
use crate::error::{SearchError, SearchResult, render_expression};
use crate::filter::{FilterParser, parse_order_by};
use crate::parameters::SearchParameters;
use crate::planner::{
    JoinPlanner, LogicalQueryPlan, Pagination, PredicateCompiler, Resolver, compile_order_by,
};
use crate::schema::{EntityDef, SchemaRegistry};

/// Compiles search requests against a schema registry.
#[derive(Debug, Clone)]
pub struct SearchCompiler {
    registry: Arc<SchemaRegistry>,
    config: CompilerConfig,
}

impl SearchCompiler {
    /// Creates a compiler with the default configuration.
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, CompilerConfig::default())
    }

    /// Creates a compiler with the given configuration.
    pub fn with_config(registry: Arc<SchemaRegistry>, config: CompilerConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compiles a full request body:
    ///
    /// ```json
    /// {
    ///   "query": {"filter": [...], "orderBy": [...]},
    ///   "paginator": {"page": 1, "itemsPerPage": 10}
    /// }
    /// ```
    ///
    /// `order_by` and `items_per_page` are accepted as aliases.
    pub fn compile_request(&self, root: &str, request: &Value) -> SearchResult<LogicalQueryPlan> {
        let query = request.get("query").unwrap_or(&Value::Null);
        let filter = query
            .get("filter")
            .filter(|f| !f.is_null())
            .ok_or(SearchError::MissingFilter)
            .inspect_err(|_| warn!(root, "Search request without query.filter"))?;
        let order_by = query
            .get("orderBy")
            .or_else(|| query.get("order_by"))
            .unwrap_or(&Value::Null);
        let pagination = Pagination::from_value(
            request.get("paginator").unwrap_or(&Value::Null),
            self.config.max_items_per_page,
        )?;

        self.compile(root, filter, order_by, pagination)
    }

    /// Compiles a filter and ordering over `root`.
    pub fn compile(
        &self,
        root: &str,
        filter: &Value,
        order_by: &Value,
        pagination: Option<Pagination>,
    ) -> SearchResult<LogicalQueryPlan> {
        self.compile_inner(root, filter, order_by, pagination)
            .inspect(|plan| {
                debug!(
                    root,
                    joins = plan.joins.len(),
                    order_keys = plan.order_by.len(),
                    paginated = plan.pagination.is_some(),
                    "Compiled search"
                )
            })
            .inspect_err(|e| debug!(root, code = e.code(), error = %e, "Search rejected"))
    }

    fn compile_inner(
        &self,
        root: &str,
        filter: &Value,
        order_by: &Value,
        pagination: Option<Pagination>,
    ) -> SearchResult<LogicalQueryPlan> {
        let root_entity = self.root_entity(root)?;

        let parser = FilterParser::new(self.config.max_depth, self.config.max_leaves);
        let expr = parser.parse(filter)?;

        let resolver = Resolver::new(&self.registry, root_entity, self.config.normalize_strings);
        let resolved = resolver.resolve(&expr)?;

        let mut joins = JoinPlanner::plan(&resolved);
        let predicate = PredicateCompiler::new(&mut joins).compile(&resolved);

        let keys = parse_order_by(order_by)?;
        let order_by = compile_order_by(&self.registry, root_entity, &keys)?;

        Ok(LogicalQueryPlan {
            root_entity: root_entity.name().to_string(),
            predicate,
            joins: joins.into_entries(),
            order_by,
            pagination,
        })
    }

    /// Describes what `entity` can be searched on.
    pub fn search_parameters(&self, entity: &str) -> SearchResult<SearchParameters> {
        self.root_entity(entity).map(SearchParameters::for_entity)
    }

    fn root_entity(&self, name: &str) -> SearchResult<&EntityDef> {
        self.registry
            .searchable_entity(name)
            .ok_or_else(|| SearchError::UnknownEntity {
                entity: name.to_string(),
                expression: render_expression(&Value::String(name.to_string())),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{AliasId, Predicate};
    use crate::schema::builtin::old_schema;
    use serde_json::json;

    fn compiler() -> SearchCompiler {
        SearchCompiler::new(Arc::new(old_schema().unwrap()))
    }

    #[test]
    fn test_compile_request() {
        let plan = compiler()
            .compile_request(
                "Form",
                &json!({
                    "query": {
                        "filter": ["Form", "enterer", "first_name", "=", "Jo"],
                        "order_by": ["Form", "transcription", "asc"]
                    },
                    "paginator": {"page": 2, "items_per_page": 25}
                }),
            )
            .unwrap();
        assert_eq!(plan.root_entity, "Form");
        assert_eq!(plan.joins.len(), 1);
        assert_eq!(plan.order_by.len(), 2);
        assert_eq!(plan.pagination.unwrap().offset(), 25);
    }

    #[test]
    fn test_missing_filter() {
        let err = compiler()
            .compile_request("Form", &json!({"query": {"orderBy": ["Form", "id", "asc"]}}))
            .unwrap_err();
        assert_eq!(err, SearchError::MissingFilter);
        assert_eq!(err.field_key(), "query.filter");
    }

    #[test]
    fn test_unknown_root() {
        let err = compiler()
            .compile("Phoneme", &json!(["Phoneme", "id", "=", 1]), &Value::Null, None)
            .unwrap_err();
        assert!(matches!(err, SearchError::UnknownEntity { .. }));
    }

    #[test]
    fn test_plan_serializes() {
        let plan = compiler()
            .compile("Form", &json!(["Form", "files", "=", null]), &Value::Null, None)
            .unwrap();
        assert_eq!(
            plan.predicate,
            Predicate::Related {
                alias: AliasId(1),
                exists: false
            }
        );
        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["rootEntity"], "Form");
        assert_eq!(json["joins"][0]["relationName"], "files");
        assert_eq!(json["predicate"]["op"], "related");
        assert!(json.get("pagination").is_none());

        let back: LogicalQueryPlan = serde_json::from_value(json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn test_search_parameters() {
        let params = compiler().search_parameters("Form").unwrap();
        assert_eq!(params.entity, "Form");
        assert!(params.attributes.iter().any(|a| a.name == "transcription"));
        let files = params.relations.iter().find(|r| r.name == "files").unwrap();
        assert!(files.default_traversal);
        assert_eq!(params.relation_table.len(), 9);

        assert!(compiler().search_parameters("Nope").is_err());
    }

    #[test]
    fn test_configured_limits() {
        let compiler = SearchCompiler::with_config(
            Arc::new(old_schema().unwrap()),
            CompilerConfig::default().with_max_leaves(1),
        );
        let err = compiler
            .compile(
                "Form",
                &json!(["or", [["Form", "id", "=", 1], ["Form", "id", "=", 2]]]),
                &Value::Null,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, SearchError::ExpressionTooComplex { .. }));
    }
}
