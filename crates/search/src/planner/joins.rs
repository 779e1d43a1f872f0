//! Join Planner.
//!
//! Gives one alias to each distinct `(source entity, relation)` traversal in a
//! resolved filter. Aliases are numbered in depth-first, left-to-right
//! discovery order starting at 1; alias 0 is the root entity.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::{Cardinality, RelationDef};

use super::resolver::{ResolvedExpr, ResolvedLeaf, Traversal};

/// Alias of one table occurrence in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasId(pub u32);

impl AliasId {
    /// The searched entity.
    pub const ROOT: AliasId = AliasId(0);

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }
}

impl fmt::Display for AliasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One traversal in the join plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPlanEntry {
    pub alias: AliasId,
    pub source_entity: String,
    pub relation_name: String,
    pub target_entity: String,
    pub cardinality: Cardinality,
}

/// Collects traversals and hands out their aliases.
#[derive(Debug, Default)]
pub struct JoinPlanner {
    entries: Vec<JoinPlanEntry>,
    index: HashMap<(String, String), AliasId>,
}

impl JoinPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans the joins of `expr`.
    pub fn plan(expr: &ResolvedExpr) -> Self {
        let mut planner = Self::new();
        planner.collect(expr);
        planner
    }

    fn collect(&mut self, expr: &ResolvedExpr) {
        match expr {
            ResolvedExpr::Leaf(leaf) => {
                if let Some(traversal) = leaf_traversal(leaf) {
                    self.alias_for(traversal);
                }
            }
            ResolvedExpr::Not(child) => self.collect(child),
            ResolvedExpr::And(children) | ResolvedExpr::Or(children) => {
                for child in children {
                    self.collect(child);
                }
            }
        }
    }

    /// Returns the alias of `traversal`, allocating one on first use.
    pub fn alias_for(&mut self, traversal: &Traversal) -> AliasId {
        self.alias_for_relation(&traversal.source, &traversal.relation)
    }

    fn alias_for_relation(&mut self, source: &str, relation: &RelationDef) -> AliasId {
        let key = (source.to_string(), relation.name.clone());
        if let Some(alias) = self.index.get(&key) {
            return *alias;
        }

        let alias = AliasId(self.entries.len() as u32 + 1);
        self.entries.push(JoinPlanEntry {
            alias,
            source_entity: source.to_string(),
            relation_name: relation.name.clone(),
            target_entity: relation.target.clone(),
            cardinality: relation.cardinality,
        });
        self.index.insert(key, alias);
        alias
    }

    /// Returns the alias already allocated to a traversal.
    pub fn lookup(&self, source: &str, relation: &str) -> Option<AliasId> {
        self.index
            .get(&(source.to_string(), relation.to_string()))
            .copied()
    }

    pub fn entries(&self) -> &[JoinPlanEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<JoinPlanEntry> {
        self.entries
    }
}

fn leaf_traversal(leaf: &ResolvedLeaf) -> Option<&Traversal> {
    match leaf {
        ResolvedLeaf::Scalar { via, .. } => via.as_ref(),
        ResolvedLeaf::Presence { traversal, .. } => Some(traversal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterParser;
    use crate::planner::resolver::Resolver;
    use crate::schema::builtin::old_schema;
    use serde_json::{Value, json};

    fn plan(filter: Value) -> Vec<JoinPlanEntry> {
        let registry = old_schema().unwrap();
        let root = registry.searchable_entity("Form").unwrap();
        let expr = FilterParser::new(32, 256).parse(&filter).unwrap();
        let resolved = Resolver::new(&registry, root, true).resolve(&expr).unwrap();
        JoinPlanner::plan(&resolved).into_entries()
    }

    #[test]
    fn test_same_relation_shares_alias() {
        let joins = plan(json!(["and", [
            ["Form", "enterer", "first_name", "=", "Jo"],
            ["Form", "enterer", "last_name", "=", "Smith"]
        ]]));
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].alias, AliasId(1));
        assert_eq!(joins[0].relation_name, "enterer");
        assert_eq!(joins[0].cardinality, Cardinality::ToOne);
    }

    #[test]
    fn test_relations_to_same_target_get_distinct_aliases() {
        let joins = plan(json!(["or", [
            ["Form", "enterer", "first_name", "=", "Jo"],
            ["Form", "elicitor", "first_name", "=", "Jo"]
        ]]));
        assert_eq!(joins.len(), 2);
        assert_eq!(joins[0].target_entity, "User");
        assert_eq!(joins[1].target_entity, "User");
        assert_ne!(joins[0].alias, joins[1].alias);
    }

    #[test]
    fn test_discovery_order_is_depth_first() {
        let joins = plan(json!(["and", [
            ["not", ["Form", "files", "=", null]],
            ["or", [
                ["Form", "tags", "name", "=", "x"],
                ["Form", "transcription", "like", "%a%"]
            ]],
            ["Form", "File", "=", 3]
        ]]));
        let names: Vec<&str> = joins.iter().map(|j| j.relation_name.as_str()).collect();
        assert_eq!(names, vec!["files", "tags"]);
        assert_eq!(joins[0].alias, AliasId(1));
        assert_eq!(joins[1].alias, AliasId(2));
    }

    #[test]
    fn test_direct_attributes_need_no_joins() {
        assert!(plan(json!(["Form", "transcription", "like", "%a%"])).is_empty());
    }

    #[test]
    fn test_alias_display_and_lookup() {
        let registry = old_schema().unwrap();
        let form = registry.entity("Form").unwrap();
        let mut planner = JoinPlanner::new();
        let traversal = Traversal {
            source: "Form".to_string(),
            relation: form.relation("tags").unwrap().clone(),
        };
        let alias = planner.alias_for(&traversal);
        assert_eq!(alias.to_string(), "t1");
        assert_eq!(planner.lookup("Form", "tags"), Some(alias));
        assert_eq!(planner.lookup("Form", "files"), None);
        assert_eq!(AliasId::ROOT.to_string(), "t0");
    }
}
