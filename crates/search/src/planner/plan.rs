//! Logical Query Plan.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SearchError, SearchResult};

use super::joins::JoinPlanEntry;
use super::order::OrderSpec;
use super::predicate::Predicate;

/// The compiled form of one search request.
///
/// Store-agnostic: it names entities, relations and attributes, never tables
/// or columns. Executors map it onto their storage (see [`crate::sql`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalQueryPlan {
    pub root_entity: String,
    pub predicate: Predicate,
    pub joins: Vec<JoinPlanEntry>,
    pub order_by: Vec<OrderSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Page-based pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u64,
    pub items_per_page: u64,
}

impl Pagination {
    /// Rows to skip. A page of 0 (possible in a deserialized plan) reads as
    /// the first page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.items_per_page)
    }

    /// Rows to return.
    pub fn limit(&self) -> u64 {
        self.items_per_page
    }

    /// Reads `{"page": n, "itemsPerPage": m}` (or `items_per_page`).
    ///
    /// `null` means no pagination. Both values must be positive integers and
    /// `itemsPerPage` may not exceed `max_items_per_page`.
    pub fn from_value(value: &Value, max_items_per_page: u64) -> SearchResult<Option<Self>> {
        if value.is_null() {
            return Ok(None);
        }
        let object = value.as_object().ok_or_else(|| SearchError::InvalidPagination {
            field: "paginator".to_string(),
            reason: "must be an object".to_string(),
        })?;

        let page = positive(object.get("page"), "page")?;
        let items = object
            .get("itemsPerPage")
            .or_else(|| object.get("items_per_page"));
        let items_per_page = positive(items, "items_per_page")?;

        if items_per_page > max_items_per_page {
            return Err(SearchError::InvalidPagination {
                field: "items_per_page".to_string(),
                reason: format!("may not exceed {}", max_items_per_page),
            });
        }

        Ok(Some(Self {
            page,
            items_per_page,
        }))
    }
}

fn positive(value: Option<&Value>, field: &str) -> SearchResult<u64> {
    value
        .and_then(Value::as_u64)
        .filter(|n| *n >= 1)
        .ok_or_else(|| SearchError::InvalidPagination {
            field: field.to_string(),
            reason: "must be an integer greater than 0".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offset_and_limit() {
        let p = Pagination::from_value(&json!({"page": 3, "itemsPerPage": 10}), 1000)
            .unwrap()
            .unwrap();
        assert_eq!(p.offset(), 20);
        assert_eq!(p.limit(), 10);
    }

    #[test]
    fn test_page_zero_offset_does_not_underflow() {
        let p = Pagination {
            page: 0,
            items_per_page: 10,
        };
        assert_eq!(p.offset(), 0);

        let p: Pagination = serde_json::from_value(json!({"page": 0, "itemsPerPage": 25})).unwrap();
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 25);
    }

    #[test]
    fn test_snake_case_alias() {
        let p = Pagination::from_value(&json!({"page": 1, "items_per_page": 5}), 1000)
            .unwrap()
            .unwrap();
        assert_eq!(p.items_per_page, 5);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_null_means_unpaginated() {
        assert!(Pagination::from_value(&Value::Null, 1000).unwrap().is_none());
    }

    #[test]
    fn test_invalid_values() {
        for bad in [
            json!({"page": 0, "itemsPerPage": 10}),
            json!({"page": -1, "itemsPerPage": 10}),
            json!({"page": "1", "itemsPerPage": 10}),
            json!({"page": 1.5, "itemsPerPage": 10}),
            json!({"page": 1}),
            json!([1, 10]),
        ] {
            let err = Pagination::from_value(&bad, 1000).unwrap_err();
            assert!(matches!(err, SearchError::InvalidPagination { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_page_size_cap() {
        let err = Pagination::from_value(&json!({"page": 1, "itemsPerPage": 5000}), 1000).unwrap_err();
        assert_eq!(err.field_key(), "paginator.items_per_page");
    }
}
