use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::scope::Scope;
use super::types::{FilterOrderInfo, ListParams, SortDirection, SqlResult};
use crate::config;
use crate::tree::Tier;

/// Listing query over a single table.
///
/// Conditions are rendered as they are added, each with its own `$n`
/// placeholders, and joined with AND.
#[derive(Debug)]
pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    search_columns: Vec<String>,
    sortable: Vec<String>,
    conditions: Vec<String>,
    params: Vec<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i64>,
    offset: Option<i64>,
    page: i64,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            select_columns: vec![],
            search_columns: vec![],
            sortable: vec![],
            conditions: vec![],
            params: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
            page: 1,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn select(&mut self, columns: &[&str]) -> Result<&mut Self, FilterError> {
        self.select_columns = validated(columns)?;
        Ok(self)
    }

    /// Columns matched (ILIKE, any of them) by the `search` term.
    pub fn searchable(&mut self, columns: &[&str]) -> Result<&mut Self, FilterError> {
        self.search_columns = validated(columns)?;
        Ok(self)
    }

    /// Columns a caller may sort by. The first one is the default order.
    pub fn sortable(&mut self, columns: &[&str]) -> Result<&mut Self, FilterError> {
        self.sortable = validated(columns)?;
        if self.order_data.is_empty() {
            if let Some(first) = self.sortable.first() {
                self.order_data = vec![FilterOrderInfo {
                    column: first.clone(),
                    sort: SortDirection::Asc,
                }];
            }
        }
        Ok(self)
    }

    /// Restrict rows of `tier` to what `scope` can see.
    pub fn scope(&mut self, scope: &Scope, tier: Tier) -> &mut Self {
        let (clause, params) = scope.clause(tier, self.params.len() + 1);
        if clause != "1=1" {
            self.conditions.push(clause);
            self.params.extend(params);
        }
        self
    }

    pub fn where_eq(&mut self, column: &str, value: impl Into<Value>) -> Result<&mut Self, FilterError> {
        if !is_identifier(column) {
            return Err(FilterError::InvalidColumn(column.to_string()));
        }
        let placeholder = self.push_param(value.into());
        self.conditions.push(format!("\"{}\" = {}", column, placeholder));
        Ok(self)
    }

    pub fn search(&mut self, term: &str) -> &mut Self {
        let term = term.trim();
        if term.is_empty() || self.search_columns.is_empty() {
            return self;
        }
        let placeholder = self.push_param(Value::String(format!("%{}%", escape_like(term))));
        let any = self
            .search_columns
            .iter()
            .map(|c| format!("\"{}\" ILIKE {}", c, placeholder))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({})", any));
        self
    }

    pub fn order(&mut self, order_spec: &str) -> Result<&mut Self, FilterError> {
        let allowed: Vec<&str> = self.sortable.iter().map(String::as_str).collect();
        let order_info = FilterOrder::validate_and_parse(order_spec, &allowed)?;
        if !order_info.is_empty() {
            self.order_data = order_info;
        }
        Ok(self)
    }

    pub fn limit(&mut self, limit: i64, offset: Option<i64>) -> Result<&mut Self, FilterError> {
        if limit < 0 {
            return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
        }
        if matches!(offset, Some(off) if off < 0) {
            return Err(FilterError::InvalidLimit("Offset must be non-negative".to_string()));
        }
        self.limit = Some(limit);
        self.offset = offset;
        Ok(self)
    }

    /// Apply search, sort and pagination from the query string. `perPage` is
    /// capped at the configured maximum.
    pub fn assign(&mut self, params: &ListParams) -> Result<&mut Self, FilterError> {
        if let Some(search) = &params.search {
            self.search(search);
        }
        if let Some(sort) = &params.sort {
            self.order(sort)?;
        }

        let api = &config::config().api;
        let page = params.page.unwrap_or(1);
        if page < 1 {
            return Err(FilterError::InvalidPage(format!("page must be at least 1, got {}", page)));
        }
        let per_page = params.per_page.unwrap_or(api.default_per_page);
        if per_page < 1 {
            return Err(FilterError::InvalidLimit(format!("perPage must be at least 1, got {}", per_page)));
        }
        let per_page = if per_page > api.max_per_page {
            tracing::debug!("perPage {} exceeds max {}, capping", per_page, api.max_per_page);
            api.max_per_page
        } else {
            per_page
        };

        let offset = (page - 1)
            .checked_mul(per_page)
            .ok_or_else(|| FilterError::InvalidPage(format!("page {} is out of range", page)))?;

        self.page = page;
        self.limit(per_page, Some(offset))?;
        Ok(self)
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn per_page(&self) -> i64 {
        self.limit.unwrap_or_else(|| config::config().api.default_per_page)
    }

    pub fn to_sql(&self) -> SqlResult {
        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table_name),
            self.build_where_clause(),
            FilterOrder::generate(&self.order_data),
            self.build_limit_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult {
            query,
            params: self.params.clone(),
        }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        let query = [
            format!("SELECT COUNT(*) AS count FROM \"{}\"", self.table_name),
            self.build_where_clause(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        SqlResult {
            query,
            params: self.params.clone(),
        }
    }

    fn push_param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() {
            "*".to_string()
        } else {
            self.select_columns
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", ")
        }
    }

    fn build_where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            _ => String::new(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn validated(columns: &[&str]) -> Result<Vec<String>, FilterError> {
    columns
        .iter()
        .map(|c| {
            if is_identifier(c) {
                Ok(c.to_string())
            } else {
                Err(FilterError::InvalidColumn(c.to_string()))
            }
        })
        .collect()
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hattra_filter() -> Filter {
        let mut filter = Filter::new("hattra").unwrap();
        filter.searchable(&["nama", "ijin_hattra"]).unwrap();
        filter.sortable(&["id_hattra", "nama"]).unwrap();
        filter
    }

    #[test]
    fn rejects_bad_identifiers() {
        assert!(Filter::new("hattra; DROP").is_err());
        assert!(Filter::new("").is_err());
        let mut filter = Filter::new("users").unwrap();
        assert!(filter.select(&["username", "pass word"]).is_err());
        assert!(filter.where_eq("role\"", "admin").is_err());
    }

    #[test]
    fn plain_listing_orders_by_default_column() {
        let filter = hattra_filter();
        let sql = filter.to_sql();
        assert_eq!(sql.query, "SELECT * FROM \"hattra\" ORDER BY \"id_hattra\" ASC");
        assert!(sql.params.is_empty());
    }

    #[test]
    fn scope_search_and_page_share_one_placeholder_sequence() {
        let mut filter = hattra_filter();
        filter.scope(&Scope::Under(Tier::Kestrad, "kestrad_a".into()), Tier::Hattra);
        filter
            .assign(&ListParams {
                search: Some("pijat".into()),
                page: Some(3),
                per_page: Some(5),
                sort: Some("nama desc".into()),
            })
            .unwrap();

        let sql = filter.to_sql();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"hattra\" WHERE id_layanan IN (SELECT id_layanan FROM layanan WHERE username_kestrad = $1) \
             AND (\"nama\" ILIKE $2 OR \"ijin_hattra\" ILIKE $2) ORDER BY \"nama\" DESC LIMIT 5 OFFSET 10"
        );
        assert_eq!(sql.params, vec![Value::from("kestrad_a"), Value::from("%pijat%")]);

        let count = filter.to_count_sql();
        assert!(count.query.starts_with("SELECT COUNT(*) AS count FROM \"hattra\" WHERE id_layanan IN"));
        assert!(!count.query.contains("LIMIT"));
        assert_eq!(count.params.len(), 2);
        assert_eq!(filter.page(), 3);
        assert_eq!(filter.per_page(), 5);
    }

    #[test]
    fn per_page_is_capped_and_page_validated() {
        let mut filter = hattra_filter();
        let max = config::config().api.max_per_page;
        filter
            .assign(&ListParams { per_page: Some(max + 500), ..Default::default() })
            .unwrap();
        assert_eq!(filter.per_page(), max);

        let mut filter = hattra_filter();
        assert!(matches!(
            filter.assign(&ListParams { page: Some(0), ..Default::default() }),
            Err(FilterError::InvalidPage(_))
        ));
    }

    #[test]
    fn huge_page_is_rejected_instead_of_overflowing() {
        let mut filter = hattra_filter();
        let result = filter.assign(&ListParams {
            page: Some(i64::MAX),
            per_page: Some(10),
            ..Default::default()
        });
        assert!(matches!(result, Err(FilterError::InvalidPage(_))));

        let mut filter = hattra_filter();
        let result = filter.assign(&ListParams { page: Some(i64::MAX), per_page: Some(1), ..Default::default() });
        assert!(result.is_ok());
    }

    #[test]
    fn unsortable_column_is_an_error() {
        let mut filter = hattra_filter();
        let err = filter
            .assign(&ListParams { sort: Some("verified".into()), ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, FilterError::UnsortableColumn(_)));
    }

    #[test]
    fn search_escapes_like_wildcards_and_skips_blank_terms() {
        let mut filter = hattra_filter();
        filter.search("   ");
        assert!(filter.to_sql().params.is_empty());

        filter.search("50%_off");
        assert_eq!(filter.to_sql().params, vec![Value::from("%50\\%\\_off%")]);
    }
}
