use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub per_page: i64,
    pub current_page: i64,
    pub last_page: i64,
}

impl Pagination {
    pub fn new(total: i64, per_page: i64, current_page: i64) -> Self {
        let per_page = per_page.max(1);
        let last_page = ((total + per_page - 1) / per_page).max(1);
        Self {
            total,
            per_page,
            current_page,
            last_page,
        }
    }
}

/// One page of a listing, the shape every list endpoint returns.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub results: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, total: i64, per_page: i64, current_page: i64) -> Self {
        Self {
            results,
            pagination: Pagination::new(total, per_page, current_page),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_rounds_up_and_is_at_least_one() {
        assert_eq!(Pagination::new(0, 10, 1).last_page, 1);
        assert_eq!(Pagination::new(10, 10, 1).last_page, 1);
        assert_eq!(Pagination::new(11, 10, 2).last_page, 2);
        assert_eq!(Pagination::new(95, 20, 1).last_page, 5);
    }

    #[test]
    fn serializes_in_camel_case() {
        let page = Page::new(vec!["a"], 1, 10, 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["results"], serde_json::json!(["a"]));
        assert_eq!(
            json["pagination"],
            serde_json::json!({"total": 1, "perPage": 10, "currentPage": 1, "lastPage": 1})
        );
    }
}
