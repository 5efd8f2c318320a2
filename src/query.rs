// Course catalog list queries: validation, normalization, and SQL construction

use serde::Deserialize;

/// SQL query builder for the course catalog listing.
/// Builds a single parameterized SELECT with filters, sorting, and pagination.
pub struct CatalogQueryBuilder {
    where_clauses: Vec<String>,
    params: Vec<String>,
    order_clause: Option<String>,
    limit: u32,
    offset: u32,
}

impl CatalogQueryBuilder {
    pub fn new() -> Self {
        Self {
            where_clauses: vec!["is_published = TRUE".to_string()],
            params: Vec::new(),
            order_clause: None,
            limit: 10,
            offset: 0,
        }
    }

    /// Partial title match, case-insensitive
    pub fn add_search_filter(&mut self, search: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses.push(format!("title ILIKE ${}", param_index));
        self.params.push(format!("%{}%", search));
    }

    /// Exact category match, case-insensitive
    pub fn add_category_filter(&mut self, category: &str) {
        let param_index = self.params.len() + 1;
        self.where_clauses
            .push(format!("category ILIKE ${}", param_index));
        self.params.push(category.to_string());
    }

    /// Inclusive price range bounds
    pub fn add_price_range(&mut self, min: Option<f64>, max: Option<f64>) {
        if let Some(min_price) = min {
            let param_index = self.params.len() + 1;
            // params are bound as text, so the comparison needs a cast
            self.where_clauses
                .push(format!("price >= ${}::numeric", param_index));
            self.params.push(min_price.to_string());
        }

        if let Some(max_price) = max {
            let param_index = self.params.len() + 1;
            self.where_clauses
                .push(format!("price <= ${}::numeric", param_index));
            self.params.push(max_price.to_string());
        }
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let field_name = match field {
            SortField::Price => "price",
            SortField::Rating => "rating_average",
            SortField::Newest => "created_at",
        };

        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        self.order_clause = Some(format!("{} {}", field_name, order_str));
    }

    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        self.offset = (page - 1) * limit;
    }

    /// Builds the final SQL string and its bind parameters.
    /// LIMIT/OFFSET are validated integers and are inlined, not bound.
    pub fn build(&self) -> (String, Vec<String>) {
        let mut query = String::from(
            "SELECT id, instructor_id, title, slug, description, category, price, \
             is_published, enrollment_count, total_lessons, total_duration, \
             rating_average, rating_count, created_at, updated_at FROM courses",
        );

        if !self.where_clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(ref order) = self.order_clause {
            query.push_str(" ORDER BY ");
            query.push_str(order);
        }

        query.push_str(&format!(" LIMIT {}", self.limit));
        query.push_str(&format!(" OFFSET {}", self.offset));

        (query, self.params.clone())
    }
}

impl Default for CatalogQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Query parameters extracted from the HTTP request.
/// All fields optional to support flexible querying.
#[derive(Debug, Deserialize)]
pub struct CatalogQueryParams {
    /// Search term for partial title matching (case-insensitive)
    pub search: Option<String>,
    /// Filter by course category (case-insensitive exact match)
    pub category: Option<String>,
    /// Minimum price filter (inclusive)
    pub min_price: Option<f64>,
    /// Maximum price filter (inclusive)
    pub max_price: Option<f64>,
    /// Sort field: "price", "rating" or "newest"
    pub sort: Option<String>,
    /// Sort order: "asc" or "desc"
    pub order: Option<String>,
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Items per page (defaults to 10, max 100)
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Rating,
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Validated and normalized catalog query parameters
#[derive(Debug)]
pub struct ValidatedQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub sort_field: Option<SortField>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug)]
pub struct QueryValidationError {
    pub message: String,
}

impl std::fmt::Display for QueryValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryValidationError {}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    /// Validates and normalizes catalog query parameters
    pub fn validate(params: CatalogQueryParams) -> Result<ValidatedQuery, QueryValidationError> {
        let search = Self::normalize_string(params.search);
        let category = Self::normalize_string(params.category);

        let min_price = match params.min_price {
            Some(price) => {
                Self::validate_price(price, "min_price")?;
                Some(price)
            }
            None => None,
        };

        let max_price = match params.max_price {
            Some(price) => {
                Self::validate_price(price, "max_price")?;
                Some(price)
            }
            None => None,
        };

        if let (Some(min), Some(max)) = (min_price, max_price) {
            if max < min {
                return Err(QueryValidationError {
                    message: "max_price must be greater than or equal to min_price".to_string(),
                });
            }
        }

        let sort_field = match params.sort.as_deref() {
            None => None,
            Some("price") => Some(SortField::Price),
            Some("rating") => Some(SortField::Rating),
            Some("newest") => Some(SortField::Newest),
            Some(other) => {
                return Err(QueryValidationError {
                    message: format!("Invalid sort field: {}", other),
                })
            }
        };

        let sort_order = match params.order.as_deref() {
            None => Self::default_order(sort_field),
            Some("asc") => SortOrder::Asc,
            Some("desc") => SortOrder::Desc,
            Some(other) => {
                return Err(QueryValidationError {
                    message: format!("Invalid sort order: {}", other),
                })
            }
        };

        let page = params.page.unwrap_or(1);
        if page == 0 {
            return Err(QueryValidationError {
                message: "page must be a positive integer".to_string(),
            });
        }

        let limit = params.limit.unwrap_or(10);
        if limit == 0 || limit > 100 {
            return Err(QueryValidationError {
                message: "limit must be between 1 and 100".to_string(),
            });
        }

        Ok(ValidatedQuery {
            search,
            category,
            min_price,
            max_price,
            sort_field,
            sort_order,
            page,
            limit,
        })
    }

    /// Trims the string and maps empty results to None
    fn normalize_string(value: Option<String>) -> Option<String> {
        value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn validate_price(price: f64, field: &str) -> Result<(), QueryValidationError> {
        if price < 0.0 || !price.is_finite() {
            return Err(QueryValidationError {
                message: format!("{} must be a non-negative number", field),
            });
        }
        Ok(())
    }

    /// Ratings default to best-first, price defaults to cheapest-first
    fn default_order(field: Option<SortField>) -> SortOrder {
        match field {
            Some(SortField::Rating) | Some(SortField::Newest) => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_params() -> CatalogQueryParams {
        CatalogQueryParams {
            search: None,
            category: None,
            min_price: None,
            max_price: None,
            sort: None,
            order: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn defaults_applied() {
        let validated = QueryValidator::validate(empty_params()).unwrap();
        assert_eq!(validated.page, 1);
        assert_eq!(validated.limit, 10);
        assert!(validated.sort_field.is_none());
    }

    #[test]
    fn rejects_inverted_price_range() {
        let params = CatalogQueryParams {
            min_price: Some(50.0),
            max_price: Some(10.0),
            ..empty_params()
        };
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn rejects_unknown_sort_field() {
        let params = CatalogQueryParams {
            sort: Some("popularity".to_string()),
            ..empty_params()
        };
        assert!(QueryValidator::validate(params).is_err());
    }

    #[test]
    fn rating_sort_defaults_descending() {
        let params = CatalogQueryParams {
            sort: Some("rating".to_string()),
            ..empty_params()
        };
        let validated = QueryValidator::validate(params).unwrap();
        assert_eq!(validated.sort_order, SortOrder::Desc);
    }

    #[test]
    fn builder_produces_positional_params() {
        let mut builder = CatalogQueryBuilder::new();
        builder.add_search_filter("rust");
        builder.add_category_filter("programming");
        builder.add_price_range(Some(5.0), Some(50.0));
        builder.set_sort(SortField::Price, SortOrder::Asc);
        builder.set_pagination(2, 20);

        let (query, params) = builder.build();
        assert!(query.contains("title ILIKE $1"));
        assert!(query.contains("category ILIKE $2"));
        assert!(query.contains("price >= $3::numeric"));
        assert!(query.contains("price <= $4::numeric"));
        assert!(query.contains("ORDER BY price ASC"));
        assert!(query.contains("LIMIT 20"));
        assert!(query.contains("OFFSET 20"));
        assert_eq!(params, vec!["%rust%", "programming", "5", "50"]);
    }

    #[test]
    fn builder_always_filters_unpublished() {
        let (query, _) = CatalogQueryBuilder::new().build();
        assert!(query.contains("is_published = TRUE"));
    }
}
