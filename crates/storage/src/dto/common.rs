use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

pub(crate) fn default_page() -> u32 {
    1
}

pub(crate) fn default_limit() -> u32 {
    50
}

impl PaginationParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.page < 1 {
            return Err("page must be >= 1".to_string());
        }
        if self.limit < 1 || self.limit > 100 {
            return Err("limit must be between 1 and 100".to_string());
        }
        Ok(())
    }

    /// Row offset for the query, in i64 so an absurd `page` cannot
    /// overflow on the way to a SQL bind.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.limit)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub total_records: i64,
    pub current_page: u32,
    pub total_pages: u32,
    pub records_per_page: u32,
}

impl PaginationMeta {
    pub fn new(page: u32, limit: u32, total_records: i64) -> Self {
        let total_pages = ((total_records as f64) / (limit as f64)).ceil() as u32;
        Self {
            total_records,
            current_page: page,
            total_pages,
            records_per_page: limit,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u32, limit: u32, total_records: i64) -> Self {
        Self {
            data,
            meta: PaginationMeta::new(page, limit, total_records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let meta = PaginationMeta::new(1, 10, 21);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(meta.records_per_page, 10);
    }

    #[test]
    fn test_empty_result_has_zero_pages() {
        let meta = PaginationMeta::new(1, 10, 0);
        assert_eq!(meta.total_pages, 0);
    }

    #[test]
    fn test_offset() {
        let params = PaginationParams { page: 3, limit: 20 };
        assert_eq!(params.offset(), 40);
    }

    #[test]
    fn test_offset_huge_page_does_not_overflow() {
        let params = PaginationParams {
            page: u32::MAX,
            limit: 100,
        };
        assert_eq!(params.offset(), i64::from(u32::MAX - 1) * 100);

        // page 0 is rejected by validate(), but offset() alone must not wrap.
        let params = PaginationParams { page: 0, limit: 100 };
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_validate_bounds() {
        assert!(PaginationParams { page: 0, limit: 10 }.validate().is_err());
        assert!(PaginationParams { page: 1, limit: 0 }.validate().is_err());
        assert!(PaginationParams { page: 1, limit: 101 }.validate().is_err());
        assert!(PaginationParams { page: 1, limit: 100 }.validate().is_ok());
    }
}
