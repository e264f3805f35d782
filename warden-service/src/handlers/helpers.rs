//! Shared handler plumbing: list envelopes and pagination query params.

use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use crate::models::ListOptions;

/// Envelope for paginated results.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub count: i64,
    pub results: Vec<T>,
}

/// `page`/`pageSize` query params; both optional, re-read on every call.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl ListParams {
    pub fn to_options(&self, default_page_size: i64) -> Result<ListOptions, AppError> {
        let page = self.page.unwrap_or(0);
        let page_size = self.page_size.unwrap_or(default_page_size);
        if page < 0 {
            return Err(AppError::Validation(anyhow::anyhow!(
                "querystrings.page must not be negative"
            )));
        }
        if page_size < 0 {
            return Err(AppError::Validation(anyhow::anyhow!(
                "querystrings.pageSize must not be negative"
            )));
        }
        Ok(ListOptions::new(page, page_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply() {
        let params = ListParams::default();
        let lo = params.to_options(15).unwrap();
        assert_eq!(lo.page, 0);
        assert_eq!(lo.page_size, 15);
    }

    #[test]
    fn test_explicit_values_win() {
        let params = ListParams {
            page: Some(3),
            page_size: Some(50),
        };
        let lo = params.to_options(15).unwrap();
        assert_eq!(lo.page, 3);
        assert_eq!(lo.page_size, 50);
    }

    #[test]
    fn test_negative_values_rejected() {
        assert!(ListParams {
            page: Some(-1),
            page_size: None,
        }
        .to_options(15)
        .is_err());
        assert!(ListParams {
            page: None,
            page_size: Some(-5),
        }
        .to_options(15)
        .is_err());
    }
}
