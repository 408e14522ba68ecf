//! Export filters
//!
//! The controller treats [`ExportFilter`] as an opaque JSON object and passes it
//! straight to the start operation. The typed builders below produce the body
//! shape each export kind expects; empty fields are left out so that an
//! unfiltered export sends `{}`.

use bon::Builder;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter must be a JSON object")]
    NotAnObject,

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error("at least one provider must be selected")]
    NoProviders,
}

/// Opaque key/value payload sent with an export request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportFilter(Map<String, Value>);

impl ExportFilter {
    /// Filter that exports every record
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(FilterError::NotAnObject),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Inserts the value only when it is present and not blank
    fn insert_text(&mut self, key: &str, value: Option<String>) {
        if let Some(text) = value {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                self.insert(key, trimmed);
            }
        }
    }

    fn insert_date(&mut self, key: &str, value: Option<NaiveDate>) {
        if let Some(date) = value {
            self.insert(key, date.format("%Y-%m-%d").to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

fn check_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<(), FilterError> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(FilterError::InvalidDateRange { start, end }),
        _ => Ok(()),
    }
}

/// Order recap filter
#[derive(Debug, Clone, Default, Builder)]
pub struct OrdersFilter {
    #[builder(into)]
    pub search: Option<String>,
    /// Order status codes, e.g. "0" (new) or "2" (processed)
    #[builder(default)]
    pub statuses: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TryFrom<OrdersFilter> for ExportFilter {
    type Error = FilterError;

    fn try_from(value: OrdersFilter) -> Result<Self, Self::Error> {
        check_range(value.start_date, value.end_date)?;

        let mut filter = ExportFilter::all();
        filter.insert_text("search", value.search);
        let statuses: Vec<&str> = value
            .statuses
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if !statuses.is_empty() {
            filter.insert("status", statuses.join(","));
        }
        filter.insert_date("startDate", value.start_date);
        filter.insert_date("endDate", value.end_date);
        Ok(filter)
    }
}

/// Payment recap filter
#[derive(Debug, Clone, Default, Builder)]
pub struct PaymentsFilter {
    #[builder(into)]
    pub search: Option<String>,
    /// Whether the payment has already been forwarded to the provider
    pub forwarded: Option<bool>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TryFrom<PaymentsFilter> for ExportFilter {
    type Error = FilterError;

    fn try_from(value: PaymentsFilter) -> Result<Self, Self::Error> {
        check_range(value.start_date, value.end_date)?;

        let mut filter = ExportFilter::all();
        filter.insert_text("search", value.search);
        if let Some(forwarded) = value.forwarded {
            filter.insert("is_forwarded", forwarded.to_string());
        }
        filter.insert_date("startDate", value.start_date);
        filter.insert_date("endDate", value.end_date);
        Ok(filter)
    }
}

/// Billing (tagihan) recap period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillsFilter {
    DateRange { start: NaiveDate, end: NaiveDate },
    Month { month: u32, year: i32 },
}

impl TryFrom<BillsFilter> for ExportFilter {
    type Error = FilterError;

    fn try_from(value: BillsFilter) -> Result<Self, Self::Error> {
        let mut filter = ExportFilter::all();
        match value {
            BillsFilter::DateRange { start, end } => {
                check_range(Some(start), Some(end))?;
                filter.insert_date("startDate", Some(start));
                filter.insert_date("endDate", Some(end));
            }
            BillsFilter::Month { month, year } => {
                if !(1..=12).contains(&month) {
                    return Err(FilterError::InvalidMonth(month));
                }
                filter.insert("month", month);
                filter.insert("year", year);
            }
        }
        Ok(filter)
    }
}

/// Provider transaction export filter
#[derive(Debug, Clone, Builder)]
pub struct ProviderFilter {
    /// Selected provider (mall) identifiers
    pub mall_ids: Vec<u64>,
    pub year: i32,
}

impl TryFrom<ProviderFilter> for ExportFilter {
    type Error = FilterError;

    fn try_from(value: ProviderFilter) -> Result<Self, Self::Error> {
        if value.mall_ids.is_empty() {
            return Err(FilterError::NoProviders);
        }

        let mut filter = ExportFilter::all();
        filter.insert("mall_id", value.mall_ids);
        filter.insert("year", value.year);
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_unfiltered_orders_send_empty_body() {
        let filter = ExportFilter::try_from(OrdersFilter::default()).unwrap();
        assert!(filter.is_empty());
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({}));
    }

    #[test]
    fn test_orders_filter_body() {
        let orders = OrdersFilter::builder()
            .search("  SMA 1 ")
            .statuses(vec!["0".to_string(), "2".to_string()])
            .start_date(date("2025-01-01"))
            .end_date(date("2025-01-31"))
            .build();

        let filter = ExportFilter::try_from(orders).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "search": "SMA 1",
                "status": "0,2",
                "startDate": "2025-01-01",
                "endDate": "2025-01-31"
            })
        );
    }

    #[test]
    fn test_blank_search_is_omitted() {
        let orders = OrdersFilter::builder().search("   ").build();
        let filter = ExportFilter::try_from(orders).unwrap();
        assert!(filter.get("search").is_none());
    }

    #[test]
    fn test_reversed_date_range_rejected() {
        let payments = PaymentsFilter::builder()
            .start_date(date("2025-02-01"))
            .end_date(date("2025-01-01"))
            .build();

        assert!(matches!(
            ExportFilter::try_from(payments),
            Err(FilterError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_payments_forwarded_flag_is_text() {
        let payments = PaymentsFilter::builder().forwarded(false).build();
        let filter = ExportFilter::try_from(payments).unwrap();
        assert_eq!(filter.get("is_forwarded"), Some(&json!("false")));
    }

    #[test]
    fn test_bills_month_mode() {
        let filter = ExportFilter::try_from(BillsFilter::Month { month: 3, year: 2025 }).unwrap();
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({"month": 3, "year": 2025}));

        assert_eq!(
            ExportFilter::try_from(BillsFilter::Month { month: 13, year: 2025 }),
            Err(FilterError::InvalidMonth(13))
        );
    }

    #[test]
    fn test_provider_filter_requires_selection() {
        let empty = ProviderFilter::builder().mall_ids(vec![]).year(2024).build();
        assert_eq!(ExportFilter::try_from(empty), Err(FilterError::NoProviders));

        let selected = ProviderFilter::builder().mall_ids(vec![12, 40]).year(2024).build();
        let filter = ExportFilter::try_from(selected).unwrap();
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"mall_id": [12, 40], "year": 2024})
        );
    }

    #[test]
    fn test_from_value_requires_object() {
        assert_eq!(ExportFilter::from_value(json!([1, 2])), Err(FilterError::NotAnObject));
        let filter = ExportFilter::from_value(json!({"status": ["0", "2"]})).unwrap();
        assert_eq!(filter.get("status"), Some(&json!(["0", "2"])));
    }
}
