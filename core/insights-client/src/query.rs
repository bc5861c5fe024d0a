//! FILENAME: core/insights-client/src/query.rs
//! Query string construction.
//!
//! Parameters are always emitted in the same order regardless of the order
//! they were set in, so identical filters produce identical URLs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::GlobalFilters;

/// Platform value meaning "no platform filter".
pub const ALL_PLATFORMS: &str = "All";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Every parameter the insights API understands, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryParam {
    StartDate,
    EndDate,
    Platform,
    Brand,
    City,
    Format,
    Category,
    FilterType,
}

impl QueryParam {
    pub fn name(self) -> &'static str {
        match self {
            QueryParam::StartDate => "startDate",
            QueryParam::EndDate => "endDate",
            QueryParam::Platform => "platform",
            QueryParam::Brand => "brand",
            QueryParam::City => "city",
            QueryParam::Format => "format",
            QueryParam::Category => "category",
            QueryParam::FilterType => "filterType",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<QueryParam, String>,
}

impl QueryParams {
    pub fn new() -> Self {
        QueryParams::default()
    }

    pub fn from_filters(filters: &GlobalFilters) -> Self {
        let mut params = QueryParams::new();
        if let Some(date) = filters.start_date {
            params.set(QueryParam::StartDate, date.format(DATE_FORMAT).to_string());
        }
        if let Some(date) = filters.end_date {
            params.set(QueryParam::EndDate, date.format(DATE_FORMAT).to_string());
        }
        if let Some(platform) = &filters.platform {
            params.set(QueryParam::Platform, platform.as_str());
        }
        params.set_opt(QueryParam::Brand, filters.brand.as_deref());
        params.set_opt(QueryParam::City, filters.city.as_deref());
        params.set_opt(QueryParam::Format, filters.format.as_deref());
        params.set_opt(QueryParam::Category, filters.category.as_deref());
        params
    }

    /// Sets (or replaces) a parameter. Blank values and the "All" platform
    /// remove it instead.
    pub fn set(&mut self, param: QueryParam, value: impl Into<String>) {
        let value: String = value.into();
        let value = value.trim();
        let skip = value.is_empty()
            || (param == QueryParam::Platform && value.eq_ignore_ascii_case(ALL_PLATFORMS));
        if skip {
            self.values.remove(&param);
        } else {
            self.values.insert(param, value.to_string());
        }
    }

    pub fn set_opt(&mut self, param: QueryParam, value: Option<&str>) {
        match value {
            Some(v) => self.set(param, v),
            None => {
                self.values.remove(&param);
            }
        }
    }

    pub fn with(mut self, param: QueryParam, value: impl Into<String>) -> Self {
        self.set(param, value);
        self
    }

    pub fn get(&self, param: QueryParam) -> Option<&str> {
        self.values.get(&param).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name/value pairs in emission order, ready for `RequestBuilder::query`.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        self.values
            .iter()
            .map(|(param, value)| (param.name(), value.as_str()))
            .collect()
    }
}
