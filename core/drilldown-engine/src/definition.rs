//! FILENAME: core/drilldown-engine/src/definition.rs
//! Drilldown Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a drilldown table:
//! - Hierarchy levels (the ordered domain enumeration)
//! - Metric keys with their semantics (percent, position, currency, ...)
//! - Heatmap threshold rules
//! - The per-view configuration tying all of the above together

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DrilldownError, Result};

// ============================================================================
// HIERARCHY LEVELS
// ============================================================================

/// An ordered hierarchy level (e.g. Category < Brand < Sku < City).
///
/// Declaration order of `ALL` is the parent/child ordering of the domain.
pub trait Level:
    Copy + Eq + Ord + Hash + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Every level of the domain, outermost first.
    const ALL: &'static [Self];

    /// Field name carried by flat API records (e.g. `"category"`).
    fn field_name(self) -> &'static str;

    /// Column header.
    fn title(self) -> &'static str;

    /// Position of this level in `ALL`.
    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|l| *l == self)
            .unwrap_or(Self::ALL.len())
    }

    fn from_field(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.field_name() == name)
    }
}

/// Levels of the pricing / discount category drilldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PricingLevel {
    Category,
    Brand,
    Sku,
    City,
}

impl Level for PricingLevel {
    const ALL: &'static [Self] = &[
        PricingLevel::Category,
        PricingLevel::Brand,
        PricingLevel::Sku,
        PricingLevel::City,
    ];

    fn field_name(self) -> &'static str {
        match self {
            PricingLevel::Category => "category",
            PricingLevel::Brand => "brand",
            PricingLevel::Sku => "sku",
            PricingLevel::City => "city",
        }
    }

    fn title(self) -> &'static str {
        match self {
            PricingLevel::Category => "Category",
            PricingLevel::Brand => "Brand",
            PricingLevel::Sku => "SKU",
            PricingLevel::City => "City",
        }
    }
}

/// Levels of the share-of-search visibility drilldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisibilityLevel {
    KeywordType,
    Brand,
    Keyword,
    Sku,
    City,
}

impl Level for VisibilityLevel {
    const ALL: &'static [Self] = &[
        VisibilityLevel::KeywordType,
        VisibilityLevel::Brand,
        VisibilityLevel::Keyword,
        VisibilityLevel::Sku,
        VisibilityLevel::City,
    ];

    fn field_name(self) -> &'static str {
        match self {
            VisibilityLevel::KeywordType => "keywordType",
            VisibilityLevel::Brand => "brand",
            VisibilityLevel::Keyword => "keyword",
            VisibilityLevel::Sku => "sku",
            VisibilityLevel::City => "city",
        }
    }

    fn title(self) -> &'static str {
        match self {
            VisibilityLevel::KeywordType => "Keyword Type",
            VisibilityLevel::Brand => "Brand",
            VisibilityLevel::Keyword => "Keyword",
            VisibilityLevel::Sku => "SKU",
            VisibilityLevel::City => "City",
        }
    }
}

/// Levels of the keyword analysis / RCA insight tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeywordLevel {
    Keyword,
    Brand,
    Sku,
    City,
}

impl Level for KeywordLevel {
    const ALL: &'static [Self] = &[
        KeywordLevel::Keyword,
        KeywordLevel::Brand,
        KeywordLevel::Sku,
        KeywordLevel::City,
    ];

    fn field_name(self) -> &'static str {
        match self {
            KeywordLevel::Keyword => "keyword",
            KeywordLevel::Brand => "brand",
            KeywordLevel::Sku => "sku",
            KeywordLevel::City => "city",
        }
    }

    fn title(self) -> &'static str {
        match self {
            KeywordLevel::Keyword => "Keyword",
            KeywordLevel::Brand => "Brand",
            KeywordLevel::Sku => "SKU",
            KeywordLevel::City => "City",
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// How a metric is interpreted for display, averaging and heatmaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricKind {
    /// 0-100 share; higher is better.
    Percent,
    /// Rank in search results; lower is better. Never averaged.
    Position,
    Currency,
    Count,
    Ratio,
}

/// How child values combine into a parent value when grouping flat records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollup {
    Mean,
    Sum,
}

/// Every metric the dashboards know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKey {
    // Share of search
    OverallSos,
    OrganicSos,
    PaidSos,
    DisplaySos,
    // Search positions
    AvgPosition,
    OrganicPosition,
    PaidPosition,
    // Pricing
    Mrp,
    Ecp,
    SellingPrice,
    Discount,
    Rpi,
    Availability,
    // Performance marketing
    Impressions,
    Clicks,
    Orders,
    Ctr,
    Cvr,
    Spend,
    Sales,
    Roas,
}

impl MetricKey {
    pub const ALL: &'static [MetricKey] = &[
        MetricKey::OverallSos,
        MetricKey::OrganicSos,
        MetricKey::PaidSos,
        MetricKey::DisplaySos,
        MetricKey::AvgPosition,
        MetricKey::OrganicPosition,
        MetricKey::PaidPosition,
        MetricKey::Mrp,
        MetricKey::Ecp,
        MetricKey::SellingPrice,
        MetricKey::Discount,
        MetricKey::Rpi,
        MetricKey::Availability,
        MetricKey::Impressions,
        MetricKey::Clicks,
        MetricKey::Orders,
        MetricKey::Ctr,
        MetricKey::Cvr,
        MetricKey::Spend,
        MetricKey::Sales,
        MetricKey::Roas,
    ];

    /// Wire name used by the API.
    pub fn key(self) -> &'static str {
        match self {
            MetricKey::OverallSos => "overallSos",
            MetricKey::OrganicSos => "organicSos",
            MetricKey::PaidSos => "paidSos",
            MetricKey::DisplaySos => "displaySos",
            MetricKey::AvgPosition => "avgPosition",
            MetricKey::OrganicPosition => "organicPosition",
            MetricKey::PaidPosition => "paidPosition",
            MetricKey::Mrp => "mrp",
            MetricKey::Ecp => "ecp",
            MetricKey::SellingPrice => "sellingPrice",
            MetricKey::Discount => "discount",
            MetricKey::Rpi => "rpi",
            MetricKey::Availability => "availability",
            MetricKey::Impressions => "impressions",
            MetricKey::Clicks => "clicks",
            MetricKey::Orders => "orders",
            MetricKey::Ctr => "ctr",
            MetricKey::Cvr => "cvr",
            MetricKey::Spend => "spend",
            MetricKey::Sales => "sales",
            MetricKey::Roas => "roas",
        }
    }

    pub fn from_key(key: &str) -> Option<MetricKey> {
        MetricKey::ALL.iter().copied().find(|m| m.key() == key)
    }

    pub fn kind(self) -> MetricKind {
        match self {
            MetricKey::OverallSos
            | MetricKey::OrganicSos
            | MetricKey::PaidSos
            | MetricKey::DisplaySos
            | MetricKey::Discount
            | MetricKey::Availability
            | MetricKey::Ctr
            | MetricKey::Cvr => MetricKind::Percent,
            MetricKey::AvgPosition | MetricKey::OrganicPosition | MetricKey::PaidPosition => {
                MetricKind::Position
            }
            MetricKey::Mrp | MetricKey::Ecp | MetricKey::SellingPrice | MetricKey::Spend | MetricKey::Sales => {
                MetricKind::Currency
            }
            MetricKey::Impressions | MetricKey::Clicks | MetricKey::Orders => MetricKind::Count,
            MetricKey::Rpi | MetricKey::Roas => MetricKind::Ratio,
        }
    }

    pub fn rollup(self) -> Rollup {
        match self {
            MetricKey::Impressions
            | MetricKey::Clicks
            | MetricKey::Orders
            | MetricKey::Spend
            | MetricKey::Sales => Rollup::Sum,
            _ => Rollup::Mean,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            MetricKey::OverallSos => "Overall SOS",
            MetricKey::OrganicSos => "Organic SOS",
            MetricKey::PaidSos => "Paid SOS",
            MetricKey::DisplaySos => "Display SOS",
            MetricKey::AvgPosition => "Avg Position",
            MetricKey::OrganicPosition => "Organic Position",
            MetricKey::PaidPosition => "Paid Position",
            MetricKey::Mrp => "MRP",
            MetricKey::Ecp => "ECP",
            MetricKey::SellingPrice => "Selling Price",
            MetricKey::Discount => "Discount",
            MetricKey::Rpi => "RPI",
            MetricKey::Availability => "Availability",
            MetricKey::Impressions => "Impressions",
            MetricKey::Clicks => "Clicks",
            MetricKey::Orders => "Orders",
            MetricKey::Ctr => "CTR",
            MetricKey::Cvr => "CVR",
            MetricKey::Spend => "Spend",
            MetricKey::Sales => "Sales",
            MetricKey::Roas => "ROAS",
        }
    }

    /// Default heatmap rule derived from the metric's semantics.
    pub fn default_heatmap(self) -> Option<HeatmapRule> {
        match self.kind() {
            MetricKind::Percent => Some(HeatmapRule::higher_is_better()),
            MetricKind::Position => Some(HeatmapRule::lower_is_better()),
            _ => None,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

// ============================================================================
// HEATMAP
// ============================================================================

/// Coarse classification of a metric cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeatmapBucket {
    Top,
    Mid,
    Low,
    Bottom,
}

/// Fixed thresholds mapping a value onto a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "direction", rename_all = "camelCase")]
pub enum HeatmapRule {
    /// `>= top` is Top, `>= mid` is Mid, `>= low` is Low, else Bottom.
    HigherIsBetter { top: f64, mid: f64, low: f64 },
    /// `<= top` is Top, `<= mid` is Mid, else Bottom.
    LowerIsBetter { top: f64, mid: f64 },
}

impl HeatmapRule {
    pub fn higher_is_better() -> Self {
        HeatmapRule::HigherIsBetter { top: 50.0, mid: 10.0, low: 1.0 }
    }

    pub fn lower_is_better() -> Self {
        HeatmapRule::LowerIsBetter { top: 3.0, mid: 10.0 }
    }

    pub fn classify(&self, value: f64) -> HeatmapBucket {
        match *self {
            HeatmapRule::HigherIsBetter { top, mid, low } => {
                if value >= top {
                    HeatmapBucket::Top
                } else if value >= mid {
                    HeatmapBucket::Mid
                } else if value >= low {
                    HeatmapBucket::Low
                } else {
                    HeatmapBucket::Bottom
                }
            }
            HeatmapRule::LowerIsBetter { top, mid } => {
                if value <= top {
                    HeatmapBucket::Top
                } else if value <= mid {
                    HeatmapBucket::Mid
                } else {
                    HeatmapBucket::Bottom
                }
            }
        }
    }
}

// ============================================================================
// COLUMNS
// ============================================================================

/// A metric column, optionally pivoted on one breakdown value (e.g. a platform).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricColumn {
    pub metric: MetricKey,

    /// Breakdown dimension value; `None` reads the node's own metrics.
    #[serde(default)]
    pub breakdown: Option<String>,
}

impl MetricColumn {
    pub fn new(metric: MetricKey) -> Self {
        MetricColumn { metric, breakdown: None }
    }

    pub fn breakdown(metric: MetricKey, dimension: impl Into<String>) -> Self {
        MetricColumn {
            metric,
            breakdown: Some(dimension.into()),
        }
    }

    pub fn title(&self) -> String {
        match &self.breakdown {
            Some(dim) => format!("{} ({})", self.metric.title(), dim),
            None => self.metric.title().to_string(),
        }
    }
}

// ============================================================================
// MAIN DEFINITION STRUCT
// ============================================================================

pub const DEFAULT_PAGE_SIZES: [usize; 5] = [5, 7, 10, 25, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_PLACEHOLDER: &str = "–";
pub const UNCLASSIFIED_LABEL: &str = "Other";

fn default_page_sizes() -> Vec<usize> {
    DEFAULT_PAGE_SIZES.to_vec()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

/// Everything a drilldown view needs to know about its hierarchy and columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = ""))]
pub struct DrilldownConfig<L: Level> {
    /// Hierarchy levels shown by this view, outermost first.
    pub levels: Vec<L>,

    /// Metric columns, in display order.
    pub metric_columns: Vec<MetricColumn>,

    /// Metrics included in the row average. `None` means every
    /// percent-typed metric among the columns.
    #[serde(default)]
    pub average_metrics: Option<Vec<MetricKey>>,

    /// Per-metric replacements for the default heatmap thresholds.
    #[serde(default)]
    pub heatmap_overrides: BTreeMap<MetricKey, HeatmapRule>,

    #[serde(default = "default_page_sizes")]
    pub page_size_options: Vec<usize>,

    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "default_true")]
    pub show_average: bool,

    /// Search text also matches when a descendant's label matches.
    #[serde(default)]
    pub search_descendants: bool,

    /// Rendered in place of a missing metric.
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Flat-record field holding the breakdown dimension (e.g. `"platform"`).
    #[serde(default)]
    pub breakdown_field: Option<String>,
}

impl<L: Level> DrilldownConfig<L> {
    pub fn new(levels: Vec<L>, metric_columns: Vec<MetricColumn>) -> Self {
        DrilldownConfig {
            levels,
            metric_columns,
            average_metrics: None,
            heatmap_overrides: BTreeMap::new(),
            page_size_options: default_page_sizes(),
            default_page_size: DEFAULT_PAGE_SIZE,
            show_average: true,
            search_descendants: false,
            placeholder: default_placeholder(),
            breakdown_field: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_average_metrics(mut self, metrics: Vec<MetricKey>) -> Self {
        self.average_metrics = Some(metrics);
        self
    }

    pub fn with_heatmap(mut self, metric: MetricKey, rule: HeatmapRule) -> Self {
        self.heatmap_overrides.insert(metric, rule);
        self
    }

    pub fn with_search_descendants(mut self, enabled: bool) -> Self {
        self.search_descendants = enabled;
        self
    }

    pub fn with_breakdown_field(mut self, field: impl Into<String>) -> Self {
        self.breakdown_field = Some(field.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(DrilldownError::InvalidConfig("no hierarchy levels".into()));
        }
        if self.levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DrilldownError::InvalidConfig(format!(
                "levels {:?} are not in hierarchy order",
                self.levels
            )));
        }
        if let Some(position) = self
            .average_allow_list()
            .into_iter()
            .find(|m| m.kind() == MetricKind::Position)
        {
            return Err(DrilldownError::InvalidConfig(format!(
                "position metric '{}' cannot be averaged",
                position
            )));
        }
        if self.default_page_size == 0 || self.page_size_options.contains(&0) {
            return Err(DrilldownError::InvalidConfig("page size must be positive".into()));
        }
        Ok(())
    }

    /// Metrics that contribute to the row average.
    pub fn average_allow_list(&self) -> Vec<MetricKey> {
        match &self.average_metrics {
            Some(list) => list.clone(),
            None => {
                let mut list: Vec<MetricKey> = self
                    .metric_columns
                    .iter()
                    .map(|c| c.metric)
                    .filter(|m| m.kind() == MetricKind::Percent)
                    .collect();
                list.dedup();
                list
            }
        }
    }

    pub fn heatmap_rule(&self, metric: MetricKey) -> Option<HeatmapRule> {
        self.heatmap_overrides
            .get(&metric)
            .copied()
            .or_else(|| metric.default_heatmap())
    }

    /// Position of `level` within this view, if the view shows it.
    pub fn level_position(&self, level: L) -> Option<usize> {
        self.levels.iter().position(|l| *l == level)
    }

    /// The level expected directly below `level` in this view.
    pub fn next_level(&self, level: L) -> Option<L> {
        self.level_position(level)
            .and_then(|pos| self.levels.get(pos + 1))
            .copied()
    }

    /// Whether a `child` node may be drilled into from a `parent` node.
    pub fn accepts_child(&self, parent: L, child: L) -> bool {
        self.next_level(parent) == Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_is_better_buckets() {
        let rule = HeatmapRule::higher_is_better();
        assert_eq!(rule.classify(50.0), HeatmapBucket::Top);
        assert_eq!(rule.classify(49.9), HeatmapBucket::Mid);
        assert_eq!(rule.classify(10.0), HeatmapBucket::Mid);
        assert_eq!(rule.classify(1.0), HeatmapBucket::Low);
        assert_eq!(rule.classify(0.5), HeatmapBucket::Bottom);
    }

    #[test]
    fn test_lower_is_better_buckets() {
        let rule = HeatmapRule::lower_is_better();
        assert_eq!(rule.classify(1.0), HeatmapBucket::Top);
        assert_eq!(rule.classify(3.0), HeatmapBucket::Top);
        assert_eq!(rule.classify(7.0), HeatmapBucket::Mid);
        assert_eq!(rule.classify(10.0), HeatmapBucket::Mid);
        assert_eq!(rule.classify(11.0), HeatmapBucket::Bottom);
    }

    #[test]
    fn test_metric_key_round_trips_wire_name() {
        for metric in MetricKey::ALL {
            let json = serde_json::to_string(metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.key()));
            assert_eq!(MetricKey::from_key(metric.key()), Some(*metric));
        }
        assert_eq!(MetricKey::from_key("bogus"), None);
    }

    #[test]
    fn test_default_average_excludes_positions() {
        let config = DrilldownConfig::new(
            vec![VisibilityLevel::KeywordType, VisibilityLevel::Brand],
            vec![
                MetricColumn::new(MetricKey::OverallSos),
                MetricColumn::new(MetricKey::AvgPosition),
                MetricColumn::new(MetricKey::PaidSos),
            ],
        );
        assert_eq!(
            config.average_allow_list(),
            vec![MetricKey::OverallSos, MetricKey::PaidSos]
        );
    }

    #[test]
    fn test_validate_rejects_position_in_average() {
        let config = DrilldownConfig::new(
            vec![PricingLevel::Category],
            vec![MetricColumn::new(MetricKey::AvgPosition)],
        )
        .with_average_metrics(vec![MetricKey::AvgPosition]);
        assert!(matches!(config.validate(), Err(DrilldownError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_unordered_levels() {
        let config = DrilldownConfig::new(
            vec![PricingLevel::Brand, PricingLevel::Category],
            vec![],
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_next_level_follows_view_order() {
        let config = DrilldownConfig::new(
            vec![PricingLevel::Category, PricingLevel::Sku, PricingLevel::City],
            vec![],
        );
        assert_eq!(config.next_level(PricingLevel::Category), Some(PricingLevel::Sku));
        assert_eq!(config.next_level(PricingLevel::City), None);
        assert!(!config.accepts_child(PricingLevel::Category, PricingLevel::Brand));
        assert!(config.accepts_child(PricingLevel::Sku, PricingLevel::City));
    }

    #[test]
    fn test_config_from_json_applies_defaults() {
        let config: DrilldownConfig<PricingLevel> = DrilldownConfig::from_json(
            r#"{
                "levels": ["category", "brand"],
                "metricColumns": [{"metric": "discount"}, {"metric": "ecp", "breakdown": "Blinkit"}],
                "heatmapOverrides": {"discount": {"direction": "lowerIsBetter", "top": 5, "mid": 15}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.page_size_options, vec![5, 7, 10, 25, 50]);
        assert_eq!(config.placeholder, "–");
        assert_eq!(
            config.heatmap_rule(MetricKey::Discount),
            Some(HeatmapRule::LowerIsBetter { top: 5.0, mid: 15.0 })
        );
        assert_eq!(config.metric_columns[1].title(), "ECP (Blinkit)");
    }
}
