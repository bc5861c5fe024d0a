//! FILENAME: core/drilldown-engine/tests/common/mod.rs
//! Fixtures shared by the drilldown integration tests.

#![allow(dead_code)]

use drilldown_engine::{
    DrilldownConfig, Level, MetricColumn, MetricKey, Node, PricingLevel, VisibilityLevel,
};
use serde_json::{json, Value};

pub fn pricing_config() -> DrilldownConfig<PricingLevel> {
    DrilldownConfig::new(
        PricingLevel::ALL.to_vec(),
        vec![
            MetricColumn::new(MetricKey::Discount),
            MetricColumn::new(MetricKey::Ecp),
            MetricColumn::new(MetricKey::Rpi),
        ],
    )
}

pub fn visibility_config() -> DrilldownConfig<VisibilityLevel> {
    DrilldownConfig::new(
        VisibilityLevel::ALL.to_vec(),
        vec![
            MetricColumn::new(MetricKey::OverallSos),
            MetricColumn::new(MetricKey::OrganicSos),
            MetricColumn::new(MetricKey::PaidSos),
            MetricColumn::new(MetricKey::AvgPosition),
        ],
    )
}

/// Snacks > {Acme > {Chips 50g > {Mumbai, Pune}, Nachos}, Zed}, Dairy > {Moo}
pub fn pricing_forest() -> Vec<Node<PricingLevel>> {
    vec![
        Node::new("c1", "Snacks", PricingLevel::Category)
            .with_metric(MetricKey::Discount, 18.0)
            .with_metric(MetricKey::Ecp, 42.0)
            .with_child(
                Node::new("b1", "Acme", PricingLevel::Brand)
                    .with_metric(MetricKey::Discount, 12.0)
                    .with_child(
                        Node::new("s1", "Chips 50g", PricingLevel::Sku)
                            .with_metric(MetricKey::Discount, 10.0)
                            .with_child(
                                Node::new("m", "Mumbai", PricingLevel::City)
                                    .with_metric(MetricKey::Discount, 8.0),
                            )
                            .with_child(
                                Node::new("p", "Pune", PricingLevel::City)
                                    .with_metric(MetricKey::Discount, 12.0),
                            ),
                    )
                    .with_child(
                        Node::new("s2", "Nachos 100g", PricingLevel::Sku)
                            .with_metric(MetricKey::Discount, 14.0),
                    ),
            )
            .with_child(
                Node::new("b2", "Zed", PricingLevel::Brand).with_metric(MetricKey::Discount, 24.0),
            ),
        Node::new("c2", "Dairy", PricingLevel::Category)
            .with_metric(MetricKey::Discount, 6.0)
            .with_child(
                Node::new("b3", "Moo", PricingLevel::Brand).with_metric(MetricKey::Discount, 6.0),
            ),
    ]
}

/// Flat share-of-search rows as the visibility endpoint returns them.
pub fn visibility_records() -> Vec<Value> {
    vec![
        json!({"keywordType": "Branded", "brand": "Acme", "keyword": "acme chips", "sku": "Chips 50g", "overallSos": 62.0, "organicSos": 40.0, "paidSos": 22.0, "avgPosition": 2.0}),
        json!({"keywordType": "Branded", "brand": "Acme", "keyword": "acme chips", "sku": "Chips 100g", "overallSos": 38.0, "organicSos": null, "paidSos": 12.0, "avgPosition": 6.0}),
        json!({"keywordType": "Generic", "brand": "Acme", "keyword": "chips", "sku": "Chips 50g", "overallSos": 9.0, "organicSos": 5.0, "paidSos": 4.0, "avgPosition": 14.0}),
        json!({"keywordType": "Generic", "brand": "Zed", "keyword": "chips", "overallSos": "0.5", "avgPosition": 21.0}),
    ]
}
