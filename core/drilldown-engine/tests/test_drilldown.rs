//! FILENAME: core/drilldown-engine/tests/test_drilldown.rs
//! PURPOSE: End-to-end behaviour of drilldown tables: flattening, sticky
//! expansion, filtering, paging, column visibility and export.

mod common;

use common::{pricing_config, pricing_forest, visibility_config, visibility_records};
use drilldown_engine::{
    flatten, forest_from_json, DrilldownConfig, DrilldownTable, ExpansionState, FilterState,
    HeatmapBucket, MetricColumn, MetricKey, MetricThreshold, Node, NodeKey, PricingLevel,
    TreeBuilder, VisibilityLevel,
};
use serde_json::json;

fn ids<L: drilldown_engine::Level>(rows: &[drilldown_engine::Row<L>]) -> Vec<String> {
    rows.iter().map(|r| r.key.to_string()).collect()
}

// ============================================================================
// FLATTENING
// ============================================================================

#[test]
fn test_single_category_scenario() {
    let forest: Vec<Node<PricingLevel>> = forest_from_json(json!([
        {"id": "c1", "label": "Snacks", "level": "category", "metrics": {"discount": 30},
         "children": [{"id": "b1", "label": "Acme", "level": "brand", "metrics": {"discount": 30}, "children": []}]}
    ]))
    .unwrap();
    let config = DrilldownConfig::new(
        vec![PricingLevel::Category, PricingLevel::Brand],
        vec![MetricColumn::new(MetricKey::Discount)],
    );

    let mut expansion = ExpansionState::new();
    let rows = flatten(&forest, &expansion, &config);
    assert_eq!(ids(&rows), vec!["c1"]);
    assert!(rows[0].has_visible_children);

    expansion.expand("c1");
    let rows = flatten(&forest, &expansion, &config);
    assert_eq!(ids(&rows), vec!["c1", "c1/b1"]);
    assert_eq!(rows[1].depth, 1);
    assert_eq!(rows[1].node_id, "b1");
}

#[test]
fn test_collapse_is_sticky_for_descendants() {
    let config = pricing_config();
    let forest = pricing_forest();
    let mut expansion = ExpansionState::new();
    expansion.expand("c1");
    expansion.expand("c1/b1");
    expansion.expand("c1/b1/s1");

    let full = flatten(&forest, &expansion, &config);
    assert_eq!(
        ids(&full),
        vec!["c1", "c1/b1", "c1/b1/s1", "c1/b1/s1/m", "c1/b1/s1/p", "c1/b1/s2", "c1/b2", "c2"]
    );

    expansion.collapse(&NodeKey::from("c1"));
    let collapsed = flatten(&forest, &expansion, &config);
    assert_eq!(ids(&collapsed), vec!["c1", "c2"]);
    assert!(expansion.is_expanded(&NodeKey::from("c1/b1")));
    assert!(expansion.is_expanded(&NodeKey::from("c1/b1/s1")));

    expansion.expand("c1");
    assert_eq!(flatten(&forest, &expansion, &config), full);
}

#[test]
fn test_flatten_is_idempotent() {
    let config = pricing_config();
    let forest = pricing_forest();
    let mut expansion = ExpansionState::new();
    expansion.expand_all(&forest);

    let first = flatten(&forest, &expansion, &config);
    let second = flatten(&forest, &expansion, &config);
    assert_eq!(first, second);
}

#[test]
fn test_visibility_rows_from_flat_records() {
    let config = visibility_config();
    let forest = TreeBuilder::from_config(&config)
        .build(&visibility_records())
        .unwrap();
    let mut expansion = ExpansionState::new();
    expansion.expand_all(&forest);
    let rows = flatten(&forest, &expansion, &config);

    let chips = rows
        .iter()
        .find(|r| r.key.as_str() == "Branded/Acme/acme chips/Chips 100g")
        .unwrap();
    assert_eq!(chips.hierarchy_label(VisibilityLevel::Keyword), Some("acme chips"));
    assert_eq!(chips.hierarchy_label(VisibilityLevel::Brand), Some("Acme"));
    // organicSos is null: average is (38 + 12) / 2, position excluded.
    assert_eq!(chips.average, Some(25.0));
    assert_eq!(chips.cells[1].display, "–");
    assert_eq!(chips.cells[3].bucket, Some(HeatmapBucket::Mid));

    // Zed's record stops at the keyword: no synthetic sku or city below it.
    let zed = rows
        .iter()
        .find(|r| r.key.as_str() == "Generic/Zed/chips")
        .unwrap();
    assert!(!zed.has_visible_children);
    assert!(!rows.iter().any(|r| r.label == "Other"));
}

#[test]
fn test_sku_grain_records_have_no_city_rows() {
    let config = pricing_config();
    let records = vec![
        json!({"category": "Snacks", "brand": "Acme", "sku": "Chips 50g", "discount": 10}),
        json!({"category": "Snacks", "brand": "Acme", "sku": "Nachos 100g", "discount": 20}),
    ];
    let forest = TreeBuilder::from_config(&config).build(&records).unwrap();
    let mut expansion = ExpansionState::new();
    expansion.expand_all(&forest);
    let rows = flatten(&forest, &expansion, &config);

    assert_eq!(
        ids(&rows),
        vec!["Snacks", "Snacks/Acme", "Snacks/Acme/Chips 50g", "Snacks/Acme/Nachos 100g"]
    );
    let sku = &rows[2];
    assert_eq!(sku.level, PricingLevel::Sku);
    assert!(!sku.has_visible_children);
    assert!(!sku.is_expanded);
    assert_eq!(rows[1].metrics.get(MetricKey::Discount), Some(15.0));
}

// ============================================================================
// FILTERING
// ============================================================================

#[test]
fn test_filter_keeps_ancestors_of_deep_match() {
    let mut table = DrilldownTable::new(pricing_config()).unwrap().with_forest(pricing_forest());
    table.expand_all();
    table.set_search("pune");

    let rows = table.rows();
    assert_eq!(ids(&rows), vec!["c1", "c1/b1", "c1/b1/s1", "c1/b1/s1/p"]);
}

#[test]
fn test_filter_combines_threshold_and_selection() {
    let mut table = DrilldownTable::new(pricing_config()).unwrap().with_forest(pricing_forest());
    table.expand_all();
    table.select_items(PricingLevel::Brand, ["Acme", "Moo"]);
    table.set_threshold(Some(MetricThreshold::new(
        MetricColumn::new(MetricKey::Discount),
        11.0,
    )));

    let rows = table.rows();
    assert_eq!(
        ids(&rows),
        vec!["c1", "c1/b1", "c1/b1/s1", "c1/b1/s1/p", "c1/b1/s2"]
    );

    table.clear_filters();
    assert_eq!(table.rows().len(), 9);
}

// ============================================================================
// PAGING AND COLUMNS
// ============================================================================

#[test]
fn test_pagination_over_flattened_rows() {
    let config = DrilldownConfig::new(
        vec![PricingLevel::Category],
        vec![MetricColumn::new(MetricKey::Discount)],
    );
    let forest = (0..23)
        .map(|i| Node::new(format!("c{}", i), format!("Category {}", i), PricingLevel::Category))
        .collect();
    let mut table = DrilldownTable::new(config).unwrap().with_forest(forest);

    table.set_page(3);
    let view = table.view();
    assert_eq!(view.page.total_pages, 3);
    assert_eq!(view.rows.len(), 3);

    table.set_page(5);
    let view = table.view();
    assert_eq!(view.page.page, 3);
    assert_eq!(view.rows.len(), 3);

    table.set_page_size(25);
    assert_eq!(table.paginator().page(), 1);
    assert_eq!(table.view().rows.len(), 23);
}

#[test]
fn test_columns_follow_current_page_only() {
    let mut table = DrilldownTable::new(pricing_config()).unwrap().with_forest(pricing_forest());
    table.expand("c1");
    table.set_page_size(5);

    let view = table.view();
    let levels: Vec<PricingLevel> = view.hierarchy_columns.iter().map(|c| c.level).collect();
    assert_eq!(levels, vec![PricingLevel::Category, PricingLevel::Brand]);
    assert!(!view.shows_level(PricingLevel::Sku));
    assert!(!view.shows_level(PricingLevel::City));

    // Deep rows exist, but only on another page.
    table.expand("c1/b1");
    table.expand("c1/b1/s1");
    table.set_page(2);
    let view = table.view();
    let levels: Vec<PricingLevel> = view.hierarchy_columns.iter().map(|c| c.level).collect();
    assert_eq!(levels, vec![PricingLevel::Category, PricingLevel::Brand, PricingLevel::Sku]);
}

// ============================================================================
// EXPORT
// ============================================================================

#[test]
fn test_export_uses_visible_columns_and_filtered_order() {
    let mut table = DrilldownTable::new(pricing_config()).unwrap().with_forest(pricing_forest());
    table.expand("c1");
    table.set_search("a");

    let csv = table.export_csv_string().unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Category,Brand,Discount,ECP,RPI,Average");
    assert_eq!(lines[1], "Snacks,,18.0%,₹42.00,–,18.0%");
    assert_eq!(lines[2], "Snacks,Acme,12.0%,–,–,12.0%");
    assert_eq!(lines[3], "Dairy,,6.0%,–,–,6.0%");
    assert_eq!(lines.len(), 4);
}

#[test]
fn test_export_keeps_levels_of_rows_off_the_current_page() {
    let mut table = DrilldownTable::new(pricing_config()).unwrap().with_forest(pricing_forest());
    table.expand("c1");
    table.expand("c1/b1");
    table.set_page_size(2);

    // Page 1 only holds category and brand rows.
    assert!(!table.view().shows_level(PricingLevel::Sku));

    let csv = table.export_csv_string().unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Category,Brand,SKU,Discount,ECP,RPI,Average");
    assert_eq!(lines[1], "Snacks,,,18.0%,₹42.00,–,18.0%");
    assert_eq!(lines[2], "Snacks,Acme,,12.0%,–,–,12.0%");
    assert_eq!(lines[3], "Snacks,Acme,Chips 50g,10.0%,–,–,10.0%");
    assert_eq!(lines[4], "Snacks,Acme,Nachos 100g,14.0%,–,–,14.0%");
    assert_eq!(lines[5], "Snacks,Zed,,24.0%,–,–,24.0%");
    assert_eq!(lines[6], "Dairy,,,6.0%,–,–,6.0%");
    assert_eq!(lines.len(), 7);
}

#[test]
fn test_threshold_filter_never_counts_missing_as_zero() {
    let mut table = DrilldownTable::new(pricing_config()).unwrap().with_forest(pricing_forest());
    table.expand_all();
    table.set_filter(FilterState::new().with_threshold(MetricThreshold::new(
        MetricColumn::new(MetricKey::Rpi),
        0.0,
    )));
    assert!(table.view().is_empty());
}
