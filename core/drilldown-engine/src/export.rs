//! FILENAME: core/drilldown-engine/src/export.rs
//! CSV export of a drilldown table.
//!
//! The export covers every visible row across all pages, in filtered, sorted
//! and expanded order, with the hierarchy columns those rows occupy.

use std::io;

use crate::definition::{Level, MetricColumn};
use crate::error::{DrilldownError, Result};
use crate::view::{HierarchyColumn, Row};

pub const AVERAGE_HEADER: &str = "Average";

pub struct CsvLayout<'a, L: Level> {
    pub hierarchy: &'a [HierarchyColumn<L>],
    pub metrics: &'a [MetricColumn],
    pub show_average: bool,
    pub placeholder: &'a str,
}

impl<'a, L: Level> CsvLayout<'a, L> {
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = self.hierarchy.iter().map(|c| c.title.to_string()).collect();
        header.extend(self.metrics.iter().map(MetricColumn::title));
        if self.show_average {
            header.push(AVERAGE_HEADER.to_string());
        }
        header
    }

    fn record(&self, row: &Row<L>) -> Vec<String> {
        let mut record: Vec<String> = self
            .hierarchy
            .iter()
            .map(|c| row.hierarchy_label(c.level).unwrap_or_default().to_string())
            .collect();
        for column in self.metrics {
            let display = row
                .cell(column)
                .map(|cell| cell.display.clone())
                .unwrap_or_else(|| self.placeholder.to_string());
            record.push(display);
        }
        if self.show_average {
            record.push(match row.average {
                Some(avg) => format!("{:.1}%", avg),
                None => self.placeholder.to_string(),
            });
        }
        record
    }

    pub fn write<W: io::Write>(&self, writer: W, rows: &[Row<L>]) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.header())?;
        for row in rows {
            csv.write_record(self.record(row))?;
        }
        csv.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self, rows: &[Row<L>]) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, rows)?;
        String::from_utf8(buffer)
            .map_err(|e| DrilldownError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{DrilldownConfig, MetricKey, PricingLevel};
    use crate::engine::flatten;
    use crate::expansion::ExpansionState;
    use crate::tree::Node;

    #[test]
    fn test_csv_uses_given_columns_and_placeholders() {
        let config = DrilldownConfig::new(
            vec![PricingLevel::Category, PricingLevel::Brand],
            vec![MetricColumn::new(MetricKey::Discount), MetricColumn::new(MetricKey::Ecp)],
        );
        let forest = vec![Node::new("c1", "Snacks, Salty", PricingLevel::Category)
            .with_metric(MetricKey::Discount, 12.0)
            .with_child(Node::new("b1", "Acme", PricingLevel::Brand).with_metric(MetricKey::Ecp, 45.0))];
        let mut expansion = ExpansionState::new();
        expansion.expand("c1");
        let rows = flatten(&forest, &expansion, &config);

        let hierarchy = vec![HierarchyColumn::new(PricingLevel::Category), HierarchyColumn::new(PricingLevel::Brand)];
        let layout = CsvLayout {
            hierarchy: &hierarchy,
            metrics: &config.metric_columns,
            show_average: true,
            placeholder: "–",
        };
        let csv = layout.to_csv_string(&rows).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Category,Brand,Discount,ECP,Average");
        assert_eq!(lines[1], "\"Snacks, Salty\",,12.0%,–,12.0%");
        assert_eq!(lines[2], "\"Snacks, Salty\",Acme,–,₹45.00,–");
    }
}
