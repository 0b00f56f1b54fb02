//! Blob size report.

use std::fmt;

use serde::Serialize;
use tracing::info;

use super::Workspace;

/// One local blob in the size report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobSizeEntry {
    pub name: String,
    pub dims: Vec<usize>,

    /// Allocated bytes; zero for blobs sharing another blob's storage.
    pub capacity: usize,

    /// Share of the total, in percent.
    pub percentage: f64,
}

/// Local blobs ranked by memory footprint, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobSizeReport {
    pub entries: Vec<BlobSizeEntry>,
    pub total: usize,
}

impl BlobSizeReport {
    /// The report as log lines: header, column names, one line per blob and
    /// a trailing total.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.entries.len() + 3);
        lines.push("---- Workspace blobs: ----".to_string());
        lines.push("name;current shape;capacity bytes;percentage".to_string());
        for entry in &self.entries {
            let shape: String = entry.dims.iter().map(|d| format!("{d},")).collect();
            lines.push(format!(
                "{};{};{};{}%",
                entry.name,
                shape,
                entry.capacity,
                significant(entry.percentage, 3)
            ));
        }
        lines.push(format!("Total;;{};100%", self.total));
        lines
    }
}

/// `value` rounded to `digits` significant digits, without trailing zeros.
fn significant(value: f64, digits: i32) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{value}");
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    let text = format!("{value:.decimals$}");
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

impl fmt::Display for BlobSizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl Workspace<'_> {
    /// Measure every local blob whose value type has a shape function.
    ///
    /// Read-only: blobs are only locked for reading. Ties keep creation
    /// order.
    pub fn blob_size_report(&self) -> BlobSizeReport {
        let mut sized: Vec<(String, Vec<usize>, usize)> = self
            .blob_map
            .iter()
            .filter_map(|(name, blob)| {
                let shape = self.shapes.shape_of(&blob.read())?;
                let capacity = if shape.shares_data { 0 } else { shape.capacity };
                Some((name.clone(), shape.dims, capacity))
            })
            .collect();
        sized.sort_by(|a, b| b.2.cmp(&a.2));

        let total: usize = sized.iter().map(|(_, _, capacity)| capacity).sum();
        let entries = sized
            .into_iter()
            .map(|(name, dims, capacity)| BlobSizeEntry {
                name,
                dims,
                capacity,
                percentage: if total > 0 {
                    100.0 * capacity as f64 / total as f64
                } else {
                    0.0
                },
            })
            .collect();
        BlobSizeReport { entries, total }
    }

    /// Log the blob size report at info level.
    pub fn print_blob_sizes(&self) {
        for line in self.blob_size_report().lines() {
            info!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tensor;
    use crate::registry::{BlobShape, ShapeRegistry};
    use rstest::rstest;
    use std::sync::Arc;

    /// Value with a fixed reported size.
    struct Fixed {
        capacity: usize,
        shared: bool,
    }

    fn workspace_with_sizes(sizes: &[(&str, usize, bool)]) -> Workspace<'static> {
        let mut shapes = ShapeRegistry::new();
        shapes.register::<Fixed>(|s| BlobShape {
            dims: vec![s.capacity],
            shares_data: s.shared,
            capacity: s.capacity,
        });
        let mut ws = Workspace::builder()
            .shape_registry(Arc::new(shapes))
            .build();
        for (name, capacity, shared) in sizes {
            ws.create_blob(name).set(Fixed {
                capacity: *capacity,
                shared: *shared,
            });
        }
        ws
    }

    #[test]
    fn ranks_by_capacity_and_skips_shared_bytes() {
        let ws = workspace_with_sizes(&[
            ("a", 10, false),
            ("b", 30, false),
            ("alias", 30, true),
            ("c", 60, false),
        ]);
        let report = ws.blob_size_report();

        assert_eq!(report.total, 100);
        let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a", "alias"]);
        let capacities: Vec<_> = report.entries.iter().map(|e| e.capacity).collect();
        assert_eq!(capacities, vec![60, 30, 10, 0]);

        let pct: f64 = report.entries.iter().map(|e| e.percentage).sum();
        assert!((pct - 100.0).abs() < 1e-9);
        assert_eq!(report.entries[3].percentage, 0.0);
    }

    #[test]
    fn ties_keep_creation_order() {
        let ws = workspace_with_sizes(&[("first", 8, false), ("second", 8, false), ("third", 8, false)]);
        let names: Vec<_> = ws
            .blob_size_report()
            .entries
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn zero_total_gives_zero_percent() {
        let ws = workspace_with_sizes(&[("alias", 16, true)]);
        let report = ws.blob_size_report();
        assert_eq!(report.total, 0);
        assert_eq!(report.entries[0].percentage, 0.0);
    }

    #[test]
    fn unsized_blobs_are_skipped() {
        let mut ws = Workspace::new();
        ws.create_blob("empty");
        ws.create_blob("text").set(String::from("hi"));
        ws.create_blob("t").set(Tensor::filled(vec![2, 2], 1.0));

        let report = ws.blob_size_report();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].name, "t");
        assert_eq!(report.entries[0].dims, vec![2, 2]);
    }

    #[test]
    fn lines_format() {
        let ws = workspace_with_sizes(&[("a", 25, false), ("b", 75, false)]);
        let lines = ws.blob_size_report().lines();
        assert_eq!(
            lines,
            vec![
                "---- Workspace blobs: ----",
                "name;current shape;capacity bytes;percentage",
                "b;75,;75;75%",
                "a;25,;25;25%",
                "Total;;100;100%",
            ]
        );
    }

    #[test]
    fn report_does_not_touch_blobs() {
        let ws = workspace_with_sizes(&[("a", 1, false)]);
        ws.print_blob_sizes();
        assert_eq!(ws.local_blobs(), vec!["a"]);
        assert!(ws.get_blob("a").unwrap().read().is::<Fixed>());
    }

    #[rstest]
    #[case(100.0, "100")]
    #[case(75.0, "75")]
    #[case(100.0 / 3.0, "33.3")]
    #[case(200.0 / 3.0, "66.7")]
    #[case(0.5, "0.5")]
    #[case(0.012345, "0.0123")]
    #[case(99.96, "100")]
    #[case(0.0, "0")]
    fn percentages_keep_three_significant_digits(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(significant(value, 3), expected);
    }
}
