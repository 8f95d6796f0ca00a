//! Text and JSON output for the `images` commands.

use std::fmt::Write as _;

use serde::Serialize;
use storefront_core::ordering::{AuditReport, CatalogSummary, RepairReport};

pub fn json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

pub fn repair_line(report: &RepairReport) -> String {
    match &report.failure {
        None => format!(
            "product {:>8}  ok      {} image(s), {} change(s)",
            report.product_id, report.record_count, report.changed_count
        ),
        Some(failure) => format!(
            "product {:>8}  FAILED  at {}: {}{}",
            report.product_id,
            failure.stage,
            failure.message,
            if failure.retryable { " (retryable)" } else { "" }
        ),
    }
}

/// Totals across a finished repair run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepairTotals {
    pub products: usize,
    pub failed: usize,
    pub changed: usize,
}

impl RepairTotals {
    pub fn record(&mut self, report: &RepairReport) {
        self.products += 1;
        self.changed += report.changed_count;
        if !report.is_ok() {
            self.failed += 1;
        }
    }
}

pub fn repair_totals(totals: &RepairTotals) -> String {
    format!(
        "{} product(s) repaired, {} change(s), {} failure(s)",
        totals.products, totals.changed, totals.failed
    )
}

pub fn audit(report: &AuditReport) -> String {
    let mut out = format!(
        "checked {} image(s) across {} product(s)\n",
        report.images_checked, report.products_checked
    );
    if report.is_consistent() {
        out.push_str("no ordering violations\n");
        return out;
    }

    let sections = [
        ("position gaps or duplicates", &report.position_violations),
        ("no primary image", &report.missing_primary),
        ("more than one primary", &report.multiple_primaries),
        ("primary not at position 1", &report.misplaced_primary),
    ];
    for (label, products) in sections {
        if products.is_empty() {
            continue;
        }
        let ids: Vec<String> = products.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "{label} ({}): {}", products.len(), ids.join(", "));
    }
    for detail in &report.details {
        let _ = writeln!(
            out,
            "  product {}: {} image(s), {} primary",
            detail.product_id, detail.image_count, detail.primary_count
        );
        for row in &detail.misordered {
            let actual = row
                .actual
                .map_or_else(|| "none".to_string(), |position| position.to_string());
            let _ = writeln!(
                out,
                "    image {}: expected {}, got {actual}",
                row.image_id, row.expected
            );
        }
    }
    let _ = writeln!(out, "{} violation(s)", report.violation_count());
    out
}

pub fn summary(summary: &CatalogSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "images:               {}", summary.total_images);
    let _ = writeln!(out, "products with images: {}", summary.products_with_images);
    let _ = writeln!(out, "primary images:       {}", summary.primary_images);
    let _ = writeln!(out, "unpositioned images:  {}", summary.unpositioned_images);
    let _ = writeln!(
        out,
        "multi-image products: {}",
        summary.multi_image_products.len()
    );
    for count in &summary.multi_image_products {
        let _ = writeln!(out, "  {:>8}  {} image(s)", count.product_id, count.images);
    }
    out
}
