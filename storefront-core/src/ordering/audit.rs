use std::collections::BTreeMap;

use serde::Serialize;
use storefront_model::{ImageId, ProductId, ProductImage};

/// Read-only consistency check across the catalog.
///
/// Each list holds product ids in ascending order; a product may appear in
/// more than one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub products_checked: usize,
    pub images_checked: usize,
    /// Positions are not exactly `1..=N` (gap, duplicate, or null).
    pub position_violations: Vec<ProductId>,
    pub missing_primary: Vec<ProductId>,
    pub multiple_primaries: Vec<ProductId>,
    /// Exactly one primary, but it is not the position-1 image.
    pub misplaced_primary: Vec<ProductId>,
    /// One entry per product named in any list above, ascending.
    pub details: Vec<ProductAuditDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductAuditDetail {
    pub product_id: ProductId,
    pub image_count: usize,
    pub primary_count: usize,
    /// Rows whose stored position differs from their upload-order rank.
    pub misordered: Vec<PositionMismatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionMismatch {
    pub image_id: ImageId,
    pub expected: i32,
    pub actual: Option<i32>,
}

impl AuditReport {
    pub fn is_consistent(&self) -> bool {
        self.position_violations.is_empty()
            && self.missing_primary.is_empty()
            && self.multiple_primaries.is_empty()
            && self.misplaced_primary.is_empty()
    }

    pub fn violation_count(&self) -> usize {
        self.position_violations.len()
            + self.missing_primary.len()
            + self.multiple_primaries.len()
            + self.misplaced_primary.len()
    }
}

pub fn audit_images(images: &[ProductImage]) -> AuditReport {
    let mut by_product: BTreeMap<ProductId, Vec<&ProductImage>> = BTreeMap::new();
    for image in images {
        by_product.entry(image.product_id).or_default().push(image);
    }

    let mut report = AuditReport {
        products_checked: by_product.len(),
        images_checked: images.len(),
        ..AuditReport::default()
    };

    for (product_id, mut rows) in by_product {
        rows.sort_by(|a, b| a.upload_order(b));
        let mut violated = false;

        if !positions_are_contiguous(&rows) {
            report.position_violations.push(product_id);
            violated = true;
        }

        let primaries: Vec<&&ProductImage> =
            rows.iter().filter(|image| image.is_primary).collect();
        match primaries.as_slice() {
            [] => report.missing_primary.push(product_id),
            [only] if !only.is_at_front() => {
                report.misplaced_primary.push(product_id)
            }
            [_] => {}
            _ => report.multiple_primaries.push(product_id),
        }
        violated |= !matches!(primaries.as_slice(), [only] if only.is_at_front());

        if violated {
            report.details.push(ProductAuditDetail {
                product_id,
                image_count: rows.len(),
                primary_count: primaries.len(),
                misordered: misordered(&rows),
            });
        }
    }

    report
}

/// `rows` must already be in upload order.
fn misordered(rows: &[&ProductImage]) -> Vec<PositionMismatch> {
    rows.iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let expected = i32::try_from(idx + 1).unwrap_or(i32::MAX);
            (row.position != Some(expected)).then_some(PositionMismatch {
                image_id: row.id,
                expected,
                actual: row.position,
            })
        })
        .collect()
}

fn positions_are_contiguous(rows: &[&ProductImage]) -> bool {
    let mut positions = Vec::with_capacity(rows.len());
    for row in rows {
        match row.position {
            Some(position) => positions.push(position),
            None => return false,
        }
    }
    positions.sort_unstable();
    positions
        .iter()
        .enumerate()
        .all(|(idx, &position)| usize::try_from(position).ok() == Some(idx + 1))
}
