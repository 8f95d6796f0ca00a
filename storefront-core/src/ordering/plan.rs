//! Pure planning step: given a product's rows as read, decide which rows
//! must be written. Nothing here touches storage.

use storefront_model::{ImageId, ProductId, ProductImage};

use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionChange {
    pub id: ImageId,
    pub from: Option<i32>,
    pub to: i32,
}

/// Positions by upload order, 1-based. Rows already at their target are
/// left out so callers only write what moved.
pub fn plan_positions(images: &[ProductImage]) -> Result<Vec<PositionChange>> {
    let mut ordered: Vec<&ProductImage> = images.iter().collect();
    ordered.sort_by(|a, b| a.upload_order(b));

    let mut changes = Vec::new();
    for (idx, image) in ordered.into_iter().enumerate() {
        let to = i32::try_from(idx + 1).map_err(|_| {
            CatalogError::Validation(format!(
                "product {} has more images than a position can address",
                image.product_id
            ))
        })?;
        if image.position != Some(to) {
            changes.push(PositionChange {
                id: image.id,
                from: image.position,
                to,
            });
        }
    }
    Ok(changes)
}

/// Writes needed to make the position-1 row the sole primary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryPlan {
    pub front: ImageId,
    /// Current primaries other than `front`; cleared before `front` is set.
    pub clear: Vec<ImageId>,
    pub set_front: bool,
}

impl PrimaryPlan {
    pub fn toggles(&self) -> usize {
        self.clear.len() + usize::from(self.set_front)
    }

    pub fn is_noop(&self) -> bool {
        self.toggles() == 0
    }
}

/// `Ok(None)` for a product without images. A non-empty product with no row
/// at position 1 means positions were never normalized (or a previous pass
/// died halfway) and is reported as `NotFound`.
pub fn plan_primary(
    product_id: ProductId,
    images: &[ProductImage],
) -> Result<Option<PrimaryPlan>> {
    if images.is_empty() {
        return Ok(None);
    }

    let front = images
        .iter()
        .filter(|image| image.is_at_front())
        .min_by(|a, b| a.upload_order(b))
        .ok_or_else(|| {
            CatalogError::NotFound(format!(
                "product {product_id} has no image at position 1"
            ))
        })?;

    let clear = images
        .iter()
        .filter(|image| image.is_primary && image.id != front.id)
        .map(|image| image.id)
        .collect();

    Ok(Some(PrimaryPlan {
        front: front.id,
        clear,
        set_front: !front.is_primary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn image(n: u128, minute: u32, position: Option<i32>, is_primary: bool) -> ProductImage {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap();
        ProductImage {
            id: ImageId(Uuid::from_u128(n)),
            product_id: ProductId(1),
            position,
            is_primary,
            image_url: format!("https://cdn.example/{n}.jpg"),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn positions_follow_upload_time_not_input_order() {
        let rows = vec![
            image(3, 30, None, false),
            image(1, 10, None, false),
            image(2, 20, None, false),
        ];
        let changes = plan_positions(&rows).unwrap();
        let assigned: Vec<(u128, i32)> = changes
            .iter()
            .map(|c| (c.id.to_uuid().as_u128(), c.to))
            .collect();
        assert_eq!(assigned, vec![(1, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn rows_already_in_place_are_skipped() {
        let rows = vec![
            image(1, 10, Some(1), true),
            image(2, 20, Some(7), false),
            image(3, 30, Some(3), false),
        ];
        let changes = plan_positions(&rows).unwrap();
        assert_eq!(
            changes,
            vec![PositionChange {
                id: ImageId(Uuid::from_u128(2)),
                from: Some(7),
                to: 2,
            }]
        );
    }

    #[test]
    fn primary_plan_clears_others_and_sets_front() {
        let rows = vec![
            image(1, 10, Some(1), false),
            image(2, 20, Some(2), true),
            image(3, 30, Some(3), true),
        ];
        let plan = plan_primary(ProductId(1), &rows).unwrap().unwrap();
        assert_eq!(plan.front, ImageId(Uuid::from_u128(1)));
        assert_eq!(plan.clear.len(), 2);
        assert!(plan.set_front);
        assert_eq!(plan.toggles(), 3);
    }

    #[test]
    fn consistent_product_needs_no_primary_writes() {
        let rows = vec![image(1, 10, Some(1), true), image(2, 20, Some(2), false)];
        let plan = plan_primary(ProductId(1), &rows).unwrap().unwrap();
        assert!(plan.is_noop());
    }

    #[test]
    fn missing_front_row_is_not_found() {
        let rows = vec![image(1, 10, Some(2), true)];
        assert!(matches!(
            plan_primary(ProductId(1), &rows),
            Err(CatalogError::NotFound(_))
        ));
        assert_eq!(plan_primary(ProductId(1), &[]).unwrap(), None);
    }
}
