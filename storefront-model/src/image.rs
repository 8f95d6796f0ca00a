use chrono::{DateTime, Utc};

use crate::{
    error::{ModelError, Result as ModelResult},
    ids::{ImageId, ProductId},
};

/// A single image attached to a catalog product.
///
/// `position` is the 1-based display rank within the product's gallery. It
/// is nullable because the upload workflow may insert rows before any order
/// has been assigned; the ordering service treats `None` as "unplaced".
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "display_order"))]
    pub position: Option<i32>,
    pub is_primary: bool,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductImage {
    /// Canonical gallery order: upload time first, id as the final tie-break
    /// so two rows inserted in the same instant still sort deterministically.
    pub fn upload_order(&self, other: &Self) -> std::cmp::Ordering {
        self.created_at
            .cmp(&other.created_at)
            .then_with(|| self.id.cmp(&other.id))
    }

    pub fn is_at_front(&self) -> bool {
        self.position == Some(1)
    }
}

/// Field-level update applied to one image row.
///
/// Absent fields are left untouched. Storage adapters stamp `updated_at` on
/// every row they patch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImagePatch {
    pub position: Option<i32>,
    pub is_primary: Option<bool>,
}

impl ImagePatch {
    pub fn position(position: i32) -> Self {
        Self {
            position: Some(position),
            is_primary: None,
        }
    }

    pub fn primary(is_primary: bool) -> Self {
        Self {
            position: None,
            is_primary: Some(is_primary),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.is_primary.is_none()
    }

    pub fn validate(&self) -> ModelResult<()> {
        match self.position {
            Some(position) if position < 1 => {
                Err(ModelError::InvalidPosition(position))
            }
            _ => Ok(()),
        }
    }

    /// Apply the patch to an in-memory row. Returns `true` if any field
    /// actually changed.
    pub fn apply_to(&self, image: &mut ProductImage, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        if let Some(position) = self.position
            && image.position != Some(position)
        {
            image.position = Some(position);
            changed = true;
        }
        if let Some(is_primary) = self.is_primary
            && image.is_primary != is_primary
        {
            image.is_primary = is_primary;
            changed = true;
        }
        if !self.is_empty() {
            image.updated_at = now;
        }
        changed
    }
}

/// Struct-of-optionals filter over the image table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageFilter {
    pub product_id: Option<ProductId>,
    /// Only rows whose `position` is null.
    pub position_is_null: bool,
    pub is_primary: Option<bool>,
}

impl ImageFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            ..Self::default()
        }
    }

    pub fn unpositioned() -> Self {
        Self {
            position_is_null: true,
            ..Self::default()
        }
    }

    pub fn primaries() -> Self {
        Self {
            is_primary: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, image: &ProductImage) -> bool {
        if let Some(product_id) = self.product_id
            && image.product_id != product_id
        {
            return false;
        }
        if self.position_is_null && image.position.is_some() {
            return false;
        }
        if let Some(is_primary) = self.is_primary
            && image.is_primary != is_primary
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn image(product: i64, position: Option<i32>, is_primary: bool) -> ProductImage {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        ProductImage {
            id: ImageId(Uuid::new_v4()),
            product_id: ProductId(product),
            position,
            is_primary,
            image_url: "https://cdn.example/img.jpg".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn patch_reports_only_real_changes_but_always_stamps() {
        let mut row = image(1, Some(2), false);
        let later = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        assert!(!ImagePatch::position(2).apply_to(&mut row, later));
        assert_eq!(row.updated_at, later);

        assert!(ImagePatch::primary(true).apply_to(&mut row, later));
        assert!(row.is_primary);
    }

    #[test]
    fn patch_rejects_non_positive_positions() {
        assert_eq!(
            ImagePatch::position(0).validate(),
            Err(ModelError::InvalidPosition(0))
        );
        assert!(ImagePatch::position(1).validate().is_ok());
        assert!(ImagePatch::primary(false).validate().is_ok());
    }

    #[test]
    fn filter_combines_fields() {
        let unplaced_primary = image(7, None, true);
        let placed = image(7, Some(1), false);

        assert!(ImageFilter::unpositioned().matches(&unplaced_primary));
        assert!(!ImageFilter::unpositioned().matches(&placed));
        assert!(ImageFilter::primaries().matches(&unplaced_primary));
        assert!(!ImageFilter::for_product(ProductId(8)).matches(&placed));
        assert!(ImageFilter::all().matches(&placed));
    }

    #[test]
    fn upload_order_breaks_ties_by_id() {
        let mut a = image(1, None, false);
        let mut b = image(1, None, false);
        a.id = ImageId(Uuid::from_u128(1));
        b.id = ImageId(Uuid::from_u128(2));
        assert_eq!(a.upload_order(&b), std::cmp::Ordering::Less);
    }
}
