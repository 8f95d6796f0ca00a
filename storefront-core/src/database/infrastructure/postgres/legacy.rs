//! One-time normalization of the alternately-named order columns.
//!
//! Older revisions of the admin panel wrote gallery order into
//! `image_order` or `sort_order` instead of `display_order`. The ordering
//! service only understands `display_order`, so the aliases are folded into
//! it once, here, rather than being checked on every read.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::error::{CatalogError, Result};

pub const CANONICAL_ORDER_COLUMN: &str = "display_order";

/// Alias columns, in the precedence used when more than one holds a value.
pub const LEGACY_ORDER_COLUMNS: [&str; 2] = ["image_order", "sort_order"];

/// Which order columns exist on `product_images`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyOrderColumns {
    has_display_order: bool,
    aliases: Vec<&'static str>,
}

impl LegacyOrderColumns {
    pub async fn detect(pool: &PgPool) -> Result<Self> {
        let columns: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT column_name::text
            FROM information_schema.columns
            WHERE table_name = 'product_images'
              AND table_schema = ANY(current_schemas(false))
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(|e| {
            CatalogError::StorageUnavailable(format!(
                "inspect product_images columns: {e}"
            ))
        })?;

        Ok(Self::from_columns(columns.iter().map(String::as_str)))
    }

    pub fn from_columns<'a>(columns: impl IntoIterator<Item = &'a str>) -> Self {
        let columns: Vec<&str> = columns.into_iter().collect();
        Self {
            has_display_order: columns.contains(&CANONICAL_ORDER_COLUMN),
            aliases: LEGACY_ORDER_COLUMNS
                .into_iter()
                .filter(|alias| columns.contains(alias))
                .collect(),
        }
    }

    pub fn has_display_order(&self) -> bool {
        self.has_display_order
    }

    pub fn aliases(&self) -> &[&'static str] {
        &self.aliases
    }

    /// The backfill statement, or `None` when there is nothing to fold.
    ///
    /// Column names come from [`LEGACY_ORDER_COLUMNS`], never from input, so
    /// interpolating them is safe.
    pub fn consolidation_sql(&self) -> Option<String> {
        if self.aliases.is_empty() {
            return None;
        }
        let source = format!("COALESCE({})", self.aliases.join(", "));
        Some(format!(
            "UPDATE product_images \
             SET {CANONICAL_ORDER_COLUMN} = {source}, updated_at = NOW() \
             WHERE {CANONICAL_ORDER_COLUMN} IS NULL AND {source} IS NOT NULL"
        ))
    }

    /// Copy legacy order values into `display_order` where it is still null.
    /// Returns the number of rows touched.
    pub async fn consolidate(&self, pool: &PgPool) -> Result<u64> {
        if !self.has_display_order {
            return Err(CatalogError::Migration(format!(
                "product_images has no {CANONICAL_ORDER_COLUMN} column; run migrations first"
            )));
        }
        let Some(sql) = self.consolidation_sql() else {
            info!("no legacy order columns present; nothing to consolidate");
            return Ok(0);
        };

        let result = sqlx::query(&sql).execute(pool).await.map_err(|e| {
            CatalogError::StorageUnavailable(format!(
                "consolidate legacy order columns: {e}"
            ))
        })?;
        let touched = result.rows_affected();
        if touched > 0 {
            warn!(
                rows = touched,
                aliases = ?self.aliases,
                "backfilled display_order from legacy columns"
            );
        }
        Ok(touched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_only_known_aliases() {
        let cols = LegacyOrderColumns::from_columns([
            "id",
            "display_order",
            "sort_order",
            "position",
        ]);
        assert!(cols.has_display_order());
        assert_eq!(cols.aliases(), &["sort_order"]);
    }

    #[test]
    fn consolidation_prefers_image_order_over_sort_order() {
        let cols = LegacyOrderColumns::from_columns([
            "display_order",
            "sort_order",
            "image_order",
        ]);
        let sql = cols.consolidation_sql().unwrap();
        assert!(sql.contains("COALESCE(image_order, sort_order)"));
        assert!(sql.contains("WHERE display_order IS NULL"));
    }

    #[test]
    fn no_aliases_means_no_statement() {
        let cols = LegacyOrderColumns::from_columns(["display_order"]);
        assert_eq!(cols.consolidation_sql(), None);
    }
}
