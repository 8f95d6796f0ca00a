use std::collections::BTreeMap;

use serde::Serialize;
use storefront_model::{ProductId, ProductImage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductImageCount {
    pub product_id: ProductId,
    pub images: usize,
}

/// Headline numbers for the image catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub total_images: usize,
    pub products_with_images: usize,
    /// Products whose gallery holds more than one image, ascending by id.
    pub multi_image_products: Vec<ProductImageCount>,
    pub primary_images: usize,
    pub unpositioned_images: usize,
}

impl CatalogSummary {
    pub fn from_rows(
        all: &[ProductImage],
        primaries: &[ProductImage],
        unpositioned: &[ProductImage],
    ) -> Self {
        let mut counts: BTreeMap<ProductId, usize> = BTreeMap::new();
        for image in all {
            *counts.entry(image.product_id).or_default() += 1;
        }

        Self {
            total_images: all.len(),
            products_with_images: counts.len(),
            multi_image_products: counts
                .into_iter()
                .filter(|&(_, images)| images > 1)
                .map(|(product_id, images)| ProductImageCount { product_id, images })
                .collect(),
            primary_images: primaries.len(),
            unpositioned_images: unpositioned.len(),
        }
    }
}
