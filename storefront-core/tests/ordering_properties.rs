//! Gallery ordering behaviour against the in-memory image table.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use futures::StreamExt;
use storefront_core::{
    CatalogError,
    database::InMemoryProductImageRepository,
    ordering::{ImageOrderingService, PositionMismatch, RepairReport, RepairStage},
};
use storefront_model::{ImageId, ProductId, ProductImage};
use uuid::Uuid;

fn t(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 14, 10, minute, 0).unwrap()
}

fn row(
    id: u128,
    product: i64,
    created: u32,
    position: Option<i32>,
    is_primary: bool,
) -> ProductImage {
    ProductImage {
        id: ImageId(Uuid::from_u128(id)),
        product_id: ProductId(product),
        position,
        is_primary,
        image_url: format!("https://cdn.example/products/{product}/{id}.webp"),
        created_at: t(created),
        updated_at: t(created),
    }
}

async fn by_id(repo: &InMemoryProductImageRepository, id: u128) -> ProductImage {
    repo.get(ImageId(Uuid::from_u128(id)))
        .await
        .expect("row should exist")
}

fn messy_catalog() -> Vec<ProductImage> {
    vec![
        row(1, 10, 3, None, false),
        row(2, 10, 1, Some(4), true),
        row(3, 10, 2, Some(4), true),
        row(4, 20, 5, Some(2), false),
        row(5, 30, 0, None, false),
        row(6, 30, 9, Some(1), false),
        row(7, 30, 4, Some(7), true),
    ]
}

#[tokio::test]
async fn worked_example_three_images() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images([
        row(1, 1, 1, None, false),
        row(2, 1, 2, Some(5), false),
        row(3, 1, 3, None, true),
    ]));
    let svc = ImageOrderingService::new(repo.clone());

    svc.normalize_positions(ProductId(1)).await.unwrap();
    svc.assign_primary(ProductId(1)).await.unwrap();

    let first = by_id(&repo, 1).await;
    let second = by_id(&repo, 2).await;
    let third = by_id(&repo, 3).await;
    assert_eq!((first.position, first.is_primary), (Some(1), true));
    assert_eq!((second.position, second.is_primary), (Some(2), false));
    assert_eq!((third.position, third.is_primary), (Some(3), false));
}

#[tokio::test]
async fn upload_time_decides_order_regardless_of_enumeration() {
    // Inserted as [t3, t1, t2].
    let repo = Arc::new(InMemoryProductImageRepository::with_images([
        row(30, 1, 3, None, false),
        row(10, 1, 1, None, false),
        row(20, 1, 2, None, false),
    ]));
    let svc = ImageOrderingService::new(repo.clone());

    let report = svc.normalize_positions(ProductId(1)).await.unwrap();
    assert_eq!(report, RepairReport::ok(ProductId(1), 3, 3));

    assert_eq!(by_id(&repo, 10).await.position, Some(1));
    assert_eq!(by_id(&repo, 20).await.position, Some(2));
    assert_eq!(by_id(&repo, 30).await.position, Some(3));
}

#[tokio::test]
async fn normalized_positions_are_exactly_one_to_n() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    let svc = ImageOrderingService::new(repo.clone());

    for product in [10, 20, 30] {
        svc.normalize_positions(ProductId(product)).await.unwrap();
    }

    let rows = repo.snapshot().await;
    for product in [10, 20, 30] {
        let mut positions: Vec<i32> = rows
            .iter()
            .filter(|r| r.product_id == ProductId(product))
            .filter_map(|r| r.position)
            .collect();
        positions.sort_unstable();
        let n = rows.iter().filter(|r| r.product_id == ProductId(product)).count();
        assert_eq!(positions, (1..=n as i32).collect::<Vec<_>>(), "product {product}");
    }
}

#[tokio::test]
async fn exactly_one_primary_at_front_after_repair() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    let svc = ImageOrderingService::new(repo.clone());

    let reports: Vec<RepairReport> = svc.repair_all().await.unwrap().collect().await;
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(RepairReport::is_ok));

    let rows = repo.snapshot().await;
    for product in [10, 20, 30] {
        let primaries: Vec<&ProductImage> = rows
            .iter()
            .filter(|r| r.product_id == ProductId(product) && r.is_primary)
            .collect();
        assert_eq!(primaries.len(), 1, "product {product}");
        assert_eq!(primaries[0].position, Some(1));
    }
    assert!(svc.audit_consistency().await.unwrap().is_consistent());
}

#[tokio::test]
async fn second_repair_pass_changes_nothing() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    let svc = ImageOrderingService::new(repo.clone());

    let first: Vec<RepairReport> = svc.repair_all().await.unwrap().collect().await;
    assert!(first.iter().any(|r| r.changed_count > 0));
    let writes_after_first = repo.write_count();

    let second: Vec<RepairReport> = svc.repair_all().await.unwrap().collect().await;
    assert!(second.iter().all(|r| r.is_ok() && r.changed_count == 0));
    assert_eq!(repo.write_count(), writes_after_first);
}

#[tokio::test]
async fn failing_product_does_not_stop_the_others() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images([
        row(1, 1, 2, None, false),
        row(2, 1, 1, None, true),
        row(3, 2, 2, Some(9), true),
        row(4, 2, 1, None, false),
    ]));
    repo.fail_reads_for(ProductId(1)).await;
    let svc = ImageOrderingService::new(repo.clone());

    let reports: Vec<RepairReport> = svc.repair_all().await.unwrap().collect().await;
    assert_eq!(reports.len(), 2);

    let a = &reports[0];
    assert_eq!(a.product_id, ProductId(1));
    let failure = a.failure.as_ref().expect("product 1 should fail");
    assert_eq!(failure.stage, RepairStage::Normalize);
    assert!(failure.message.contains("Storage unavailable"));

    let b = &reports[1];
    assert_eq!(b.product_id, ProductId(2));
    assert!(b.is_ok());
    assert_eq!(b.record_count, 2);
    // two positions move, old primary cleared, new primary set
    assert_eq!(b.changed_count, 4);

    repo.heal().await;
    let retry: Vec<RepairReport> = svc.repair_all().await.unwrap().collect().await;
    assert!(retry.iter().all(RepairReport::is_ok));
    assert_eq!(retry[1].changed_count, 0);
    assert!(svc.audit_consistency().await.unwrap().is_consistent());
}

#[tokio::test]
async fn empty_product_performs_no_writes() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    let svc = ImageOrderingService::new(repo.clone());

    let report = svc.normalize_positions(ProductId(999)).await.unwrap();
    assert_eq!(report.changed_count, 0);
    assert_eq!(report.record_count, 0);
    assert_eq!(repo.write_count(), 0);
}

#[tokio::test]
async fn audit_reports_without_mutating() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    let svc = ImageOrderingService::new(repo.clone());
    let before = repo.snapshot().await;

    let audit = svc.audit_consistency().await.unwrap();
    assert_eq!(audit.products_checked, 3);
    assert_eq!(audit.position_violations, vec![ProductId(10), ProductId(20), ProductId(30)]);
    assert_eq!(audit.multiple_primaries, vec![ProductId(10)]);
    assert_eq!(audit.missing_primary, vec![ProductId(20)]);
    assert_eq!(audit.misplaced_primary, vec![ProductId(30)]);

    let detail = &audit.details[0];
    assert_eq!(audit.details.len(), 3);
    assert_eq!(detail.product_id, ProductId(10));
    assert_eq!((detail.image_count, detail.primary_count), (3, 2));
    let expected = [(2, 1, Some(4)), (3, 2, Some(4)), (1, 3, None)].map(
        |(id, expected, actual)| PositionMismatch {
            image_id: ImageId(Uuid::from_u128(id)),
            expected,
            actual,
        },
    );
    assert_eq!(detail.misordered, expected);

    assert_eq!(repo.snapshot().await, before);
    assert_eq!(repo.write_count(), 0);
}

#[tokio::test]
async fn audit_surfaces_a_failed_catalog_read() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    repo.fail_catalog_scans();
    let svc = ImageOrderingService::new(repo.clone());

    let audit = svc.audit_consistency().await;
    assert!(matches!(audit, Err(CatalogError::StorageUnavailable(_))));
    assert_eq!(repo.write_count(), 0);
}

#[tokio::test]
async fn repair_all_fails_before_any_write_when_enumeration_fails() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    repo.fail_catalog_scans();
    let svc = ImageOrderingService::new(repo.clone());

    assert!(matches!(svc.repair_all().await, Err(CatalogError::StorageUnavailable(_))));
    assert_eq!(repo.write_count(), 0);
    assert_eq!(repo.storage_locks_taken(), 0);
    assert_eq!(repo.snapshot().await, messy_catalog());
}

#[tokio::test]
async fn storage_locks_are_returned_after_every_repair() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(messy_catalog()));
    repo.fail_writes_for(ProductId(20)).await;
    let svc = ImageOrderingService::new(repo.clone());

    let reports: Vec<RepairReport> = svc.repair_all().await.unwrap().collect().await;
    assert!(!reports[1].is_ok());
    assert_eq!(repo.storage_locks_taken(), 3);
    assert_eq!(repo.storage_locks_held(), 0);
    assert!(svc.locks().is_empty());
}

#[tokio::test]
async fn repair_waits_for_an_admin_holding_the_product() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images([
        row(1, 1, 2, None, true),
        row(2, 1, 1, None, false),
    ]));
    let svc = Arc::new(ImageOrderingService::new(repo.clone()));

    let admin = svc.lock_product(ProductId(1)).await;
    let task = tokio::spawn({
        let svc = svc.clone();
        async move { svc.repair_product(ProductId(1)).await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!task.is_finished());
    assert_eq!(repo.write_count(), 0);

    drop(admin);
    let report = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("repair should finish once the lock is released")
        .expect("task should not panic");
    assert!(report.is_ok());
    assert!(svc.audit_consistency().await.unwrap().is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_repairs_of_one_product_converge() {
    let repo = Arc::new(InMemoryProductImageRepository::with_images(
        (0..8u32).map(|i| row(u128::from(i) + 1, 5, 8 - i, None, i % 2 == 0)),
    ));
    let svc = Arc::new(ImageOrderingService::new(repo.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let svc = svc.clone();
            tokio::spawn(async move { svc.repair_product(ProductId(5)).await })
        })
        .collect();

    let mut total_changes = 0;
    for handle in handles {
        let report = handle.await.unwrap();
        assert!(report.is_ok());
        total_changes += report.changed_count;
    }

    // Serialized passes: the first does all the work, the rest find nothing.
    // Eight moves, four stale primaries cleared, one new primary set.
    let expected_first_pass = 8 + 4 + 1;
    assert_eq!(total_changes, expected_first_pass);
    assert_eq!(repo.write_count(), expected_first_pass);
    assert!(svc.audit_consistency().await.unwrap().is_consistent());
}
