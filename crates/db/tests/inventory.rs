//! Integration tests for the inventory repository against a real database.

use sqlx::PgPool;
use stockroom_db::models::inventory::CreateInventoryLevel;
use stockroom_db::repositories::InventoryRepo;

fn level(variant_id: i64, on_hand: i64, reserved: i64) -> CreateInventoryLevel {
    CreateInventoryLevel {
        variant_id,
        location_id: None,
        quantity_on_hand: on_hand,
        quantity_reserved: Some(reserved),
        minimum_threshold: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_and_aggregate_counts(pool: PgPool) {
    InventoryRepo::create(&pool, &level(1, 10, 2)).await.unwrap();
    InventoryRepo::create(
        &pool,
        &CreateInventoryLevel {
            variant_id: 1,
            location_id: Some(2),
            quantity_on_hand: 5,
            quantity_reserved: Some(1),
            minimum_threshold: None,
        },
    )
    .await
    .unwrap();

    let counts = InventoryRepo::counts_for_variant(&pool, 1)
        .await
        .unwrap()
        .expect("variant 1 has inventory");
    assert_eq!(counts.quantity_on_hand, 15);
    assert_eq!(counts.quantity_reserved, 3);
    assert_eq!(counts.available(), 12);

    assert!(InventoryRepo::counts_for_variant(&pool, 999)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reserve_takes_from_the_location_with_most_availability(pool: PgPool) {
    InventoryRepo::create(&pool, &level(7, 3, 0)).await.unwrap();
    InventoryRepo::create(
        &pool,
        &CreateInventoryLevel {
            variant_id: 7,
            location_id: Some(2),
            quantity_on_hand: 10,
            quantity_reserved: Some(0),
            minimum_threshold: None,
        },
    )
    .await
    .unwrap();

    let updated = InventoryRepo::reserve(&pool, 7, 4)
        .await
        .unwrap()
        .expect("location 2 can cover 4 units");
    assert_eq!(updated.location_id, 2);
    assert_eq!(updated.quantity_reserved, 4);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reserve_fails_when_no_location_has_enough(pool: PgPool) {
    InventoryRepo::create(&pool, &level(7, 3, 1)).await.unwrap();

    let result = InventoryRepo::reserve(&pool, 7, 5).await.unwrap();
    assert!(result.is_none(), "2 available cannot cover 5");

    // The failed attempt must not have touched the counter.
    let counts = InventoryRepo::counts_for_variant(&pool, 7)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counts.quantity_reserved, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_reserved_decrements_inside_a_transaction(pool: PgPool) {
    InventoryRepo::create(&pool, &level(3, 10, 5)).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let touched = InventoryRepo::release_reserved(&mut tx, 3, 3).await.unwrap();
    assert!(touched.is_some());
    tx.commit().await.unwrap();

    let counts = InventoryRepo::counts_for_variant(&pool, 3)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counts.quantity_reserved, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn release_reserved_refuses_to_underflow(pool: PgPool) {
    InventoryRepo::create(&pool, &level(3, 10, 2)).await.unwrap();

    let mut tx = pool.begin().await.unwrap();
    let touched = InventoryRepo::release_reserved(&mut tx, 3, 5).await.unwrap();
    assert!(touched.is_none(), "no row holds 5 reserved units");
    tx.rollback().await.unwrap();

    let counts = InventoryRepo::counts_for_variant(&pool, 3)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(counts.quantity_reserved, 2, "counter must be untouched");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn low_stock_listing_respects_the_threshold(pool: PgPool) {
    InventoryRepo::create(
        &pool,
        &CreateInventoryLevel {
            variant_id: 1,
            location_id: None,
            quantity_on_hand: 10,
            quantity_reserved: Some(9),
            minimum_threshold: Some(2),
        },
    )
    .await
    .unwrap();
    InventoryRepo::create(
        &pool,
        &CreateInventoryLevel {
            variant_id: 2,
            location_id: None,
            quantity_on_hand: 10,
            quantity_reserved: Some(1),
            minimum_threshold: Some(2),
        },
    )
    .await
    .unwrap();

    let low = InventoryRepo::list_low_stock(&pool).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].variant_id, 1);
}
