//! Service-level tests for waste records: validation, the ledger
//! adjustment applied on record, and per-ingredient summaries.

mod common;

use cocina_api::errors::ServiceError;
use cocina_api::services::ingredients::CreateIngredientInput;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn seed_ingredient(state: &cocina_api::AppState, name: &str, quantity: Decimal) -> i64 {
    state
        .services
        .ingredients
        .create_ingredient(CreateIngredientInput {
            name: name.to_string(),
            quantity,
            unit: "kg".to_string(),
            unit_price: dec!(1.00),
        })
        .await
        .expect("seed ingredient")
        .id
}

#[tokio::test]
async fn record_waste_adjusts_the_ledger_by_the_waste_quantity() {
    let state = common::setup_state().await;
    let ingredient_id = seed_ingredient(&state, "Pollo", dec!(10)).await;

    let record = state
        .services
        .waste
        .record_waste(ingredient_id, dec!(2.50))
        .await
        .expect("record waste");

    assert_eq!(record.ingredient_id, ingredient_id);
    assert_eq!(record.quantity, dec!(2.50));

    let ingredient = state
        .services
        .ingredients
        .get_ingredient(ingredient_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ingredient.quantity, dec!(12.50));
}

#[tokio::test]
async fn record_waste_with_non_positive_quantity_fails() {
    let state = common::setup_state().await;
    let ingredient_id = seed_ingredient(&state, "Pollo", dec!(10)).await;

    for quantity in [dec!(0), dec!(-1)] {
        let err = state
            .services
            .waste
            .record_waste(ingredient_id, quantity)
            .await
            .expect_err("non-positive quantity must fail");
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    // Ledger untouched
    let ingredient = state
        .services
        .ingredients
        .get_ingredient(ingredient_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ingredient.quantity, dec!(10));
}

#[tokio::test]
async fn record_waste_against_unknown_ingredient_fails() {
    let state = common::setup_state().await;

    let err = state
        .services
        .waste
        .record_waste(9_999, dec!(1))
        .await
        .expect_err("unknown ingredient must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn repeated_waste_submissions_accumulate() {
    let state = common::setup_state().await;
    let ingredient_id = seed_ingredient(&state, "Pescado", dec!(0)).await;

    for _ in 0..4 {
        state
            .services
            .waste
            .record_waste(ingredient_id, dec!(0.25))
            .await
            .unwrap();
    }

    let ingredient = state
        .services
        .ingredients
        .get_ingredient(ingredient_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ingredient.quantity, dec!(1.00));

    let (records, total) = state
        .services
        .waste
        .list_waste_records(1, 10, None, None)
        .await
        .unwrap();
    assert_eq!(records.len(), 4);
    assert_eq!(total, 4);
}

#[tokio::test]
async fn summary_groups_by_ingredient_descending() {
    let state = common::setup_state().await;
    let chicken = seed_ingredient(&state, "Pollo", dec!(10)).await;
    let fish = seed_ingredient(&state, "Pescado", dec!(10)).await;

    state
        .services
        .waste
        .record_waste(chicken, dec!(1.00))
        .await
        .unwrap();
    state
        .services
        .waste
        .record_waste(fish, dec!(2.00))
        .await
        .unwrap();
    state
        .services
        .waste
        .record_waste(fish, dec!(1.50))
        .await
        .unwrap();

    let summary = state
        .services
        .waste
        .summary_by_ingredient(None, None)
        .await
        .unwrap();

    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].ingredient_name, "Pescado");
    assert_eq!(summary[0].total_quantity, dec!(3.50));
    assert_eq!(summary[1].ingredient_name, "Pollo");
    assert_eq!(summary[1].total_quantity, dec!(1.00));
}

#[tokio::test]
async fn deleting_a_waste_record_leaves_the_ledger_adjustment() {
    let state = common::setup_state().await;
    let ingredient_id = seed_ingredient(&state, "Pollo", dec!(10)).await;

    let record = state
        .services
        .waste
        .record_waste(ingredient_id, dec!(3))
        .await
        .unwrap();

    state
        .services
        .waste
        .delete_waste_record(record.id)
        .await
        .unwrap();

    assert!(state
        .services
        .waste
        .get_waste_record(record.id)
        .await
        .unwrap()
        .is_none());

    let ingredient = state
        .services
        .ingredients
        .get_ingredient(ingredient_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ingredient.quantity, dec!(13));
}

#[tokio::test]
async fn deleting_a_missing_waste_record_is_not_found() {
    let state = common::setup_state().await;

    let err = state
        .services
        .waste
        .delete_waste_record(9_999)
        .await
        .expect_err("missing record must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
