//! Service-level tests for the ingredient ledger: validation, the
//! delete-guard on referenced ingredients, low-stock listing, and
//! inventory valuation.

mod common;

use cocina_api::errors::ServiceError;
use cocina_api::services::ingredients::{CreateIngredientInput, UpdateIngredientInput};
use cocina_api::services::recipes::{CreateRecipeInput, RecipeIngredientInput};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn ingredient_input(name: &str, quantity: Decimal, unit_price: Decimal) -> CreateIngredientInput {
    CreateIngredientInput {
        name: name.to_string(),
        quantity,
        unit: "kg".to_string(),
        unit_price,
    }
}

#[tokio::test]
async fn create_ingredient_persists_fields() {
    let state = common::setup_state().await;

    let created = state
        .services
        .ingredients
        .create_ingredient(ingredient_input("Tomate", dec!(25.00), dec!(1.20)))
        .await
        .expect("create ingredient");

    assert_eq!(created.name, "Tomate");
    assert_eq!(created.quantity, dec!(25.00));
    assert_eq!(created.unit_price, dec!(1.20));

    let fetched = state
        .services
        .ingredients
        .get_ingredient(created.id)
        .await
        .expect("get ingredient")
        .expect("ingredient exists");
    assert_eq!(fetched.id, created.id);
}

#[tokio::test]
async fn negative_quantity_or_price_is_rejected() {
    let state = common::setup_state().await;

    let err = state
        .services
        .ingredients
        .create_ingredient(ingredient_input("Cebolla", dec!(-1), dec!(0.80)))
        .await
        .expect_err("negative quantity must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = state
        .services
        .ingredients
        .create_ingredient(ingredient_input("Cebolla", dec!(1), dec!(-0.80)))
        .await
        .expect_err("negative price must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = state
        .services
        .ingredients
        .create_ingredient(ingredient_input("  ", dec!(1), dec!(0.80)))
        .await
        .expect_err("blank name must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn update_rejects_negative_values_and_keeps_state() {
    let state = common::setup_state().await;

    let created = state
        .services
        .ingredients
        .create_ingredient(ingredient_input("Leche", dec!(10), dec!(0.95)))
        .await
        .unwrap();

    let err = state
        .services
        .ingredients
        .update_ingredient(
            created.id,
            UpdateIngredientInput {
                quantity: Some(dec!(-3)),
                ..Default::default()
            },
        )
        .await
        .expect_err("negative update must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let unchanged = state
        .services
        .ingredients
        .get_ingredient(created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.quantity, dec!(10));
}

#[tokio::test]
async fn deleting_a_referenced_ingredient_is_refused() {
    let state = common::setup_state().await;

    let flour = state
        .services
        .ingredients
        .create_ingredient(ingredient_input("Harina", dec!(50), dec!(0.60)))
        .await
        .unwrap();

    state
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: "Pan".to_string(),
            description: "Pan de caja".to_string(),
            portions: dec!(8),
            category: "panaderia".to_string(),
            ingredients: vec![RecipeIngredientInput {
                ingredient_id: flour.id,
                quantity: dec!(2),
            }],
        })
        .await
        .unwrap();

    let err = state
        .services
        .ingredients
        .delete_ingredient(flour.id)
        .await
        .expect_err("delete of referenced ingredient must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Still present
    assert!(state
        .services
        .ingredients
        .get_ingredient(flour.id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn deleting_an_unreferenced_ingredient_succeeds() {
    let state = common::setup_state().await;

    let sugar = state
        .services
        .ingredients
        .create_ingredient(ingredient_input("Azucar", dec!(5), dec!(1.10)))
        .await
        .unwrap();

    state
        .services
        .ingredients
        .delete_ingredient(sugar.id)
        .await
        .expect("delete unreferenced ingredient");

    assert!(state
        .services
        .ingredients
        .get_ingredient(sugar.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn low_stock_uses_strict_comparison() {
    let state = common::setup_state().await;
    let svc = &state.services.ingredients;

    svc.create_ingredient(ingredient_input("Bajo", dec!(5), dec!(1)))
        .await
        .unwrap();
    svc.create_ingredient(ingredient_input("Justo", dec!(10), dec!(1)))
        .await
        .unwrap();
    svc.create_ingredient(ingredient_input("Sobrado", dec!(15), dec!(1)))
        .await
        .unwrap();

    let low = svc.low_stock(dec!(10)).await.unwrap();

    assert_eq!(low.len(), 1);
    assert_eq!(low[0].name, "Bajo");
    assert_eq!(low[0].quantity, dec!(5));
}

#[tokio::test]
async fn inventory_value_sums_quantity_times_price() {
    let state = common::setup_state().await;
    let svc = &state.services.ingredients;

    assert_eq!(svc.total_inventory_value().await.unwrap(), dec!(0));

    svc.create_ingredient(ingredient_input("A", dec!(2), dec!(2.50)))
        .await
        .unwrap();
    svc.create_ingredient(ingredient_input("B", dec!(1.5), dec!(3.00)))
        .await
        .unwrap();

    // 2 * 2.50 + 1.5 * 3.00 = 9.50, exactly
    assert_eq!(svc.total_inventory_value().await.unwrap(), dec!(9.50));
}
