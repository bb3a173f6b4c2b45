//! Service-level tests for sales: validation, recipe linking, replace
//! semantics on update, and the completed/pending summary.

mod common;

use cocina_api::errors::ServiceError;
use cocina_api::services::recipes::CreateRecipeInput;
use cocina_api::services::sales::{CreateSaleInput, UpdateSaleInput};
use rust_decimal_macros::dec;

async fn seed_recipe(state: &cocina_api::AppState, name: &str) -> i64 {
    state
        .services
        .recipes
        .create_recipe(CreateRecipeInput {
            name: name.to_string(),
            description: String::new(),
            portions: dec!(2),
            category: "platos".to_string(),
            ingredients: Vec::new(),
        })
        .await
        .expect("seed recipe")
        .id
}

#[tokio::test]
async fn record_sale_links_all_recipes() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;
    let agua = seed_recipe(&state, "Agua fresca").await;

    let sale = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: vec![tacos, agua],
            total: dec!(180.00),
            completed: true,
        })
        .await
        .expect("record sale");

    assert_eq!(sale.total, dec!(180.00));
    assert!(sale.completed);
    assert_eq!(sale.recipe_ids, vec![tacos, agua]);

    let fetched = state
        .services
        .sales
        .get_sale(sale.id)
        .await
        .unwrap()
        .expect("sale exists");
    assert_eq!(fetched.recipe_ids.len(), 2);
}

#[tokio::test]
async fn record_sale_with_empty_recipe_list_fails() {
    let state = common::setup_state().await;

    let err = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: Vec::new(),
            total: dec!(10),
            completed: false,
        })
        .await
        .expect_err("empty recipe list must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn record_sale_with_unknown_recipe_fails_and_creates_nothing() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;

    let err = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: vec![tacos, 9_999],
            total: dec!(50),
            completed: false,
        })
        .await
        .expect_err("unknown recipe id must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let (sales, total) = state
        .services
        .sales
        .list_sales(1, 10, None, None)
        .await
        .unwrap();
    assert!(sales.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn record_sale_with_negative_total_fails() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;

    let err = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: vec![tacos],
            total: dec!(-0.01),
            completed: false,
        })
        .await
        .expect_err("negative total must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn duplicate_recipe_ids_collapse_to_one_link() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;

    let sale = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: vec![tacos, tacos, tacos],
            total: dec!(90),
            completed: false,
        })
        .await
        .unwrap();

    assert_eq!(sale.recipe_ids, vec![tacos]);
}

#[tokio::test]
async fn update_sale_replaces_the_linked_set() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;
    let agua = seed_recipe(&state, "Agua fresca").await;
    let flan = seed_recipe(&state, "Flan").await;

    let sale = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: vec![tacos, agua],
            total: dec!(120),
            completed: false,
        })
        .await
        .unwrap();

    let updated = state
        .services
        .sales
        .update_sale(
            sale.id,
            UpdateSaleInput {
                recipe_ids: Some(vec![flan]),
                total: Some(dec!(45)),
                completed: Some(true),
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.recipe_ids, vec![flan]);
    assert_eq!(updated.total, dec!(45));
    assert!(updated.completed);
}

#[tokio::test]
async fn update_sale_with_unknown_recipe_keeps_old_links() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;

    let sale = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: vec![tacos],
            total: dec!(60),
            completed: false,
        })
        .await
        .unwrap();

    let err = state
        .services
        .sales
        .update_sale(
            sale.id,
            UpdateSaleInput {
                recipe_ids: Some(vec![9_999]),
                ..Default::default()
            },
        )
        .await
        .expect_err("unknown recipe id must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let fetched = state
        .services
        .sales
        .get_sale(sale.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.recipe_ids, vec![tacos]);
}

#[tokio::test]
async fn update_missing_sale_is_not_found() {
    let state = common::setup_state().await;

    let err = state
        .services
        .sales
        .update_sale(9_999, UpdateSaleInput::default())
        .await
        .expect_err("missing sale must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn summary_counts_completed_and_pending() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;

    for (total, completed) in [
        (dec!(100.00), true),
        (dec!(55.50), true),
        (dec!(70.00), false),
    ] {
        state
            .services
            .sales
            .record_sale(CreateSaleInput {
                recipe_ids: vec![tacos],
                total,
                completed,
            })
            .await
            .unwrap();
    }

    let summary = state.services.sales.summary(None, None).await.unwrap();

    assert_eq!(summary.completed_sales, 2);
    assert_eq!(summary.pending_sales, 1);
    assert_eq!(summary.completed_total, dec!(155.50));
}

#[tokio::test]
async fn deleting_a_sale_removes_it_from_listings() {
    let state = common::setup_state().await;
    let tacos = seed_recipe(&state, "Tacos").await;

    let sale = state
        .services
        .sales
        .record_sale(CreateSaleInput {
            recipe_ids: vec![tacos],
            total: dec!(30),
            completed: false,
        })
        .await
        .unwrap();

    state.services.sales.delete_sale(sale.id).await.unwrap();

    assert!(state
        .services
        .sales
        .get_sale(sale.id)
        .await
        .unwrap()
        .is_none());
}
