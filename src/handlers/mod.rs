pub mod common;
pub mod ingredients;
pub mod recipes;
pub mod sales;
pub mod users;
pub mod waste;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub ingredients: Arc<crate::services::ingredients::IngredientService>,
    pub recipes: Arc<crate::services::recipes::RecipeService>,
    pub sales: Arc<crate::services::sales::SalesService>,
    pub waste: Arc<crate::services::waste::WasteService>,
    pub users: Arc<crate::services::users::UserService>,
}

impl AppServices {
    /// Builds the full services container over one shared pool and event channel.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let ingredients = Arc::new(crate::services::ingredients::IngredientService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let recipes = Arc::new(crate::services::recipes::RecipeService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let sales = Arc::new(crate::services::sales::SalesService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let waste = Arc::new(crate::services::waste::WasteService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let users = Arc::new(crate::services::users::UserService::new(
            db_pool,
            event_sender,
        ));

        Self {
            ingredients,
            recipes,
            sales,
            waste,
            users,
        }
    }
}
