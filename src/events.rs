use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

/// Events emitted by the services after successful state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Ingredient events
    IngredientCreated(i64),
    IngredientUpdated(i64),
    IngredientDeleted(i64),

    // Recipe events
    RecipeCreated(i64),
    RecipeUpdated(i64),
    RecipeDeleted(i64),
    IngredientAssociated {
        recipe_id: i64,
        ingredient_id: i64,
        quantity: Decimal,
        unit_price: Decimal,
    },
    IngredientDissociated {
        recipe_id: i64,
        ingredient_id: i64,
    },

    // Sale events
    SaleRecorded(i64),
    SaleUpdated(i64),
    SaleDeleted(i64),

    // Waste events
    WasteRecorded {
        waste_id: i64,
        ingredient_id: i64,
        quantity: Decimal,
    },
    WasteDeleted(i64),

    // User events
    UserCreated(i64),
    UserUpdated(i64),
    UserDeleted(i64),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging (rather than propagating) delivery failures.
    /// State changes have already committed by the time events fire, so a
    /// full channel must not fail the request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event.clone()).await {
            error!("Dropping event {:?}: {}", event, e);
        }
    }
}

/// Consumes events off the channel and logs them. Runs until every
/// EventSender clone has been dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::WasteRecorded {
                waste_id,
                ingredient_id,
                quantity,
            } => {
                info!(
                    waste_id = %waste_id,
                    ingredient_id = %ingredient_id,
                    quantity = %quantity,
                    "Waste recorded"
                );
            }
            Event::IngredientAssociated {
                recipe_id,
                ingredient_id,
                quantity,
                unit_price,
            } => {
                info!(
                    recipe_id = %recipe_id,
                    ingredient_id = %ingredient_id,
                    quantity = %quantity,
                    unit_price = %unit_price,
                    "Ingredient associated to recipe"
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}
