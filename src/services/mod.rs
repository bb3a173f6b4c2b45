// Core services
pub mod ingredients;
pub mod recipes;
pub mod sales;
pub mod users;
pub mod waste;
