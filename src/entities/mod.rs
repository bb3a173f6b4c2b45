pub mod ingredient;
pub mod recipe;
pub mod recipe_ingredient;
pub mod sale;
pub mod sale_recipe;
pub mod user;
pub mod waste_record;
