pub mod repo;
pub mod repo_types;

pub use repo::CatalogStore;
pub use repo_types::{Ingredient, NewIngredient, NewRecipe, NewTag, Recipe, Tag};
