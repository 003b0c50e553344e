use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Recipe owned by a user. Deleted together with its owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub time_minutes: i32,
    pub price: Decimal, // NUMERIC(5, 2)
    pub link: Option<String>,
    pub image: Option<String>, // object key from recipe_image_file_path
    pub created_at: OffsetDateTime, // set on insert
    pub updated_at: OffsetDateTime, // set on every write
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: Option<String>,
    pub image: Option<String>,
}

impl NewRecipe {
    pub fn new(user_id: i64, title: impl Into<String>, time_minutes: i32, price: Decimal) -> Self {
        Self {
            user_id,
            title: title.into(),
            description: None,
            time_minutes,
            price,
            link: None,
            image: None,
        }
    }
}

/// Tag owned by a user. Deleted together with its owner.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTag {
    pub user_id: i64,
    pub name: String,
}

/// Ingredient associated with a user. Survives the user's deletion, after
/// which `user_id` no longer resolves.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewIngredient {
    pub user_id: i64,
    pub name: String,
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

impl std::fmt::Display for Ingredient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}
