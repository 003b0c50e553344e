use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tracing::debug;

use crate::db::{map_write_error, PgStore};
use crate::error::{ModelError, ModelResult};
use crate::fields::{
    check_max_length, check_optional_max_length, check_positive, check_price, MAX_CHAR_LENGTH,
};
use crate::recipes::repo_types::{Ingredient, NewIngredient, NewRecipe, NewTag, Recipe, Tag};

/// Persistence seam for the recipe catalog.
///
/// Every listing is ordered by descending id. Write routines own the
/// timestamps: `created_at` is set on insert, `updated_at` on insert and on
/// every update; values carried by the caller are ignored.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_tag(&self, new: NewTag) -> ModelResult<Tag>;
    async fn get_tag(&self, id: i64) -> ModelResult<Option<Tag>>;
    async fn list_tags(&self, owner: Option<i64>) -> ModelResult<Vec<Tag>>;
    async fn update_tag(&self, tag: &Tag) -> ModelResult<Tag>;
    async fn delete_tag(&self, id: i64) -> ModelResult<()>;

    async fn insert_ingredient(&self, new: NewIngredient) -> ModelResult<Ingredient>;
    async fn get_ingredient(&self, id: i64) -> ModelResult<Option<Ingredient>>;
    async fn list_ingredients(&self, owner: Option<i64>) -> ModelResult<Vec<Ingredient>>;
    async fn update_ingredient(&self, ingredient: &Ingredient) -> ModelResult<Ingredient>;
    async fn delete_ingredient(&self, id: i64) -> ModelResult<()>;

    async fn insert_recipe(&self, new: NewRecipe) -> ModelResult<Recipe>;
    async fn get_recipe(&self, id: i64) -> ModelResult<Option<Recipe>>;
    async fn list_recipes(&self, owner: Option<i64>) -> ModelResult<Vec<Recipe>>;
    async fn update_recipe(&self, recipe: &Recipe) -> ModelResult<Recipe>;
    async fn delete_recipe(&self, id: i64) -> ModelResult<()>;

    /// Links a tag to a recipe. Linking the same pair twice adds a second row.
    async fn add_recipe_tag(&self, recipe_id: i64, tag_id: i64) -> ModelResult<()>;
    async fn recipe_tags(&self, recipe_id: i64) -> ModelResult<Vec<Tag>>;
    async fn clear_recipe_tags(&self, recipe_id: i64) -> ModelResult<()>;

    /// Links an ingredient to a recipe. Duplicates are kept.
    async fn add_recipe_ingredient(&self, recipe_id: i64, ingredient_id: i64) -> ModelResult<()>;
    async fn recipe_ingredients(&self, recipe_id: i64) -> ModelResult<Vec<Ingredient>>;
    async fn clear_recipe_ingredients(&self, recipe_id: i64) -> ModelResult<()>;
}

pub(crate) fn check_name(name: &str) -> ModelResult<()> {
    check_max_length("name", name, MAX_CHAR_LENGTH)
}

pub(crate) fn check_recipe_columns(
    title: &str,
    time_minutes: i32,
    price: Decimal,
    link: Option<&str>,
    image: Option<&str>,
) -> ModelResult<()> {
    check_max_length("title", title, MAX_CHAR_LENGTH)?;
    check_positive("time_minutes", time_minutes)?;
    check_price("price", price)?;
    check_optional_max_length("link", link, MAX_CHAR_LENGTH)?;
    check_optional_max_length("image", image, MAX_CHAR_LENGTH)
}

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, time_minutes, price, link, image, created_at, updated_at";

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_tag(&self, new: NewTag) -> ModelResult<Tag> {
        check_name(&new.name)?;
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (user_id, name, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.name)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "name"))?;
        debug!(tag_id = tag.id, user_id = tag.user_id, "tag inserted");
        Ok(tag)
    }

    async fn get_tag(&self, id: i64) -> ModelResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            "SELECT id, user_id, name, created_at FROM tags WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn list_tags(&self, owner: Option<i64>) -> ModelResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, user_id, name, created_at
              FROM tags
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
             ORDER BY id DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_tag(&self, tag: &Tag) -> ModelResult<Tag> {
        check_name(&tag.name)?;
        sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags SET user_id = $2, name = $3
             WHERE id = $1
            RETURNING id, user_id, name, created_at
            "#,
        )
        .bind(tag.id)
        .bind(tag.user_id)
        .bind(&tag.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "name"))?
        .ok_or_else(|| ModelError::not_found("tag", tag.id))
    }

    async fn delete_tag(&self, id: i64) -> ModelResult<()> {
        let res = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ModelError::not_found("tag", id));
        }
        Ok(())
    }

    async fn insert_ingredient(&self, new: NewIngredient) -> ModelResult<Ingredient> {
        check_name(&new.name)?;
        let ingredient = sqlx::query_as::<_, Ingredient>(
            r#"
            INSERT INTO ingredients (user_id, name)
            VALUES ($1, $2)
            RETURNING id, user_id, name
            "#,
        )
        .bind(new.user_id)
        .bind(&new.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "name"))?;
        debug!(ingredient_id = ingredient.id, user_id = ingredient.user_id, "ingredient inserted");
        Ok(ingredient)
    }

    async fn get_ingredient(&self, id: i64) -> ModelResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT id, user_id, name FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ingredient)
    }

    async fn list_ingredients(&self, owner: Option<i64>) -> ModelResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT id, user_id, name
              FROM ingredients
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
             ORDER BY id DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_ingredient(&self, ingredient: &Ingredient) -> ModelResult<Ingredient> {
        check_name(&ingredient.name)?;
        sqlx::query_as::<_, Ingredient>(
            r#"
            UPDATE ingredients SET user_id = $2, name = $3
             WHERE id = $1
            RETURNING id, user_id, name
            "#,
        )
        .bind(ingredient.id)
        .bind(ingredient.user_id)
        .bind(&ingredient.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "name"))?
        .ok_or_else(|| ModelError::not_found("ingredient", ingredient.id))
    }

    async fn delete_ingredient(&self, id: i64) -> ModelResult<()> {
        let res = sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ModelError::not_found("ingredient", id));
        }
        Ok(())
    }

    async fn insert_recipe(&self, new: NewRecipe) -> ModelResult<Recipe> {
        check_recipe_columns(
            &new.title,
            new.time_minutes,
            new.price,
            new.link.as_deref(),
            new.image.as_deref(),
        )?;
        let now = OffsetDateTime::now_utc();
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            INSERT INTO recipes (user_id, title, description, time_minutes, price, link, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {}
            "#,
            RECIPE_COLUMNS
        ))
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.time_minutes)
        .bind(new.price)
        .bind(&new.link)
        .bind(&new.image)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "recipe"))?;
        debug!(recipe_id = recipe.id, user_id = recipe.user_id, "recipe inserted");
        Ok(recipe)
    }

    async fn get_recipe(&self, id: i64) -> ModelResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {} FROM recipes WHERE id = $1",
            RECIPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn list_recipes(&self, owner: Option<i64>) -> ModelResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, Recipe>(&format!(
            r#"
            SELECT {}
              FROM recipes
             WHERE ($1::BIGINT IS NULL OR user_id = $1)
             ORDER BY id DESC
            "#,
            RECIPE_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_recipe(&self, recipe: &Recipe) -> ModelResult<Recipe> {
        check_recipe_columns(
            &recipe.title,
            recipe.time_minutes,
            recipe.price,
            recipe.link.as_deref(),
            recipe.image.as_deref(),
        )?;
        sqlx::query_as::<_, Recipe>(&format!(
            r#"
            UPDATE recipes
               SET user_id = $2, title = $3, description = $4, time_minutes = $5,
                   price = $6, link = $7, image = $8, updated_at = $9
             WHERE id = $1
            RETURNING {}
            "#,
            RECIPE_COLUMNS
        ))
        .bind(recipe.id)
        .bind(recipe.user_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(recipe.time_minutes)
        .bind(recipe.price)
        .bind(&recipe.link)
        .bind(&recipe.image)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "recipe"))?
        .ok_or_else(|| ModelError::not_found("recipe", recipe.id))
    }

    async fn delete_recipe(&self, id: i64) -> ModelResult<()> {
        let res = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(ModelError::not_found("recipe", id));
        }
        Ok(())
    }

    async fn add_recipe_tag(&self, recipe_id: i64, tag_id: i64) -> ModelResult<()> {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "tag_id"))?;
        Ok(())
    }

    async fn recipe_tags(&self, recipe_id: i64) -> ModelResult<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.user_id, t.name, t.created_at
              FROM tags t
              JOIN recipe_tags rt ON rt.tag_id = t.id
             WHERE rt.recipe_id = $1
             ORDER BY t.id DESC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn clear_recipe_tags(&self, recipe_id: i64) -> ModelResult<()> {
        sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add_recipe_ingredient(&self, recipe_id: i64, ingredient_id: i64) -> ModelResult<()> {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(ingredient_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "ingredient_id"))?;
        Ok(())
    }

    async fn recipe_ingredients(&self, recipe_id: i64) -> ModelResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            r#"
            SELECT i.id, i.user_id, i.name
              FROM ingredients i
              JOIN recipe_ingredients ri ON ri.ingredient_id = i.id
             WHERE ri.recipe_id = $1
             ORDER BY i.id DESC
            "#,
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn clear_recipe_ingredients(&self, recipe_id: i64) -> ModelResult<()> {
        sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
