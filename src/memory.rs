//! In-process store with the same column constraints and delete rules as the
//! Postgres schema. Used by tests and `AppState::fake`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::recipes::repo::{check_name, check_recipe_columns, CatalogStore};
use crate::recipes::repo_types::{Ingredient, NewIngredient, NewRecipe, NewTag, Recipe, Tag};
use crate::users::repo::{check_user_columns, UserStore};
use crate::users::repo_types::{NewUser, User};

#[derive(Default)]
struct Sequences {
    users: i64,
    tags: i64,
    ingredients: i64,
    recipes: i64,
}

impl Sequences {
    fn next(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<i64, User>,
    tags: BTreeMap<i64, Tag>,
    ingredients: BTreeMap<i64, Ingredient>,
    recipes: BTreeMap<i64, Recipe>,
    recipe_tags: Vec<(i64, i64)>,
    recipe_ingredients: Vec<(i64, i64)>,
}

impl Tables {
    fn require_user(&self, id: i64) -> ModelResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::not_found("user", id))
        }
    }

    /// Mirrors the `REFERENCES users (id)` foreign keys.
    fn owner_exists(&self, id: i64) -> ModelResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::foreign_key("user_id", id))
        }
    }

    fn require_recipe(&self, id: i64) -> ModelResult<()> {
        if self.recipes.contains_key(&id) {
            Ok(())
        } else {
            Err(ModelError::not_found("recipe", id))
        }
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn drop_recipe(&mut self, id: i64) {
        self.recipes.remove(&id);
        self.recipe_tags.retain(|(r, _)| *r != id);
        self.recipe_ingredients.retain(|(r, _)| *r != id);
    }
}

/// Newest-first, matching the `ORDER BY id DESC` of the SQL store.
fn newest_first<'a, T: Clone + 'a>(
    rows: impl DoubleEndedIterator<Item = &'a T>,
    keep: impl Fn(&T) -> bool,
) -> Vec<T> {
    rows.rev().filter(|r| keep(r)).cloned().collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn user_count(&self) -> usize {
        self.lock().users.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> ModelResult<User> {
        check_user_columns(&new.email, &new.name)?;
        let mut t = self.lock();
        if t.email_taken(&new.email, None) {
            return Err(ModelError::unique("email"));
        }
        let id = Sequences::next(&mut t.seq.users);
        let user = User {
            id,
            email: new.email,
            name: new.name,
            password_hash: new.password_hash,
            is_active: new.is_active,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            permissions: new.permissions,
            last_login: None,
        };
        t.users.insert(id, user.clone());
        debug!(user_id = id, "user row inserted");
        Ok(user)
    }

    async fn save_user(&self, user: &User) -> ModelResult<User> {
        check_user_columns(&user.email, &user.name)?;
        let mut t = self.lock();
        t.require_user(user.id)?;
        if t.email_taken(&user.email, Some(user.id)) {
            return Err(ModelError::unique("email"));
        }
        t.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user(&self, id: i64) -> ModelResult<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> ModelResult<Option<User>> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn delete_user(&self, id: i64) -> ModelResult<()> {
        let mut t = self.lock();
        if t.users.remove(&id).is_none() {
            return Err(ModelError::not_found("user", id));
        }
        let owned: Vec<i64> = t
            .recipes
            .values()
            .filter(|r| r.user_id == id)
            .map(|r| r.id)
            .collect();
        for recipe_id in owned {
            t.drop_recipe(recipe_id);
        }
        let tags: Vec<i64> = t
            .tags
            .values()
            .filter(|tag| tag.user_id == id)
            .map(|tag| tag.id)
            .collect();
        for tag_id in tags {
            t.tags.remove(&tag_id);
            t.recipe_tags.retain(|(_, tg)| *tg != tag_id);
        }
        // ingredients keep their user_id; no cascade
        debug!(user_id = id, "user row deleted");
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_tag(&self, new: NewTag) -> ModelResult<Tag> {
        check_name(&new.name)?;
        let mut t = self.lock();
        t.owner_exists(new.user_id)?;
        let id = Sequences::next(&mut t.seq.tags);
        let tag = Tag {
            id,
            user_id: new.user_id,
            name: new.name,
            created_at: OffsetDateTime::now_utc(),
        };
        t.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn get_tag(&self, id: i64) -> ModelResult<Option<Tag>> {
        Ok(self.lock().tags.get(&id).cloned())
    }

    async fn list_tags(&self, owner: Option<i64>) -> ModelResult<Vec<Tag>> {
        let t = self.lock();
        Ok(newest_first(t.tags.values(), |tag| {
            owner.map_or(true, |o| tag.user_id == o)
        }))
    }

    async fn update_tag(&self, tag: &Tag) -> ModelResult<Tag> {
        check_name(&tag.name)?;
        let mut t = self.lock();
        t.owner_exists(tag.user_id)?;
        let stored = t
            .tags
            .get_mut(&tag.id)
            .ok_or_else(|| ModelError::not_found("tag", tag.id))?;
        stored.user_id = tag.user_id;
        stored.name = tag.name.clone();
        Ok(stored.clone())
    }

    async fn delete_tag(&self, id: i64) -> ModelResult<()> {
        let mut t = self.lock();
        if t.tags.remove(&id).is_none() {
            return Err(ModelError::not_found("tag", id));
        }
        t.recipe_tags.retain(|(_, tg)| *tg != id);
        Ok(())
    }

    async fn insert_ingredient(&self, new: NewIngredient) -> ModelResult<Ingredient> {
        check_name(&new.name)?;
        let mut t = self.lock();
        let id = Sequences::next(&mut t.seq.ingredients);
        let ingredient = Ingredient {
            id,
            user_id: new.user_id,
            name: new.name,
        };
        t.ingredients.insert(id, ingredient.clone());
        Ok(ingredient)
    }

    async fn get_ingredient(&self, id: i64) -> ModelResult<Option<Ingredient>> {
        Ok(self.lock().ingredients.get(&id).cloned())
    }

    async fn list_ingredients(&self, owner: Option<i64>) -> ModelResult<Vec<Ingredient>> {
        let t = self.lock();
        Ok(newest_first(t.ingredients.values(), |i| {
            owner.map_or(true, |o| i.user_id == o)
        }))
    }

    async fn update_ingredient(&self, ingredient: &Ingredient) -> ModelResult<Ingredient> {
        check_name(&ingredient.name)?;
        let mut t = self.lock();
        let stored = t
            .ingredients
            .get_mut(&ingredient.id)
            .ok_or_else(|| ModelError::not_found("ingredient", ingredient.id))?;
        stored.user_id = ingredient.user_id;
        stored.name = ingredient.name.clone();
        Ok(stored.clone())
    }

    async fn delete_ingredient(&self, id: i64) -> ModelResult<()> {
        let mut t = self.lock();
        if t.ingredients.remove(&id).is_none() {
            return Err(ModelError::not_found("ingredient", id));
        }
        t.recipe_ingredients.retain(|(_, i)| *i != id);
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
        let mut t = self.lock();
        t.owner_exists(new.user_id)?;
        let id = Sequences::next(&mut t.seq.recipes);
        let now = OffsetDateTime::now_utc();
        let recipe = Recipe {
            id,
            user_id: new.user_id,
            title: new.title,
            description: new.description,
            time_minutes: new.time_minutes,
            price: new.price,
            link: new.link,
            image: new.image,
            created_at: now,
            updated_at: now,
        };
        t.recipes.insert(id, recipe.clone());
        Ok(recipe)
    }

    async fn get_recipe(&self, id: i64) -> ModelResult<Option<Recipe>> {
        Ok(self.lock().recipes.get(&id).cloned())
    }

    async fn list_recipes(&self, owner: Option<i64>) -> ModelResult<Vec<Recipe>> {
        let t = self.lock();
        Ok(newest_first(t.recipes.values(), |r| {
            owner.map_or(true, |o| r.user_id == o)
        }))
    }

    async fn update_recipe(&self, recipe: &Recipe) -> ModelResult<Recipe> {
        check_recipe_columns(
            &recipe.title,
            recipe.time_minutes,
            recipe.price,
            recipe.link.as_deref(),
            recipe.image.as_deref(),
        )?;
        let mut t = self.lock();
        t.owner_exists(recipe.user_id)?;
        let stored = t
            .recipes
            .get_mut(&recipe.id)
            .ok_or_else(|| ModelError::not_found("recipe", recipe.id))?;
        let created_at = stored.created_at;
        *stored = Recipe {
            created_at,
            updated_at: OffsetDateTime::now_utc(),
            ..recipe.clone()
        };
        Ok(stored.clone())
    }

    async fn delete_recipe(&self, id: i64) -> ModelResult<()> {
        let mut t = self.lock();
        t.require_recipe(id)?;
        t.drop_recipe(id);
        Ok(())
    }

    async fn add_recipe_tag(&self, recipe_id: i64, tag_id: i64) -> ModelResult<()> {
        let mut t = self.lock();
        if !t.recipes.contains_key(&recipe_id) {
            return Err(ModelError::foreign_key("recipe_id", recipe_id));
        }
        if !t.tags.contains_key(&tag_id) {
            return Err(ModelError::foreign_key("tag_id", tag_id));
        }
        t.recipe_tags.push((recipe_id, tag_id));
        Ok(())
    }

    async fn recipe_tags(&self, recipe_id: i64) -> ModelResult<Vec<Tag>> {
        let t = self.lock();
        let mut rows: Vec<Tag> = t
            .recipe_tags
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, tag_id)| t.tags.get(tag_id).cloned())
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn clear_recipe_tags(&self, recipe_id: i64) -> ModelResult<()> {
        self.lock().recipe_tags.retain(|(r, _)| *r != recipe_id);
        Ok(())
    }

    async fn add_recipe_ingredient(&self, recipe_id: i64, ingredient_id: i64) -> ModelResult<()> {
        let mut t = self.lock();
        if !t.recipes.contains_key(&recipe_id) {
            return Err(ModelError::foreign_key("recipe_id", recipe_id));
        }
        if !t.ingredients.contains_key(&ingredient_id) {
            return Err(ModelError::foreign_key("ingredient_id", ingredient_id));
        }
        t.recipe_ingredients.push((recipe_id, ingredient_id));
        Ok(())
    }

    async fn recipe_ingredients(&self, recipe_id: i64) -> ModelResult<Vec<Ingredient>> {
        let t = self.lock();
        let mut rows: Vec<Ingredient> = t
            .recipe_ingredients
            .iter()
            .filter(|(r, _)| *r == recipe_id)
            .filter_map(|(_, id)| t.ingredients.get(id).cloned())
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn clear_recipe_ingredients(&self, recipe_id: i64) -> ModelResult<()> {
        self.lock().recipe_ingredients.retain(|(r, _)| *r != recipe_id);
        Ok(())
    }
}
