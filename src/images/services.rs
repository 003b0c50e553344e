use bytes::Bytes;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};
use crate::fields::{check_max_length, MAX_CHAR_LENGTH};
use crate::recipes::repo::CatalogStore;
use crate::recipes::repo_types::Recipe;
use crate::state::AppState;

pub const RECIPE_UPLOAD_DIR: &str = "uploads/recipe";

/// Builds `uploads/recipe/<uuid>.<ext>` for an uploaded file.
///
/// The extension is whatever follows the last `.` (case kept); a name
/// without a dot is used whole. Every call draws a fresh v4 UUID.
pub fn recipe_image_file_path(original_filename: &str) -> String {
    let ext = original_filename
        .rsplit('.')
        .next()
        .unwrap_or(original_filename);
    format!("{}/{}.{}", RECIPE_UPLOAD_DIR, Uuid::new_v4(), ext)
}

/// Stores the image bytes under a fresh path and records that path on the
/// recipe. The replaced object is removed from storage once the row points
/// at the new one; the new object is removed again if the row write fails.
#[instrument(skip(st, body))]
pub async fn upload_recipe_image(
    st: &AppState,
    recipe_id: i64,
    original_filename: &str,
    body: Bytes,
    content_type: &str,
) -> ModelResult<Recipe> {
    let mut recipe = st
        .store
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(|| ModelError::not_found("recipe", recipe_id))?;

    let key = recipe_image_file_path(original_filename);
    check_max_length("image", &key, MAX_CHAR_LENGTH)?;

    st.storage
        .put_object(&key, body, content_type)
        .await
        .map_err(ModelError::Storage)?;
    debug!(%key, "recipe image stored");

    let previous = recipe.image.replace(key.clone());
    let recipe = match st.store.update_recipe(&recipe).await {
        Ok(recipe) => recipe,
        Err(e) => {
            discard_object(st, &key).await;
            return Err(e);
        }
    };
    if let Some(old) = previous {
        discard_object(st, &old).await;
    }
    info!(recipe_id = recipe.id, "recipe image attached");
    Ok(recipe)
}

async fn discard_object(st: &AppState, key: &str) {
    match st.storage.delete_object(key).await {
        Ok(()) => debug!(%key, "recipe image removed"),
        Err(e) => warn!(%key, error = %e, "failed to remove recipe image"),
    }
}

/// Presigned read URL for the recipe's image, if it has one.
pub async fn recipe_image_url(st: &AppState, recipe: &Recipe) -> ModelResult<Option<String>> {
    let Some(key) = recipe.image.as_deref() else {
        return Ok(None);
    };
    let url = st
        .storage
        .presign_get(key, st.config.object_store.url_ttl_secs)
        .await
        .map_err(ModelError::Storage)?;
    Ok(Some(url))
}

#[cfg(test)]
mod image_tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::recipes::repo_types::NewRecipe;
    use crate::state::fake_config;
    use crate::storage::StorageClient;
    use crate::users::{create_user, ExtraFields};

    #[derive(Default)]
    struct RecordingStorage {
        puts: Mutex<Vec<(String, usize, String)>>,
        deletes: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl StorageClient for RecordingStorage {
        async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("bucket unavailable");
            }
            self.puts
                .lock()
                .unwrap()
                .push((key.to_string(), body.len(), content_type.to_string()));
            Ok(())
        }
        async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
            self.deletes.lock().unwrap().push(key.to_string());
            Ok(())
        }
        async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
            Ok(format!("https://signed.local/{}?ttl={}", key, seconds))
        }
    }

    fn assert_uuid_path(path: &str, ext: &str) {
        let rest = path
            .strip_prefix("uploads/recipe/")
            .expect("upload dir prefix");
        let (id, got_ext) = rest.split_once('.').expect("extension separator");
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(id).is_ok());
        assert_eq!(got_ext, ext);
    }

    async fn state_with_recipe(storage: Arc<RecordingStorage>) -> (AppState, Recipe) {
        let store = Arc::new(MemoryStore::new());
        let user = create_user(&*store, "img@example.com", Some("pw"), ExtraFields::default())
            .await
            .unwrap();
        let recipe = store
            .insert_recipe(NewRecipe::new(user.id, "Pancakes", 20, Decimal::new(300, 2)))
            .await
            .unwrap();
        let st = AppState::from_parts(store, Arc::new(fake_config()), storage);
        (st, recipe)
    }

    #[test]
    fn path_keeps_extension_case() {
        let path = recipe_image_file_path("photo.JPG");
        assert_uuid_path(&path, "JPG");
    }

    #[test]
    fn path_uses_last_extension() {
        let path = recipe_image_file_path("my.holiday.photo.png");
        assert_uuid_path(&path, "png");
    }

    #[test]
    fn path_without_dot_uses_whole_name() {
        let path = recipe_image_file_path("image");
        assert_uuid_path(&path, "image");
    }

    #[test]
    fn paths_never_repeat() {
        let a = recipe_image_file_path("photo.JPG");
        let b = recipe_image_file_path("photo.JPG");
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn upload_stores_bytes_and_records_path() {
        let storage = Arc::new(RecordingStorage::default());
        let (st, recipe) = state_with_recipe(storage.clone()).await;

        let updated = upload_recipe_image(
            &st,
            recipe.id,
            "stack.jpeg",
            Bytes::from_static(b"\xff\xd8\xff"),
            "image/jpeg",
        )
        .await
        .expect("upload");

        let key = updated.image.clone().expect("image recorded");
        assert_uuid_path(&key, "jpeg");
        assert!(updated.updated_at >= recipe.updated_at);

        let puts = storage.puts.lock().unwrap().clone();
        assert_eq!(puts, vec![(key.clone(), 3, "image/jpeg".to_string())]);

        let stored = st.store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert_eq!(stored.image.as_deref(), Some(key.as_str()));

        let url = recipe_image_url(&st, &stored).await.unwrap().unwrap();
        assert_eq!(url, format!("https://signed.local/{}?ttl=60", key));
    }

    #[tokio::test]
    async fn upload_failure_leaves_recipe_untouched() {
        let storage = Arc::new(RecordingStorage {
            fail: true,
            ..RecordingStorage::default()
        });
        let (st, recipe) = state_with_recipe(storage).await;

        let err = upload_recipe_image(&st, recipe.id, "a.png", Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.message_key(), "files.storage_failed");

        let stored = st.store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert!(stored.image.is_none());
    }

    #[tokio::test]
    async fn upload_to_missing_recipe_is_not_found() {
        let st = AppState::fake();
        let err = upload_recipe_image(&st, 5, "a.png", Bytes::new(), "image/png")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "recipe 5 not found");
    }

    #[tokio::test]
    async fn recipe_without_image_has_no_url() {
        let storage = Arc::new(RecordingStorage::default());
        let (st, recipe) = state_with_recipe(storage).await;
        assert!(recipe_image_url(&st, &recipe).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overlong_path_is_rejected_before_storing() {
        let storage = Arc::new(RecordingStorage::default());
        let (st, recipe) = state_with_recipe(storage.clone()).await;

        let filename = format!("photo.{}", "j".repeat(220));
        let err = upload_recipe_image(&st, recipe.id, &filename, Bytes::from_static(b"img"), "image/jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.message_key(), "fields.max_length");

        assert!(storage.puts.lock().unwrap().is_empty());
        assert!(storage.deletes.lock().unwrap().is_empty());
        let stored = st.store.get_recipe(recipe.id).await.unwrap().unwrap();
        assert!(stored.image.is_none());
    }

    #[tokio::test]
    async fn replacing_image_removes_previous_object() {
        let storage = Arc::new(RecordingStorage::default());
        let (st, recipe) = state_with_recipe(storage.clone()).await;

        let first = upload_recipe_image(&st, recipe.id, "a.png", Bytes::from_static(b"1"), "image/png")
            .await
            .unwrap();
        let first_key = first.image.clone().unwrap();
        assert!(storage.deletes.lock().unwrap().is_empty());

        let second = upload_recipe_image(&st, recipe.id, "b.webp", Bytes::from_static(b"2"), "image/webp")
            .await
            .unwrap();
        let second_key = second.image.clone().unwrap();
        assert_ne!(first_key, second_key);

        assert_eq!(storage.puts.lock().unwrap().len(), 2);
        assert_eq!(*storage.deletes.lock().unwrap(), vec![first_key]);
    }
}
