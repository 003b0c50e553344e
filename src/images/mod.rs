pub mod services;

pub use services::{recipe_image_file_path, recipe_image_url, upload_recipe_image};
