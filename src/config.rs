use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuperuserSeed {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub object_store: ObjectStoreConfig,
    pub superuser: Option<SuperuserSeed>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let object_store = ObjectStoreConfig {
            endpoint: std::env::var("MINIO_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "recipes".into()),
            access_key: std::env::var("MINIO_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("MINIO_SECRET_KEY").unwrap_or_default(),
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".into()),
            url_ttl_secs: std::env::var("IMAGE_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30 * 60),
        };
        let superuser = match (
            std::env::var("SUPERUSER_EMAIL"),
            std::env::var("SUPERUSER_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() => {
                Some(SuperuserSeed { email, password })
            }
            _ => None,
        };
        Ok(Self {
            database_url,
            max_connections,
            object_store,
            superuser,
        })
    }
}
