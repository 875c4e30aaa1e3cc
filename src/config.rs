use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_key: String,
    pub image_size: String,
    pub debounce_ms: u64,
    pub min_query_len: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            api_host: env::var("PIX_SCOUT_API_HOST")
                .unwrap_or_else(|_| "https://api.500px.com/".to_string()),
            api_key: env::var("PIX_SCOUT_API_KEY")
                .map_err(|_| "PIX_SCOUT_API_KEY must be set to a 500px consumer key")?,
            image_size: env::var("PIX_SCOUT_IMAGE_SIZE").unwrap_or_else(|_| "4".to_string()),
            debounce_ms: env::var("PIX_SCOUT_DEBOUNCE_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            min_query_len: env::var("PIX_SCOUT_MIN_QUERY_LEN")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
        })
    }
}
