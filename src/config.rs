use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: Option<String>, // Archive is optional
    pub gemini_api_key: Option<String>,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub instagram_base_url: String,
    pub instagram_app_id: String,
    pub llm_timeout_secs: u64,
    pub scrape_timeout_secs: u64,
    pub history_capacity: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|url| {
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })
                .transpose()?,
            gemini_api_key: optional_secret("GEMINI_API_KEY"),
            gemini_base_url: base_url(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            )?,
            gemini_model: std::env::var("GEMINI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "gemini-1.5-pro".to_string()),
            openai_api_key: optional_secret("OPENAI_API_KEY"),
            openai_base_url: base_url("OPENAI_BASE_URL", "https://api.openai.com")?,
            openai_model: std::env::var("OPENAI_MODEL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            instagram_base_url: base_url("INSTAGRAM_BASE_URL", "https://www.instagram.com")?,
            instagram_app_id: std::env::var("INSTAGRAM_APP_ID")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "936619743392459".to_string()),
            llm_timeout_secs: positive_number("LLM_TIMEOUT_SECS", 60)?,
            scrape_timeout_secs: positive_number("SCRAPE_TIMEOUT_SECS", 10)?,
            history_capacity: positive_number("HISTORY_CAPACITY", 500)?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        if config.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; Gemini source will contribute nothing");
        }
        if config.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; OpenAI source will contribute nothing");
        }
        match config.database_url {
            Some(ref url) => tracing::debug!(
                "Database URL: {}...",
                url.chars().take(20).collect::<String>()
            ),
            None => tracing::info!("DATABASE_URL not set; report archive disabled"),
        }
        tracing::debug!("Gemini Base URL: {}", config.gemini_base_url);
        tracing::debug!("OpenAI Base URL: {}", config.openai_base_url);
        tracing::debug!("Instagram Base URL: {}", config.instagram_base_url);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn optional_secret(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn base_url(name: &str, default: &str) -> anyhow::Result<String> {
    let url = std::env::var(name).unwrap_or_else(|_| default.to_string());
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn positive_number(name: &str, default: u64) -> anyhow::Result<u64> {
    let value = match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("{} must be a positive integer", name))?,
        Err(_) => default,
    };
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}
