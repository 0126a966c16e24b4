use anyhow::anyhow;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub multi_agent_base_url: String,
    pub single_agent_base_url: String,
    pub bind_address: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL not found"))?;

        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| anyhow!("JWT_SECRET not found"))?;

        let multi_agent_base_url = std::env::var("MULTI_AGENT_BASE_URL")
            .map_err(|_| anyhow!("MULTI_AGENT_BASE_URL not found"))?;

        let single_agent_base_url = std::env::var("SINGLE_AGENT_BASE_URL")
            .map_err(|_| anyhow!("SINGLE_AGENT_BASE_URL not found"))?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        Ok(AppConfig {
            database_url,
            jwt_secret,
            multi_agent_base_url,
            single_agent_base_url,
            bind_address,
        })
    }
}
