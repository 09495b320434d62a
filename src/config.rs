use anyhow::Context;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub frontend_url: String,
    /// `scheme://host[:port]` of `frontend_url`, matched against the `Origin` header.
    pub frontend_origin: String,
    pub host: String,
    pub port: u16,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} must be set"));
        let port = |key: &str, default: u16| -> anyhow::Result<u16> {
            match lookup(key) {
                Some(v) => v
                    .parse::<u16>()
                    .with_context(|| format!("{key} must be a valid port, got {v:?}")),
                None => Ok(default),
            }
        };

        let mail = MailConfig {
            host: lookup("EMAIL_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
            port: port("EMAIL_PORT", 465)?,
            username: required("EMAIL_USER")?,
            password: required("EMAIL_PASS")?,
        };

        let frontend_url = required("FRONTEND_URL")?.trim_end_matches('/').to_string();
        let frontend_origin = Url::parse(&frontend_url)
            .with_context(|| format!("FRONTEND_URL must be an absolute URL, got {frontend_url:?}"))?
            .origin()
            .ascii_serialization();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            frontend_url,
            frontend_origin,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: port("SERVER_PORT", 5000)?,
            mail,
        })
    }

    pub fn verification_link(&self, token: &str) -> String {
        format!("{}/verify-email?token={}", self.frontend_url, token)
    }

    pub fn verified_page(&self, status: &str) -> String {
        format!("{}/thank-you-verified.html?status={}", self.frontend_url, status)
    }
}
