use std::str::FromStr;

/// How `DELETE /api/upload-queue/cancel/{id}` is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelMode {
    /// Acknowledge without contacting the processing backend.
    Acknowledge,
    /// Forward the cancellation to the processing backend.
    Forward,
}

impl CancelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acknowledge => "acknowledge",
            Self::Forward => "forward",
        }
    }
}

impl FromStr for CancelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acknowledge" | "mock" | "standalone" => Ok(Self::Acknowledge),
            "forward" | "backend" => Ok(Self::Forward),
            other => Err(format!(
                "unknown cancel mode '{other}' (expected 'acknowledge' or 'forward')"
            )),
        }
    }
}

/// Runtime settings for the upload-queue proxy, read once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Web origins allowed by CORS (`CORS_ORIGINS`, comma-separated).
    pub cors_origins: Vec<String>,
    /// Whole-request timeout applied by the router.
    pub request_timeout_secs: u64,
    /// Processing backend origin, e.g. `http://localhost:8000`.
    pub backend_url: String,
    /// Timeout for each backend call; `None` keeps the reqwest default.
    pub backend_timeout_secs: Option<u64>,
    pub cancel_mode: CancelMode,
    /// Largest accepted multipart body for `POST /api/upload-queue`.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Read the environment, falling back to local-development defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `BACKEND_URL`          | `http://localhost:8000`    |
    /// | `BACKEND_TIMEOUT_SECS` | unset                      |
    /// | `CANCEL_MODE`          | `acknowledge`              |
    /// | `MAX_UPLOAD_BYTES`     | `10485760`                 |
    ///
    /// Panics on unparsable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let backend_timeout_secs = env_value("BACKEND_TIMEOUT_SECS").map(|v| {
            parse_or_panic::<u64>("BACKEND_TIMEOUT_SECS", &v)
        });

        Self {
            host: env_value("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env_parsed("PORT", "3000"),
            cors_origins: split_origins(
                &env_value("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:5173".into()),
            ),
            request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS", "30"),
            backend_url: env_value("BACKEND_URL")
                .unwrap_or_else(|| "http://localhost:8000".into()),
            backend_timeout_secs,
            cancel_mode: env_parsed("CANCEL_MODE", "acknowledge"),
            max_upload_bytes: env_parsed("MAX_UPLOAD_BYTES", "10485760"),
        }
    }
}

/// Trimmed value of `name`; unset and blank both read as `None`.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T>(name: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env_value(name).unwrap_or_else(|| default.to_string());
    parse_or_panic(name, &raw)
}

fn parse_or_panic<T>(name: &str, raw: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}"))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
