use chrono::NaiveDate;
use chrono_tz::Tz;

/// Runtime settings, read from `FLOORLINE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub api_token: Option<String>,
    pub timezone: Tz,
    pub request_timeout_secs: u64,
    pub metrics_port: Option<u16>,
    /// Service day to open on; today in `timezone` when unset.
    pub service_date: Option<NaiveDate>,
    pub default_country_code: String,
    pub upcoming_events_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            api_token: None,
            timezone: chrono_tz::Europe::London,
            request_timeout_secs: 10,
            metrics_port: None,
            service_date: None,
            default_country_code: "44".into(),
            upcoming_events_limit: 20,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    var(name)
        .map(|v| {
            v.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            api_url: var("FLOORLINE_API_URL").unwrap_or(defaults.api_url),
            api_token: var("FLOORLINE_API_TOKEN"),
            timezone: parsed("FLOORLINE_TIMEZONE")?.unwrap_or(defaults.timezone),
            request_timeout_secs: parsed("FLOORLINE_REQUEST_TIMEOUT_SECS")?
                .unwrap_or(defaults.request_timeout_secs),
            metrics_port: parsed("FLOORLINE_METRICS_PORT")?,
            service_date: parsed("FLOORLINE_SERVICE_DATE")?,
            default_country_code: var("FLOORLINE_DEFAULT_COUNTRY_CODE")
                .unwrap_or(defaults.default_country_code),
            upcoming_events_limit: parsed("FLOORLINE_UPCOMING_EVENTS_LIMIT")?
                .unwrap_or(defaults.upcoming_events_limit),
        })
    }
}
