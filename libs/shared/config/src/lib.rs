use std::env;
use tracing::warn;

/// Abandoned booking wizards are dropped after this long without a request.
pub const DEFAULT_WIZARD_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub jwt_secret: String,
    pub mock_availability: bool,
    pub port: u16,
    pub login_path: String,
    pub dashboard_path: String,
    pub appointments_path: String,
    pub wizard_idle_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("BOOKING_API_URL")
                .unwrap_or_else(|_| {
                    warn!("BOOKING_API_URL not set, using empty value");
                    String::new()
                }),
            api_key: env::var("BOOKING_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("BOOKING_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("BOOKING_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("BOOKING_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            mock_availability: env::var("BOOKING_MOCK_AVAILABILITY")
                .map(|value| matches!(value.trim(), "true" | "1"))
                .unwrap_or(false),
            port: env::var("PORT")
                .ok()
                .and_then(|value| match value.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("PORT is not a valid port number: {}, using default", value);
                        None
                    }
                })
                .unwrap_or(3000),
            login_path: env::var("BOOKING_LOGIN_PATH")
                .unwrap_or_else(|_| "/login".to_string()),
            dashboard_path: env::var("BOOKING_DASHBOARD_PATH")
                .unwrap_or_else(|_| "/patient/dashboard".to_string()),
            appointments_path: env::var("BOOKING_APPOINTMENTS_PATH")
                .unwrap_or_else(|_| "/patient/appointments".to_string()),
            wizard_idle_secs: env::var("BOOKING_WIZARD_IDLE_SECS")
                .ok()
                .and_then(|value| match value.parse() {
                    Ok(secs) => Some(secs),
                    Err(_) => {
                        warn!("BOOKING_WIZARD_IDLE_SECS is not a number: {}, using default", value);
                        None
                    }
                })
                .unwrap_or(DEFAULT_WIZARD_IDLE_SECS),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
            && !self.api_key.is_empty()
            && !self.jwt_secret.is_empty()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            api_key: String::new(),
            jwt_secret: String::new(),
            mock_availability: false,
            port: 3000,
            login_path: "/login".to_string(),
            dashboard_path: "/patient/dashboard".to_string(),
            appointments_path: "/patient/appointments".to_string(),
            wizard_idle_secs: DEFAULT_WIZARD_IDLE_SECS,
        }
    }
}
