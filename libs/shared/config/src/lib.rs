use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub supabase_jwt_secret: String,
    pub mail_api_url: String,
    pub mail_from_address: String,
    pub push_api_url: String,
    pub push_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            mail_api_url: env::var("MAIL_API_URL")
                .unwrap_or_else(|_| {
                    warn!("MAIL_API_URL not set, email notifications disabled");
                    String::new()
                }),
            mail_from_address: env::var("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "bookings@fisiobook.app".to_string()),
            push_api_url: env::var("PUSH_API_URL")
                .unwrap_or_else(|_| {
                    warn!("PUSH_API_URL not set, push notifications disabled");
                    String::new()
                }),
            push_api_key: env::var("PUSH_API_KEY")
                .unwrap_or_else(|_| String::new()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_mail_configured(&self) -> bool {
        !self.mail_api_url.is_empty() && !self.mail_from_address.is_empty()
    }

    pub fn is_push_configured(&self) -> bool {
        !self.push_api_url.is_empty() && !self.push_api_key.is_empty()
    }
}
