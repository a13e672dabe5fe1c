use std::env;

#[derive(Clone)]
pub struct WhatsAppSettings {
    pub api_key: String,
    pub base_url: String,
    pub phone_number_id: String,
    pub app_secret: String,
    pub verify_token: String,
}

pub struct Config {
    pub database_url: String,
    pub frontend_origin: String,
    pub whatsapp: WhatsAppSettings,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok(); // Load .env file

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let frontend_origin = env::var("FRONTEND_ORIGIN").expect("FRONTEND_ORIGIN must be set");

        let whatsapp = WhatsAppSettings {
            api_key: env::var("WHATSAPP_API_KEY").unwrap_or_default(),
            base_url: env::var("WHATSAPP_BASE_URL")
                .unwrap_or_else(|_| "https://graph.facebook.com/v18.0".to_string()),
            phone_number_id: env::var("WHATSAPP_PHONE_NUMBER_ID").unwrap_or_default(),
            app_secret: env::var("WHATSAPP_APP_SECRET").unwrap_or_default(),
            verify_token: env::var("WHATSAPP_VERIFY_TOKEN").unwrap_or_default(),
        };

        Config {
            database_url,
            frontend_origin,
            whatsapp,
        }
    }
}
