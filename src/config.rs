//! Application configuration.
//!
//! All values come from the environment and are read once at startup.
//! The loaded struct is cloned into the application state and passed by
//! handle into the components that need it, so tests can build their own.
//!
//! # Security Notes
//! - Sensitive fields are clearly marked and should never be logged
//! - Production environments should use secure secret management systems

use envconfig::Envconfig;

/// Environment-backed configuration, immutable after startup.
#[derive(Envconfig, Clone)]
pub struct AppConfig {
    /// Environment name to deploy the app (NON-SENSITIVE)
    /// Values: "local", "dev", "staging", "prod"
    #[envconfig(default = "local")]
    pub env: String,

    /// Host address for web server binding (NON-SENSITIVE)
    /// Example: "0.0.0.0", "localhost", "shop.rockbot.top"
    pub wep_server_host: String,

    /// Port for web server binding (NON-SENSITIVE)
    pub wep_server_port: u16,

    /// Path to SSL private key file (SENSITIVE PATH)
    #[envconfig(default = "server.key")]
    pub private_key_path: String,

    /// Path to SSL certificate file (NON-SENSITIVE)
    #[envconfig(default = "server.crt")]
    pub certificate_path: String,

    /// WeChat Official Account app id (SEMI-SENSITIVE)
    /// Example: "wx1234567890abcdef"
    pub wechat_app_id: String,

    /// 🔒 SENSITIVE: WeChat Official Account app secret
    pub wechat_app_secret: String,

    /// 🔒 SENSITIVE: shared token configured in the WeChat server dashboard,
    /// used for the webhook handshake signature
    pub wechat_token: String,

    /// 🔒 SENSITIVE: 43-character EncodingAESKey from the WeChat dashboard,
    /// key material for the message envelope cipher
    pub wechat_aes_key: String,

    /// WeChat Pay merchant id (SEMI-SENSITIVE)
    pub wepay_mch_id: String,

    /// 🔒 SENSITIVE: WeChat Pay API key
    pub wepay_api_key: String,

    /// Path to the WeChat Pay merchant certificate (SENSITIVE PATH)
    pub wepay_mch_cert_path: String,

    /// Path to the WeChat Pay merchant private key (SENSITIVE PATH)
    pub wepay_mch_key_path: String,

    /// Chatbot collaborator endpoint answering visitor text messages
    /// (NON-SENSITIVE)
    pub bot_endpoint: String,

    /// 🔒 SENSITIVE: chatbot collaborator API key
    pub bot_api_key: String,
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_prod(&self) -> bool {
        self.env.to_lowercase() == "prod"
    }

    /// Gets the server URL host with port for non-production environments
    pub fn url_host(&self) -> String {
        if self.is_prod() {
            return self.wep_server_host.to_string();
        }

        format!(
            "{host}:{port}",
            host = self.wep_server_host,
            port = self.wep_server_port
        )
    }

    /// Gets the appropriate protocol (HTTP/HTTPS) based on environment
    pub fn wep_server_protocol(&self) -> String {
        if self.is_prod() {
            return "https".into();
        }
        "http".into()
    }

    /// Constructs the complete base URL for the application
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.wep_server_protocol(), self.url_host())
    }
}

/// Fixed configuration for unit tests across the crate.
#[cfg(test)]
pub fn test_config() -> AppConfig {
    AppConfig {
        env: "local".into(),
        wep_server_host: "localhost".into(),
        wep_server_port: 8080,
        private_key_path: "server.key".into(),
        certificate_path: "server.crt".into(),
        wechat_app_id: "wx49f1dcb32deadbee".into(),
        wechat_app_secret: "secret".into(),
        wechat_token: "spamtest".into(),
        wechat_aes_key: "fItuO9pHkOyhhbaiHoaGzDInQSAYsgCDGWckjattZkK".into(),
        wepay_mch_id: "1230000109".into(),
        wepay_api_key: "paykey".into(),
        wepay_mch_cert_path: "mch.crt".into(),
        wepay_mch_key_path: "mch.key".into(),
        bot_endpoint: "http://localhost:9000/reply".into(),
        bot_api_key: "botkey".into(),
    }
}
