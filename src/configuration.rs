use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(flatten)]
    pub auth: AuthSettings,
}

/// Authentication settings
///
/// Every field maps 1:1 onto an environment variable of the same name in
/// upper case (ACCESS_TOKEN_SECRET, AUTH_PBKDF2_ITERATIONS, ...). Values are
/// injected into components at construction; nothing reads the environment
/// after startup.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    #[serde(default = "default_access_secret")]
    pub access_token_secret: String,
    #[serde(default = "default_refresh_secret")]
    pub refresh_token_secret: String,
    /// Access token lifetime in seconds (default 15 minutes)
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl: i64,
    /// Refresh token lifetime in seconds (default 7 days)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl: i64,
    #[serde(default = "default_pbkdf2_iterations")]
    pub auth_pbkdf2_iterations: u32,
    /// PBKDF2 digest name, "sha256" or "sha512"
    #[serde(default = "default_pbkdf2_digest")]
    pub auth_pbkdf2_digest: String,
    /// Derived key length in bytes
    #[serde(default = "default_pbkdf2_key_length")]
    pub auth_pbkdf2_key_length: usize,
    /// Upper bound on stored refresh-token records per user
    #[serde(default = "default_max_refresh_tokens")]
    pub max_refresh_tokens: usize,
}

fn default_port() -> u16 {
    8080
}

fn default_access_secret() -> String {
    "dev-access-secret".to_string()
}

fn default_refresh_secret() -> String {
    "dev-refresh-secret".to_string()
}

fn default_access_ttl() -> i64 {
    900
}

fn default_refresh_ttl() -> i64 {
    60 * 60 * 24 * 7
}

fn default_pbkdf2_iterations() -> u32 {
    310_000
}

fn default_pbkdf2_digest() -> String {
    "sha512".to_string()
}

fn default_pbkdf2_key_length() -> usize {
    64
}

fn default_max_refresh_tokens() -> usize {
    5
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::default().try_parsing(true))
        .build()?;
    settings.try_deserialize::<Settings>()
}
