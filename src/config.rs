use crate::models::RoleType;

/// Deployment environment; error detail reaches clients only outside production
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub env: Environment,
    /// Sub-path the app is served under, e.g. `/monitoring`; empty at the root
    pub app_sub_url: String,
    pub error_template: String,
    pub templates_dir: String,
    pub anonymous_enabled: bool,
    pub anonymous_org_id: i64,
    pub anonymous_org_name: String,
    pub anonymous_org_role: RoleType,
    pub login_cookie_name: String,
    pub database_url: String,
    /// Listen address of the Prometheus scrape endpoint; `None` disables it
    pub metrics_addr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            env: Environment::Development,
            app_sub_url: String::new(),
            error_template: "error.html".to_string(),
            templates_dir: "templates".to_string(),
            anonymous_enabled: false,
            anonymous_org_id: 1,
            anonymous_org_name: "Main Org.".to_string(),
            anonymous_org_role: RoleType::Viewer,
            login_cookie_name: "reqctx_session".to_string(),
            database_url: "sqlite:reqctx.db?mode=rwc".to_string(),
            metrics_addr: Some("0.0.0.0:9464".to_string()),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a config from a variable lookup; unparsable values keep their defaults
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = var("REQCTX_HOST") {
            config.host = host;
        }

        if let Some(port) = var("REQCTX_PORT") {
            if let Ok(p) = port.parse() {
                config.port = p;
            }
        }

        if let Some(env) = var("REQCTX_ENV") {
            match env.parse::<Environment>() {
                Ok(e) => config.env = e,
                Err(e) => tracing::warn!("Ignoring REQCTX_ENV: {}", e),
            }
        }

        if let Some(sub_url) = var("REQCTX_APP_SUB_URL") {
            config.app_sub_url = sub_url.trim_end_matches('/').to_string();
        }

        if let Some(template) = var("REQCTX_ERROR_TEMPLATE") {
            config.error_template = template;
        }

        if let Some(dir) = var("REQCTX_TEMPLATES_DIR") {
            config.templates_dir = dir;
        }

        if let Some(enabled) = var("REQCTX_ANONYMOUS_ENABLED") {
            if let Ok(b) = enabled.parse() {
                config.anonymous_enabled = b;
            }
        }

        if let Some(org_id) = var("REQCTX_ANONYMOUS_ORG_ID") {
            if let Ok(id) = org_id.parse() {
                config.anonymous_org_id = id;
            }
        }

        if let Some(org_name) = var("REQCTX_ANONYMOUS_ORG_NAME") {
            config.anonymous_org_name = org_name;
        }

        if let Some(role) = var("REQCTX_ANONYMOUS_ORG_ROLE") {
            if let Ok(r) = role.parse() {
                config.anonymous_org_role = r;
            }
        }

        if let Some(cookie) = var("REQCTX_LOGIN_COOKIE") {
            config.login_cookie_name = cookie;
        }

        if let Some(url) = var("DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(addr) = var("REQCTX_METRICS_ADDR") {
            config.metrics_addr = Some(addr).filter(|a| !a.trim().is_empty());
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
