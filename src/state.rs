use std::sync::Arc;

use tera::Tera;

use crate::config::Config;
use crate::context::RenderSettings;
use crate::db::DbPool;

/// Shared application state handed to every router
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DbPool,
    pub templates: Arc<Tera>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, templates: Tera) -> Self {
        Self {
            config: Arc::new(config),
            db,
            templates: Arc::new(templates),
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            env: self.config.env,
            app_sub_url: self.config.app_sub_url.clone(),
            error_template: self.config.error_template.clone(),
            templates: self.templates.clone(),
        }
    }
}
