//! Response-data mapping and the response builder behind `ReqContext`.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tera::Tera;

use super::timer::RequestTimer;
use crate::config::Environment;

/// Key under which `time_request` parks the request timer
pub const PERFMON_TIMER_KEY: &str = "perfmon.timer";

/// Per-request key/value store consumed by the template renderer.
///
/// Serializable values feed the template context; opaque handles (timers)
/// live beside them under their own keys and never reach a template.
#[derive(Default)]
pub struct ResponseData {
    values: Map<String, Value>,
    handles: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl ResponseData {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.handles.contains_key(key)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn insert_handle<T: Any + Send + Sync>(&mut self, key: &'static str, handle: T) {
        self.handles.insert(key, Box::new(handle));
    }

    /// Remove and return the handle under `key` if it has type `T`
    pub fn take_handle<T: Any + Send + Sync>(&mut self, key: &str) -> Option<T> {
        if !self.handles.get(key)?.is::<T>() {
            return None;
        }
        let handle = self.handles.remove(key)?.downcast::<T>().ok()?;
        Some(*handle)
    }
}

impl std::fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseData")
            .field("values", &self.values)
            .field("handles", &self.handles.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// JSON error envelope: optional `error` detail plus a `message` that defaults
/// to the reason phrase for 404 and 500 only.
///
/// Any other status with an empty message yields no `message` key at all.
pub fn api_error_body(status: StatusCode, message: &str, error: Option<String>) -> Map<String, Value> {
    let mut body = Map::new();

    if let Some(error) = error {
        body.insert("error".to_string(), Value::String(error));
    }

    match status {
        StatusCode::NOT_FOUND => {
            body.insert("message".to_string(), "Not Found".into());
        }
        StatusCode::INTERNAL_SERVER_ERROR => {
            body.insert("message".to_string(), "Internal Server Error".into());
        }
        _ => {}
    }

    if !message.is_empty() {
        body.insert("message".to_string(), message.into());
    }

    body
}

/// Settings the responder needs from the application, injected per request
#[derive(Clone)]
pub struct RenderSettings {
    pub env: Environment,
    pub app_sub_url: String,
    pub error_template: String,
    pub templates: Arc<Tera>,
}

/// Mutable response builder owned by one request
pub struct Responder {
    pub data: ResponseData,
    settings: RenderSettings,
}

impl Responder {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            data: ResponseData::default(),
            settings,
        }
    }

    /// Render the configured error template with the current response data
    pub fn error_page(&mut self, status: StatusCode, title: &str, error: Option<String>) -> Response {
        if let Some(error) = error {
            if !self.settings.env.is_production() {
                self.data.insert("ErrorMsg", error);
            }
        }

        self.data.insert("Title", title);
        self.data.insert("AppSubUrl", self.settings.app_sub_url.clone());
        self.data.insert("Theme", "dark");

        let template = self.settings.error_template.clone();
        self.html(status, &template)
    }

    /// Render a named template at `status`; a render failure is logged and
    /// answered with a bare page carrying the same status.
    pub fn html(&mut self, status: StatusCode, template: &str) -> Response {
        let rendered = tera::Context::from_serialize(self.data.values())
            .and_then(|ctx| self.settings.templates.render(template, &ctx));

        let response = match rendered {
            Ok(body) => (status, Html(body)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, template = template, "template render failed");
                let title = self
                    .data
                    .get("Title")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                (
                    status,
                    Html(format!(
                        "<html><body><h1>{}</h1></body></html>",
                        tera::escape_html(&title)
                    )),
                )
                    .into_response()
            }
        };

        self.finish(response)
    }

    pub fn json<T: Serialize>(&mut self, status: StatusCode, body: &T) -> Response {
        let response = (status, Json(body)).into_response();
        self.finish(response)
    }

    pub fn json_api_err(&mut self, status: StatusCode, message: &str, error: Option<String>) -> Response {
        let error = error.filter(|_| !self.settings.env.is_production());
        let body = api_error_body(status, message, error);
        self.json(status, &body)
    }

    /// Hand the request timer to the telemetry middleware via response extensions
    fn finish(&mut self, mut response: Response) -> Response {
        if let Some(timer) = self.data.take_handle::<RequestTimer>(PERFMON_TIMER_KEY) {
            response.extensions_mut().insert(timer);
        }
        response
    }
}
