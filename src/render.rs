use axum::response::Html;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tera::{Context, Tera};
use tracing::{debug, instrument};

use crate::session::CurrentUser;
use crate::shared::AppError;

macro_rules! template {
    ($name:literal) => {
        ($name, include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/", $name)))
    };
}

/// Compiled page templates, shared by every handler
#[derive(Clone)]
pub struct Templates {
    tera: Arc<Tera>,
}

impl Templates {
    pub fn new() -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            template!("base.html"),
            template!("_activity.html"),
            template!("_topics.html"),
            template!("home.html"),
            template!("room.html"),
            template!("room_form.html"),
            template!("delete.html"),
            template!("login_registration.html"),
            template!("profile.html"),
            template!("update_user.html"),
        ])?;
        tera.autoescape_on(vec![".html"]);

        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    #[instrument(skip(self, page))]
    pub fn render(&self, name: &str, page: Page) -> Result<Html<String>, AppError> {
        debug!(template = name, "Rendering page");
        Ok(Html(self.tera.render(name, &page.context)?))
    }
}

/// Template context for one page. Every page knows who is logged in and
/// carries a (possibly empty) list of flash messages.
pub struct Page {
    context: Context,
}

impl Page {
    pub fn new(current_user: Option<&CurrentUser>) -> Self {
        let mut context = Context::new();
        context.insert("current_user", &current_user);
        context.insert("messages", &Vec::<String>::new());
        Self { context }
    }

    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        self.context.insert(key, value);
        self
    }

    pub fn flash(self, messages: &[String]) -> Self {
        self.with("messages", messages)
    }
}

/// Coarse age of a timestamp in the largest sensible unit, e.g. "3 hours"
pub fn time_since(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds().max(0);
    let (count, unit) = match seconds {
        s if s < 60 => return "0 minutes".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 604_800 => (s / 86_400, "day"),
        s if s < 2_592_000 => (s / 604_800, "week"),
        s if s < 31_536_000 => (s / 2_592_000, "month"),
        s => (s / 31_536_000, "year"),
    };

    if count == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", count, unit)
    }
}
