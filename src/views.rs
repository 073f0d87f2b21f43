//! HTML views
//!
//! Templates are compiled into the binary and rendered with minijinja.
//! Names end in `.html`, which turns on HTML auto-escaping for every
//! interpolated value.

use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

use crate::error::AppError;

pub const HOME: &str = "index.html";
pub const LOGIN: &str = "login.html";
pub const ACCOUNT: &str = "account.html";

const TEMPLATES: [(&str, &str); 4] = [
    ("layout.html", include_str!("../templates/layout.html")),
    (HOME, include_str!("../templates/index.html")),
    (LOGIN, include_str!("../templates/login.html")),
    (ACCOUNT, include_str!("../templates/account.html")),
];

/// Template registry shared by all handlers
#[derive(Debug)]
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    /// Compile the embedded templates
    ///
    /// # Errors
    /// Returns `AppError::Template` if a template has a syntax error.
    pub fn new() -> Result<Self, AppError> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    /// Render `name` with `context`
    pub fn render<C: Serialize>(&self, name: &str, context: C) -> Result<Html<String>, AppError> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(context)?))
    }
}
