//! HTML templates compiled into the binary.

use minijinja::{default_auto_escape_callback, Environment, Value};

use crate::errors::AppError;

pub trait TemplateEngine: Send + Sync {
    fn render(&self, template_name: &str, context: Value) -> Result<String, AppError>;
}

pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(default_auto_escape_callback);
        env.set_loader(embedded_template_loader);
        env.add_filter("price", format_price);
        Self { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render(&self, template_name: &str, context: Value) -> Result<String, AppError> {
        let tmpl = self.env.get_template(template_name)?;
        Ok(tmpl.render(context)?)
    }
}

/// Whole amounts drop the decimals: `0.0` shows as `0`, `12.5` as `12.5`.
fn format_price(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn embedded_template_loader(name: &str) -> Result<Option<String>, minijinja::Error> {
    let template_content = match name {
        "layout.html" => Some(include_str!("layout.html")),
        "loading.html" => Some(include_str!("loading.html")),

        // Public
        "listing.html" => Some(include_str!("listing.html")),

        // Admin
        "login.html" => Some(include_str!("login.html")),
        "admin_nav.html" => Some(include_str!("admin_nav.html")),
        "admin_activities.html" => Some(include_str!("admin_activities.html")),
        "create_activity.html" => Some(include_str!("create_activity.html")),

        _ => None,
    };

    Ok(template_content.map(|s| s.to_string()))
}
