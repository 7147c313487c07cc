use tera::Tera;

use crate::error::Result;

/// Error page used when the templates directory does not provide one
pub const DEFAULT_ERROR_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>{{ Title }}</title>
  <base href="{{ AppSubUrl }}/">
</head>
<body class="theme-{{ Theme }}">
  <div class="page-error">
    <h1>{{ Title }}</h1>
    {% if ErrorMsg is defined %}<pre class="page-error__detail">{{ ErrorMsg }}</pre>{% endif %}
  </div>
</body>
</html>
"#;

/// Load `*.html` templates under `dir`, registering the built-in error page
/// under `error_template` when the directory lacks it.
pub fn load(dir: &str, error_template: &str) -> Result<Tera> {
    let mut tera = Tera::new(&format!("{}/**/*.html", dir.trim_end_matches('/')))?;

    if !tera.get_template_names().any(|name| name == error_template) {
        tracing::warn!(
            "Template {} not found in {}, using the built-in error page",
            error_template,
            dir
        );
        tera.add_raw_template(error_template, DEFAULT_ERROR_TEMPLATE)?;
    }

    tracing::debug!("Loaded {} templates", tera.get_template_names().count());
    Ok(tera)
}

/// Tera instance holding only the built-in error page
pub fn builtin(error_template: &str) -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(error_template, DEFAULT_ERROR_TEMPLATE)?;
    Ok(tera)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_renders_without_error_msg() {
        let tera = builtin("error.html").unwrap();
        let mut ctx = tera::Context::new();
        ctx.insert("Title", "Not here");
        ctx.insert("AppSubUrl", "");
        ctx.insert("Theme", "dark");

        let html = tera.render("error.html", &ctx).unwrap();
        assert!(html.contains("<h1>Not here</h1>"));
        assert!(!html.contains("page-error__detail"));
    }

    #[test]
    fn test_builtin_escapes_error_msg() {
        let tera = builtin("error.html").unwrap();
        let mut ctx = tera::Context::new();
        ctx.insert("Title", "Oops");
        ctx.insert("AppSubUrl", "");
        ctx.insert("Theme", "dark");
        ctx.insert("ErrorMsg", "<script>");

        let html = tera.render("error.html", &ctx).unwrap();
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_load_from_missing_dir_falls_back() {
        let tera = load("does-not-exist", "error.html").unwrap();
        assert!(tera.get_template_names().any(|n| n == "error.html"));
    }

    #[test]
    fn test_load_repository_templates() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");
        let tera = load(dir, "error.html").unwrap();
        assert!(tera.get_template_names().any(|n| n == "error.html"));
    }
}
