//! HTML rendering of security alert mails.

use crate::MailerError;
use askama::Template;

/// Security alert wrapped in a minimal HTML layout.
#[derive(Template, Debug, Clone)]
#[template(
    source = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{{ subject }}</title></head>
<body>
<h2>{{ site_name }}</h2>
{% for line in paragraphs %}<p>{{ line }}</p>
{% endfor %}</body>
</html>"#,
    ext = "html"
)]
pub struct SecurityAlertTemplate {
    pub site_name: String,
    pub subject: String,
    /// Body lines, one paragraph each.
    pub paragraphs: Vec<String>,
}

impl SecurityAlertTemplate {
    pub fn new(
        site_name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let body: String = body.into();
        Self {
            site_name: site_name.into(),
            subject: subject.into(),
            paragraphs: body.lines().map(str::to_string).collect(),
        }
    }

    pub fn render_html(&self) -> Result<String, MailerError> {
        Ok(self.render()?)
    }
}
