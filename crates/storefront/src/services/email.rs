//! Transactional email: welcome messages and password reset links.
//!
//! Uses SMTP via lettre with Askama HTML and plain-text templates. Delivery
//! failures are reported to the caller, which logs them; no page depends on
//! an email going out.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

#[derive(Template)]
#[template(path = "email/welcome.html")]
struct WelcomeEmailHtml<'a> {
    name: &'a str,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/welcome.txt")]
struct WelcomeEmailText<'a> {
    name: &'a str,
    shop_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    name: &'a str,
    reset_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    name: &'a str,
    reset_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            base_url: base_url.to_string(),
        })
    }

    /// Send a welcome email after signup.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_welcome_email(&self, to: &str, name: &str) -> Result<(), EmailError> {
        let shop_url = self.base_url.as_str();
        let html = WelcomeEmailHtml { name, shop_url }.render()?;
        let text = WelcomeEmailText { name, shop_url }.render()?;

        self.send_multipart_email(to, "Welcome to Boutique", &text, &html)
            .await
    }

    /// Send a password reset link for `token`.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let reset_url = reset_link(&self.base_url, token);
        let html = PasswordResetEmailHtml {
            name,
            reset_url: &reset_url,
        }
        .render()?;
        let text = PasswordResetEmailText {
            name,
            reset_url: &reset_url,
        }
        .render()?;

        self.send_multipart_email(to, "Reset your Boutique password", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent");
        Ok(())
    }
}

fn reset_link(base_url: &str, token: &str) -> String {
    format!("{base_url}/reset/{token}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_link() {
        assert_eq!(
            reset_link("https://boutique.test", "ab12"),
            "https://boutique.test/reset/ab12"
        );
    }

    #[test]
    fn test_password_reset_templates_contain_link() {
        let reset_url = "https://boutique.test/reset/ab12";
        let html = PasswordResetEmailHtml {
            name: "marie",
            reset_url,
        }
        .render()
        .unwrap();
        let text = PasswordResetEmailText {
            name: "marie",
            reset_url,
        }
        .render()
        .unwrap();

        assert!(html.contains(reset_url));
        assert!(text.contains(reset_url));
        assert!(text.contains("marie"));
    }

    #[test]
    fn test_welcome_template_escapes_name() {
        let html = WelcomeEmailHtml {
            name: "<b>marie</b>",
            shop_url: "https://boutique.test",
        }
        .render()
        .unwrap();

        assert!(!html.contains("<b>marie</b>"));
    }
}
