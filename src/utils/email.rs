use lettre::message::{MultiPart, SinglePart, header};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{instrument, warn};

use supernova_config::EmailConfig;
use supernova_core::AppError;

pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Welcomes the first administrator of a newly created school.
    #[instrument(skip(self))]
    pub async fn send_school_welcome_email(
        &self,
        to_email: &str,
        to_name: &str,
        school_name: &str,
    ) -> Result<(), AppError> {
        let login_link = format!("{}/login", self.config.frontend_url);
        let html_body = self.school_welcome_template(to_name, school_name, &login_link);
        let text_body = format!(
            "Hi {},\n\n\
             {} is now set up on Supernova and you are its administrator.\n\n\
             Sign in with this email address at:\n\
             {}\n\n\
             From there you can add teachers and students and enroll them in \
             the courses your school has licensed.\n\n\
             Best regards,\n\
             Supernova Team",
            to_name, school_name, login_link
        );

        self.send_email(
            to_email,
            &format!("Welcome to Supernova, {}", school_name),
            &text_body,
            &html_body,
        )
        .await
    }

    /// Sends the welcome email when SMTP is enabled. Delivery failures are
    /// logged and never surface to the caller.
    pub async fn notify_school_created(&self, to_email: &str, to_name: &str, school_name: &str) {
        if !self.is_enabled() {
            return;
        }
        if let Err(e) = self
            .send_school_welcome_email(to_email, to_name, school_name)
            .await
        {
            warn!(error = %e.error, email = %to_email, "Failed to send school welcome email");
        }
    }

    #[instrument(skip(self, html_body, text_body))]
    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let from = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::internal_error(format!("Invalid from email: {}", e)))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| AppError::internal_error(format!("Invalid to email: {}", e)))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(header::ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::internal_error(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.has_credentials() {
            let creds = Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            );

            SmtpTransport::relay(&self.config.smtp_host)
                .map_err(|e| {
                    AppError::internal_error(format!("Failed to create SMTP relay: {}", e))
                })?
                .port(self.config.smtp_port)
                .credentials(creds)
                .build()
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        };

        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::internal_error(format!("Task join error: {}", e)))?
            .map_err(|e| AppError::internal_error(format!("Failed to send email: {}", e)))?;

        Ok(())
    }

    fn school_welcome_template(&self, name: &str, school_name: &str, login_link: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Welcome to Supernova</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #1f2937; max-width: 600px; margin: 0 auto; padding: 20px;">
    <div style="background-color: #312e81; color: #ffffff; padding: 24px; border-radius: 8px 8px 0 0;">
        <h1 style="margin: 0; font-size: 22px;">Welcome to Supernova</h1>
    </div>
    <div style="background-color: #f9fafb; padding: 24px; border-radius: 0 0 8px 8px;">
        <p>Hi {name},</p>
        <p><strong>{school_name}</strong> is now set up on Supernova and you are its administrator.</p>
        <p style="text-align: center; margin: 32px 0;">
            <a href="{login_link}" style="background-color: #4f46e5; color: #ffffff; padding: 12px 28px; text-decoration: none; border-radius: 6px;">Sign in</a>
        </p>
        <p>From there you can add teachers and students and enroll them in the courses your school has licensed.</p>
        <p>Best regards,<br>Supernova Team</p>
    </div>
</body>
</html>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_template_names_school_and_link() {
        let service = EmailService::new(EmailConfig::disabled());
        let html = service.school_welcome_template("Ada", "Hillside Academy", "http://x/login");
        assert!(html.contains("Hi Ada,"));
        assert!(html.contains("<strong>Hillside Academy</strong>"));
        assert!(html.contains(r#"href="http://x/login""#));
    }

    #[tokio::test]
    async fn disabled_service_skips_delivery() {
        let service = EmailService::new(EmailConfig::disabled());
        assert!(!service.is_enabled());
        service
            .notify_school_created("admin@school.edu", "Ada", "Hillside")
            .await;
    }
}
