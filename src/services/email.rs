// src/services/email.rs
use aws_config::BehaviorVersion;
use aws_sdk_sesv2::config::Region;
use aws_sdk_sesv2::types::{Body as SesBody, Content, Destination, EmailContent, Message};
use aws_sdk_sesv2::Client as SesClient;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::common::config::EmailConfig;
use crate::common::helpers::safe_email_log;

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("SES operation failed: {0}")]
    SESError(String),
}

/// Outgoing transactional mail. Without a sender address nothing is sent and
/// the message is only logged.
pub struct EmailService {
    sender: Option<(SesClient, String)>,
}

impl EmailService {
    pub async fn from_config(config: &EmailConfig) -> Self {
        let Some(from_email) = config.from_email.clone() else {
            warn!("SES_FROM_EMAIL not set, emails will be logged instead of sent");
            return Self::disabled();
        };

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        info!(region = %config.region, from = %from_email, "Using SES for outgoing email");
        Self {
            sender: Some((SesClient::new(&sdk_config), from_email)),
        }
    }

    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<(), EmailError> {
        let body = password_reset_email(reset_link);
        match &self.sender {
            Some(_) => self.send_email(to, "Password Reset Request", &body).await,
            None => {
                info!(
                    to = %safe_email_log(to),
                    "Password reset requested (email delivery disabled)"
                );
                Ok(())
            }
        }
    }

    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        let Some((client, from_email)) = &self.sender else {
            return Ok(());
        };

        let destination = Destination::builder()
            .set_to_addresses(Some(vec![to.to_string()]))
            .build();

        let subject_content = Content::builder()
            .data(subject)
            .charset("UTF-8")
            .build()
            .map_err(|e| EmailError::SESError(format!("Failed to build subject: {}", e)))?;

        let body_content = Content::builder()
            .data(html)
            .charset("UTF-8")
            .build()
            .map_err(|e| EmailError::SESError(format!("Failed to build body: {}", e)))?;

        let message = Message::builder()
            .subject(subject_content)
            .body(SesBody::builder().html(body_content).build())
            .build();

        let result = client
            .send_email()
            .from_email_address(from_email)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, to = %safe_email_log(to), "Failed to send email via SES");
                EmailError::SESError(format!("Send failed: {}", e))
            })?;

        info!(
            to = %safe_email_log(to),
            message_id = ?result.message_id(),
            "Email sent via SES"
        );
        Ok(())
    }
}

pub fn password_reset_email(reset_link: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .button {{ display: inline-block; padding: 12px 24px; background-color: #16A34A; color: white; text-decoration: none; border-radius: 5px; margin: 10px 0; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Password Reset</h1>
        <p>You requested a password reset for your AI Fitness Coach account.</p>
        <p><a class="button" href="{link}">Reset Password</a></p>
        <p>Or copy this link into your browser: {link}</p>
        <p>This link will expire in 1 hour.</p>
        <p>If you did not request this, you can ignore this email.</p>
        <div class="footer">
            <p>This is an automated message. Please do not reply directly to this email.</p>
        </div>
    </div>
</body>
</html>"#,
        link = reset_link
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_email_contains_link() {
        let html = password_reset_email("http://localhost:3000/reset-password?token=abc");
        assert!(html.contains("href=\"http://localhost:3000/reset-password?token=abc\""));
        assert!(html.contains("expire in 1 hour"));
    }

    #[tokio::test]
    async fn test_disabled_service_does_not_fail() {
        let service = EmailService::disabled();
        assert!(!service.is_enabled());
        service
            .send_password_reset("user@example.com", "http://x/reset-password?token=t")
            .await
            .unwrap();
    }
}
