//! # Email
//!
//! Two messages go out per accepted lead:
//! - notification to the operator inbox (`YOUR_EMAIL`)
//! - auto-reply to the person who submitted the form
//!
//! Both are sent through an authenticated STARTTLS relay. They are attempted
//! independently and never retried. Callers only learn whether both went out.
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{error, info, warn};

use crate::{config::Config, error::NotifyError};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends the operator notification and the auto-reply. `true` only when both succeed.
    async fn notify(&self, recipient: &str, name: &str, niche: &str, problem: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub html: String,
}

pub fn plan_for_niche(niche: &str) -> &'static str {
    match niche.trim().to_lowercase().as_str() {
        "saas" => "Implement AI chatbot for customer support + automated onboarding emails",
        "ecommerce" => "Set up automated abandoned cart recovery + inventory notifications",
        "agency" => "Build client reporting dashboard + automated weekly status emails",
        "creator" => "Automate social media posting + email list growth sequences",
        "service" => "Create booking automation + automated invoice reminders",
        _ => "Custom automation workflow based on your needs",
    }
}

pub fn operator_email(
    recipient: &str,
    name: &str,
    niche: &str,
    problem: &str,
    submitted: &str,
) -> Email {
    Email {
        subject: format!("New Lead: {name} from {niche}"),
        html: format!(
            "<h2>New Lead Submission</h2>\n\
             <p><strong>Name:</strong> {name}</p>\n\
             <p><strong>Email:</strong> {recipient}</p>\n\
             <p><strong>Niche:</strong> {niche}</p>\n\
             <p><strong>Problem:</strong> {problem}</p>\n\
             <p><em>Submitted: {submitted}</em></p>\n"
        ),
    }
}

pub fn auto_reply_email(name: &str, niche: &str) -> Email {
    let plan = plan_for_niche(niche);

    Email {
        subject: "Your Automation Plan is Coming!".to_string(),
        html: format!(
            "<h2>Hi {name},</h2>\n\
             <p>Thanks for reaching out! I got your message about your {niche} business.</p>\n\
             <p><strong>A first idea for you:</strong> {plan}</p>\n\
             <p><strong>Here's what happens next:</strong></p>\n\
             <ul>\n\
             <li>I'll review your bottleneck within 24 hours</li>\n\
             <li>You'll get a personalized automation plan</li>\n\
             <li>We'll schedule a quick call to discuss setup</li>\n\
             </ul>\n\
             <p>In the meantime, check out some quick automation wins in my case studies.</p>\n\
             <p>Talk soon!<br><strong>AutoMate AI</strong></p>\n"
        ),
    }
}

pub struct SmtpNotifier {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    sender: String,
    operator: String,
}

impl SmtpNotifier {
    pub fn from_config(config: &Config) -> Self {
        let transport = match build_transport(config) {
            Ok(transport) => Some(transport),
            Err(e) => {
                warn!("{e}, notifications disabled");
                None
            }
        };

        Self {
            transport,
            sender: config.sender_email.clone(),
            operator: config.operator_email.clone(),
        }
    }

    async fn send(&self, recipient: &str, email: Email) -> Result<(), NotifyError> {
        let transport = self.transport.as_ref().ok_or(NotifyError::NotConfigured)?;

        let message = Message::builder()
            .from(self.sender.parse::<Mailbox>()?)
            .to(recipient.parse::<Mailbox>()?)
            .subject(email.subject)
            .header(ContentType::TEXT_HTML)
            .body(email.html)?;

        transport.send(message).await?;

        Ok(())
    }
}

fn build_transport(config: &Config) -> Result<AsyncSmtpTransport<Tokio1Executor>, NotifyError> {
    if config.smtp_server.is_empty()
        || config.sender_email.is_empty()
        || config.sender_password.is_empty()
    {
        return Err(NotifyError::NotConfigured);
    }

    let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.sender_email.clone(),
            config.sender_password.clone(),
        ))
        .timeout(Some(Duration::from_secs(30)))
        .build();

    Ok(transport)
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, recipient: &str, name: &str, niche: &str, problem: &str) -> bool {
        if self.transport.is_none() {
            warn!("Email not configured, skipping notification for {recipient}");
            return false;
        }

        let submitted = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let to_operator = self
            .send(
                &self.operator,
                operator_email(recipient, name, niche, problem, &submitted),
            )
            .await;
        if let Err(e) = &to_operator {
            error!("Operator notification for {recipient} failed: {e}");
        }

        let to_user = self.send(recipient, auto_reply_email(name, niche)).await;
        if let Err(e) = &to_user {
            error!("Auto-reply to {recipient} failed: {e}");
        }

        let sent = to_operator.is_ok() && to_user.is_ok();
        if sent {
            info!("Emails sent successfully for {recipient}");
        }

        sent
    }
}

#[cfg(test)]
mod tests {
    use super::{Notifier, SmtpNotifier, auto_reply_email, operator_email, plan_for_niche};
    use crate::config::Config;

    #[test]
    fn test_plan_for_known_niches() {
        assert_eq!(
            plan_for_niche("SaaS"),
            "Implement AI chatbot for customer support + automated onboarding emails"
        );
        assert_eq!(
            plan_for_niche(" ecommerce "),
            "Set up automated abandoned cart recovery + inventory notifications"
        );
        assert_eq!(
            plan_for_niche("Creator"),
            "Automate social media posting + email list growth sequences"
        );
    }

    #[test]
    fn test_plan_falls_back_for_unknown_niche() {
        assert_eq!(
            plan_for_niche("dentistry"),
            "Custom automation workflow based on your needs"
        );
    }

    #[test]
    fn test_operator_email_fields() {
        let email = operator_email(
            "ava@x.com",
            "Ava",
            "saas",
            "manual onboarding",
            "2026-01-01 09:30:00",
        );

        assert_eq!(email.subject, "New Lead: Ava from saas");
        assert!(email.html.contains("<strong>Email:</strong> ava@x.com"));
        assert!(email.html.contains("<strong>Problem:</strong> manual onboarding"));
        assert!(email.html.contains("Submitted: 2026-01-01 09:30:00"));
    }

    #[test]
    fn test_auto_reply_includes_plan() {
        let email = auto_reply_email("Ava", "agency");

        assert_eq!(email.subject, "Your Automation Plan is Coming!");
        assert!(email.html.contains("Hi Ava,"));
        assert!(email.html.contains("your agency business"));
        assert!(email.html.contains("Build client reporting dashboard"));
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_sending() {
        let notifier = SmtpNotifier::from_config(&Config::default());

        assert!(!notifier.notify("ava@x.com", "Ava", "saas", "manual onboarding").await);
    }
}
