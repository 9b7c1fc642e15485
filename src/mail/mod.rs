use async_trait::async_trait;

mod smtp;
mod templates;

pub use smtp::SmtpMailer;

/// Outbound notification channel. State transitions commit before any of
/// these are called; a failure here must not undo them.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()>;
    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()>;
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
    async fn send_reset_success(&self, to: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_verification(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let (subject, body) = templates::verification_email(code);
        self.send(to, &subject, body).await
    }

    async fn send_welcome(&self, to: &str, name: &str) -> anyhow::Result<()> {
        let (subject, body) = templates::welcome_email(name);
        self.send(to, &subject, body).await
    }

    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        let (subject, body) = templates::password_reset_email(reset_url);
        self.send(to, &subject, body).await
    }

    async fn send_reset_success(&self, to: &str) -> anyhow::Result<()> {
        let (subject, body) = templates::reset_success_email();
        self.send(to, &subject, body).await
    }
}
