//! Delivery of availability notices.
//!
//! The scheduler only knows the [`Notifier`] capability. The engine binary
//! wires in [`TelegramNotifier`]; tests use recording fakes.

mod telegram;

pub use telegram::{TelegramConfig, TelegramNotifier};

use async_trait::async_trait;
use thiserror::Error;

use crate::db::User;

/// Delivery failures. Never fatal to the scheduler.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The transport could not be reached.
    #[error("delivery transport failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The transport refused the message.
    #[error("delivery rejected ({status}): {description}")]
    Rejected { status: u16, description: String },
}

/// A plan that just became available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityNotice {
    pub plan_code: String,
    pub region: String,
    /// Datacenters currently showing stock, sorted.
    pub datacenters: Vec<String>,
}

impl AvailabilityNotice {
    /// HTML message text addressed to `user`.
    pub fn render_html(&self, user: &User) -> String {
        let datacenters = self
            .datacenters
            .iter()
            .map(|dc| format!("<code>{}</code>", escape_html(dc)))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{} plan <code>{}</code> is available in {}",
            escape_html(&user.mention()),
            escape_html(&self.plan_code),
            datacenters
        )
    }
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Capability to deliver a notice to a user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user: &User, notice: &AvailabilityNotice) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_html() {
        let notice = AvailabilityNotice {
            plan_code: "24ska01".to_string(),
            region: "ovh-eu".to_string(),
            datacenters: vec!["gra".to_string(), "rbx".to_string()],
        };
        let user = User::new(1).with_username("ada");
        assert_eq!(
            notice.render_html(&user),
            "@ada plan <code>24ska01</code> is available in <code>gra</code>, <code>rbx</code>"
        );
    }

    #[test]
    fn test_render_escapes_markup() {
        let notice = AvailabilityNotice {
            plan_code: "a<b>".to_string(),
            region: "ovh-eu".to_string(),
            datacenters: vec!["gra".to_string()],
        };
        let mut user = User::new(1);
        user.first_name = Some("Tom & Jerry".to_string());
        assert_eq!(
            notice.render_html(&user),
            "Tom &amp; Jerry plan <code>a&lt;b&gt;</code> is available in <code>gra</code>"
        );
    }
}
