use chrono::Duration;

use crate::config::Config;

/// Runtime settings the pipeline reads on every run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Lifetime of the document link handed to the e-signature service.
    pub signed_url_ttl: Duration,
    /// Number of investor-side signature blocks on the rendered page.
    pub max_signatories: usize,
    /// Prefix of the subscription link carried by notifications.
    pub notification_link_base: String,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            signed_url_ttl: Duration::days(i64::from(config.storage.signed_url_ttl_days)),
            max_signatories: config.signing.max_signatories,
            notification_link_base: config
                .notifications
                .link_base
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Link to a subscription page, e.g. `/subscriptions/<id>`.
    pub fn subscription_link(&self, subscription_id: &str) -> String {
        format!("{}/{}", self.notification_link_base, subscription_id)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            signed_url_ttl: Duration::days(7),
            max_signatories: 10,
            notification_link_base: "/subscriptions".to_string(),
        }
    }
}
