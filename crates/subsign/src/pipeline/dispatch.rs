use tracing::{debug, warn};

use crate::db::{organization_repo, subscription_repo, Database};
use crate::notify::{Notification, Notifier};

use super::error::PipelineWarning;

/// Tells the deal's introducer organization that the pack went out.
///
/// Best effort: every failure becomes a warning and the run still succeeds.
pub fn notify_introducer(
    db: &Database,
    notifier: &dyn Notifier,
    deal_id: &str,
    subscription_id: &str,
    link: String,
    warnings: &mut Vec<PipelineWarning>,
) {
    let users = match introducer_users(db, deal_id) {
        Ok(users) => users,
        Err(e) => {
            warn!(deal_id, error = %e, "Could not look up introducer users");
            warnings.push(PipelineWarning::NotificationLookupFailed {
                error: e.to_string(),
            });
            return;
        }
    };

    if users.is_empty() {
        debug!(deal_id, "No introducer to notify");
        return;
    }

    for user_id in users {
        let notification = Notification {
            user_id: user_id.clone(),
            title: "Subscription pack sent for signature".to_string(),
            message: format!(
                "The subscription pack for subscription {} has been sent for signature.",
                subscription_id
            ),
            link: Some(link.clone()),
        };
        match notifier.enqueue(&notification) {
            Ok(()) => debug!(user_id = %user_id, "Introducer notified"),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Failed to notify introducer user");
                warnings.push(PipelineWarning::NotificationFailed {
                    user_id,
                    error: e.to_string(),
                });
            }
        }
    }
}

fn introducer_users(
    db: &Database,
    deal_id: &str,
) -> Result<Vec<String>, crate::db::DatabaseError> {
    let Some(deal) = subscription_repo::find_deal(db, deal_id)? else {
        return Ok(Vec::new());
    };
    let Some(org_id) = deal.introducer_org_id else {
        return Ok(Vec::new());
    };
    Ok(organization_repo::list_users(db, &org_id)?
        .into_iter()
        .map(|p| p.id)
        .collect())
}
