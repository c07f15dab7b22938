use tracing::warn;

use crate::db::profile_repo::{self, ProfileRow};
use crate::db::{organization_repo, Database};
use crate::model::{Countersigner, CountersignerSource};
use crate::pipeline::{PipelineError, PipelineWarning};

#[derive(Debug, Clone)]
pub struct ResolvedCountersigner {
    pub countersigner: Countersigner,
    pub warnings: Vec<PipelineWarning>,
}

/// Display name of a profile, or its e-mail when the name is blank.
fn signing_name(profile: &ProfileRow, email: &str) -> String {
    let name = profile.display_name.trim();
    if name.is_empty() {
        email.to_string()
    } else {
        name.to_string()
    }
}

fn resolve_delegate(db: &Database, organization_id: &str) -> Result<Countersigner, PipelineError> {
    let organization = organization_repo::find_by_id(db, organization_id)?
        .ok_or_else(|| PipelineError::not_found("organization", organization_id))?;

    let profile = organization_repo::find_primary_user(db, organization_id)?.ok_or_else(|| {
        PipelineError::configuration(format!(
            "delegate organization '{}' has no primary user; assign one before delegating countersignature",
            organization.name
        ))
    })?;

    let email = profile.usable_email().ok_or_else(|| {
        PipelineError::configuration(format!(
            "primary user '{}' of delegate organization '{}' has no e-mail address",
            profile.id, organization.name
        ))
    })?;

    Ok(Countersigner {
        name: signing_name(&profile, email),
        email: email.to_string(),
        source: CountersignerSource::Delegate {
            organization_id: organization.id,
            organization_name: organization.name,
            profile_id: profile.id.clone(),
        },
    })
}

/// Picks the platform-side countersigner.
///
/// An explicitly requested delegate organization is final: if it cannot be
/// resolved the call fails without trying anything else. Otherwise the
/// canonical approver is used, then the invoking operator (with a warning).
pub fn resolve_countersigner(
    db: &Database,
    delegate_organization_id: Option<&str>,
    operator_profile_id: Option<&str>,
) -> Result<ResolvedCountersigner, PipelineError> {
    if let Some(organization_id) = delegate_organization_id.map(str::trim).filter(|s| !s.is_empty())
    {
        return Ok(ResolvedCountersigner {
            countersigner: resolve_delegate(db, organization_id)?,
            warnings: Vec::new(),
        });
    }

    if let Some(approver) = profile_repo::find_designated_signer(db)? {
        if let Some(email) = approver.usable_email() {
            return Ok(ResolvedCountersigner {
                countersigner: Countersigner {
                    name: signing_name(&approver, email),
                    email: email.to_string(),
                    source: CountersignerSource::Approver {
                        profile_id: approver.id.clone(),
                    },
                },
                warnings: Vec::new(),
            });
        }
    }

    if let Some(operator_id) = operator_profile_id {
        if let Some(operator) = profile_repo::find_by_id(db, operator_id)? {
            if let Some(email) = operator.usable_email() {
                warn!(
                    profile_id = %operator.id,
                    "No canonical approver configured; the invoking operator will countersign"
                );
                return Ok(ResolvedCountersigner {
                    countersigner: Countersigner {
                        name: signing_name(&operator, email),
                        email: email.to_string(),
                        source: CountersignerSource::OperatorFallback {
                            profile_id: operator.id.clone(),
                        },
                    },
                    warnings: vec![PipelineWarning::OperatorFallbackCountersigner {
                        profile_id: operator.id.clone(),
                    }],
                });
            }
        }
    }

    Err(PipelineError::configuration(
        "no countersigner available: flag a profile with an e-mail address as designated \
         signer, or request a delegate countersigning organization",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::organization_repo::OrganizationRow;
    use crate::model::SignerRole;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, minute, 0).unwrap()
    }

    fn profile(db: &Database, id: &str, email: Option<&str>, designated: bool, minute: u32) {
        profile_repo::insert(
            db,
            &ProfileRow {
                id: id.to_string(),
                display_name: format!("Profile {}", id),
                email: email.map(str::to_string),
                designated_signer: designated,
                created_at: ts(minute),
            },
        )
        .unwrap();
    }

    fn organization(db: &Database, id: &str) {
        organization_repo::insert(
            db,
            &OrganizationRow {
                id: id.to_string(),
                name: format!("Org {}", id),
                kind: "introducer".to_string(),
                created_at: ts(0),
            },
        )
        .unwrap();
    }

    #[test]
    fn test_operator_fallback_when_no_approver() {
        let db = Database::open_in_memory().unwrap();
        profile(&db, "op", Some("op@platform.test"), false, 1);

        let resolved = resolve_countersigner(&db, None, Some("op")).unwrap();
        assert_eq!(resolved.countersigner.email, "op@platform.test");
        assert_eq!(resolved.countersigner.role(), SignerRole::Admin);
        assert!(matches!(
            resolved.countersigner.source,
            CountersignerSource::OperatorFallback { .. }
        ));
        assert_eq!(
            resolved.warnings,
            vec![PipelineWarning::OperatorFallbackCountersigner {
                profile_id: "op".to_string()
            }]
        );
    }

    #[test]
    fn test_approver_preferred_over_operator() {
        let db = Database::open_in_memory().unwrap();
        profile(&db, "op", Some("op@platform.test"), false, 1);
        profile(&db, "blank", Some(" "), true, 2);
        profile(&db, "approver", Some("ceo@platform.test"), true, 3);
        profile(&db, "late", Some("late@platform.test"), true, 4);

        let resolved = resolve_countersigner(&db, None, Some("op")).unwrap();
        assert_eq!(resolved.countersigner.email, "ceo@platform.test");
        assert_eq!(resolved.countersigner.profile_id(), "approver");
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn test_delegate_preferred_over_approver() {
        let db = Database::open_in_memory().unwrap();
        profile(&db, "approver", Some("ceo@platform.test"), true, 1);
        profile(&db, "intro", Some("lead@intro.test"), false, 2);
        organization(&db, "org-1");
        organization_repo::add_user(&db, "org-1", "intro", true, ts(3)).unwrap();

        let resolved = resolve_countersigner(&db, Some("org-1"), None).unwrap();
        assert_eq!(resolved.countersigner.email, "lead@intro.test");
        assert_eq!(resolved.countersigner.role(), SignerRole::Arranger);
        match &resolved.countersigner.source {
            CountersignerSource::Delegate {
                organization_name, ..
            } => assert_eq!(organization_name, "Org org-1"),
            other => panic!("expected delegate, got {:?}", other),
        }
    }

    #[test]
    fn test_delegate_failures_are_final() {
        let db = Database::open_in_memory().unwrap();
        profile(&db, "approver", Some("ceo@platform.test"), true, 1);
        profile(&db, "mute", None, false, 2);
        organization(&db, "no-primary");
        organization(&db, "no-email");
        organization_repo::add_user(&db, "no-email", "mute", true, ts(3)).unwrap();

        assert!(matches!(
            resolve_countersigner(&db, Some("ghost"), Some("approver")),
            Err(PipelineError::NotFound { .. })
        ));
        assert!(matches!(
            resolve_countersigner(&db, Some("no-primary"), Some("approver")),
            Err(PipelineError::Configuration { .. })
        ));
        assert!(matches!(
            resolve_countersigner(&db, Some("no-email"), Some("approver")),
            Err(PipelineError::Configuration { .. })
        ));
    }

    #[test]
    fn test_nothing_resolves_is_configuration_error() {
        let db = Database::open_in_memory().unwrap();
        profile(&db, "op", None, false, 1);

        assert!(matches!(
            resolve_countersigner(&db, None, Some("op")),
            Err(PipelineError::Configuration { .. })
        ));
        assert!(matches!(
            resolve_countersigner(&db, None, None),
            Err(PipelineError::Configuration { .. })
        ));
        assert!(matches!(
            resolve_countersigner(&db, Some("  "), Some("ghost")),
            Err(PipelineError::Configuration { .. })
        ));
    }
}
