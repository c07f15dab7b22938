use std::collections::HashSet;

use tracing::warn;

use crate::db::investor_repo::{self, InvestorRow, MemberRow};
use crate::db::Database;
use crate::model::{InvestorType, PositionSlot, Signatory, PRIMARY_CONTACT_REF};
use crate::pipeline::{PipelineError, PipelineWarning};
use crate::sanitize::redact_email;

#[derive(Debug, Clone)]
pub struct ResolvedSignatories {
    /// In slot order.
    pub signatories: Vec<Signatory>,
    pub warnings: Vec<PipelineWarning>,
}

fn usable(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The investor signing as its own primary contact.
fn primary_contact(investor: &InvestorRow) -> Result<Signatory, PipelineError> {
    let email = usable(investor.email.as_deref()).ok_or_else(|| {
        PipelineError::validation(format!("investor '{}' has no e-mail address", investor.id))
    })?;
    let name = investor.signing_name();
    if name.is_empty() {
        return Err(PipelineError::validation(format!(
            "investor '{}' has no legal or display name",
            investor.id
        )));
    }
    Ok(Signatory {
        signer_ref: PRIMARY_CONTACT_REF.to_string(),
        full_name: name.to_string(),
        email: email.to_string(),
        slot: PositionSlot::for_signatory_index(0),
    })
}

fn member_signatory(member: &MemberRow, index: usize) -> Result<Signatory, PipelineError> {
    let email = usable(member.email.as_deref()).ok_or_else(|| {
        PipelineError::validation(format!(
            "investor member '{}' has no e-mail address",
            member.id
        ))
    })?;
    Ok(Signatory {
        signer_ref: member.id.clone(),
        full_name: member.full_name.trim().to_string(),
        email: email.to_string(),
        slot: PositionSlot::for_signatory_index(index),
    })
}

/// Looks up and checks every caller-selected member. Any bad id fails the
/// whole selection.
fn resolve_selected(
    db: &Database,
    investor: &InvestorRow,
    requested: &[String],
) -> Result<Vec<Signatory>, PipelineError> {
    let mut seen = HashSet::new();
    let mut signatories = Vec::new();

    for id in requested {
        let id = id.trim();
        if id.is_empty() || !seen.insert(id) {
            continue;
        }

        let member = investor_repo::find_member(db, id)?
            .ok_or_else(|| PipelineError::not_found("investor member", id))?;
        if member.investor_id != investor.id {
            return Err(PipelineError::validation(format!(
                "investor member '{}' does not belong to investor '{}'",
                id, investor.id
            )));
        }
        if !member.is_active {
            return Err(PipelineError::validation(format!(
                "investor member '{}' is not active",
                id
            )));
        }

        signatories.push(member_signatory(&member, signatories.len())?);
    }

    Ok(signatories)
}

/// Computes the ordered investor-side signing parties for a subscription.
///
/// An explicit, non-empty `requested` list is validated and used as given.
/// Otherwise individuals sign themselves and entities sign through their
/// active authorized representatives, falling back to the investor's own
/// contact (with a warning) when none is flagged.
pub fn resolve_signatories(
    db: &Database,
    investor: &InvestorRow,
    requested: Option<&[String]>,
    max_signatories: usize,
) -> Result<ResolvedSignatories, PipelineError> {
    let mut warnings = Vec::new();

    let signatories = match requested.filter(|ids| !ids.is_empty()) {
        Some(ids) => resolve_selected(db, investor, ids)?,
        None => match investor.kind() {
            InvestorType::Individual => vec![primary_contact(investor)?],
            InvestorType::Entity => {
                let members = investor_repo::list_active_signatories(db, &investor.id)?;
                if members.is_empty() {
                    warn!(
                        investor_id = %investor.id,
                        "Entity investor has no active authorized signatory; using primary contact"
                    );
                    warnings.push(PipelineWarning::EntityWithoutSignatories {
                        investor_id: investor.id.clone(),
                    });
                    vec![primary_contact(investor)?]
                } else {
                    members
                        .iter()
                        .enumerate()
                        .map(|(i, m)| member_signatory(m, i))
                        .collect::<Result<Vec<_>, _>>()?
                }
            }
        },
    };

    if signatories.is_empty() {
        return Err(PipelineError::validation("no signatory could be resolved"));
    }
    if signatories.len() > max_signatories {
        return Err(PipelineError::validation(format!(
            "{} signatories resolved but the document has {} investor signature blocks",
            signatories.len(),
            max_signatories
        )));
    }

    for s in &signatories {
        tracing::debug!(slot = %s.slot, signer = %redact_email(&s.email), "Resolved signatory");
    }

    Ok(ResolvedSignatories {
        signatories,
        warnings,
    })
}
