//! Builders for seeding the database with portal records.
//!
//! Every builder stamps rows with deterministic, increasing timestamps so
//! that ordering-sensitive lookups are reproducible.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use subsign::db::document_repo::{self, DocumentRow};
use subsign::db::investor_repo::{self, InvestorRow, MemberRow};
use subsign::db::organization_repo::{self, OrganizationRow};
use subsign::db::profile_repo::{self, ProfileRow};
use subsign::db::subscription_repo::{self, DealRow, SubscriptionRow};
use subsign::db::Database;
use subsign::model::DocumentStatus;

/// A fixed point in time offset by `minutes`.
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// Inserts a platform profile.
pub fn profile(db: &Database, id: &str, name: &str, email: Option<&str>) {
    insert_profile(db, id, name, email, false, 0);
}

/// Inserts a profile flagged as the canonical countersigning approver.
pub fn approver(db: &Database, id: &str, name: &str, email: &str) {
    insert_profile(db, id, name, Some(email), true, 0);
}

fn insert_profile(
    db: &Database,
    id: &str,
    name: &str,
    email: Option<&str>,
    designated_signer: bool,
    minute: i64,
) {
    profile_repo::insert(
        db,
        &ProfileRow {
            id: id.to_string(),
            display_name: name.to_string(),
            email: email.map(str::to_string),
            designated_signer,
            created_at: at(minute),
        },
    )
    .unwrap();
}

/// Inserts an organization and attaches `users` as `(profile id, is primary)`.
pub fn organization(db: &Database, id: &str, name: &str, kind: &str, users: &[(&str, bool)]) {
    organization_repo::insert(
        db,
        &OrganizationRow {
            id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            created_at: at(0),
        },
    )
    .unwrap();
    for (i, (profile_id, primary)) in users.iter().enumerate() {
        organization_repo::add_user(db, id, profile_id, *primary, at(i as i64)).unwrap();
    }
}

/// Builder for investors and their members.
pub struct InvestorBuilder {
    investor: InvestorRow,
    members: Vec<MemberRow>,
}

impl InvestorBuilder {
    pub fn individual(id: &str, name: &str, email: &str) -> Self {
        Self::with_type(id, name, Some(email), "individual")
    }

    pub fn entity(id: &str, name: &str, email: &str) -> Self {
        Self::with_type(id, name, Some(email), "entity")
    }

    pub fn with_type(id: &str, name: &str, email: Option<&str>, investor_type: &str) -> Self {
        Self {
            investor: InvestorRow {
                id: id.to_string(),
                legal_name: name.to_string(),
                display_name: None,
                investor_type: investor_type.to_string(),
                email: email.map(str::to_string),
                created_at: at(0),
            },
            members: Vec::new(),
        }
    }

    /// Adds an active member flagged as authorized signatory.
    pub fn signatory(self, id: &str, name: &str, email: &str) -> Self {
        self.member(id, name, Some(email), true, true)
    }

    pub fn member(
        mut self,
        id: &str,
        name: &str,
        email: Option<&str>,
        is_signatory: bool,
        is_active: bool,
    ) -> Self {
        let minute = self.members.len() as i64 + 1;
        self.members.push(MemberRow {
            id: id.to_string(),
            investor_id: self.investor.id.clone(),
            full_name: name.to_string(),
            email: email.map(str::to_string),
            is_signatory,
            is_active,
            created_at: at(minute),
        });
        self
    }

    pub fn insert(self, db: &Database) -> InvestorRow {
        investor_repo::insert_investor(db, &self.investor).unwrap();
        for member in &self.members {
            investor_repo::insert_member(db, member).unwrap();
        }
        self.investor
    }
}

/// Inserts a deal, optionally referred by an introducer organization.
pub fn deal(db: &Database, id: &str, introducer_org_id: Option<&str>) {
    subscription_repo::insert_deal(
        db,
        &DealRow {
            id: id.to_string(),
            name: format!("Deal {}", id),
            vehicle_id: Some("veh-1".to_string()),
            introducer_org_id: introducer_org_id.map(str::to_string),
            created_at: at(0),
        },
    )
    .unwrap();
}

pub fn subscription(db: &Database, id: &str, investor_id: &str, deal_id: &str) {
    subscription_repo::insert(
        db,
        &SubscriptionRow {
            id: id.to_string(),
            investor_id: investor_id.to_string(),
            deal_id: deal_id.to_string(),
            vehicle_id: Some("veh-1".to_string()),
            pack_generated_at: None,
            pack_sent_at: None,
            created_at: at(0),
            updated_at: at(0),
        },
    )
    .unwrap();
}

/// Builder for document rows.
pub struct DocumentBuilder {
    row: DocumentRow,
}

impl DocumentBuilder {
    pub fn new(id: &str, subscription_id: &str, file_key: &str) -> Self {
        Self {
            row: DocumentRow {
                id: id.to_string(),
                subscription_id: subscription_id.to_string(),
                deal_id: Some("deal-1".to_string()),
                vehicle_id: Some("veh-1".to_string()),
                folder_id: Some("folder-1".to_string()),
                name: file_key.rsplit('/').next().unwrap_or(file_key).to_string(),
                file_key: file_key.to_string(),
                mime_type: None,
                status: DocumentStatus::Draft,
                ready_for_signature: false,
                previous_version_id: None,
                superseded_by_id: None,
                converted_at: None,
                created_by: None,
                created_at: at(0),
                updated_at: at(0),
            },
        }
    }

    pub fn mime(mut self, mime_type: &str) -> Self {
        self.row.mime_type = Some(mime_type.to_string());
        self
    }

    pub fn insert(self, db: &Database) -> DocumentRow {
        document_repo::insert(db, &self.row).unwrap();
        self.row
    }
}
