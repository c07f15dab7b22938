//! Domain types shared by the repositories, resolvers and the pipeline.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Signer reference used when an investor signs as their own primary contact
/// rather than through an investor-member record.
pub const PRIMARY_CONTACT_REF: &str = "primary_contact";

/// Stores a text-backed enum as its `as_str()` form and parses it back on read.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_str()?;
                <$ty>::parse(raw).ok_or_else(|| {
                    FromSqlError::Other(
                        format!("unknown {} value '{}'", stringify!($ty), raw).into(),
                    )
                })
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Converted,
    PendingSignature,
    Signed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Converted => "converted",
            DocumentStatus::PendingSignature => "pending_signature",
            DocumentStatus::Signed => "signed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(DocumentStatus::Draft),
            "converted" => Some(DocumentStatus::Converted),
            "pending_signature" => Some(DocumentStatus::PendingSignature),
            "signed" => Some(DocumentStatus::Signed),
            _ => None,
        }
    }
}

sql_text_enum!(DocumentStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureStatus {
    Pending,
    Signed,
    Cancelled,
    Expired,
}

impl SignatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureStatus::Pending => "pending",
            SignatureStatus::Signed => "signed",
            SignatureStatus::Cancelled => "cancelled",
            SignatureStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SignatureStatus::Pending),
            "signed" => Some(SignatureStatus::Signed),
            "cancelled" => Some(SignatureStatus::Cancelled),
            "expired" => Some(SignatureStatus::Expired),
            _ => None,
        }
    }

    /// Pending and signed requests make up a document's active set.
    pub fn is_active(&self) -> bool {
        matches!(self, SignatureStatus::Pending | SignatureStatus::Signed)
    }
}

sql_text_enum!(SignatureStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerRole {
    Investor,
    Admin,
    Arranger,
}

impl SignerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignerRole::Investor => "investor",
            SignerRole::Admin => "admin",
            SignerRole::Arranger => "arranger",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "investor" => Some(SignerRole::Investor),
            "admin" => Some(SignerRole::Admin),
            "arranger" => Some(SignerRole::Arranger),
            _ => None,
        }
    }
}

impl fmt::Display for SignerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

sql_text_enum!(SignerRole);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorType {
    Individual,
    Entity,
}

impl InvestorType {
    /// Anything that is not an individual (corporate, trust, fund, institutional, ...)
    /// signs through authorized representatives.
    pub fn from_legal_type(legal_type: &str) -> Self {
        if legal_type.trim().eq_ignore_ascii_case("individual") {
            InvestorType::Individual
        } else {
            InvestorType::Entity
        }
    }
}

/// Placement of a signature block on the rendered page.
///
/// Investor-side parties fill `party_a`, `party_a_2`, `party_a_3`, ... in
/// resolution order; the countersigner always signs at `party_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PositionSlot {
    /// 1-based ordinal of the investor-side party.
    Investor(u32),
    Countersigner,
}

impl PositionSlot {
    pub fn for_signatory_index(index: usize) -> Self {
        PositionSlot::Investor(index as u32 + 1)
    }

    pub fn label(&self) -> String {
        match self {
            PositionSlot::Investor(1) => "party_a".to_string(),
            PositionSlot::Investor(n) => format!("party_a_{}", n),
            PositionSlot::Countersigner => "party_b".to_string(),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "party_a" => Some(PositionSlot::Investor(1)),
            "party_b" => Some(PositionSlot::Countersigner),
            other => {
                let n: u32 = other.strip_prefix("party_a_")?.parse().ok()?;
                (n >= 2).then_some(PositionSlot::Investor(n))
            }
        }
    }
}

impl fmt::Display for PositionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<PositionSlot> for String {
    fn from(slot: PositionSlot) -> Self {
        slot.label()
    }
}

impl TryFrom<String> for PositionSlot {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PositionSlot::parse(&value).ok_or_else(|| format!("invalid position slot '{}'", value))
    }
}

impl ToSql for PositionSlot {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.label()))
    }
}

impl FromSql for PositionSlot {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        PositionSlot::parse(raw)
            .ok_or_else(|| FromSqlError::Other(format!("unknown position slot '{}'", raw).into()))
    }
}

/// An investor-side signing party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signatory {
    /// Investor-member id, or [`PRIMARY_CONTACT_REF`] for the investor itself.
    pub signer_ref: String,
    pub full_name: String,
    pub email: String,
    pub slot: PositionSlot,
}

/// Where the countersigning identity came from. Each variant carries only
/// the identifiers that path can produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CountersignerSource {
    Delegate {
        organization_id: String,
        organization_name: String,
        profile_id: String,
    },
    Approver {
        profile_id: String,
    },
    OperatorFallback {
        profile_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Countersigner {
    pub name: String,
    pub email: String,
    pub source: CountersignerSource,
}

impl Countersigner {
    pub fn role(&self) -> SignerRole {
        match self.source {
            CountersignerSource::Delegate { .. } => SignerRole::Arranger,
            CountersignerSource::Approver { .. } | CountersignerSource::OperatorFallback { .. } => {
                SignerRole::Admin
            }
        }
    }

    pub fn profile_id(&self) -> &str {
        match &self.source {
            CountersignerSource::Delegate { profile_id, .. }
            | CountersignerSource::Approver { profile_id }
            | CountersignerSource::OperatorFallback { profile_id } => profile_id,
        }
    }
}
