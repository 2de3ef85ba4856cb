// Marketplace domain models - the records the moderation core moves between states.
//
// These are pure domain types with no storage or HTTP dependencies.
// Every persisted type implements `Entity` so the typed store facade knows
// which collection it lives in.

use crate::core::store::{Collection, Entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use super::money::{Money, MoneyParseError};

// ============================================================================
// ENUMS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Services,
    Crafts,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Food => write!(f, "Food"),
            Category::Services => write!(f, "Services"),
            Category::Crafts => write!(f, "Crafts"),
            Category::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleType {
    Product,
    Service,
}

impl fmt::Display for SaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaleType::Product => write!(f, "Product sale"),
            SaleType::Service => write!(f, "Service provided"),
        }
    }
}

/// Shared status of anything an administrator has to sign off on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModerationStatus::Pending => write!(f, "pending"),
            ModerationStatus::Approved => write!(f, "approved"),
            ModerationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    InMediation,
    Resolved,
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisputeStatus::Open => write!(f, "open"),
            DisputeStatus::InMediation => write!(f, "in_mediation"),
            DisputeStatus::Resolved => write!(f, "resolved"),
        }
    }
}

/// Who wrote a dispute message, from the mediation's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Complaint,
    Party,
    Mediator,
}

// ============================================================================
// ENTITIES
// ============================================================================

/// A registered actor on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    /// WhatsApp number used for notifications.
    pub contact: Option<String>,
    pub role: Role,
    pub is_approved: bool,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_suspended(&self) -> bool {
        self.status == AccountStatus::Suspended
    }
}

/// A listing for a good or service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: Option<Money>,
    pub category: Category,
    pub neighborhood: String,
    #[serde(default)]
    pub images: Vec<String>,
    /// Publicly visible. New offers from non-admins start inactive.
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A self-declared completed transaction waiting for financial verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub reporter_id: Uuid,
    pub sale_type: SaleType,
    pub amount: Money,
    pub description: Option<String>,
    pub proof_image: String,
    pub status: ModerationStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

/// A 1-5 star rating with a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub author_id: Uuid,
    pub rating: u8,
    pub comment: String,
    pub status: ModerationStatus,
    /// 1 for the author's first review of this offer, 2 for the second, ...
    pub evaluation_number: u32,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn is_repeat(&self) -> bool {
        self.evaluation_number > 1
    }
}

/// A mediation case opened by a buyer against an offer's owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub complainant_id: Uuid,
    pub defendant_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: DisputeStatus,
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Dispute {
    pub fn involves(&self, profile_id: Uuid) -> bool {
        self.complainant_id == profile_id || self.defendant_id == profile_id
    }
}

/// One entry of a dispute's append-only conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputeMessage {
    pub id: Uuid,
    pub dispute_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub kind: MessageKind,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Someone pressed "contact seller" on an offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactLog {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub buyer_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Entity for Profile {
    const COLLECTION: Collection = Collection::Profiles;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Offer {
    const COLLECTION: Collection = Collection::Offers;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for SalesReport {
    const COLLECTION: Collection = Collection::SalesReports;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Review {
    const COLLECTION: Collection = Collection::Reviews;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Dispute {
    const COLLECTION: Collection = Collection::Disputes;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for DisputeMessage {
    const COLLECTION: Collection = Collection::DisputeMessages;
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for ContactLog {
    const COLLECTION: Collection = Collection::ContactLogs;
    fn id(&self) -> Uuid {
        self.id
    }
}

// ============================================================================
// ACTORS AND REFERENCES
// ============================================================================

/// Whoever is issuing a command, as resolved by the identity provider.
///
/// Passed explicitly into every operation instead of being read from a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub id: Uuid,
    pub name: String,
    pub contact: Option<String>,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            contact: profile.contact.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferSummary {
    pub id: Uuid,
    pub title: String,
}

impl From<&Offer> for OfferSummary {
    fn from(offer: &Offer) -> Self {
        Self {
            id: offer.id,
            title: offer.title.clone(),
        }
    }
}

/// Something a [`Related`] reference can point at.
pub trait Referent {
    /// Shown in place of the record once it has been deleted.
    const MISSING_LABEL: &'static str;

    fn label(&self) -> &str;
}

impl Referent for ProfileSummary {
    const MISSING_LABEL: &'static str = "Unknown user";

    fn label(&self) -> &str {
        &self.name
    }
}

impl Referent for OfferSummary {
    const MISSING_LABEL: &'static str = "Offer unavailable";

    fn label(&self) -> &str {
        &self.title
    }
}

/// A reference to another record that may have been deleted since.
///
/// An orphaned reference serializes with its placeholder label, so views
/// render "Offer unavailable" and the like instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Related<T> {
    Present(T),
    Orphaned { id: Uuid },
}

impl<T> Related<T> {
    pub fn from_lookup(id: Uuid, found: Option<T>) -> Self {
        match found {
            Some(value) => Related::Present(value),
            None => Related::Orphaned { id },
        }
    }
}

impl<T: Referent> Related<T> {
    pub fn label(&self) -> &str {
        match self {
            Related::Present(value) => value.label(),
            Related::Orphaned { .. } => T::MISSING_LABEL,
        }
    }
}

impl<T: Referent + Serialize> Serialize for Related<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(tag = "state", rename_all = "snake_case")]
        enum Wire<'a, T> {
            Present(&'a T),
            Orphaned { id: Uuid, label: &'static str },
        }

        match self {
            Related::Present(value) => Wire::Present(value),
            Related::Orphaned { id } => Wire::Orphaned {
                id: *id,
                label: T::MISSING_LABEL,
            },
        }
        .serialize(serializer)
    }
}
