use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use strum::{AsRefStr, Display, EnumString};
use crate::domain::models::user::SessionUser;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendeeStatus {
    Pending,
    Confirmed,
    Present,
    Absent,
}

impl TryFrom<String> for AttendeeStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// How the attendee reached `present`. Reset to `None` when a check-in is undone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckInOrigin {
    #[default]
    None,
    Scanner,
    Manual,
}

impl TryFrom<String> for CheckInOrigin {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Identity {
    User { user_id: String },
    Guest { name: String, email: String, whatsapp: Option<String> },
}

/// Guest contact fields as submitted with an RSVP.
#[derive(Debug, Clone, Default)]
pub struct GuestContact {
    pub name: Option<String>,
    pub email: Option<String>,
    pub whatsapp: Option<String>,
}

impl Identity {
    /// Resolves who is responding: an authenticated session always wins over
    /// guest contact fields.
    pub fn resolve(session: Option<&SessionUser>, guest: GuestContact) -> Result<Self, AppError> {
        if let Some(user) = session {
            return Ok(Identity::User { user_id: user.id.clone() });
        }
        Self::guest(guest)
    }

    pub fn guest(guest: GuestContact) -> Result<Self, AppError> {
        let name = guest.name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(AppError::Validation("guest_name is required".into()))?;
        if name.chars().count() > 120 {
            return Err(AppError::Validation("guest_name is too long".into()));
        }

        let email = guest.email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or(AppError::Validation("guest_email is required".into()))?;
        if !is_plausible_email(&email) {
            return Err(AppError::Validation("guest_email is not a valid address".into()));
        }

        let whatsapp = guest.whatsapp
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty());

        Ok(Identity::Guest { name, email, whatsapp })
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendee {
    pub id: String,
    pub event_id: String,
    pub identity: Identity,
    pub status: AttendeeStatus,
    pub qr_code: Option<String>,
    pub check_in_origin: CheckInOrigin,
    pub companions_count: i32,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Attendee {
    pub fn pending(event_id: String, identity: Identity, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            identity,
            status: AttendeeStatus::Pending,
            qr_code: None,
            check_in_origin: CheckInOrigin::None,
            companions_count: 0,
            confirmed_at: None,
            checked_in_at: None,
            created_at: now,
        }
    }

    /// An arrival registered by an admin without any code.
    pub fn manual_present(event_id: String, identity: Identity, companions_count: i32, now: DateTime<Utc>) -> Self {
        Self {
            status: AttendeeStatus::Present,
            check_in_origin: CheckInOrigin::Manual,
            companions_count,
            confirmed_at: Some(now),
            checked_in_at: Some(now),
            ..Self::pending(event_id, identity, now)
        }
    }

    /// A present attendee holding a code, or one that arrived through the
    /// scanner, cannot be reverted by a manual action.
    pub fn is_scanner_protected(&self) -> bool {
        self.status == AttendeeStatus::Present
            && (self.qr_code.is_some() || self.check_in_origin == CheckInOrigin::Scanner)
    }

    pub fn user_id(&self) -> Option<&str> {
        match &self.identity {
            Identity::User { user_id } => Some(user_id),
            Identity::Guest { .. } => None,
        }
    }

    pub fn guest_name(&self) -> Option<&str> {
        match &self.identity {
            Identity::Guest { name, .. } => Some(name),
            Identity::User { .. } => None,
        }
    }

    pub fn guest_email(&self) -> Option<&str> {
        match &self.identity {
            Identity::Guest { email, .. } => Some(email),
            Identity::User { .. } => None,
        }
    }

    pub fn guest_whatsapp(&self) -> Option<&str> {
        match &self.identity {
            Identity::Guest { whatsapp, .. } => whatsapp.as_deref(),
            Identity::User { .. } => None,
        }
    }
}
