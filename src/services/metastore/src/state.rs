//! Lifecycle states of persisted records
//!
//! Each entity kind has a closed set of states. Strings coming from a persisted
//! record or from a caller are checked against that set before being trusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kinds of records managed by the metastore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    ApplicationInstance,
    Federation,
}

impl EntityKind {
    /// Marker prepended to derived record names
    pub fn name_prefix(&self) -> &'static str {
        match self {
            EntityKind::ApplicationInstance => "appinst",
            EntityKind::Federation => "federation",
        }
    }

    /// Allowed lifecycle states for this kind
    pub fn allowed_states(&self) -> &'static [&'static str] {
        match self {
            EntityKind::ApplicationInstance => ApplicationInstanceState::ALL,
            EntityKind::Federation => FederationState::ALL,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::ApplicationInstance => write!(f, "ApplicationInstance"),
            EntityKind::Federation => write!(f, "Federation"),
        }
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "applicationinstance" | "appinst" => Ok(EntityKind::ApplicationInstance),
            "federation" => Ok(EntityKind::Federation),
            _ => Err(format!("Invalid entity kind: {}", s)),
        }
    }
}

/// Returns true only if `status` is exactly one of the states allowed for `kind`
pub fn is_valid(kind: EntityKind, status: &str) -> bool {
    kind.allowed_states().contains(&status)
}

/// Application instance lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationInstanceState {
    Pending,
    Ready,
    Failed,
    Terminating,
}

impl ApplicationInstanceState {
    const ALL: &'static [&'static str] = &["Pending", "Ready", "Failed", "Terminating"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationInstanceState::Pending => "Pending",
            ApplicationInstanceState::Ready => "Ready",
            ApplicationInstanceState::Failed => "Failed",
            ApplicationInstanceState::Terminating => "Terminating",
        }
    }
}

impl FromStr for ApplicationInstanceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ApplicationInstanceState::Pending),
            "Ready" => Ok(ApplicationInstanceState::Ready),
            "Failed" => Ok(ApplicationInstanceState::Failed),
            "Terminating" => Ok(ApplicationInstanceState::Terminating),
            _ => Err(format!("Invalid application instance state: {}", s)),
        }
    }
}

impl fmt::Display for ApplicationInstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Federation relationship lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FederationState {
    Available,
    Locked,
    NotAvailable,
    Failed,
    TemporaryFailure,
}

impl FederationState {
    const ALL: &'static [&'static str] = &[
        "Available",
        "Locked",
        "NotAvailable",
        "Failed",
        "TemporaryFailure",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FederationState::Available => "Available",
            FederationState::Locked => "Locked",
            FederationState::NotAvailable => "NotAvailable",
            FederationState::Failed => "Failed",
            FederationState::TemporaryFailure => "TemporaryFailure",
        }
    }
}

impl FromStr for FederationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(FederationState::Available),
            "Locked" => Ok(FederationState::Locked),
            "NotAvailable" => Ok(FederationState::NotAvailable),
            "Failed" => Ok(FederationState::Failed),
            "TemporaryFailure" => Ok(FederationState::TemporaryFailure),
            _ => Err(format!("Invalid federation state: {}", s)),
        }
    }
}

impl fmt::Display for FederationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
