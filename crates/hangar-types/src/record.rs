//! Directory records: infrastructure, deployments, and dev environments.
//!
//! A record is created without an id. The backend assigns a [`RecordId`]
//! the first time a record is stored for a lookup and keeps it stable across
//! later updates; the finalized record is handed back to the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::id::RecordId;
use crate::lookup::{DeployLookup, DevLookup, InfraLookup, Lookup};

/// Common surface over every record class.
///
/// Storage engines implement create/update once against this trait instead
/// of once per record class.
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Lookup: Lookup;

    fn lookup(&self) -> &Self::Lookup;

    /// The backend-assigned id, or `None` before the first store.
    fn id(&self) -> Option<&RecordId>;

    fn set_id(&mut self, id: RecordId);

    /// Record class name, shared with the lookup.
    fn kind() -> &'static str {
        <Self::Lookup as Lookup>::KIND
    }
}

// ---------------------------------------------------------------------------
// Infra
// ---------------------------------------------------------------------------

/// Provisioning state of an infrastructure record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfraState {
    /// Never successfully provisioned.
    #[default]
    Invalid,
    /// Fully provisioned.
    Ready,
    /// Provisioning started but did not complete.
    Partial,
}

impl fmt::Display for InfraState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "invalid"),
            Self::Ready => write!(f, "ready"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// An infrastructure target, optionally scoped to a foundation running on it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Infra {
    pub lookup: InfraLookup,
    pub id: Option<RecordId>,
    pub state: InfraState,
    /// Provisioning outputs (addresses, credentials references, ...).
    pub outputs: BTreeMap<String, String>,
    /// Engine-specific state the directory stores but never interprets.
    pub opaque: Vec<u8>,
}

impl Infra {
    pub fn new(lookup: InfraLookup) -> Self {
        Self {
            lookup,
            id: None,
            state: InfraState::default(),
            outputs: BTreeMap::new(),
            opaque: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: InfraState) -> Self {
        self.state = state;
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn is_ready(&self) -> bool {
        self.state == InfraState::Ready
    }

    pub fn is_partial(&self) -> bool {
        self.state == InfraState::Partial
    }
}

impl Entity for Infra {
    type Lookup = InfraLookup;

    fn lookup(&self) -> &InfraLookup {
        &self.lookup
    }

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

// ---------------------------------------------------------------------------
// Deploy
// ---------------------------------------------------------------------------

/// Lifecycle state of a deployment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeployState {
    #[default]
    New,
    Deployed,
    Failed,
    Destroyed,
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Deployed => write!(f, "deployed"),
            Self::Failed => write!(f, "failed"),
            Self::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// A deployment of one application onto one infrastructure flavor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deploy {
    pub lookup: DeployLookup,
    pub id: Option<RecordId>,
    pub state: DeployState,
    /// Identifier reported by the deployment engine, if any.
    pub deploy_id: Option<String>,
    pub opaque: Vec<u8>,
}

impl Deploy {
    pub fn new(lookup: DeployLookup) -> Self {
        Self {
            lookup,
            id: None,
            state: DeployState::default(),
            deploy_id: None,
            opaque: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: DeployState) -> Self {
        self.state = state;
        self
    }

    pub fn is_deployed(&self) -> bool {
        self.state == DeployState::Deployed
    }

    pub fn is_failed(&self) -> bool {
        self.state == DeployState::Failed
    }
}

impl Entity for Deploy {
    type Lookup = DeployLookup;

    fn lookup(&self) -> &DeployLookup {
        &self.lookup
    }

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

// ---------------------------------------------------------------------------
// Dev
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DevState {
    #[default]
    New,
    Ready,
}

impl fmt::Display for DevState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// A local development environment for an application.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dev {
    pub lookup: DevLookup,
    pub id: Option<RecordId>,
    pub state: DevState,
}

impl Dev {
    pub fn new(lookup: DevLookup) -> Self {
        Self {
            lookup,
            id: None,
            state: DevState::default(),
        }
    }

    pub fn with_state(mut self, state: DevState) -> Self {
        self.state = state;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.state == DevState::Ready
    }
}

impl Entity for Dev {
    type Lookup = DevLookup;

    fn lookup(&self) -> &DevLookup {
        &self.lookup
    }

    fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_records_have_no_id() {
        assert!(Infra::new(InfraLookup::new("aws")).id().is_none());
        assert!(Deploy::new(DeployLookup::new("a", "aws", "simple")).id().is_none());
        assert!(Dev::new(DevLookup::new("a")).id().is_none());
    }

    #[test]
    fn defaults_match_fresh_lifecycle() {
        let infra = Infra::new(InfraLookup::new("aws"));
        assert_eq!(infra.state, InfraState::Invalid);
        assert!(!infra.is_ready());

        let deploy = Deploy::new(DeployLookup::new("a", "aws", "simple"));
        assert_eq!(deploy.state, DeployState::New);
        assert!(!deploy.is_deployed());

        assert_eq!(Dev::new(DevLookup::new("a")).state, DevState::New);
    }

    #[test]
    fn outputs_ignore_insertion_order() {
        let a = Infra::new(InfraLookup::new("aws"))
            .with_output("region", "us-east-1")
            .with_output("vpc", "vpc-1");
        let b = Infra::new(InfraLookup::new("aws"))
            .with_output("vpc", "vpc-1")
            .with_output("region", "us-east-1");
        assert_eq!(a, b);
    }

    #[test]
    fn set_id_is_visible_through_entity() {
        let mut dev = Dev::new(DevLookup::new("a"));
        dev.set_id(RecordId::new("id-1"));
        assert_eq!(dev.id().map(RecordId::as_str), Some("id-1"));
    }

    #[test]
    fn kind_follows_lookup() {
        assert_eq!(Infra::kind(), "infra");
        assert_eq!(Deploy::kind(), "deploy");
        assert_eq!(Dev::kind(), "dev");
    }

    #[test]
    fn state_helpers() {
        let infra = Infra::new(InfraLookup::new("aws")).with_state(InfraState::Partial);
        assert!(infra.is_partial());
        let deploy =
            Deploy::new(DeployLookup::new("a", "aws", "simple")).with_state(DeployState::Failed);
        assert!(deploy.is_failed());
        assert!(Dev::new(DevLookup::new("a")).with_state(DevState::Ready).is_ready());
    }

    #[test]
    fn serde_roundtrip_preserves_everything() {
        let mut infra = Infra::new(InfraLookup::new("aws").with_foundation("consul"))
            .with_state(InfraState::Ready)
            .with_output("addr", "10.0.0.1");
        infra.opaque = vec![1, 2, 3];
        infra.set_id(RecordId::generate());
        let json = serde_json::to_string(&infra).unwrap();
        let parsed: Infra = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, infra);
    }
}
