//! Typed composite keys for directory records.
//!
//! Each record class has its own lookup shape. Optional components are
//! modelled as `Option<String>`: an absent foundation is its own key, never a
//! wildcard, so `foo` and `foo` scoped to foundation `bar` address two
//! independent records.

use std::fmt;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};

/// Common surface over every lookup shape.
pub trait Lookup:
    Clone + fmt::Debug + fmt::Display + Eq + Hash + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Record class this lookup addresses ("infra", "deploy", "dev").
    const KIND: &'static str;

    /// Reject lookups with empty required components or with optional
    /// components that are present but empty.
    fn validate(&self) -> Result<()>;

    /// Append each component to `out` using the canonical encoding.
    fn encode_components(&self, out: &mut Vec<u8>);

    /// Unambiguous byte encoding of this lookup.
    ///
    /// Layout: the kind followed by every component, each as a presence tag
    /// (`0` absent, `1` present) and, when present, a little-endian `u32`
    /// length and the UTF-8 bytes. Two lookups encode equally iff they are
    /// equal.
    fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        put_component(&mut out, Some(Self::KIND));
        self.encode_components(&mut out);
        out
    }
}

fn put_component(out: &mut Vec<u8>, value: Option<&str>) {
    match value {
        None => out.push(0),
        Some(s) => {
            out.push(1);
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
    }
}

fn require(component: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(TypeError::EmptyComponent { component });
    }
    Ok(())
}

fn require_optional(component: &'static str, value: Option<&str>) -> Result<()> {
    match value {
        Some("") => Err(TypeError::EmptyOptional { component }),
        _ => Ok(()),
    }
}

/// Key of an [`Infra`](crate::Infra) record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InfraLookup {
    pub infra: String,
    /// Foundation scoping. `None` means the infrastructure itself.
    pub foundation: Option<String>,
}

impl InfraLookup {
    pub fn new(infra: impl Into<String>) -> Self {
        Self {
            infra: infra.into(),
            foundation: None,
        }
    }

    /// Scope the lookup to a foundation running on the infrastructure.
    pub fn with_foundation(mut self, foundation: impl Into<String>) -> Self {
        self.foundation = Some(foundation.into());
        self
    }
}

impl Lookup for InfraLookup {
    const KIND: &'static str = "infra";

    fn validate(&self) -> Result<()> {
        require("infra", &self.infra)?;
        require_optional("foundation", self.foundation.as_deref())
    }

    fn encode_components(&self, out: &mut Vec<u8>) {
        put_component(out, Some(&self.infra));
        put_component(out, self.foundation.as_deref());
    }
}

impl fmt::Display for InfraLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.foundation {
            Some(foundation) => write!(f, "infra={} foundation={foundation}", self.infra),
            None => write!(f, "infra={}", self.infra),
        }
    }
}

/// Key of a [`Deploy`](crate::Deploy) record. All components are required.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeployLookup {
    pub app_id: String,
    pub infra: String,
    pub infra_flavor: String,
}

impl DeployLookup {
    pub fn new(
        app_id: impl Into<String>,
        infra: impl Into<String>,
        infra_flavor: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            infra: infra.into(),
            infra_flavor: infra_flavor.into(),
        }
    }
}

impl Lookup for DeployLookup {
    const KIND: &'static str = "deploy";

    fn validate(&self) -> Result<()> {
        require("app_id", &self.app_id)?;
        require("infra", &self.infra)?;
        require("infra_flavor", &self.infra_flavor)
    }

    fn encode_components(&self, out: &mut Vec<u8>) {
        put_component(out, Some(&self.app_id));
        put_component(out, Some(&self.infra));
        put_component(out, Some(&self.infra_flavor));
    }
}

impl fmt::Display for DeployLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "app={} infra={} flavor={}",
            self.app_id, self.infra, self.infra_flavor
        )
    }
}

/// Key of a [`Dev`](crate::Dev) record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DevLookup {
    pub app_id: String,
}

impl DevLookup {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }
}

impl Lookup for DevLookup {
    const KIND: &'static str = "dev";

    fn validate(&self) -> Result<()> {
        require("app_id", &self.app_id)
    }

    fn encode_components(&self, out: &mut Vec<u8>) {
        put_component(out, Some(&self.app_id));
    }
}

impl fmt::Display for DevLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "app={}", self.app_id)
    }
}
