use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Shared error type for the rolegate crates.
#[derive(Debug, Error, Clone)]
pub enum GateError {
    #[error("{message}")]
    Message { message: String },
}

impl GateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Identifier of a page or post owned by the host platform.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ContentId(pub u64);

impl ContentId {
    /// Host platforms use zero for "no object" (custom menu links and the like).
    pub fn from_raw(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentId {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<u64>()
            .map_err(|err| GateError::new(format!("invalid content id '{s}': {err}")))?;
        Self::from_raw(raw).ok_or_else(|| GateError::new("content id must be positive"))
    }
}

/// Opaque role slug resolved against the host's role store.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RoleName(pub String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RoleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoleName {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The principal behind the current request.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Actor {
    roles: BTreeSet<RoleName>,
}

impl Actor {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_roles<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleName>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roles(&self) -> &BTreeSet<RoleName> {
        &self.roles
    }

    pub fn is_anonymous(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn holds(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// True when at least one of `roles` is held by this actor.
    pub fn holds_any<'a, I>(&self, roles: I) -> bool
    where
        I: IntoIterator<Item = &'a RoleName>,
    {
        roles.into_iter().any(|role| self.roles.contains(role))
    }
}
