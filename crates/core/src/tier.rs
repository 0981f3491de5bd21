use serde::{Deserialize, Serialize};

/// Access classification of a route.
///
/// Unclassified paths are treated as [`Tier::Private`] (secure by default),
/// which is also the `Default` value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Reachable by anyone; identity is never consulted.
    Public,
    /// Reachable by anonymous visitors only (login, register, ...).
    GuestOnly,
    /// Requires an authenticated, active identity.
    #[default]
    Private,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Public => "PUBLIC",
            Tier::GuestOnly => "GUEST_ONLY",
            Tier::Private => "PRIVATE",
        }
    }
}

impl core::fmt::Display for Tier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
