use std::str::FromStr;

/// How a collection behaves when the collection server can not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Changes are applied to memory and the local mirror when the server fails.
    Mirror,
    /// The server is the only record of truth. Failures are reported and nothing is cached.
    ServerOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Events,
    Registrations,
    UnregistrationRequests,
    Users,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Events,
        Collection::Registrations,
        Collection::UnregistrationRequests,
        Collection::Users,
    ];

    /// Endpoint path segment on the collection server.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::Registrations => "registrations",
            Self::UnregistrationRequests => "unregistration-requests",
            Self::Users => "users",
        }
    }

    /// Name of the local mirror slot.
    pub fn slot(&self) -> &'static str {
        self.path()
    }

    /// User records hold credentials and must never diverge between devices, so they are only
    /// ever read from and written to the server.
    pub const fn policy(&self) -> FallbackPolicy {
        match self {
            Self::Events | Self::Registrations | Self::UnregistrationRequests => {
                FallbackPolicy::Mirror
            }
            Self::Users => FallbackPolicy::ServerOnly,
        }
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.path() == s)
            .ok_or_else(|| format!("Unknown collection '{s}'"))
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_users_are_server_only() {
        for collection in Collection::ALL {
            let expected = if collection == Collection::Users {
                FallbackPolicy::ServerOnly
            } else {
                FallbackPolicy::Mirror
            };
            assert_eq!(collection.policy(), expected, "{collection}");
        }
    }

    #[test]
    fn parses_paths() {
        assert_eq!(
            "unregistration-requests".parse::<Collection>(),
            Ok(Collection::UnregistrationRequests)
        );
        assert!("eventos".parse::<Collection>().is_err());
    }
}
