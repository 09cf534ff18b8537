use std::fmt;

/// AccessSet is a bitmask of capabilities granted to a principal on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AccessSet(u16);

const NAMES: [(&str, AccessSet); 8] = [
    ("READ", AccessSet::READ),
    ("DOWNLOAD", AccessSet::DOWNLOAD),
    ("CREATE", AccessSet::CREATE),
    ("UPDATE", AccessSet::UPDATE),
    ("DELETE", AccessSet::DELETE),
    ("MODERATE", AccessSet::MODERATE),
    ("CHANGE_PERMISSIONS", AccessSet::CHANGE_PERMISSIONS),
    ("CHANGE_SETTINGS", AccessSet::CHANGE_SETTINGS),
];

impl AccessSet {
    pub const READ: AccessSet = AccessSet(1 << 0);
    pub const DOWNLOAD: AccessSet = AccessSet(1 << 1);
    pub const CREATE: AccessSet = AccessSet(1 << 2);
    pub const UPDATE: AccessSet = AccessSet(1 << 3);
    pub const DELETE: AccessSet = AccessSet(1 << 4);
    pub const MODERATE: AccessSet = AccessSet(1 << 5);
    pub const CHANGE_PERMISSIONS: AccessSet = AccessSet(1 << 6);
    pub const CHANGE_SETTINGS: AccessSet = AccessSet(1 << 7);

    /// READ + DOWNLOAD.
    pub const VIEW: AccessSet = AccessSet(Self::READ.0 | Self::DOWNLOAD.0);

    /// VIEW + CREATE + UPDATE + DELETE.
    pub const EDIT_DELETE: AccessSet =
        AccessSet(Self::VIEW.0 | Self::CREATE.0 | Self::UPDATE.0 | Self::DELETE.0);

    /// VIEW + UPDATE, no CREATE or DELETE.
    pub const MODIFY: AccessSet = AccessSet(Self::VIEW.0 | Self::UPDATE.0);

    /// VIEW + CREATE + UPDATE.
    pub const CONTRIBUTE: AccessSet = AccessSet(Self::VIEW.0 | Self::CREATE.0 | Self::UPDATE.0);

    /// Every capability.
    pub const ADMIN: AccessSet = AccessSet(
        Self::EDIT_DELETE.0
            | Self::MODERATE.0
            | Self::CHANGE_PERMISSIONS.0
            | Self::CHANGE_SETTINGS.0,
    );

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Returns true if this set contains every capability in `required`.
    #[must_use]
    pub const fn has(self, required: AccessSet) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: AccessSet) -> AccessSet {
        AccessSet(self.0 | other.0)
    }

    #[must_use]
    pub const fn difference(self, other: AccessSet) -> AccessSet {
        AccessSet(self.0 & !other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn parse(s: &str) -> Option<AccessSet> {
        NAMES
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, access)| *access)
    }

    /// Folds capability names into a set. Names the platform knows but this
    /// set does not model are returned separately so callers can report them.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> (AccessSet, Vec<String>) {
        let mut set = AccessSet::default();
        let mut unknown = Vec::new();
        for name in names {
            match Self::parse(name.as_ref()) {
                Some(access) => set = set.union(access),
                None => unknown.push(name.as_ref().to_string()),
            }
        }
        (set, unknown)
    }

    /// Capability names in canonical order.
    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        NAMES
            .iter()
            .filter(|(_, access)| self.has(*access))
            .map(|(name, _)| *name)
            .collect()
    }

    #[must_use]
    pub fn to_owned_strings(self) -> Vec<String> {
        self.to_strings().into_iter().map(String::from).collect()
    }
}

impl fmt::Display for AccessSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }
        write!(f, "{}", self.to_strings().join(", "))
    }
}
