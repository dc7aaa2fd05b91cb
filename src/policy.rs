//! Role based leave allotments used to initialise new balances
use super::error::{LeaveError, LeaveResult};
use super::types::{Balance, Role};
use std::collections::BTreeMap;

/// A single persisted role allotment. Stored keyed by role name so there is
/// at most one record per role.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDefault {
    #[n(0)]
    pub role: Role,
    #[n(1)]
    pub balance: Balance,
}

/// Immutable mapping from role to its default leave balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLeavePolicy {
    defaults: BTreeMap<Role, Balance>,
}

impl RoleLeavePolicy {
    /// The allotments every deployment starts with.
    pub fn standard() -> Self {
        let defaults = BTreeMap::from([
            (Role::Admin, Balance::new(0, 0, 0)),
            (Role::Hr, Balance::new(10, 8, 5)),
            (Role::Manager, Balance::new(12, 6, 4)),
            (Role::Employee, Balance::new(12, 6, 3)),
            (Role::Intern, Balance::new(6, 3, 2)),
        ]);

        Self { defaults }
    }

    /// Build a policy from explicit entries. Roles left out have no defaults.
    pub fn from_entries<I>(entries: I) -> LeaveResult<Self>
    where
        I: IntoIterator<Item = RoleDefault>,
    {
        let mut defaults = BTreeMap::new();
        for entry in entries {
            if defaults.insert(entry.role, entry.balance).is_some() {
                return Err(LeaveError::DuplicateRole(entry.role));
            }
        }

        Ok(Self { defaults })
    }

    pub fn defaults_for(&self, role: Role) -> LeaveResult<Balance> {
        self.defaults
            .get(&role)
            .copied()
            .ok_or_else(|| LeaveError::UnknownRole(role.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = RoleDefault> + '_ {
        self.defaults
            .iter()
            .map(|(role, balance)| RoleDefault {
                role: *role,
                balance: *balance,
            })
    }
}

impl Default for RoleLeavePolicy {
    fn default() -> Self {
        Self::standard()
    }
}
