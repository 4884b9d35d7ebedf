use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Employee,
    Supervisor,
    Admin,
}

impl Role {
    /// Supervisors and admins may file check-ins and correction requests.
    pub fn can_supervise(self) -> bool {
        matches!(self, Role::Supervisor | Role::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn roles_round_trip_through_storage_names() {
        assert_eq!(Role::from_str("supervisor").unwrap(), Role::Supervisor);
        assert_eq!(Role::Admin.as_ref(), "admin");
        assert!(Role::from_str("ceo").is_err());
    }

    #[test]
    fn only_supervisors_and_admins_supervise() {
        assert!(Role::Supervisor.can_supervise());
        assert!(Role::Admin.can_supervise());
        assert!(!Role::Employee.can_supervise());
    }
}
