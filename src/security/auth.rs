use crate::trash::content::{Actor, Role};

/// Capability check for managing the trash log.
pub trait Authorizer: Send + Sync {
    fn can_manage(&self, actor: Option<&Actor>) -> bool;
}

/// Role based default. Network installs only trust super admins.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoleAuthorizer {
    pub network: bool,
}

impl RoleAuthorizer {
    pub fn new(network: bool) -> Self {
        Self { network }
    }
}

impl Authorizer for RoleAuthorizer {
    fn can_manage(&self, actor: Option<&Actor>) -> bool {
        match actor.map(|a| a.role) {
            Some(Role::SuperAdmin) => true,
            Some(Role::Administrator) => !self.network,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_install_accepts_administrators() {
        let auth = RoleAuthorizer::new(false);
        assert!(auth.can_manage(Some(&Actor::new(1, "a", Role::Administrator))));
        assert!(auth.can_manage(Some(&Actor::new(1, "a", Role::SuperAdmin))));
        assert!(!auth.can_manage(Some(&Actor::new(1, "a", Role::Editor))));
        assert!(!auth.can_manage(None));
    }

    #[test]
    fn network_install_requires_super_admin() {
        let auth = RoleAuthorizer::new(true);
        assert!(!auth.can_manage(Some(&Actor::new(1, "a", Role::Administrator))));
        assert!(auth.can_manage(Some(&Actor::new(1, "a", Role::SuperAdmin))));
    }
}
