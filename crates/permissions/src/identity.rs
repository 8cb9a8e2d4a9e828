//! Identity & Role Store.

use std::sync::Arc;

use cp_db::UserStore;
use cp_domain::types::{Role, User};
use cp_domain::{Actor, Error, Result};
use uuid::Uuid;

use crate::public::PublicPermissionMaterializer;

pub struct IdentityService {
    users: Arc<UserStore>,
    public: Arc<PublicPermissionMaterializer>,
}

impl IdentityService {
    pub fn new(users: Arc<UserStore>, public: Arc<PublicPermissionMaterializer>) -> Self {
        Self { users, public }
    }

    /// Register a new external identity. Every currently active public
    /// permission is granted to the new user as `system:public`
    /// before the row is returned.
    pub async fn create_user(&self, email: &str, display_name: &str) -> Result<User> {
        let user = self.users.create(email, display_name, Role::User).await?;
        self.public.grant_all_active_to_user(user.id).await?;
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        self.users.get(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users.get_by_email(email).await
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        self.users.list().await
    }

    /// Role is mutable only by `dev_admin`.
    pub async fn set_role(&self, actor: &Actor, target: Uuid, role: Role) -> Result<()> {
        authorize_role_change(actor)?;
        self.users.set_role(target, role).await
    }
}

fn authorize_role_change(actor: &Actor) -> Result<()> {
    if !actor.is_dev_admin() {
        return Err(Error::Forbidden("only dev_admin may change roles".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dev_admin_may_change_roles() {
        let actor = Actor::user(Uuid::new_v4().to_string(), Role::DevAdmin);
        assert!(authorize_role_change(&actor).is_ok());
    }

    #[test]
    fn business_admin_may_not_change_roles() {
        let actor = Actor::user(Uuid::new_v4().to_string(), Role::BusinessAdmin);
        assert!(authorize_role_change(&actor).is_err());
    }

    #[test]
    fn regular_user_may_not_change_roles() {
        let actor = Actor::user(Uuid::new_v4().to_string(), Role::User);
        assert!(authorize_role_change(&actor).is_err());
    }
}
