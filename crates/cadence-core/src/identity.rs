use uuid::Uuid;

/// Source of the current user's identity.
///
/// Every repository operation is scoped to the id returned here. `None` means
/// nobody is signed in: listings come back empty and mutations fail.
pub trait IdentityProvider: Send + Sync {
    fn current_user_id(&self) -> Option<Uuid>;
}

/// A fixed identity, set once at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity(Option<Uuid>);

impl StaticIdentity {
    pub fn user(user_id: Uuid) -> Self {
        Self(Some(user_id))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<Uuid> {
        self.0
    }
}
