use ntex_session::Session;

use crate::consts;

/// Visitor identity resolved through the platform OAuth flow.
/// Lives in the (encrypted) session cookie for the browser session only.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct UserProfile {
    pub openid: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub headimgurl: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

/// Session-scoped store for the resolved visitor profile.
/// Explicit seam so the resolver stays decoupled from the web framework.
pub trait VisitorCache {
    fn get(&self) -> anyhow::Result<Option<UserProfile>>;

    fn set(&self, profile: &UserProfile) -> anyhow::Result<()>;

    fn clear(&self);
}

/// Cookie-session-backed cache; isolation between visitor sessions is
/// provided by the session middleware.
pub struct CookieVisitorCache {
    session: Session,
}

impl CookieVisitorCache {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

impl VisitorCache for CookieVisitorCache {
    fn get(&self) -> anyhow::Result<Option<UserProfile>> {
        self.session
            .get::<UserProfile>(consts::VISITOR_PROFILE_COOKIE_NAME)
            .map_err(|e| anyhow::anyhow!("cant read visitor profile from session: {}", e))
    }

    fn set(&self, profile: &UserProfile) -> anyhow::Result<()> {
        self.session
            .set(consts::VISITOR_PROFILE_COOKIE_NAME, profile)
            .map_err(|e| anyhow::anyhow!("cant store visitor profile in session: {}", e))
    }

    fn clear(&self) {
        self.session.remove(consts::VISITOR_PROFILE_COOKIE_NAME);
    }
}

/// In-memory cache for tests exercising the resolver without a cookie jar
#[cfg(test)]
pub struct MemoryVisitorCache(pub std::cell::RefCell<Option<UserProfile>>);

#[cfg(test)]
impl MemoryVisitorCache {
    pub fn empty() -> Self {
        Self(std::cell::RefCell::new(None))
    }

    pub fn with_profile(profile: UserProfile) -> Self {
        Self(std::cell::RefCell::new(Some(profile)))
    }
}

#[cfg(test)]
impl VisitorCache for MemoryVisitorCache {
    fn get(&self) -> anyhow::Result<Option<UserProfile>> {
        Ok(self.0.borrow().clone())
    }

    fn set(&self, profile: &UserProfile) -> anyhow::Result<()> {
        *self.0.borrow_mut() = Some(profile.clone());
        Ok(())
    }

    fn clear(&self) {
        *self.0.borrow_mut() = None;
    }
}
