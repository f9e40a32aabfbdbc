use crate::events::RemoteUser;

/// Roster of remote users currently in the channel.
///
/// Fed by the UI kit's joined/left callbacks. Read by the shell for display.
#[derive(Debug, Clone, Default)]
pub struct ParticipantManager {
    users: Vec<RemoteUser>,
}

impl ParticipantManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the user was already present.
    pub fn add_user(&mut self, user: RemoteUser) -> bool {
        if self.users.iter().any(|u| u.uid == user.uid) {
            return false;
        }
        self.users.push(user);
        true
    }

    pub fn remove_user(&mut self, uid: &str) -> Option<RemoteUser> {
        let idx = self.users.iter().position(|u| u.uid == uid)?;
        Some(self.users.remove(idx))
    }

    pub fn users(&self) -> &[RemoteUser] {
        &self.users
    }

    pub fn user(&self, uid: &str) -> Option<&RemoteUser> {
        self.users.iter().find(|u| u.uid == uid)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn clear(&mut self) {
        self.users.clear();
    }
}
