use serde::{Deserialize, Serialize};

use super::{fill, fill_int, is_absent};

/// A user account
///
/// Two users are the same account when any non-empty name of one equals,
/// ignoring case, any non-empty name of the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub full_name: String,
    pub username: String,
    pub comments: String,
    pub sid: String,
    pub domain: String,
    /// Microseconds since the Unix epoch, zero when unknown
    pub last_password_change: i64,
}

impl User {
    /// Build a user from an event log identity triple
    ///
    /// Returns `None` when the name is absent (`-` or empty).
    pub fn from_account(name: &str, sid: &str, domain: &str) -> Option<User> {
        if is_absent(name) {
            return None;
        }
        Some(User {
            username: name.to_string(),
            sid: if is_absent(sid) { String::new() } else { sid.to_string() },
            domain: if is_absent(domain) { String::new() } else { domain.to_string() },
            ..Default::default()
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        [self.username.as_str(), self.full_name.as_str()]
            .into_iter()
            .filter(|name| !name.is_empty())
    }

    pub fn same_account(&self, other: &User) -> bool {
        self.names()
            .any(|mine| other.names().any(|theirs| mine.eq_ignore_ascii_case(theirs)))
    }

    /// Case-insensitive match against one of this user's names
    pub fn is_named(&self, name: &str) -> bool {
        !name.is_empty() && self.names().any(|mine| mine.eq_ignore_ascii_case(name))
    }

    /// Fill empty fields from `other`, never overwriting populated ones
    pub fn fill_from(&mut self, other: &User) {
        fill(&mut self.full_name, &other.full_name);
        fill(&mut self.username, &other.username);
        fill(&mut self.comments, &other.comments);
        fill(&mut self.sid, &other.sid);
        fill(&mut self.domain, &other.domain);
        fill_int(&mut self.last_password_change, other.last_password_change);
    }
}
