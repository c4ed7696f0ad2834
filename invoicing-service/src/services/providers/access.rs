//! E-mail allow-list access policy.

use super::AccessPolicy;
use async_trait::async_trait;
use std::collections::HashSet;

/// Admits only the configured e-mail addresses, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AllowListPolicy {
    allowed: HashSet<String>,
}

impl AllowListPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = emails
            .into_iter()
            .map(|e| normalize(e.as_ref()))
            .filter(|e| !e.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AccessPolicy for AllowListPolicy {
    async fn is_allowed(&self, email: &str) -> bool {
        self.allowed.contains(&normalize(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_case_insensitively_and_ignores_blanks() {
        let policy = AllowListPolicy::new([" Daan@Example.nl ", "", "wim@example.nl"]);
        assert_eq!(policy.len(), 2);
        assert!(tokio_test::block_on(policy.is_allowed("daan@example.nl")));
        assert!(tokio_test::block_on(policy.is_allowed("WIM@example.nl")));
        assert!(!tokio_test::block_on(policy.is_allowed("someone@example.nl")));
    }

    #[test]
    fn empty_list_admits_nobody() {
        let policy = AllowListPolicy::new(Vec::<String>::new());
        assert!(policy.is_empty());
        assert!(!tokio_test::block_on(policy.is_allowed("daan@example.nl")));
    }
}
