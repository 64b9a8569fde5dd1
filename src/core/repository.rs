use serde::{Deserialize, Serialize};

/// Git repository the environments deploy from.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl GitRepository {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Clone URL, with `user:pass@` embedded when both credentials are set.
    ///
    /// Locations without a `scheme://` prefix (scp-style `git@host:repo`,
    /// local paths) are returned unchanged.
    pub fn effective_location(&self) -> String {
        match self.password.as_deref() {
            Some(password) => self.embed_userinfo(&encode_userinfo(password)),
            None => self.location.clone(),
        }
    }

    /// Location with any password masked, for messages and reports.
    pub fn display_location(&self) -> String {
        self.embed_userinfo("****")
    }

    fn embed_userinfo(&self, password: &str) -> String {
        let (Some(username), Some(_)) = (
            self.username.as_deref().filter(|u| !u.is_empty()),
            self.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return self.location.clone();
        };

        let Some((scheme, rest)) = self.location.split_once("://") else {
            return self.location.clone();
        };

        let authority_end = rest.find('/').unwrap_or(rest.len());
        let (authority, path) = rest.split_at(authority_end);
        let host = authority
            .rsplit_once('@')
            .map(|(_, host)| host)
            .unwrap_or(authority);

        format!(
            "{}://{}:{}@{}{}",
            scheme,
            encode_userinfo(username),
            password,
            host,
            path
        )
    }
}

fn encode_userinfo(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => encoded.push_str("%25"),
            '@' => encoded.push_str("%40"),
            ':' => encoded.push_str("%3A"),
            '/' => encoded.push_str("%2F"),
            '#' => encoded.push_str("%23"),
            '?' => encoded.push_str("%3F"),
            _ => encoded.push(c),
        }
    }
    encoded
}
