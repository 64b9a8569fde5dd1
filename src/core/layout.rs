//! Directory layout of a deployment root on the target host.
//!
//! ```text
//! <root>/repo/                      working copy
//! <root>/releases/<10-digit-epoch>/ one directory per release
//! <root>/shared/<name>/             persisted resources symlinked into releases
//! <root>/current -> releases/<id>   active release pointer
//! ```

use crate::release::ReleaseId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    root: String,
}

impl RemoteLayout {
    pub fn new(root: &str) -> Self {
        let trimmed = root.trim_end_matches('/');
        let root = if trimmed.is_empty() { "/" } else { trimmed };
        Self {
            root: root.to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn repo(&self) -> String {
        self.join("repo")
    }

    pub fn releases(&self) -> String {
        self.join("releases")
    }

    pub fn release(&self, release: &ReleaseId) -> String {
        format!("{}/{}", self.releases(), release)
    }

    pub fn shared(&self) -> String {
        self.join("shared")
    }

    pub fn shared_entry(&self, name: &str) -> String {
        format!("{}/{}", self.shared(), name.trim_matches('/'))
    }

    pub fn current(&self) -> String {
        self.join("current")
    }

    /// Path of `relative` inside a release directory.
    pub fn release_entry(&self, release: &ReleaseId, relative: &str) -> String {
        format!("{}/{}", self.release(release), relative.trim_matches('/'))
    }

    fn join(&self, child: &str) -> String {
        if self.root == "/" {
            format!("/{}", child)
        } else {
            format!("{}/{}", self.root, child)
        }
    }
}
