use crate::config::defs::{ModuleStatus, GIT_COMMIT_HASH, GIT_URL, VERSION};

pub fn status() -> ModuleStatus {
    ModuleStatus {
        state: "OK".to_string(),
        message: String::new(),
        version: VERSION.to_string(),
        git_url: GIT_URL.to_string(),
        git_commit_hash: GIT_COMMIT_HASH.to_string(),
    }
}
