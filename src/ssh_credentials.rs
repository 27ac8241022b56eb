use std::fmt;

use crate::HostKeyPolicy;

#[derive(Clone)]
pub struct SshCredentials {
    user_name: String,
    password: String,
    host_key_policy: HostKeyPolicy,
}

impl SshCredentials {
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            host_key_policy: HostKeyPolicy::InsecureIgnore,
        }
    }

    pub fn with_host_key_policy(mut self, host_key_policy: HostKeyPolicy) -> Self {
        self.host_key_policy = host_key_policy;
        self
    }

    pub fn get_user_name(&self) -> &str {
        self.user_name.as_str()
    }

    pub fn get_password(&self) -> &str {
        self.password.as_str()
    }

    pub fn get_host_key_policy(&self) -> &HostKeyPolicy {
        &self.host_key_policy
    }
}

impl fmt::Debug for SshCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshCredentials")
            .field("user_name", &self.user_name)
            .field("password", &"***")
            .field("host_key_policy", &self.host_key_policy)
            .finish()
    }
}
