//! Backend option parsing
//!
//! Backend connection arguments are given as `--name=value` or bare
//! `--name` flags following the backend URL.

use std::collections::BTreeMap;

/// Option carrying the backend user name
pub const AUTH_USERNAME: &str = "auth-username";
/// Option carrying the backend password
pub const AUTH_PASSWORD: &str = "auth-password";
/// Enables full error detail output
pub const DEBUG_OUTPUT: &str = "debug-output";
/// Directory used for spooled transfers
pub const TEMPDIR: &str = "tempdir";
/// Forces the spooling transfer strategy
pub const DISABLE_STREAMING: &str = "disable-streaming-transfers";

/// Named options for one backend, keyed by lower-cased name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    values: BTreeMap<String, String>,
}

impl BackendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `args` into options and the remaining positional arguments
    ///
    /// Only arguments starting with `--` are options. A later occurrence of
    /// the same option replaces an earlier one.
    pub fn parse<I, S>(args: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::new();
        let mut rest = Vec::new();

        for arg in args {
            let arg = arg.as_ref();
            match arg.strip_prefix("--") {
                Some(body) if !body.is_empty() => {
                    let (key, value) = body.split_once('=').unwrap_or((body, ""));
                    options.set(key, value);
                }
                _ => rest.push(arg.to_string()),
            }
        }

        (options, rest)
    }

    /// Fill credentials from `AUTH_USERNAME` / `AUTH_PASSWORD` when absent
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback_from(|name| std::env::var(name).ok())
    }

    /// Same as [`with_env_fallback`](Self::with_env_fallback) with an injectable lookup
    pub fn with_fallback_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for (option, var) in [(AUTH_USERNAME, "AUTH_USERNAME"), (AUTH_PASSWORD, "AUTH_PASSWORD")] {
            if self.values.contains_key(option) {
                continue;
            }
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                self.set(option, value);
            }
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into().to_lowercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Non-empty value of `key`
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Boolean flag: present without a value, or `true|1|on|yes`
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            None => false,
            Some("") => true,
            Some(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "on" | "yes"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
