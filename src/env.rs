//! Scoped environment variable overrides.
//!
//! [`set_env`] and [`set_envs`] capture the previous state of each variable,
//! apply the new values and hand back an [`EnvGuard`]. Restoring puts every
//! variable back exactly as it was: re-set to its previous value, or removed
//! if it was absent. Restoring is idempotent and also happens on drop.
//!
//! ```rust
//! let mut guard = tf::set_env("TF_DOC_EXAMPLE", "on").unwrap();
//! assert_eq!(std::env::var("TF_DOC_EXAMPLE").unwrap(), "on");
//! guard.restore();
//! guard.restore();
//! assert!(std::env::var_os("TF_DOC_EXAMPLE").is_none());
//! ```
//!
//! The process environment is global. Mutations made through this module are
//! serialised, but tests running in parallel that read the same variables
//! still observe each other's overrides.

use std::{ffi::OsString, sync::Mutex};

use lazy_static::lazy_static;
use tracing::debug;

use crate::error::{TfError, TfResult};

lazy_static! {
    static ref ENV_LOCK: Mutex<()> = Mutex::new(());
}

fn validate(name: &str, value: &str) -> TfResult<()> {
    if name.is_empty() || name.contains('=') || name.contains('\0') {
        return Err(TfError::EnvName {
            name: name.to_string(),
        });
    }
    if value.contains('\0') {
        return Err(TfError::EnvValue {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Sets one variable until the returned guard is restored or dropped.
pub fn set_env(name: &str, value: &str) -> TfResult<EnvGuard> {
    set_envs([(name, value)])
}

/// Sets several variables at once. Nothing is changed unless every name and
/// value is valid. If a name repeats, restoring returns it to the value it
/// had before the first write.
pub fn set_envs<I, K, V>(vars: I) -> TfResult<EnvGuard>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let vars: Vec<(String, String)> = vars
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
        .collect();
    for (name, value) in &vars {
        validate(name, value)?;
    }

    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let mut saved = Vec::with_capacity(vars.len());
    for (name, value) in vars {
        let previous = std::env::var_os(&name);
        debug!(var = %name, "setting environment variable");
        std::env::set_var(&name, &value);
        saved.push(Saved { name, previous });
    }
    Ok(EnvGuard {
        saved,
        restored: false,
    })
}

#[derive(Debug)]
struct Saved {
    name: String,
    previous: Option<OsString>,
}

/// Restores overridden variables when [`restore`](EnvGuard::restore)d or dropped.
#[derive(Debug)]
#[must_use = "dropping the guard restores the environment immediately"]
pub struct EnvGuard {
    saved: Vec<Saved>,
    restored: bool,
}

impl EnvGuard {
    /// Puts every variable back. Calling it again does nothing.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Reverse order, so a repeated name ends on its original value.
        for saved in self.saved.iter().rev() {
            match &saved.previous {
                Some(value) => std::env::set_var(&saved.name, value),
                None => std::env::remove_var(&saved.name),
            }
            debug!(var = %saved.name, "restored environment variable");
        }
    }

    /// Names of the variables this guard will restore, in the order they were set.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.saved.iter().map(|s| s.name.as_str())
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_names_are_rejected_before_mutation() {
        let err = set_envs([("TF_UNIT_OK", "1"), ("BAD=NAME", "2")]).unwrap_err();
        assert!(matches!(err, TfError::EnvName { .. }));
        assert!(std::env::var_os("TF_UNIT_OK").is_none());

        assert!(matches!(
            set_env("", "x").unwrap_err(),
            TfError::EnvName { .. }
        ));
        assert!(matches!(
            set_env("TF_UNIT_NUL", "a\0b").unwrap_err(),
            TfError::EnvValue { .. }
        ));
    }

    #[test]
    fn repeated_names_restore_to_the_original() {
        std::env::remove_var("TF_UNIT_REPEAT");
        let guard = set_envs([("TF_UNIT_REPEAT", "one"), ("TF_UNIT_REPEAT", "two")]).unwrap();
        assert_eq!(std::env::var("TF_UNIT_REPEAT").unwrap(), "two");
        assert_eq!(guard.names().count(), 2);
        drop(guard);
        assert!(std::env::var_os("TF_UNIT_REPEAT").is_none());
    }
}
