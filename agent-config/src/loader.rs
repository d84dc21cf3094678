//! Environment-variable loader for [`crate::RuntimeConfig`].

use std::env::VarError;
use std::num::NonZeroUsize;

use anyhow::{bail, Context, Result};
use tracing::debug;

use crate::schema::RuntimeConfig;

const MAX_HISTORY_VAR: &str = "AGENT_RUNTIME_MAX_HISTORY";
const DEBUG_VAR: &str = "AGENT_RUNTIME_DEBUG";

/// Builds a [`RuntimeConfig`] from `AGENT_RUNTIME_MAX_HISTORY` and
/// `AGENT_RUNTIME_DEBUG`, falling back to [`RuntimeConfig::default`] for
/// whichever is unset.
///
/// # Errors
///
/// Returns an error if either variable is set to a value that doesn't parse.
pub fn load_from_env() -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();

    match std::env::var(MAX_HISTORY_VAR) {
        Ok(raw) => {
            let value: usize = raw
                .parse()
                .with_context(|| format!("{MAX_HISTORY_VAR} must be a positive integer, got {raw:?}"))?;
            let max_history = NonZeroUsize::new(value)
                .with_context(|| format!("{MAX_HISTORY_VAR} must be greater than zero"))?;
            config = RuntimeConfig::new(max_history).with_debug(config.debug());
        }
        Err(VarError::NotPresent) => {}
        Err(VarError::NotUnicode(_)) => bail!("{MAX_HISTORY_VAR} is not valid UTF-8"),
    }

    match std::env::var(DEBUG_VAR) {
        Ok(raw) => {
            let debug_flag: bool = raw
                .parse()
                .with_context(|| format!("{DEBUG_VAR} must be \"true\" or \"false\", got {raw:?}"))?;
            config = config.with_debug(debug_flag);
        }
        Err(VarError::NotPresent) => {}
        Err(VarError::NotUnicode(_)) => bail!("{DEBUG_VAR} is not valid UTF-8"),
    }

    debug!(max_history = config.max_history().get(), debug = config.debug(), "loaded runtime config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<F: FnOnce()>(vars: &[(&str, Option<&str>)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap();
        let previous: Vec<_> = vars.iter().map(|(k, _)| (*k, std::env::var(k).ok())).collect();
        for (key, value) in vars {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        f();
        for (key, value) in previous {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }

    #[test]
    fn defaults_when_unset() {
        with_env(&[(MAX_HISTORY_VAR, None), (DEBUG_VAR, None)], || {
            let config = load_from_env().unwrap();
            assert_eq!(config.max_history().get(), RuntimeConfig::DEFAULT_MAX_HISTORY);
            assert!(!config.debug());
        });
    }

    #[test]
    fn reads_both_variables() {
        with_env(&[(MAX_HISTORY_VAR, Some("50")), (DEBUG_VAR, Some("true"))], || {
            let config = load_from_env().unwrap();
            assert_eq!(config.max_history().get(), 50);
            assert!(config.debug());
        });
    }

    #[test]
    fn rejects_zero_max_history() {
        with_env(&[(MAX_HISTORY_VAR, Some("0")), (DEBUG_VAR, None)], || {
            assert!(load_from_env().is_err());
        });
    }

    #[test]
    fn rejects_non_boolean_debug() {
        with_env(&[(MAX_HISTORY_VAR, None), (DEBUG_VAR, Some("loud"))], || {
            assert!(load_from_env().is_err());
        });
    }
}
