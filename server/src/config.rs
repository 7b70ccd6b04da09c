use std::{env, str::FromStr};

use tracing::warn;

/// Reads `name` from the environment, falling back to `default` when the
/// variable is unset or does not parse.
pub fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Ignoring unparsable value {:?} for {}", value, name);
                default
            }
        },
        Err(_) => default,
    }
}
