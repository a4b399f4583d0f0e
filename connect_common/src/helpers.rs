use std::{env, fmt::Display, str::FromStr};

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Reads and parses the environment variable `key`.
///
/// Returns `Ok(None)` if the variable is not set, and `Err` with a human-readable message if it is set but cannot be
/// parsed into a `T`.
pub fn parse_env_var<T>(key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(s) => s.trim().parse::<T>().map(Some).map_err(|e| format!("{s} is not a valid value for {key}. {e}")),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("Yes".into()), false));
        assert!(parse_boolean_flag(Some(" on ".into()), false));
        assert!(!parse_boolean_flag(Some("0".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
    }

    #[test]
    fn env_var_parsing() {
        env::set_var("CONNECT_COMMON_TEST_NUMBER", "42");
        env::set_var("CONNECT_COMMON_TEST_BAD", "forty-two");
        assert_eq!(parse_env_var::<u32>("CONNECT_COMMON_TEST_NUMBER"), Ok(Some(42)));
        assert!(parse_env_var::<u32>("CONNECT_COMMON_TEST_BAD").is_err());
        assert_eq!(parse_env_var::<u32>("CONNECT_COMMON_TEST_MISSING"), Ok(None));
    }
}
