use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// True when `FRAUDSTORE_QUIET` asks for progress lines to be suppressed
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| quiet_requested(std::env::var("FRAUDSTORE_QUIET").ok().as_deref()))
}

fn quiet_requested(value: Option<&str>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_values() {
        assert!(quiet_requested(Some("1")));
        assert!(quiet_requested(Some("TRUE")));
        assert!(!quiet_requested(Some("0")));
        assert!(!quiet_requested(None));
    }
}
