use std::{env, io};

use tracing_subscriber::EnvFilter;

const DEBUG_ENV: &str = "JIRAC_DEBUG";
const DEBUG_DIRECTIVES: &str = "warn,jirac=debug,jirac_config=debug,jirac_domain=debug,jirac_jira=debug";

/// Installs the stderr subscriber. `RUST_LOG` wins over `--debug`.
pub fn init(debug: bool) {
    let debug = debug || parse_bool_flag(&env::var(DEBUG_ENV).unwrap_or_default());
    let filter = match env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(filter_directives(debug)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn filter_directives(debug: bool) -> &'static str {
    if debug {
        DEBUG_DIRECTIVES
    } else {
        "warn"
    }
}

fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::{filter_directives, parse_bool_flag};

    #[test]
    fn parses_debug_bool_flags() {
        assert!(parse_bool_flag("1"));
        assert!(parse_bool_flag("true"));
        assert!(parse_bool_flag("YES"));
        assert!(parse_bool_flag("on"));
        assert!(!parse_bool_flag(""));
        assert!(!parse_bool_flag("0"));
        assert!(!parse_bool_flag("false"));
    }

    #[test]
    fn debug_raises_only_our_targets() {
        assert_eq!(filter_directives(false), "warn");
        assert!(filter_directives(true).starts_with("warn,"));
        assert!(filter_directives(true).contains("jirac_jira=debug"));
    }
}
