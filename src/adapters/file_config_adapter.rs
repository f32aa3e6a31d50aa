//! INI file configuration adapter.
//!
//! Every typed getter reads through [`ConfigPort::get_string`], so all keys
//! share the same value cleanup:
//! - trailing ` ; comment` or ` # comment` text is dropped;
//! - surrounding whitespace is trimmed and a blank value counts as missing;
//! - numbers may use `_` digit separators (`100_000`) and a trailing `%`
//!   (`0.4%` reads as `0.004`).

use crate::domain::error::AllocbtError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AllocbtError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| AllocbtError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, AllocbtError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| AllocbtError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }
}

fn strip_inline_comment(value: &str) -> &str {
    let bytes = value.as_bytes();
    let cut = (1..bytes.len())
        .find(|&i| matches!(bytes[i], b';' | b'#') && bytes[i - 1].is_ascii_whitespace());
    match cut {
        Some(i) => &value[..i],
        None => value,
    }
}

fn parse_number(value: &str) -> Option<f64> {
    let cleaned: String = value.chars().filter(|c| *c != '_').collect();
    match cleaned.strip_suffix('%') {
        Some(pct) => pct.trim_end().parse::<f64>().ok().map(|v| v / 100.0),
        None => cleaned.parse().ok(),
    }
}

fn parse_integer(value: &str) -> Option<i64> {
    let cleaned: String = value.chars().filter(|c| *c != '_').collect();
    cleaned.parse().ok()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| strip_inline_comment(&v).trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| parse_integer(&v))
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_string(section, key)
            .and_then(|v| parse_number(&v))
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get_string(section, key)
            .and_then(|v| parse_bool(&v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const RUN_CONFIG: &str = r#"
[data]
dir = /var/prices        ; per-symbol csv files
symbols = AAPL, MSFT ,,
features =

[backtest]
initial_capital = 250_000
fee_rate = 0.4%
use_fees = off
allow_short_position = Yes
periods_per_year = 52    # weekly bars

[strategy]
kinds = momentum, buy_and_hold

[momentum]
lookback = 1_0
quantity = two
"#;

    fn run_config() -> FileConfigAdapter {
        FileConfigAdapter::from_string(RUN_CONFIG).unwrap()
    }

    #[test]
    fn inline_comments_are_dropped() {
        let adapter = run_config();
        assert_eq!(adapter.get_string("data", "dir"), Some("/var/prices".into()));
        assert_eq!(adapter.get_double("backtest", "periods_per_year", 252.0), 52.0);
    }

    #[test]
    fn blank_value_reads_as_missing() {
        let adapter = run_config();
        assert_eq!(adapter.get_string("data", "features"), None);
        assert_eq!(adapter.get_string("data", "start_date"), None);
        assert_eq!(adapter.get_string("nowhere", "dir"), None);
    }

    #[test]
    fn numbers_accept_separators_and_percent() {
        let adapter = run_config();
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 250_000.0);
        assert!((adapter.get_double("backtest", "fee_rate", 0.0) - 0.004).abs() < 1e-12);
        assert_eq!(adapter.get_int("momentum", "lookback", 5), 10);
    }

    #[test]
    fn unparseable_numbers_fall_back_to_default() {
        let adapter = run_config();
        assert_eq!(adapter.get_double("momentum", "quantity", 1.0), 1.0);
        assert_eq!(adapter.get_int("strategy", "kinds", 3), 3);
        assert_eq!(adapter.get_int("backtest", "fee_rate", 7), 7);
    }

    #[test]
    fn booleans_are_case_insensitive() {
        let adapter = run_config();
        assert!(!adapter.get_bool("backtest", "use_fees", true));
        assert!(adapter.get_bool("backtest", "allow_short_position", false));
        assert!(adapter.get_bool("backtest", "benchmark", true));
        assert!(!adapter.get_bool("data", "dir", false));
    }

    #[test]
    fn lists_skip_empty_items() {
        let adapter = run_config();
        assert_eq!(
            adapter.get_list("data", "symbols"),
            vec!["AAPL".to_string(), "MSFT".to_string()]
        );
        assert_eq!(
            adapter.get_list("strategy", "kinds"),
            vec!["momentum".to_string(), "buy_and_hold".to_string()]
        );
        assert!(adapter.get_list("data", "features").is_empty());
    }

    #[test]
    fn from_file_matches_from_string() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", RUN_CONFIG).unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_list("data", "symbols"), run_config().get_list("data", "symbols"));
        assert_eq!(adapter.get_int("momentum", "lookback", 0), 10);
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/allocbt.ini")
            .err()
            .unwrap();
        assert!(
            matches!(err, AllocbtError::ConfigParse { file, .. } if file.ends_with("allocbt.ini"))
        );
    }
}
