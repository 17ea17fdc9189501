//! INI file configuration adapter.

use crate::domain::error::TradecastError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TradecastError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| TradecastError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[data]
provider = stooq
csv_dir = /srv/prices

[backtest]
initial_capital = 250000.0
min_history = 90
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "provider"),
            Some("stooq".to_string())
        );
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/srv/prices".to_string())
        );
        assert_eq!(adapter.get_int("backtest", "min_history", 60), 90);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[web]\nport = 8000\n").unwrap();
        assert_eq!(adapter.get_string("web", "host"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_default_for_missing_or_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[web]\nport = abc\n").unwrap();
        assert_eq!(adapter.get_int("web", "port", 8000), 8000);
        assert_eq!(adapter.get_int("web", "missing", 42), 42);
    }

    #[test]
    fn get_double_returns_value_or_default() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ntarget_volatility = 0.015\nslippage_factor = lots\n",
        )
        .unwrap();
        assert_eq!(adapter.get_double("backtest", "target_volatility", 0.0), 0.015);
        assert_eq!(adapter.get_double("backtest", "slippage_factor", 0.001), 0.001);
        assert_eq!(adapter.get_double("backtest", "missing", 99.9), 99.9);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[cache]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("cache", "a", false));
        assert!(adapter.get_bool("cache", "b", false));
        assert!(adapter.get_bool("cache", "c", false));
        assert!(!adapter.get_bool("cache", "d", true));
        assert!(!adapter.get_bool("cache", "e", true));
        assert!(!adapter.get_bool("cache", "f", true));
        assert!(adapter.get_bool("cache", "g", true));
        assert!(!adapter.get_bool("cache", "missing", false));
    }

    #[test]
    fn get_list_splits_on_commas() {
        let adapter = FileConfigAdapter::from_string(
            "[web]\ncors_origins = http://localhost:3000, https://app.example.com\n",
        )
        .unwrap();
        assert_eq!(
            adapter.get_list("web", "cors_origins"),
            vec!["http://localhost:3000", "https://app.example.com"]
        );
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[cache]\npath = /tmp/bars.sqlite\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("cache", "path"),
            Some("/tmp/bars.sqlite".to_string())
        );
    }

    #[test]
    fn from_file_missing_file_is_config_parse_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/tradecast.ini");
        assert!(matches!(result, Err(TradecastError::ConfigParse { .. })));
    }
}
