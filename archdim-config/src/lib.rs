use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use archdim_core::units::{IMPERIAL_PRECISIONS, MAX_DECIMAL_PRECISION, UnitSettings};
use serde::Deserialize;
use thiserror::Error;

/// 配置文件路径的环境变量。
pub const CONFIG_ENV: &str = "ARCHDIM_CONFIG";

/// 支持的预设视角名称。
pub const VIEW_NAMES: [&str; 4] = ["top", "front", "right", "iso"];

/// 演示应用的配置：日志等级、单位与显示选项。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub units: UnitSettings,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl AppConfig {
    /// 从显式路径加载配置，并校验取值范围。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 查找顺序：环境变量 `ARCHDIM_CONFIG`，然后 `./config/default.toml`，都没有时使用默认值。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 小数位数不超过 5，英制分母只能是 1 到 64 之间的 2 的幂，视角必须是预设名称。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units.decimal_precision > MAX_DECIMAL_PRECISION {
            return Err(ConfigError::Invalid {
                message: format!(
                    "小数位数 {} 超出范围（最大 {MAX_DECIMAL_PRECISION}）",
                    self.units.decimal_precision
                ),
            });
        }
        if !IMPERIAL_PRECISIONS.contains(&self.units.imperial_precision) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "英制精度 {} 无效，可选值为 {:?}",
                    self.units.imperial_precision, IMPERIAL_PRECISIONS
                ),
            });
        }
        if !VIEW_NAMES.contains(&self.display.view.as_str()) {
            return Err(ConfigError::Invalid {
                message: format!("未知视角 `{}`", self.display.view),
            });
        }
        Ok(())
    }
}

/// `[logging]`，等级字符串按 `EnvFilter` 语法解析。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "LoggingSection::info")]
    pub level: String,
}

impl LoggingSection {
    fn info() -> String {
        "info".into()
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self { level: Self::info() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "DisplayConfig::default_show_text")]
    pub show_dimension_text: bool,
    #[serde(default = "DisplayConfig::default_viewport")]
    pub viewport: [f32; 2],
    #[serde(default = "DisplayConfig::default_view")]
    pub view: String,
    #[serde(default)]
    pub orthographic: bool,
}

impl DisplayConfig {
    fn default_show_text() -> bool {
        true
    }

    fn default_viewport() -> [f32; 2] {
        [1280.0, 720.0]
    }

    fn default_view() -> String {
        "top".to_string()
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_dimension_text: Self::default_show_text(),
            viewport: Self::default_viewport(),
            view: Self::default_view(),
            orthographic: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置取值无效: {message}")]
    Invalid { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use archdim_core::units::{LengthUnit, UnitSystem};
    use std::io::Write;

    #[test]
    fn discover_without_file_uses_metric_top_view() {
        let cfg = AppConfig::discover().expect("默认配置可用");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.units, UnitSettings::default());
        assert!(cfg.display.show_dimension_text);
        assert_eq!(cfg.display.view, "top");
        assert!(!cfg.display.orthographic);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn imperial_units_and_display_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
        writeln!(
            file,
            r#"
            [logging]
            level = "archdim_engine=trace"

            [units]
            system = "imperial"
            length_unit = "feet"
            imperial_precision = 8
            decimal_precision = 3

            [display]
            show_dimension_text = false
            viewport = [800.0, 600.0]
            view = "iso"
            orthographic = true
            "#
        )
        .unwrap();

        let cfg = AppConfig::from_file(file.path()).expect("读取配置失败");
        assert_eq!(cfg.logging.level, "archdim_engine=trace");
        assert_eq!(cfg.units.system, UnitSystem::Imperial);
        assert_eq!(cfg.units.length_unit, LengthUnit::Feet);
        assert_eq!(cfg.units.imperial_precision, 8);
        assert_eq!(cfg.units.decimal_precision, 3);
        // 未写出的字段保持默认
        assert_eq!(cfg.units.scale_length, 1.0);
        assert!(!cfg.display.show_dimension_text);
        assert_eq!(cfg.display.viewport, [800.0, 600.0]);
        assert_eq!(cfg.display.view, "iso");
        assert!(cfg.display.orthographic);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
        writeln!(
            file,
            r#"
            [units]
            imperial_precision = 12
            "#
        )
        .unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));

        let mut cfg = AppConfig::default();
        cfg.units.decimal_precision = 6;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));

        let mut cfg = AppConfig::default();
        cfg.display.view = "bottom".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
        writeln!(file, "[display\nview = ").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
