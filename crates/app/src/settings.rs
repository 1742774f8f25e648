use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use tenkan_core::config::AppConfig;

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 按优先级从低到高叠加：
/// 1. 内置默认值 (缺省字段由 `serde(default)` 补齐)。
/// 2. 可选的 `config/default.toml`。
/// 3. 命令行指定的配置文件 (必须存在)。
/// 4. `TENKAN__` 前缀的环境变量，层级用 `__` 分隔，如 `TENKAN__PIPELINE__QUEUE_DEPTH`。
///
/// # Arguments
/// * `path`: 命令行指定的配置文件。
///
/// # Returns
/// 反序列化后的配置，管线部分尚未规整。
pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder =
        Config::builder().add_source(File::with_name("config/default").required(false));
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder
        .add_source(
            Environment::with_prefix("TENKAN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tenkan_core::common::TimeFrame;

    #[test]
    fn test_defaults_without_files() {
        let config = load(None).unwrap();
        assert_eq!(config.pipeline.buffer_capacity, 1_440);
        assert_eq!(config.indicators.sma_periods, vec![20, 50]);
        assert!(config.strategies.ma_breakout.enabled);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let tmp_dir = tempdir().unwrap();
        let path = tmp_dir.path().join("tenkan.toml");
        std::fs::write(
            &path,
            r#"
[pipeline]
evaluated_timeframes = ["1m", "1h"]
queue_depth = 16

[indicators.rsi]
period = 7

[strategies.vwap_cross]
enabled = false
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();

        assert_eq!(
            config.pipeline.evaluated_timeframes,
            vec![TimeFrame::Minute1, TimeFrame::Hour1]
        );
        assert_eq!(config.pipeline.queue_depth, 16);
        assert_eq!(config.indicators.rsi.period, 7);
        // 未覆盖的字段保持默认
        assert_eq!(config.indicators.rsi.overbought, 70.0);
        assert!(!config.strategies.vwap_cross.enabled);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        assert!(load(Some(Path::new("/nonexistent/tenkan.toml"))).is_err());
    }
}
