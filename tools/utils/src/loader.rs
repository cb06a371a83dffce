//! 对 `wsi-berry::config` 的更一层封装. 提供默认配置文件的定位与加载.

use std::env;
use std::path::PathBuf;
use wsi_berry::data::home_dataset_dir_with;
use wsi_berry::RawConfig;

/// 指定默认配置文件的环境变量.
pub const CONFIG_ENV: &str = "WSI_BERRY_CONFIG";

/// 默认配置文件名.
pub const CONFIG_FILE_NAME: &str = "wsi-berry.toml";

/// 获取默认配置文件路径.
///
/// 1. 若环境变量 `$WSI_BERRY_CONFIG` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/wsi-berry.toml`. 无法确定主目录时返回 `None`.
pub fn config_path_from_env_or_home() -> Option<PathBuf> {
    match env::var(CONFIG_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with([CONFIG_FILE_NAME]),
    }
}

/// 若默认配置文件存在, 则加载它.
pub fn default_raw_config() -> wsi_berry::Result<Option<RawConfig>> {
    match config_path_from_env_or_home() {
        Some(path) if path.is_file() => {
            log::info!("using configuration {}", path.display());
            RawConfig::from_toml_file(path).map(Some)
        }
        _ => Ok(None),
    }
}
