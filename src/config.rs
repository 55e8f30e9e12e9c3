use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// パイプライン駆動の目標FPS
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// デバッグ出力
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    /// レイ原点のカットオフ（緩め: ユーザが意識して動かさない量）
    #[serde(default = "default_origin_min_cutoff")]
    pub origin_min_cutoff: f32,
    #[serde(default = "default_origin_beta")]
    pub origin_beta: f32,
    /// レイ方向のカットオフ（応答寄り: 能動的に狙う量）
    #[serde(default = "default_direction_min_cutoff")]
    pub direction_min_cutoff: f32,
    #[serde(default = "default_direction_beta")]
    pub direction_beta: f32,
    /// 微分チャンネルの固定カットオフ
    #[serde(default = "default_d_cutoff")]
    pub d_cutoff: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GestureConfig {
    /// ピンチ係合閾値
    #[serde(default = "default_pinch_threshold")]
    pub pinch_threshold: f32,
    /// ピンチ解放閾値（pinch_threshold より小さいこと）
    #[serde(default = "default_release_threshold")]
    pub release_threshold: f32,
    /// ポイント姿勢の係合閾値
    #[serde(default = "default_point_threshold")]
    pub point_threshold: f32,
    /// ポイント姿勢の解放閾値
    #[serde(default = "default_point_release")]
    pub point_release: f32,
    /// グラブ係合閾値
    #[serde(default = "default_grab_threshold")]
    pub grab_threshold: f32,
    /// グラブ解放閾値
    #[serde(default = "default_grab_release")]
    pub grab_release: f32,
    /// aiming → locked までのドウェル時間（ミリ秒）
    #[serde(default = "default_lock_dwell_ms")]
    pub lock_dwell_ms: u64,
    /// 手首から前腕方向に遡る仮想ピボット距離（正規化座標）
    #[serde(default = "default_pivot_distance")]
    pub pivot_distance: f32,
    /// ヒットテストの最大レイ距離
    #[serde(default = "default_max_hit_distance")]
    pub max_hit_distance: f32,
    /// 両手メトリクスのEMA係数（0に近いほど生値）
    #[serde(default = "default_two_hand_smoothing")]
    pub two_hand_smoothing: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BridgeConfig {
    /// ブリッジ中継サーバのアドレス
    #[serde(default = "default_bridge_addr")]
    pub addr: String,
}

fn default_target_fps() -> u32 { 60 }
fn default_origin_min_cutoff() -> f32 { 0.5 }
fn default_origin_beta() -> f32 { 0.3 }
fn default_direction_min_cutoff() -> f32 { 1.5 }
fn default_direction_beta() -> f32 { 0.8 }
fn default_d_cutoff() -> f32 { 1.0 }
fn default_pinch_threshold() -> f32 { 0.6 }
fn default_release_threshold() -> f32 { 0.35 }
fn default_point_threshold() -> f32 { 0.55 }
fn default_point_release() -> f32 { 0.35 }
fn default_grab_threshold() -> f32 { 0.7 }
fn default_grab_release() -> f32 { 0.45 }
fn default_lock_dwell_ms() -> u64 { 300 }
fn default_pivot_distance() -> f32 { 0.12 }
fn default_max_hit_distance() -> f32 { 100.0 }
fn default_two_hand_smoothing() -> f32 { 0.3 }
fn default_bridge_addr() -> String { "127.0.0.1:8765".to_string() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            debug: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            origin_min_cutoff: default_origin_min_cutoff(),
            origin_beta: default_origin_beta(),
            direction_min_cutoff: default_direction_min_cutoff(),
            direction_beta: default_direction_beta(),
            d_cutoff: default_d_cutoff(),
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_threshold: default_pinch_threshold(),
            release_threshold: default_release_threshold(),
            point_threshold: default_point_threshold(),
            point_release: default_point_release(),
            grab_threshold: default_grab_threshold(),
            grab_release: default_grab_release(),
            lock_dwell_ms: default_lock_dwell_ms(),
            pivot_distance: default_pivot_distance(),
            max_hit_distance: default_max_hit_distance(),
            two_hand_smoothing: default_two_hand_smoothing(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            addr: default_bridge_addr(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 読み込み失敗時はデフォルト設定で続行
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(c) => c,
            Err(_) => Self::default(),
        }
    }

    /// ヒステリシスが成立するよう解放閾値 < 係合閾値を要求する
    pub fn validate(&self) -> Result<()> {
        let g = &self.gesture;
        if g.release_threshold >= g.pinch_threshold {
            anyhow::bail!(
                "release_threshold ({}) must be < pinch_threshold ({})",
                g.release_threshold,
                g.pinch_threshold
            );
        }
        if g.point_release >= g.point_threshold {
            anyhow::bail!(
                "point_release ({}) must be < point_threshold ({})",
                g.point_release,
                g.point_threshold
            );
        }
        if g.grab_release >= g.grab_threshold {
            anyhow::bail!(
                "grab_release ({}) must be < grab_threshold ({})",
                g.grab_release,
                g.grab_threshold
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = Config::default();
        assert!((config.gesture.pinch_threshold - 0.6).abs() < 1e-6);
        assert!((config.gesture.release_threshold - 0.35).abs() < 1e-6);
        assert!((config.gesture.pivot_distance - 0.12).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
            [gesture]
            pinch_threshold = 0.75
            release_threshold = 0.5

            [filter]
            origin_min_cutoff = 0.4
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!((config.gesture.pinch_threshold - 0.75).abs() < 1e-6);
        assert!((config.gesture.release_threshold - 0.5).abs() < 1e-6);
        // 未指定フィールドはデフォルト
        assert!((config.filter.direction_min_cutoff - 1.5).abs() < 1e-6);
        assert!((config.gesture.pivot_distance - 0.12).abs() < 1e-6);
    }

    #[test]
    fn test_validate_rejects_inverted_hysteresis() {
        let toml_str = r#"
            [gesture]
            pinch_threshold = 0.4
            release_threshold = 0.6
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/config.toml");
        assert_eq!(config.app.target_fps, 60);
    }
}
