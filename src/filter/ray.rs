use nalgebra::Vector3;

use crate::config::FilterConfig;
use crate::filter::one_euro::Point3Filter;

/// レイ専用フィルタ
///
/// origin: ユーザが意識して操作しない点なので緩いチューニングで安定させる
/// direction: 能動的に狙う量なので応答寄りのチューニング
/// フィルタ後の direction は再正規化して常に単位ベクトルにする
pub struct RayFilter {
    origin: Point3Filter,
    direction: Point3Filter,
    last_direction: Option<Vector3<f32>>,
}

impl RayFilter {
    pub fn new(
        origin_min_cutoff: f32,
        origin_beta: f32,
        direction_min_cutoff: f32,
        direction_beta: f32,
        d_cutoff: f32,
    ) -> Self {
        Self {
            origin: Point3Filter::new(origin_min_cutoff, origin_beta, d_cutoff),
            direction: Point3Filter::new(direction_min_cutoff, direction_beta, d_cutoff),
            last_direction: None,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(
            config.origin_min_cutoff,
            config.origin_beta,
            config.direction_min_cutoff,
            config.direction_beta,
            config.d_cutoff,
        )
    }

    /// origin と direction を独立にフィルタし、direction を再正規化して返す
    pub fn apply(
        &mut self,
        origin: Vector3<f32>,
        direction: Vector3<f32>,
        timestamp_secs: f64,
    ) -> (Vector3<f32>, Vector3<f32>) {
        let filtered_origin = self.origin.filter(origin, timestamp_secs);
        let filtered_dir = self.direction.filter(direction, timestamp_secs);

        let norm = filtered_dir.norm();
        let unit = if norm > 1e-6 {
            filtered_dir / norm
        } else {
            // 縮退: 直前の有効な方向、なければ画面奥向き
            self.last_direction
                .unwrap_or_else(|| Vector3::new(0.0, 0.0, 1.0))
        };
        self.last_direction = Some(unit);

        (filtered_origin, unit)
    }

    pub fn reset(&mut self) {
        self.origin.reset();
        self.direction.reset();
        self.last_direction = None;
    }
}
