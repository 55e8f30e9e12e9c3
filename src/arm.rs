use nalgebra::Vector3;

use crate::config::{FilterConfig, GestureConfig};
use crate::filter::RayFilter;
use crate::hand::{HandJointIndex, HandSnapshot, Handedness, Landmark};

/// 肩→肘→手首→ピンチ点の推定チェーン。毎フレーム再計算され持ち越さない
#[derive(Debug, Clone, Copy)]
pub struct ArmPose {
    pub shoulder: Vector3<f32>,
    pub elbow: Vector3<f32>,
    pub wrist: Vector3<f32>,
    pub pinch_point: Vector3<f32>,
}

/// 安定化済みエイミングレイ
///
/// direction はフィルタ後に再正規化済みの単位ベクトル。
/// is_active は状態機械のヒステリシスが決める（ここでは常に false で返す）
#[derive(Debug, Clone)]
pub struct StableRay {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
    pub pinch_strength: f32,
    pub is_active: bool,
    pub confidence: f32,
    pub pinch_point: Vector3<f32>,
    /// z=0 平面との交点。レイが平面と平行または後方なら None
    pub screen_hit: Option<Vector3<f32>>,
    pub arm_pose: ArmPose,
}

/// 仮想肩のX座標: 手の側の画面外に固定配置する
const SHOULDER_X_RIGHT: f32 = 1.4;
const SHOULDER_X_LEFT: f32 = -0.4;
/// 仮想肩は可視フレームの下・奥
const SHOULDER_Y: f32 = 1.2;
const SHOULDER_Z: f32 = -0.15;

/// 肘は肩→手首の35%地点
const ELBOW_RATIO: f32 = 0.35;
/// 自然な肘の曲がりの最大横オフセット
const ELBOW_BEND_MAX: f32 = 0.1;

fn to_vec(lm: &Landmark) -> Vector3<f32> {
    Vector3::new(lm.x, lm.y, lm.z)
}

/// 手の近さの代理量: 手首〜中指ナックル距離。近いほど画面上で大きい
fn hand_proximity(hand: &HandSnapshot) -> f32 {
    let wrist = hand.joint(HandJointIndex::Wrist);
    let mcp = hand.joint(HandJointIndex::MiddleMcp);
    // 0.1前後が典型。0〜1に正規化
    (wrist.distance_to(mcp) / 0.2).clamp(0.0, 1.0)
}

/// 可視ランドマークのみから腕ポーズを推定する
///
/// 肩と肘は観測ではなく推定。レイのピボットを手首ではなく前腕の
/// 奥に置くことで、手の微細な震えが遠距離で角度スイングに増幅される
/// のを抑える
pub fn estimate_arm_pose(hand: &HandSnapshot) -> ArmPose {
    let wrist = to_vec(hand.joint(HandJointIndex::Wrist));

    let shoulder_x = match hand.handedness {
        Handedness::Right => SHOULDER_X_RIGHT,
        Handedness::Left => SHOULDER_X_LEFT,
    };
    let shoulder = Vector3::new(shoulder_x, SHOULDER_Y, SHOULDER_Z);

    // 前腕の短縮をモデル化: 手がカメラに近いほど肘の曲がりを大きく
    let bend_sign = match hand.handedness {
        Handedness::Right => 1.0,
        Handedness::Left => -1.0,
    };
    let bend = bend_sign * ELBOW_BEND_MAX * hand_proximity(hand);
    let elbow = shoulder + (wrist - shoulder) * ELBOW_RATIO + Vector3::new(bend, 0.0, 0.0);

    let thumb = to_vec(hand.joint(HandJointIndex::ThumbTip));
    let index = to_vec(hand.joint(HandJointIndex::IndexTip));
    let pinch_point = (thumb + index) / 2.0;

    ArmPose {
        shoulder,
        elbow,
        wrist,
        pinch_point,
    }
}

/// レイと z=0 平面の交点
fn screen_plane_hit(origin: Vector3<f32>, direction: Vector3<f32>) -> Option<Vector3<f32>> {
    if direction.z.abs() < 1e-6 {
        return None;
    }
    let t = -origin.z / direction.z;
    if t < 0.0 {
        return None;
    }
    Some(origin + direction * t)
}

/// 推定信頼度: 平均可視性に手のひら正面向きブーストを加える
///
/// 手のひらがカメラを向いている（手首が人差し指・中指ナックルより
/// 画像で下にある）ときは追跡が安定するため加点する
fn estimate_confidence(hand: &HandSnapshot) -> f32 {
    let base = hand.landmarks.average_visibility();
    let wrist = hand.joint(HandJointIndex::Wrist);
    let index_mcp = hand.joint(HandJointIndex::IndexMcp);
    let middle_mcp = hand.joint(HandJointIndex::MiddleMcp);
    let palm_facing = wrist.y > index_mcp.y && wrist.y > middle_mcp.y;
    if palm_facing {
        (base * 1.2).min(1.0)
    } else {
        base
    }
}

/// 片手分のレイ推定器。フィルタ状態を持つため手スロットごとに1つ
pub struct RayEstimator {
    filter: RayFilter,
    pivot_distance: f32,
}

impl RayEstimator {
    pub fn new(filter_config: &FilterConfig, gesture_config: &GestureConfig) -> Self {
        Self {
            filter: RayFilter::from_config(filter_config),
            pivot_distance: gesture_config.pivot_distance,
        }
    }

    /// 1フレーム分の安定化レイを計算する
    pub fn estimate(
        &mut self,
        hand: &HandSnapshot,
        pinch_strength: f32,
        timestamp_secs: f64,
    ) -> StableRay {
        let arm = estimate_arm_pose(hand);

        // 前腕方向に沿って手首の奥へ仮想ピボットを置く
        let forearm = arm.wrist - arm.elbow;
        let forearm_norm = forearm.norm();
        let forearm_dir = if forearm_norm > 1e-6 {
            forearm / forearm_norm
        } else {
            Vector3::new(0.0, -1.0, 0.0)
        };
        let pivot = arm.wrist - forearm_dir * self.pivot_distance;

        let aim = arm.pinch_point - pivot;
        let aim_norm = aim.norm();
        let raw_direction = if aim_norm > 1e-6 {
            aim / aim_norm
        } else {
            forearm_dir
        };

        let (origin, direction) = self.filter.apply(pivot, raw_direction, timestamp_secs);

        StableRay {
            origin,
            direction,
            pinch_strength,
            is_active: false,
            confidence: estimate_confidence(hand),
            pinch_point: arm.pinch_point,
            screen_hit: screen_plane_hit(origin, direction),
            arm_pose: arm,
        }
    }

    /// フィルタ状態を全消去（手のロスト・トラッキング無効化時）
    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{Landmark, LandmarkSet};

    fn make_hand(handedness: Handedness, joints: &[(HandJointIndex, f32, f32, f32)]) -> HandSnapshot {
        let mut points = [Landmark::neutral(); HandJointIndex::COUNT];
        for p in points.iter_mut() {
            p.visibility = 1.0;
        }
        for (joint, x, y, z) in joints {
            points[*joint as usize] = Landmark::new(*x, *y, *z);
        }
        let set = LandmarkSet::new(points, false);
        HandSnapshot::new(set.clone(), set, handedness)
    }

    fn aiming_hand(handedness: Handedness) -> HandSnapshot {
        make_hand(
            handedness,
            &[
                (HandJointIndex::Wrist, 0.6, 0.7, 0.0),
                (HandJointIndex::MiddleMcp, 0.6, 0.6, 0.0),
                (HandJointIndex::IndexMcp, 0.62, 0.6, 0.0),
                (HandJointIndex::ThumbTip, 0.63, 0.55, 0.05),
                (HandJointIndex::IndexTip, 0.65, 0.53, 0.05),
            ],
        )
    }

    #[test]
    fn test_shoulder_side_depends_on_handedness() {
        let right = estimate_arm_pose(&aiming_hand(Handedness::Right));
        let left = estimate_arm_pose(&aiming_hand(Handedness::Left));
        assert!((right.shoulder.x - 1.4).abs() < 1e-6);
        assert!((left.shoulder.x + 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_elbow_between_shoulder_and_wrist() {
        let arm = estimate_arm_pose(&aiming_hand(Handedness::Right));
        // 肘は肩→手首の35%地点付近（曲がりオフセット分は許容）
        let expected = arm.shoulder + (arm.wrist - arm.shoulder) * 0.35;
        assert!((arm.elbow - expected).norm() <= ELBOW_BEND_MAX + 1e-6);
    }

    #[test]
    fn test_pinch_point_is_thumb_index_midpoint() {
        let arm = estimate_arm_pose(&aiming_hand(Handedness::Right));
        assert!((arm.pinch_point.x - 0.64).abs() < 1e-6);
        assert!((arm.pinch_point.y - 0.54).abs() < 1e-6);
        assert!((arm.pinch_point.z - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_pivot_sits_behind_wrist() {
        let config = FilterConfig::default();
        let gesture = GestureConfig::default();
        let mut estimator = RayEstimator::new(&config, &gesture);
        let hand = aiming_hand(Handedness::Right);
        let ray = estimator.estimate(&hand, 0.0, 0.0);
        let arm = estimate_arm_pose(&hand);
        // 初回フレームはパススルー: origin = wrist - forearm_dir * 0.12
        let forearm_dir = (arm.wrist - arm.elbow).normalize();
        let expected = arm.wrist - forearm_dir * 0.12;
        assert!((ray.origin - expected).norm() < 1e-5);
    }

    #[test]
    fn test_direction_unit_after_filtering() {
        let config = FilterConfig::default();
        let gesture = GestureConfig::default();
        let mut estimator = RayEstimator::new(&config, &gesture);
        for i in 0..60 {
            let t = i as f64 / 30.0;
            let shift = (i as f32) * 0.002;
            let hand = make_hand(
                Handedness::Right,
                &[
                    (HandJointIndex::Wrist, 0.6 + shift, 0.7, 0.0),
                    (HandJointIndex::MiddleMcp, 0.6 + shift, 0.6, 0.0),
                    (HandJointIndex::ThumbTip, 0.63 + shift, 0.55, 0.05),
                    (HandJointIndex::IndexTip, 0.65 + shift, 0.53, 0.05),
                ],
            );
            let ray = estimator.estimate(&hand, 0.5, t);
            assert!(
                (ray.direction.norm() - 1.0).abs() < 1e-5,
                "frame {}: |dir|={}",
                i,
                ray.direction.norm()
            );
        }
    }

    #[test]
    fn test_screen_hit_at_z_zero_plane() {
        let origin = Vector3::new(0.5, 0.5, -0.2);
        let direction = Vector3::new(0.0, 0.0, 1.0);
        let hit = screen_plane_hit(origin, direction).unwrap();
        assert!(hit.z.abs() < 1e-6);
        assert!((hit.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_screen_hit_parallel_ray_none() {
        let origin = Vector3::new(0.5, 0.5, -0.2);
        let direction = Vector3::new(1.0, 0.0, 0.0);
        assert!(screen_plane_hit(origin, direction).is_none());
    }

    #[test]
    fn test_screen_hit_behind_origin_none() {
        let origin = Vector3::new(0.5, 0.5, -0.2);
        let direction = Vector3::new(0.0, 0.0, -1.0);
        assert!(screen_plane_hit(origin, direction).is_none());
    }

    #[test]
    fn test_confidence_palm_facing_boost() {
        // 手首がナックルより下（y大）→ 手のひら正面
        let facing = make_hand(
            Handedness::Right,
            &[
                (HandJointIndex::Wrist, 0.5, 0.8, 0.0),
                (HandJointIndex::IndexMcp, 0.5, 0.6, 0.0),
                (HandJointIndex::MiddleMcp, 0.52, 0.6, 0.0),
            ],
        );
        let away = make_hand(
            Handedness::Right,
            &[
                (HandJointIndex::Wrist, 0.5, 0.4, 0.0),
                (HandJointIndex::IndexMcp, 0.5, 0.6, 0.0),
                (HandJointIndex::MiddleMcp, 0.52, 0.6, 0.0),
            ],
        );
        assert!(estimate_confidence(&facing) > estimate_confidence(&away));
    }

    #[test]
    fn test_reset_reseeds_filter() {
        let config = FilterConfig::default();
        let gesture = GestureConfig::default();
        let mut estimator = RayEstimator::new(&config, &gesture);
        let hand = aiming_hand(Handedness::Right);
        estimator.estimate(&hand, 0.0, 0.0);
        estimator.estimate(&hand, 0.0, 1.0 / 30.0);
        estimator.reset();
        // リセット後の初回はパススルー
        let ray = estimator.estimate(&hand, 0.0, 2.0 / 30.0);
        let arm = estimate_arm_pose(&hand);
        let forearm_dir = (arm.wrist - arm.elbow).normalize();
        let expected = arm.wrist - forearm_dir * 0.12;
        assert!((ray.origin - expected).norm() < 1e-5);
    }
}
