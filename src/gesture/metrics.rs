use nalgebra::Vector2;

use crate::hand::{HandJointIndex, HandSnapshot};

/// ピンチ判定の距離キャリブレーション（正規化座標）
/// 約2cm相当で完全ピンチ、約15cm相当で完全オープンになる実測値
const PINCH_CLOSED_DIST: f32 = 0.02;
const PINCH_SPAN: f32 = 0.13;

/// グラブ判定のキャリブレーション
const GRAB_CLOSED_DIST: f32 = 0.08;
const GRAB_SPAN: f32 = 0.17;

/// ポイント判定: 人差し指先がナックルよりこのマージン以上持ち上がっていること
const POINT_MARGIN: f32 = 0.05;
const POINT_FULL_EXTENSION: f32 = 0.15;

fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// 親指と人差し指の接触度 (0=開, 1=閉)
pub fn pinch_strength(hand: &HandSnapshot) -> f32 {
    let thumb = hand.joint(HandJointIndex::ThumbTip);
    let index = hand.joint(HandJointIndex::IndexTip);
    clamp01(1.0 - (thumb.distance_to(index) - PINCH_CLOSED_DIST) / PINCH_SPAN)
}

/// 握り込みの度合い (0=開, 1=握り)。全指先と手首の平均距離から
pub fn grab_strength(hand: &HandSnapshot) -> f32 {
    let wrist = hand.joint(HandJointIndex::Wrist);
    let sum: f32 = HandJointIndex::fingertips()
        .iter()
        .map(|&tip| hand.joint(tip).distance_to(wrist))
        .sum();
    let avg = sum / 5.0;
    clamp01(1.0 - (avg - GRAB_CLOSED_DIST) / GRAB_SPAN)
}

/// 人差し指以外にカールしている指があるか数える（画像座標: yは下向き）
fn curled_finger_count(hand: &HandSnapshot) -> usize {
    [
        (HandJointIndex::MiddleTip, HandJointIndex::MiddlePip),
        (HandJointIndex::RingTip, HandJointIndex::RingPip),
        (HandJointIndex::PinkyTip, HandJointIndex::PinkyPip),
    ]
    .iter()
    .filter(|(tip, pip)| hand.joint(*tip).y > hand.joint(*pip).y)
    .count()
}

fn index_extension(hand: &HandSnapshot) -> f32 {
    hand.joint(HandJointIndex::IndexMcp).y - hand.joint(HandJointIndex::IndexTip).y
}

/// ポイント姿勢: 人差し指先がナックルより上 かつ 他に1本以上カール
pub fn is_pointing(hand: &HandSnapshot) -> bool {
    index_extension(hand) > POINT_MARGIN && curled_finger_count(hand) >= 1
}

/// ポイント姿勢の連続メトリクス (0〜1)
///
/// 指の持ち上がり量をベースに、カール指本数で係数を掛ける。
/// 全指開き（open palm）では閾値0.55を越えない
pub fn point_strength(hand: &HandSnapshot) -> f32 {
    let base = clamp01(index_extension(hand) / POINT_FULL_EXTENSION);
    let factor = match curled_finger_count(hand) {
        0 => 0.4,
        1 => 0.6,
        2 => 0.8,
        _ => 1.0,
    };
    clamp01(base * factor)
}

/// 指差し方向の2D単位ベクトル（ナックル→指先）。縮退時は None
pub fn point_direction(hand: &HandSnapshot) -> Option<Vector2<f32>> {
    let mcp = hand.joint(HandJointIndex::IndexMcp);
    let tip = hand.joint(HandJointIndex::IndexTip);
    let dir = Vector2::new(tip.x - mcp.x, tip.y - mcp.y);
    let norm = dir.norm();
    if norm > 1e-6 {
        Some(dir / norm)
    } else {
        None
    }
}

/// 片手分のメトリクスまとめ
#[derive(Debug, Clone)]
pub struct HandMetrics {
    pub pinch_strength: f32,
    pub grab_strength: f32,
    pub point_strength: f32,
    pub is_pointing: bool,
    pub point_direction: Option<Vector2<f32>>,
}

pub fn compute_hand_metrics(hand: &HandSnapshot) -> HandMetrics {
    HandMetrics {
        pinch_strength: pinch_strength(hand),
        grab_strength: grab_strength(hand),
        point_strength: point_strength(hand),
        is_pointing: is_pointing(hand),
        point_direction: point_direction(hand),
    }
}

/// 両手の空間関係。両手が揃ったフレームでのみ存在する
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoHandMetrics {
    /// 手首間距離
    pub distance: f32,
    /// 手首間の傾き atan2(Δy, Δx)
    pub rotation: f32,
    /// 手首の中点
    pub center: Vector2<f32>,
}

/// 前フレームとの差分（ズーム・回転・パン操作量）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TwoHandDeltas {
    pub zoom_delta: f32,
    pub rotate_delta: f32,
    pub pan_delta: Vector2<f32>,
}

impl Default for TwoHandMetrics {
    fn default() -> Self {
        Self {
            distance: 0.0,
            rotation: 0.0,
            center: Vector2::zeros(),
        }
    }
}

/// 角度を (−π, π] に正規化
fn wrap_angle(mut a: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    while a <= -PI {
        a += TAU;
    }
    while a > PI {
        a -= TAU;
    }
    a
}

fn raw_two_hand(left: &HandSnapshot, right: &HandSnapshot) -> TwoHandMetrics {
    let lw = left.joint(HandJointIndex::Wrist);
    let rw = right.joint(HandJointIndex::Wrist);
    let dx = rw.x - lw.x;
    let dy = rw.y - lw.y;
    TwoHandMetrics {
        distance: (dx * dx + dy * dy).sqrt(),
        rotation: f32::atan2(dy, dx),
        center: Vector2::new((lw.x + rw.x) / 2.0, (lw.y + rw.y) / 2.0),
    }
}

/// 両手メトリクスのEMA平滑化と差分計算
///
/// メインのレイと違い間接操作量なので、軽量なEMAで十分とする
pub struct TwoHandTracker {
    smoothing: f32,
    prev: Option<TwoHandMetrics>,
}

impl TwoHandTracker {
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing,
            prev: None,
        }
    }

    /// 両手が揃ったフレームで呼ぶ。平滑化済みメトリクスと差分を返す
    pub fn update(
        &mut self,
        left: &HandSnapshot,
        right: &HandSnapshot,
    ) -> (TwoHandMetrics, TwoHandDeltas) {
        let raw = raw_two_hand(left, right);
        let alpha = 1.0 - self.smoothing;

        let smoothed = match self.prev {
            Some(prev) => TwoHandMetrics {
                distance: prev.distance + (raw.distance - prev.distance) * alpha,
                rotation: prev.rotation + wrap_angle(raw.rotation - prev.rotation) * alpha,
                center: prev.center + (raw.center - prev.center) * alpha,
            },
            None => raw,
        };

        let deltas = match self.prev {
            Some(prev) => TwoHandDeltas {
                zoom_delta: smoothed.distance - prev.distance,
                rotate_delta: wrap_angle(smoothed.rotation - prev.rotation),
                pan_delta: smoothed.center - prev.center,
            },
            None => TwoHandDeltas::default(),
        };

        self.prev = Some(smoothed);
        (smoothed, deltas)
    }

    /// どちらかの手が消えたら呼ぶ
    pub fn reset(&mut self) {
        self.prev = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{Handedness, Landmark, LandmarkSet};

    /// 指定関節だけ動かしたスナップショットを作る
    fn make_hand(joints: &[(HandJointIndex, f32, f32, f32)]) -> HandSnapshot {
        let mut points = [Landmark::neutral(); HandJointIndex::COUNT];
        for p in points.iter_mut() {
            p.visibility = 1.0;
        }
        for (joint, x, y, z) in joints {
            points[*joint as usize] = Landmark::new(*x, *y, *z);
        }
        let set = LandmarkSet::new(points, false);
        HandSnapshot::new(set.clone(), set, Handedness::Right)
    }

    #[test]
    fn test_pinch_fully_closed() {
        let hand = make_hand(&[
            (HandJointIndex::ThumbTip, 0.5, 0.5, 0.0),
            (HandJointIndex::IndexTip, 0.51, 0.5, 0.0),
        ]);
        assert!(pinch_strength(&hand) > 0.99);
    }

    #[test]
    fn test_pinch_fully_open() {
        let hand = make_hand(&[
            (HandJointIndex::ThumbTip, 0.3, 0.5, 0.0),
            (HandJointIndex::IndexTip, 0.6, 0.5, 0.0),
        ]);
        assert!(pinch_strength(&hand) < 0.01);
    }

    #[test]
    fn test_pinch_monotonic_in_distance() {
        let near = make_hand(&[
            (HandJointIndex::ThumbTip, 0.5, 0.5, 0.0),
            (HandJointIndex::IndexTip, 0.55, 0.5, 0.0),
        ]);
        let far = make_hand(&[
            (HandJointIndex::ThumbTip, 0.5, 0.5, 0.0),
            (HandJointIndex::IndexTip, 0.6, 0.5, 0.0),
        ]);
        assert!(pinch_strength(&near) > pinch_strength(&far));
    }

    #[test]
    fn test_grab_closed_fist() {
        // 全指先が手首のすぐ近く
        let hand = make_hand(&[
            (HandJointIndex::Wrist, 0.5, 0.6, 0.0),
            (HandJointIndex::ThumbTip, 0.52, 0.58, 0.0),
            (HandJointIndex::IndexTip, 0.51, 0.57, 0.0),
            (HandJointIndex::MiddleTip, 0.5, 0.56, 0.0),
            (HandJointIndex::RingTip, 0.49, 0.57, 0.0),
            (HandJointIndex::PinkyTip, 0.48, 0.58, 0.0),
        ]);
        assert!(grab_strength(&hand) > 0.95);
    }

    #[test]
    fn test_grab_open_hand() {
        let hand = make_hand(&[
            (HandJointIndex::Wrist, 0.5, 0.8, 0.0),
            (HandJointIndex::ThumbTip, 0.25, 0.5, 0.0),
            (HandJointIndex::IndexTip, 0.4, 0.45, 0.0),
            (HandJointIndex::MiddleTip, 0.5, 0.42, 0.0),
            (HandJointIndex::RingTip, 0.6, 0.45, 0.0),
            (HandJointIndex::PinkyTip, 0.72, 0.5, 0.0),
        ]);
        assert!(grab_strength(&hand) < 0.1);
    }

    /// index伸展 + middle/ring/pinkyカールの典型的ポイント姿勢
    fn pointing_hand() -> HandSnapshot {
        make_hand(&[
            (HandJointIndex::Wrist, 0.5, 0.8, 0.0),
            (HandJointIndex::IndexMcp, 0.5, 0.6, 0.0),
            (HandJointIndex::IndexTip, 0.5, 0.42, 0.0),
            (HandJointIndex::MiddlePip, 0.52, 0.6, 0.0),
            (HandJointIndex::MiddleTip, 0.52, 0.68, 0.0),
            (HandJointIndex::RingPip, 0.54, 0.62, 0.0),
            (HandJointIndex::RingTip, 0.54, 0.69, 0.0),
            (HandJointIndex::PinkyPip, 0.56, 0.63, 0.0),
            (HandJointIndex::PinkyTip, 0.56, 0.7, 0.0),
        ])
    }

    #[test]
    fn test_is_pointing_true() {
        assert!(is_pointing(&pointing_hand()));
        assert!(point_strength(&pointing_hand()) > 0.55);
    }

    #[test]
    fn test_open_palm_not_pointing() {
        // 全指伸展（カールなし）
        let hand = make_hand(&[
            (HandJointIndex::IndexMcp, 0.5, 0.6, 0.0),
            (HandJointIndex::IndexTip, 0.5, 0.42, 0.0),
            (HandJointIndex::MiddlePip, 0.52, 0.6, 0.0),
            (HandJointIndex::MiddleTip, 0.52, 0.4, 0.0),
            (HandJointIndex::RingPip, 0.54, 0.6, 0.0),
            (HandJointIndex::RingTip, 0.54, 0.42, 0.0),
            (HandJointIndex::PinkyPip, 0.56, 0.6, 0.0),
            (HandJointIndex::PinkyTip, 0.56, 0.44, 0.0),
        ]);
        assert!(!is_pointing(&hand));
        assert!(point_strength(&hand) <= 0.55);
    }

    #[test]
    fn test_point_direction_is_unit() {
        let dir = point_direction(&pointing_hand()).unwrap();
        assert!((dir.norm() - 1.0).abs() < 1e-5);
        // 指先はナックルより上（yマイナス方向）
        assert!(dir.y < 0.0);
    }

    #[test]
    fn test_point_direction_degenerate() {
        let hand = make_hand(&[
            (HandJointIndex::IndexMcp, 0.5, 0.5, 0.0),
            (HandJointIndex::IndexTip, 0.5, 0.5, 0.0),
        ]);
        assert!(point_direction(&hand).is_none());
    }

    #[test]
    fn test_wrap_angle_range() {
        use std::f32::consts::PI;
        for &a in &[-7.0_f32, -PI, -0.5, 0.0, 0.5, PI, 7.0] {
            let w = wrap_angle(a);
            assert!(w > -PI - 1e-6 && w <= PI + 1e-6, "wrap({}) = {}", a, w);
        }
        // πはπのまま、-πはπへ
        assert!((wrap_angle(PI) - PI).abs() < 1e-6);
        assert!((wrap_angle(-PI) - PI).abs() < 1e-5);
    }

    fn wrist_at(x: f32, y: f32) -> HandSnapshot {
        make_hand(&[(HandJointIndex::Wrist, x, y, 0.0)])
    }

    #[test]
    fn test_two_hand_first_update_no_deltas() {
        let mut tracker = TwoHandTracker::new(0.3);
        let (metrics, deltas) = tracker.update(&wrist_at(0.3, 0.5), &wrist_at(0.7, 0.5));
        assert!((metrics.distance - 0.4).abs() < 1e-6);
        assert!(metrics.rotation.abs() < 1e-6);
        assert_eq!(deltas, TwoHandDeltas::default());
    }

    #[test]
    fn test_two_hand_zoom_delta_positive_on_spread() {
        let mut tracker = TwoHandTracker::new(0.3);
        tracker.update(&wrist_at(0.4, 0.5), &wrist_at(0.6, 0.5));
        let (_, deltas) = tracker.update(&wrist_at(0.3, 0.5), &wrist_at(0.7, 0.5));
        assert!(deltas.zoom_delta > 0.0);
        assert!(deltas.rotate_delta.abs() < 1e-4);
    }

    #[test]
    fn test_two_hand_smoothing_lags_raw() {
        let mut tracker = TwoHandTracker::new(0.3);
        tracker.update(&wrist_at(0.4, 0.5), &wrist_at(0.6, 0.5));
        let (metrics, _) = tracker.update(&wrist_at(0.2, 0.5), &wrist_at(0.8, 0.5));
        // 生値0.6に対しEMAは途中まで
        assert!(metrics.distance > 0.2 && metrics.distance < 0.6);
    }

    #[test]
    fn test_two_hand_reset() {
        let mut tracker = TwoHandTracker::new(0.3);
        tracker.update(&wrist_at(0.4, 0.5), &wrist_at(0.6, 0.5));
        tracker.reset();
        let (_, deltas) = tracker.update(&wrist_at(0.1, 0.5), &wrist_at(0.9, 0.5));
        // リセット後は初回扱いで差分ゼロ
        assert_eq!(deltas, TwoHandDeltas::default());
    }
}
