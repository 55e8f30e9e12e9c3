use serde::Deserialize;
use tracing::debug;

use crate::hand::{HandJointIndex, HandSnapshot, Handedness, Landmark, LandmarkSet};
use crate::source::slot::FrameSlot;
use crate::source::{CanonicalFrame, LandmarkSource, SourceKind};

/// Webcam推定器が1フレームごとに渡してくる生の検出結果
///
/// ランドマークは画像空間 [0,1] の連続配列、深度は物理単位なしの推定値。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebcamResults {
    #[serde(rename = "multiHandLandmarks", default)]
    pub multi_hand_landmarks: Vec<Vec<RawPoint>>,
    #[serde(rename = "multiHandedness", default)]
    pub multi_handedness: Vec<RawHandedness>,
    #[serde(rename = "multiHandWorldLandmarks", default)]
    pub multi_hand_world_landmarks: Vec<Vec<RawPoint>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub visibility: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHandedness {
    pub label: String,
    #[serde(default)]
    pub score: f32,
}

/// 生の21点配列を正準ランドマーク集合へ変換
///
/// 短い/欠損配列は中立デフォルトで埋める。失敗はさせない
fn canonicalize_points(points: &[RawPoint]) -> LandmarkSet {
    let mut set = [Landmark::neutral(); HandJointIndex::COUNT];
    for (i, p) in points.iter().take(HandJointIndex::COUNT).enumerate() {
        set[i] = Landmark::with_visibility(p.x, p.y, p.z, p.visibility.unwrap_or(1.0));
    }
    LandmarkSet::new(set, false)
}

/// Webcamフレームを正準フレームへ変換
///
/// 推定ライブラリはミラー画像基準のラベルを返すため左右を反転する。
/// 手は最大2本。ランドマークが空の手は「未検出」として落とす
pub fn canonicalize(results: &WebcamResults, timestamp_secs: f64) -> CanonicalFrame {
    let mut hands = Vec::with_capacity(2);

    for (i, points) in results.multi_hand_landmarks.iter().take(2).enumerate() {
        if points.is_empty() {
            debug!("webcam hand {} has no landmarks, dropping", i);
            continue;
        }

        let handedness = results
            .multi_handedness
            .get(i)
            .and_then(|h| Handedness::parse(&h.label))
            .map(|h| h.flipped())
            .unwrap_or(Handedness::Right);

        let landmarks = canonicalize_points(points);
        let world_landmarks = results
            .multi_hand_world_landmarks
            .get(i)
            .filter(|w| !w.is_empty())
            .map(|w| canonicalize_points(w))
            .unwrap_or_else(|| landmarks.clone());

        hands.push(HandSnapshot::new(landmarks, world_landmarks, handedness));
    }

    CanonicalFrame {
        hands,
        timestamp_secs,
    }
}

/// Webcamソース
///
/// センサーコールバック側が ingest() で最新フレームを書き込み、
/// パイプラインが poll() で未消費フレームを取り出す。
pub struct WebcamSource {
    slot: FrameSlot,
    last_seen: u64,
}

impl WebcamSource {
    pub fn new() -> Self {
        Self {
            slot: FrameSlot::new(),
            last_seen: 0,
        }
    }

    /// コールバック側へ渡すプロデューサハンドル
    pub fn producer(&self) -> FrameSlot {
        self.slot.clone()
    }

    /// 推定結果1フレームを取り込む
    pub fn ingest(&self, results: &WebcamResults, timestamp_secs: f64) {
        self.slot.push(canonicalize(results, timestamp_secs));
    }
}

impl Default for WebcamSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkSource for WebcamSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Webcam
    }

    fn poll(&mut self) -> Option<CanonicalFrame> {
        let (id, frame) = self.slot.poll_newer(self.last_seen)?;
        self.last_seen = id;
        Some(frame)
    }

    fn reset(&mut self) {
        self.slot.clear();
        self.last_seen = self.slot.frame_id();
    }
}
