use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::hand::{HandJointIndex, HandSnapshot, Handedness, Landmark, LandmarkSet};
use crate::protocol::{BridgeHand, BridgeMessage, BridgeStatus};
use crate::source::slot::FrameSlot;
use crate::source::{CanonicalFrame, LandmarkSource, SourceKind};

/// 関節名 → インデックスの対応表
///
/// 電話側アプリには2つの命名規約が観測されている:
/// camelCase（"indexTip"）と MediaPipe 式 snake_case（"index_finger_tip"）。
/// 両方を受け付ける
fn joint_from_name(name: &str) -> Option<HandJointIndex> {
    use HandJointIndex::*;
    match name {
        "wrist" => Some(Wrist),
        "thumbCMC" | "thumb_cmc" => Some(ThumbCmc),
        "thumbMCP" | "thumb_mcp" => Some(ThumbMcp),
        "thumbIP" | "thumb_ip" => Some(ThumbIp),
        "thumbTip" | "thumb_tip" => Some(ThumbTip),
        "indexMCP" | "index_finger_mcp" => Some(IndexMcp),
        "indexPIP" | "index_finger_pip" => Some(IndexPip),
        "indexDIP" | "index_finger_dip" => Some(IndexDip),
        "indexTip" | "index_finger_tip" => Some(IndexTip),
        "middleMCP" | "middle_finger_mcp" => Some(MiddleMcp),
        "middlePIP" | "middle_finger_pip" => Some(MiddlePip),
        "middleDIP" | "middle_finger_dip" => Some(MiddleDip),
        "middleTip" | "middle_finger_tip" => Some(MiddleTip),
        "ringMCP" | "ring_finger_mcp" => Some(RingMcp),
        "ringPIP" | "ring_finger_pip" => Some(RingPip),
        "ringDIP" | "ring_finger_dip" => Some(RingDip),
        "ringTip" | "ring_finger_tip" => Some(RingTip),
        "pinkyMCP" | "pinky_mcp" => Some(PinkyMcp),
        "pinkyPIP" | "pinky_pip" => Some(PinkyPip),
        "pinkyDIP" | "pinky_dip" => Some(PinkyDip),
        "pinkyTip" | "pinky_tip" => Some(PinkyTip),
        _ => None,
    }
}

/// LiDARのメートル深度をWebcamソースと同じ相対スケールへ変換
///
/// 約1mを中立(0)とし、近いほど正・遠いほど負。±0.5でクランプ
pub fn normalize_lidar_depth(depth_meters: f32) -> f32 {
    ((1.0 - depth_meters) * 0.2).clamp(-0.5, 0.5)
}

/// 電話ブリッジの1手分を正準スナップショットへ変換
///
/// 欠損関節は中立デフォルト。認識可能な関節が1つも無ければ None
/// （「手は検出されなかった」扱い）
fn canonicalize_hand(hand: &BridgeHand) -> Option<HandSnapshot> {
    let mut points = [Landmark::neutral(); HandJointIndex::COUNT];
    let mut recognized = 0usize;

    for (name, p) in &hand.landmarks {
        let Some(joint) = joint_from_name(name) else {
            debug!("bridge: unknown joint name '{}'", name);
            continue;
        };
        let z = if hand.has_lidar_depth {
            normalize_lidar_depth(p.z)
        } else {
            p.z
        };
        points[joint as usize] = Landmark::new(p.x, p.y, z);
        recognized += 1;
    }

    if recognized == 0 {
        return None;
    }

    let handedness = Handedness::parse(&hand.handedness).unwrap_or(Handedness::Right);
    let landmarks = LandmarkSet::new(points, hand.has_lidar_depth);
    // 電話側は単一座標系のみ提供するためワールド系も同一集合
    let world_landmarks = landmarks.clone();
    Some(HandSnapshot::new(landmarks, world_landmarks, handedness))
}

/// hand_tracking メッセージを正準フレームへ変換
pub fn canonicalize(hands: &[BridgeHand], frame_timestamp: f64) -> CanonicalFrame {
    let hands = hands.iter().take(2).filter_map(canonicalize_hand).collect();
    CanonicalFrame {
        hands,
        timestamp_secs: frame_timestamp,
    }
}

/// トランスポートタスク側へ渡すプロデューサハンドル
#[derive(Clone)]
pub struct BridgeIngest {
    slot: FrameSlot,
    status: Arc<Mutex<BridgeStatus>>,
}

impl BridgeIngest {
    /// 中継チャネルからのメッセージ1件を処理する
    pub fn handle_message(&self, msg: &BridgeMessage) {
        match msg {
            BridgeMessage::HandTracking {
                hands,
                frame_timestamp,
            } => {
                self.slot.push(canonicalize(hands, *frame_timestamp));
            }
            BridgeMessage::Status {
                phone_connected,
                ips,
                phone_port,
            } => {
                let mut status = self.status.lock().unwrap();
                status.phone_connected = *phone_connected;
                status.ips = ips.clone();
                status.phone_port = *phone_port;
            }
        }
    }

    /// 中継チャネルの生テキスト1行を処理。不正な行は黙って捨てる
    pub fn handle_line(&self, line: &str) {
        match crate::protocol::parse_message(line) {
            Some(msg) => self.handle_message(&msg),
            None => debug!("bridge: ignoring malformed line ({} bytes)", line.len()),
        }
    }
}

/// 電話ブリッジソース
pub struct BridgeSource {
    slot: FrameSlot,
    status: Arc<Mutex<BridgeStatus>>,
    last_seen: u64,
}

impl BridgeSource {
    pub fn new() -> Self {
        Self {
            slot: FrameSlot::new(),
            status: Arc::new(Mutex::new(BridgeStatus::default())),
            last_seen: 0,
        }
    }

    pub fn producer(&self) -> BridgeIngest {
        BridgeIngest {
            slot: self.slot.clone(),
            status: self.status.clone(),
        }
    }

    /// UI表示用の接続状態スナップショット
    pub fn status(&self) -> BridgeStatus {
        self.status.lock().unwrap().clone()
    }
}

impl Default for BridgeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkSource for BridgeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::PhoneBridge
    }

    fn poll(&mut self) -> Option<CanonicalFrame> {
        let (id, frame) = self.slot.poll_newer(self.last_seen)?;
        self.last_seen = id;
        Some(frame)
    }

    fn reset(&mut self) {
        self.slot.clear();
        self.last_seen = self.slot.frame_id();
        let mut status = self.status.lock().unwrap();
        status.phone_connected = false;
    }
}
