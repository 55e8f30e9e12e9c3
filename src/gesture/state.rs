use nalgebra::Vector3;
use tracing::debug;

use crate::config::GestureConfig;
use crate::gesture::metrics::TwoHandDeltas;
use crate::hand::Handedness;
use crate::hit::NodeId;

/// 2閾値ヒステリシス。境界付近のチャタリングを防ぐ
///
/// 係合は engage を上回った瞬間、解放は release を下回った瞬間に
/// それぞれ一度だけエッジを返す（レベルトリガではない）
pub struct Hysteresis {
    engage: f32,
    release: f32,
    engaged: bool,
}

/// ヒステリシスのエッジイベント
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HysteresisEdge {
    Engaged,
    Released,
}

impl Hysteresis {
    pub fn new(engage: f32, release: f32) -> Self {
        Self {
            engage,
            release,
            engaged: false,
        }
    }

    pub fn update(&mut self, value: f32) -> Option<HysteresisEdge> {
        if !self.engaged && value > self.engage {
            self.engaged = true;
            Some(HysteresisEdge::Engaged)
        } else if self.engaged && value < self.release {
            self.engaged = false;
            Some(HysteresisEdge::Released)
        } else {
            None
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn reset(&mut self) {
        self.engaged = false;
    }
}

/// 状態機械のモード
///
/// GrabStarting は変位原点をキャプチャする明示的な遷移サブ状態。
/// 「1フレームだけ差分をスキップ」を一回限りフラグで表現しない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Idle,
    Aiming,
    Locked,
    GrabStarting,
    Grabbed,
    TwoHand,
}

/// レンダラ側が読み取り専用で消費するロック状態スナップショット
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockState {
    pub mode: LockMode,
    pub hand: Option<Handedness>,
    pub grab_node: Option<NodeId>,
}

/// 1tick分の片手入力
#[derive(Debug, Clone, Copy)]
pub struct HandInput {
    pub pinch: f32,
    pub grab: f32,
    pub point: f32,
    pub pinch_point: Vector3<f32>,
    /// この手のレイ直下のノード
    pub hit: Option<NodeId>,
    pub hit_center: Option<Vector3<f32>>,
}

/// 1tick分の状態機械入力
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineInput {
    pub left: Option<HandInput>,
    pub right: Option<HandInput>,
    /// 両手が揃ったフレームのみ（パイプラインが計算済み）
    pub two_hand_deltas: Option<TwoHandDeltas>,
    pub timestamp_secs: f64,
}

impl MachineInput {
    fn hand(&self, handedness: Handedness) -> Option<&HandInput> {
        match handedness {
            Handedness::Left => self.left.as_ref(),
            Handedness::Right => self.right.as_ref(),
        }
    }
}

/// 1tick分の出力イベント。すべてエッジトリガ
#[derive(Debug, Clone, Copy, Default)]
pub struct MachineOutput {
    /// ピンチ係合（押下）。押下時にレイ直下だったノード
    pub pressed: bool,
    pub press_node: Option<NodeId>,
    /// ピンチ解放
    pub released: bool,
    /// 押下と解放が同一ノード上 → 選択確定
    pub selected: Option<NodeId>,
    /// グラブ中のノード新位置（変位ベース）
    pub grab_update: Option<(NodeId, Vector3<f32>)>,
    /// 両手複合操作の操作量
    pub two_hand: Option<TwoHandDeltas>,
    /// 呼び出し側はフィルタバンクを全消去すること
    pub filters_cleared: bool,
}

/// ジェスチャ状態機械 (idle → aiming → locked → grabbed)
pub struct GestureStateMachine {
    config: GestureConfig,
    mode: LockMode,
    committed: Option<Handedness>,
    aim_started: Option<f64>,
    pinch: Hysteresis,
    press_node: Option<NodeId>,
    grab_node: Option<NodeId>,
    grab_object_origin: Vector3<f32>,
    grab_pinch_origin: Vector3<f32>,
}

impl GestureStateMachine {
    pub fn new(config: GestureConfig) -> Self {
        let pinch = Hysteresis::new(config.pinch_threshold, config.release_threshold);
        Self {
            config,
            mode: LockMode::Idle,
            committed: None,
            aim_started: None,
            pinch,
            press_node: None,
            grab_node: None,
            grab_object_origin: Vector3::zeros(),
            grab_pinch_origin: Vector3::zeros(),
        }
    }

    pub fn lock_state(&self) -> LockState {
        LockState {
            mode: self.mode,
            hand: self.committed,
            grab_node: self.grab_node,
        }
    }

    /// idle に戻してロック・ヒステリシス状態を全消去
    fn to_idle(&mut self, out: &mut MachineOutput) {
        if self.mode != LockMode::Idle {
            debug!("gesture: {:?} -> Idle", self.mode);
        }
        self.mode = LockMode::Idle;
        self.committed = None;
        self.aim_started = None;
        self.pinch.reset();
        self.press_node = None;
        self.grab_node = None;
        out.filters_cleared = true;
    }

    /// 両手同時ピンチが成立しているか
    fn both_hands_pinching(&self, input: &MachineInput) -> bool {
        match (&input.left, &input.right) {
            (Some(l), Some(r)) => {
                if self.mode == LockMode::TwoHand {
                    // 保持中は解放閾値まで許容（ヒステリシス）
                    l.pinch > self.config.release_threshold
                        && r.pinch > self.config.release_threshold
                } else {
                    l.pinch > self.config.pinch_threshold
                        && r.pinch > self.config.pinch_threshold
                }
            }
            _ => false,
        }
    }

    pub fn update(&mut self, input: &MachineInput) -> MachineOutput {
        let mut out = MachineOutput::default();

        // 両手複合モードは片手ロックより優先
        if self.both_hands_pinching(input) {
            if self.mode != LockMode::TwoHand {
                // 進行中のグラブ・ロックを先にキャンセルしてから入る
                self.to_idle(&mut out);
                self.mode = LockMode::TwoHand;
                debug!("gesture: Idle -> TwoHand");
            }
            out.two_hand = input.two_hand_deltas;
            return out;
        }
        if self.mode == LockMode::TwoHand {
            self.to_idle(&mut out);
            return out;
        }

        match self.mode {
            LockMode::Idle => {
                // ポイント姿勢の強い方の手にコミット
                let mut best: Option<(Handedness, f32)> = None;
                for (handedness, hand) in [
                    (Handedness::Left, &input.left),
                    (Handedness::Right, &input.right),
                ] {
                    if let Some(h) = hand {
                        if h.point > self.config.point_threshold
                            && best.map_or(true, |(_, p)| h.point > p)
                        {
                            best = Some((handedness, h.point));
                        }
                    }
                }
                if let Some((handedness, _)) = best {
                    self.committed = Some(handedness);
                    self.aim_started = Some(input.timestamp_secs);
                    self.mode = LockMode::Aiming;
                    debug!("gesture: Idle -> Aiming ({})", handedness.as_str());
                }
            }

            LockMode::Aiming => {
                let committed = self.committed.expect("aiming without committed hand");
                match input.hand(committed) {
                    None => self.to_idle(&mut out),
                    Some(hand) if hand.point < self.config.point_release => self.to_idle(&mut out),
                    Some(_) => {
                        let dwell = self.config.lock_dwell_ms as f64 / 1000.0;
                        if input.timestamp_secs - self.aim_started.unwrap_or(input.timestamp_secs)
                            >= dwell
                        {
                            self.mode = LockMode::Locked;
                            debug!("gesture: Aiming -> Locked");
                        }
                    }
                }
            }

            LockMode::Locked => {
                let committed = self.committed.expect("locked without committed hand");
                match input.hand(committed) {
                    None => self.to_idle(&mut out),
                    Some(hand) => {
                        let hand = *hand;
                        match self.pinch.update(hand.pinch) {
                            Some(HysteresisEdge::Engaged) => {
                                out.pressed = true;
                                out.press_node = hand.hit;
                                self.press_node = hand.hit;
                            }
                            Some(HysteresisEdge::Released) => {
                                out.released = true;
                                // 押下時と同一ノード上でのみ選択確定
                                if self.press_node.is_some() && self.press_node == hand.hit {
                                    out.selected = self.press_node;
                                }
                                self.press_node = None;
                            }
                            None => {}
                        }

                        if hand.grab > self.config.grab_threshold {
                            // 変位原点のキャプチャはこの遷移の仕事
                            if let (Some(node), Some(center)) = (hand.hit, hand.hit_center) {
                                self.grab_node = Some(node);
                                self.grab_object_origin = center;
                                self.grab_pinch_origin = hand.pinch_point;
                                self.mode = LockMode::GrabStarting;
                                debug!("gesture: Locked -> GrabStarting (node {})", node);
                            }
                        } else if hand.point < self.config.point_release
                            && !self.pinch.is_engaged()
                        {
                            self.to_idle(&mut out);
                        }
                    }
                }
            }

            LockMode::GrabStarting | LockMode::Grabbed => {
                let committed = self.committed.expect("grab without committed hand");
                match input.hand(committed) {
                    None => self.to_idle(&mut out),
                    Some(hand) if hand.grab < self.config.grab_release => self.to_idle(&mut out),
                    Some(hand) => {
                        // 変位ベースドラッグ: origin + (現在ピンチ点 - 開始ピンチ点)
                        let node = self.grab_node.expect("grab mode without node");
                        let position =
                            self.grab_object_origin + (hand.pinch_point - self.grab_pinch_origin);
                        out.grab_update = Some((node, position));
                        self.mode = LockMode::Grabbed;
                    }
                }
            }

            LockMode::TwoHand => unreachable!("handled above"),
        }

        out
    }

    /// 外部からの強制リセット（トラッキング無効化・ソース切替）
    pub fn reset(&mut self) -> MachineOutput {
        let mut out = MachineOutput::default();
        self.to_idle(&mut out);
        out
    }
}
