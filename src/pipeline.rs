//! フレーム単位のジェスチャパイプライン
//!
//! 正規化フレームを受け取り、メトリクス計算 → レイ推定 → ヒットテスト →
//! 状態機械の順で処理して1tick分のジェスチャ状態を返す

use tracing::debug;

use crate::arm::{RayEstimator, StableRay};
use crate::config::Config;
use crate::gesture::{
    compute_hand_metrics, GestureStateMachine, HandInput, HandMetrics, LockMode, LockState,
    MachineInput, MachineOutput, TwoHandMetrics, TwoHandTracker,
};
use crate::hand::{HandSnapshot, Handedness};
use crate::hit::{find_node_hit, NodeHit, NodeId, NodeSphere};
use crate::source::CanonicalFrame;

/// 1tick分の片手状態
#[derive(Debug, Clone)]
pub struct HandState {
    pub handedness: Handedness,
    pub metrics: HandMetrics,
    pub ray: StableRay,
    pub hit: Option<NodeHit>,
}

/// パイプラインの1tick出力
#[derive(Debug, Clone)]
pub struct GestureState {
    pub left: Option<HandState>,
    pub right: Option<HandState>,
    pub two_hand: Option<TwoHandMetrics>,
    pub lock: LockState,
    pub events: MachineOutput,
    pub timestamp_secs: f64,
}

impl GestureState {
    fn idle(timestamp_secs: f64, lock: LockState) -> Self {
        Self {
            left: None,
            right: None,
            two_hand: None,
            lock,
            events: MachineOutput::default(),
            timestamp_secs,
        }
    }
}

fn slot(handedness: Handedness) -> usize {
    match handedness {
        Handedness::Left => 0,
        Handedness::Right => 1,
    }
}

/// ジェスチャパイプライン本体
///
/// レイ推定器は手スロットごとに遅延生成し、手のロストで破棄する。
/// ノード球はヒットテスト対象のシーンとして外部から与えられる
pub struct GesturePipeline {
    config: Config,
    enabled: bool,
    nodes: Vec<NodeSphere>,
    estimators: [Option<RayEstimator>; 2],
    two_hand: TwoHandTracker,
    machine: GestureStateMachine,
}

impl GesturePipeline {
    pub fn new(config: Config) -> Self {
        let two_hand = TwoHandTracker::new(config.gesture.two_hand_smoothing);
        let machine = GestureStateMachine::new(config.gesture.clone());
        Self {
            config,
            enabled: true,
            nodes: Vec::new(),
            estimators: [None, None],
            two_hand,
            machine,
        }
    }

    /// ヒットテスト対象のシーンを差し替える
    pub fn set_nodes(&mut self, nodes: Vec<NodeSphere>) {
        self.nodes = nodes;
    }

    pub fn nodes(&self) -> &[NodeSphere] {
        &self.nodes
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// トラッキング有効/無効の切替。無効化は全状態を消去する
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.clear();
        }
        self.enabled = enabled;
    }

    /// ソース切替時などの完全リセット
    pub fn reset(&mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        self.machine.reset();
        self.estimators = [None, None];
        self.two_hand.reset();
    }

    fn node_center(&self, id: NodeId) -> Option<nalgebra::Vector3<f32>> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.center)
    }

    /// 各スロットの最初の手を採用する。3本目以降は無視
    fn split_hands<'a>(
        &self,
        frame: &'a CanonicalFrame,
    ) -> [Option<&'a HandSnapshot>; 2] {
        let mut slots: [Option<&HandSnapshot>; 2] = [None, None];
        for hand in &frame.hands {
            let i = slot(hand.handedness);
            if slots[i].is_none() {
                slots[i] = Some(hand);
            } else {
                debug!("duplicate {} hand dropped", hand.handedness.as_str());
            }
        }
        slots
    }

    /// 1フレーム処理する
    pub fn process(&mut self, frame: &CanonicalFrame) -> GestureState {
        if !self.enabled {
            return GestureState::idle(frame.timestamp_secs, self.machine.lock_state());
        }

        let slots = self.split_hands(frame);

        // 手ごとの計測とレイ推定。ロストしたスロットは推定器ごと破棄
        let mut states: [Option<HandState>; 2] = [None, None];
        let Self {
            config,
            nodes,
            estimators,
            ..
        } = self;
        for (i, snapshot) in slots.iter().enumerate() {
            match snapshot {
                Some(hand) => {
                    let estimator = estimators[i].get_or_insert_with(|| {
                        RayEstimator::new(&config.filter, &config.gesture)
                    });
                    let metrics = compute_hand_metrics(hand);
                    let ray =
                        estimator.estimate(hand, metrics.pinch_strength, frame.timestamp_secs);
                    let hit = find_node_hit(
                        ray.origin,
                        ray.direction,
                        nodes,
                        config.gesture.max_hit_distance,
                    );
                    states[i] = Some(HandState {
                        handedness: hand.handedness,
                        metrics,
                        ray,
                        hit,
                    });
                }
                None => {
                    if estimators[i].take().is_some() {
                        debug!("hand slot {} lost, estimator dropped", i);
                    }
                }
            }
        }

        // 両手トラッキング
        let two_hand = match (slots[0], slots[1]) {
            (Some(left), Some(right)) => Some(self.two_hand.update(left, right)),
            _ => {
                self.two_hand.reset();
                None
            }
        };

        let machine_input = MachineInput {
            left: states[0].as_ref().map(|s| self.hand_input(s)),
            right: states[1].as_ref().map(|s| self.hand_input(s)),
            two_hand_deltas: two_hand.map(|(_, deltas)| deltas),
            timestamp_secs: frame.timestamp_secs,
        };
        let events = self.machine.update(&machine_input);
        if events.filters_cleared {
            self.estimators = [None, None];
            self.two_hand.reset();
        }

        // グラブ中の移動をシーンに反映
        if let Some((id, position)) = events.grab_update {
            if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
                node.center = position;
            }
        }

        let lock = self.machine.lock_state();
        if let Some(handedness) = lock.hand {
            let active = !matches!(lock.mode, LockMode::Idle | LockMode::TwoHand);
            if let Some(state) = states[slot(handedness)].as_mut() {
                state.ray.is_active = active;
            }
        }

        let [left, right] = states;
        GestureState {
            left,
            right,
            two_hand: two_hand.map(|(metrics, _)| metrics),
            lock,
            events,
            timestamp_secs: frame.timestamp_secs,
        }
    }

    fn hand_input(&self, state: &HandState) -> HandInput {
        HandInput {
            pinch: state.metrics.pinch_strength,
            grab: state.metrics.grab_strength,
            point: state.metrics.point_strength,
            pinch_point: state.ray.pinch_point,
            hit: state.hit.map(|h| h.node_id),
            hit_center: state.hit.and_then(|h| self.node_center(h.node_id)),
        }
    }
}
