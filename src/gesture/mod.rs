//! ジェスチャ認識: ランドマークからの強度計算と状態機械

pub mod metrics;
pub mod state;

pub use metrics::{
    compute_hand_metrics, HandMetrics, TwoHandDeltas, TwoHandMetrics, TwoHandTracker,
};
pub use state::{
    GestureStateMachine, HandInput, Hysteresis, LockMode, LockState, MachineInput, MachineOutput,
};
