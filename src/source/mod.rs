pub mod bridge;
pub mod slot;
pub mod webcam;

pub use bridge::BridgeSource;
pub use slot::FrameSlot;
pub use webcam::WebcamSource;

use crate::hand::HandSnapshot;

/// 正準化された1フレーム分の検出結果。手は0〜2本
#[derive(Debug, Clone)]
pub struct CanonicalFrame {
    pub hands: Vec<HandSnapshot>,
    /// 秒単位タイムスタンプ（ソースのクロック基準で単調増加）
    pub timestamp_secs: f64,
}

impl CanonicalFrame {
    pub fn empty(timestamp_secs: f64) -> Self {
        Self {
            hands: Vec::new(),
            timestamp_secs,
        }
    }
}

/// ランドマークソースの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Webcam,
    PhoneBridge,
}

/// セッションごとに1つ選択されるランドマークソース
///
/// 2つのソースを混合することはない。フレームが無ければ None
/// （poll はノンブロッキングで、呼び出し側のフレームループから
/// tick ごとに1回呼ばれる）。
pub trait LandmarkSource {
    fn kind(&self) -> SourceKind;

    /// 未消費の最新フレームがあれば返す
    fn poll(&mut self) -> Option<CanonicalFrame>;

    /// 保持状態をすべて破棄する（トラッキング無効化・ソース切替時）
    fn reset(&mut self);
}
