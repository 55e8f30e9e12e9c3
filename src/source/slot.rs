use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::source::CanonicalFrame;

/// 最新フレーム1枚だけを保持するスロット
///
/// プロデューサ（センサーコールバック）が push し、コンシューマが
/// フレームIDで新着を判定して取り出す。キューイングはしない:
/// 古いフレームは新しいフレームで単純に上書きされる。
#[derive(Clone)]
pub struct FrameSlot {
    latest: Arc<Mutex<Option<CanonicalFrame>>>,
    frame_id: Arc<AtomicU64>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            frame_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 新フレームを格納。以前のフレームは破棄される
    pub fn push(&self, frame: CanonicalFrame) {
        *self.latest.lock().unwrap() = Some(frame);
        self.frame_id.fetch_add(1, Ordering::Release);
    }

    /// 現在のフレームID。新フレーム到着ごとにインクリメントされる
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    /// last_seen より新しいフレームがあれば (id, frame) を返す
    pub fn poll_newer(&self, last_seen: u64) -> Option<(u64, CanonicalFrame)> {
        let id = self.frame_id();
        if id == last_seen {
            return None;
        }
        let guard = self.latest.lock().unwrap();
        guard.as_ref().map(|f| (id, f.clone()))
    }

    /// スロットを空に戻す（トラッキング無効化時）
    pub fn clear(&self) {
        *self.latest.lock().unwrap() = None;
        self.frame_id.fetch_add(1, Ordering::Release);
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}
