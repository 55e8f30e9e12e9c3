/// MediaPipe Hands 互換の21関節インデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandJointIndex {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandJointIndex {
    pub const COUNT: usize = 21;

    pub fn from_index(index: usize) -> Option<Self> {
        use HandJointIndex::*;
        const ALL: [HandJointIndex; HandJointIndex::COUNT] = [
            Wrist, ThumbCmc, ThumbMcp, ThumbIp, ThumbTip, IndexMcp, IndexPip, IndexDip, IndexTip,
            MiddleMcp, MiddlePip, MiddleDip, MiddleTip, RingMcp, RingPip, RingDip, RingTip,
            PinkyMcp, PinkyPip, PinkyDip, PinkyTip,
        ];
        ALL.get(index).copied()
    }

    /// 5指の指先
    pub fn fingertips() -> [HandJointIndex; 5] {
        [
            Self::ThumbTip,
            Self::IndexTip,
            Self::MiddleTip,
            Self::RingTip,
            Self::PinkyTip,
        ]
    }
}

/// 単一関節の正規化座標
///
/// x, y はカメラ画像空間 0.0〜1.0。z はソース依存のスケール
/// （Webcam: 推定深度、LiDAR: メートル深度を相対スケールへ変換済み）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// 可視性スコア (0.0〜1.0)。提供しないソースは1.0を入れる
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: 1.0,
        }
    }

    pub fn with_visibility(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// 欠損関節の中立デフォルト（画面中央・深度0・可視性0）
    pub fn neutral() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            z: 0.0,
            visibility: 0.0,
        }
    }

    pub fn distance_to(&self, other: &Landmark) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self::neutral()
    }
}

/// 21関節からなる正準ランドマーク集合。フレームごとに不変
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    pub points: [Landmark; HandJointIndex::COUNT],
    /// 深度が物理単位（LiDAR由来）か推定値か
    pub has_metric_depth: bool,
}

impl LandmarkSet {
    pub fn new(points: [Landmark; HandJointIndex::COUNT], has_metric_depth: bool) -> Self {
        Self {
            points,
            has_metric_depth,
        }
    }

    pub fn get(&self, index: HandJointIndex) -> &Landmark {
        &self.points[index as usize]
    }

    /// 全関節の平均可視性
    pub fn average_visibility(&self) -> f32 {
        let sum: f32 = self.points.iter().map(|p| p.visibility).sum();
        sum / HandJointIndex::COUNT as f32
    }
}

impl Default for LandmarkSet {
    fn default() -> Self {
        Self {
            points: [Landmark::neutral(); HandJointIndex::COUNT],
            has_metric_depth: false,
        }
    }
}

/// 左右の別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// ミラー表示のソースが返すラベルの反転
    pub fn flipped(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// 処理済みフレーム中の片手分のスナップショット
#[derive(Debug, Clone)]
pub struct HandSnapshot {
    pub landmarks: LandmarkSet,
    pub world_landmarks: LandmarkSet,
    pub handedness: Handedness,
}

impl HandSnapshot {
    pub fn new(landmarks: LandmarkSet, world_landmarks: LandmarkSet, handedness: Handedness) -> Self {
        Self {
            landmarks,
            world_landmarks,
            handedness,
        }
    }

    pub fn joint(&self, index: HandJointIndex) -> &Landmark {
        self.landmarks.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_index_count() {
        assert_eq!(HandJointIndex::COUNT, 21);
    }

    #[test]
    fn test_joint_index_from_index() {
        assert_eq!(HandJointIndex::from_index(0), Some(HandJointIndex::Wrist));
        assert_eq!(HandJointIndex::from_index(4), Some(HandJointIndex::ThumbTip));
        assert_eq!(HandJointIndex::from_index(20), Some(HandJointIndex::PinkyTip));
        assert_eq!(HandJointIndex::from_index(21), None);
    }

    #[test]
    fn test_fingertips() {
        let tips = HandJointIndex::fingertips();
        assert_eq!(tips.len(), 5);
        assert_eq!(tips[0], HandJointIndex::ThumbTip);
        assert_eq!(tips[4], HandJointIndex::PinkyTip);
    }

    #[test]
    fn test_landmark_distance() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_neutral_landmark() {
        let n = Landmark::neutral();
        assert_eq!(n.x, 0.5);
        assert_eq!(n.y, 0.5);
        assert_eq!(n.visibility, 0.0);
    }

    #[test]
    fn test_set_average_visibility() {
        let mut points = [Landmark::neutral(); HandJointIndex::COUNT];
        for p in points.iter_mut() {
            p.visibility = 0.5;
        }
        let set = LandmarkSet::new(points, false);
        assert!((set.average_visibility() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_handedness_flipped() {
        assert_eq!(Handedness::Left.flipped(), Handedness::Right);
        assert_eq!(Handedness::Right.flipped(), Handedness::Left);
    }

    #[test]
    fn test_handedness_parse() {
        assert_eq!(Handedness::parse("Left"), Some(Handedness::Left));
        assert_eq!(Handedness::parse("right"), Some(Handedness::Right));
        assert_eq!(Handedness::parse("both"), None);
    }
}
