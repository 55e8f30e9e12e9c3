use nalgebra::Vector3;

/// Low-pass filter component
struct LowPassFilter {
    prev: Option<f32>,
}

impl LowPassFilter {
    fn new() -> Self {
        Self { prev: None }
    }

    fn filter(&mut self, value: f32, alpha: f32) -> f32 {
        match self.prev {
            Some(prev) => {
                let result = alpha * value + (1.0 - alpha) * prev;
                self.prev = Some(result);
                result
            }
            None => {
                self.prev = Some(value);
                value
            }
        }
    }

    fn last(&self) -> Option<f32> {
        self.prev
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}

/// alpha = 1 / (1 + tau/Te), tau = 1/(2*pi*fc)
fn smoothing_factor(te: f32, cutoff: f32) -> f32 {
    let r = 2.0 * std::f32::consts::PI * cutoff * te;
    r / (r + 1.0)
}

/// 1スカラーチャンネル用 One Euro Filter
///
/// タイムスタンプは秒単位で単調増加していること。
/// dt <= 0 のフレームは no-op（前回出力を返す）で、NaN を伝播させない。
pub struct OneEuroFilter {
    min_cutoff: f32,
    beta: f32,
    d_cutoff: f32,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    prev_value: Option<f32>,
    prev_time: Option<f64>,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            x_filter: LowPassFilter::new(),
            dx_filter: LowPassFilter::new(),
            prev_value: None,
            prev_time: None,
        }
    }

    pub fn filter(&mut self, value: f32, timestamp_secs: f64) -> f32 {
        let (prev_value, prev_time) = match (self.prev_value, self.prev_time) {
            (Some(v), Some(t)) => (v, t),
            _ => {
                // 初回はそのまま通して状態をシード
                self.prev_value = Some(value);
                self.prev_time = Some(timestamp_secs);
                self.x_filter.filter(value, 1.0);
                self.dx_filter.filter(0.0, 1.0);
                return value;
            }
        };

        let dt = (timestamp_secs - prev_time) as f32;
        if dt <= 0.0 {
            // 逆行・重複タイムスタンプ: 前回出力を返す
            return self.x_filter.last().unwrap_or(prev_value);
        }

        self.prev_value = Some(value);
        self.prev_time = Some(timestamp_secs);

        let dx = (value - prev_value) / dt;
        let edx = self.dx_filter.filter(dx, smoothing_factor(dt, self.d_cutoff));
        // 速度適応カットオフ: 速い動きほど平滑化を弱めて追従させる
        let cutoff = self.min_cutoff + self.beta * edx.abs();
        self.x_filter.filter(value, smoothing_factor(dt, cutoff))
    }

    /// 状態を完全にクリア。次の filter() は初回扱いになる
    pub fn reset(&mut self) {
        self.x_filter.reset();
        self.dx_filter.reset();
        self.prev_value = None;
        self.prev_time = None;
    }
}

/// x/y/z に独立な OneEuroFilter を適用する3Dラッパー
pub struct Point3Filter {
    channels: [OneEuroFilter; 3],
}

impl Point3Filter {
    pub fn new(min_cutoff: f32, beta: f32, d_cutoff: f32) -> Self {
        Self {
            channels: std::array::from_fn(|_| OneEuroFilter::new(min_cutoff, beta, d_cutoff)),
        }
    }

    pub fn filter(&mut self, point: Vector3<f32>, timestamp_secs: f64) -> Vector3<f32> {
        Vector3::new(
            self.channels[0].filter(point.x, timestamp_secs),
            self.channels[1].filter(point.y, timestamp_secs),
            self.channels[2].filter(point.z, timestamp_secs),
        )
    }

    pub fn reset(&mut self) {
        for c in &mut self.channels {
            c.reset();
        }
    }
}
