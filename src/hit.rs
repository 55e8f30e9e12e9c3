use nalgebra::Vector3;

/// グラフノードのID（シーン側が採番）
pub type NodeId = u64;

/// シーン側から毎フレーム供給される対話ターゲット球の読み取り専用スナップショット
#[derive(Debug, Clone, Copy)]
pub struct NodeSphere {
    pub id: NodeId,
    pub center: Vector3<f32>,
    pub radius: f32,
}

/// 最近傍ヒットの結果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeHit {
    pub node_id: NodeId,
    /// レイ原点からの距離
    pub distance: f32,
    pub point: Vector3<f32>,
}

/// レイ・球の解析的交差判定。最近傍ヒットを返す
///
/// 毎フレーム数百ターゲットに対して走るためホットパスでは確保しない。
/// direction は単位ベクトル前提（a = 1 として二次方程式を解く）
pub fn find_node_hit(
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    spheres: &[NodeSphere],
    max_distance: f32,
) -> Option<NodeHit> {
    let mut best: Option<(f32, &NodeSphere)> = None;

    for sphere in spheres {
        let oc = origin - sphere.center;
        let b = 2.0 * oc.dot(&direction);
        let c = oc.dot(&oc) - sphere.radius * sphere.radius;
        let discriminant = b * b - 4.0 * c;
        if discriminant < 0.0 {
            continue;
        }

        let sqrt_d = discriminant.sqrt();
        // 手前の根を優先、レイ内部開始なら奥の根
        let t_near = (-b - sqrt_d) / 2.0;
        let t_far = (-b + sqrt_d) / 2.0;
        let t = if t_near >= 0.0 { t_near } else { t_far };

        if t < 0.0 || t > max_distance {
            continue;
        }
        if best.map_or(true, |(bt, _)| t < bt) {
            best = Some((t, sphere));
        }
    }

    best.map(|(t, sphere)| NodeHit {
        node_id: sphere.id,
        distance: t,
        point: origin + direction * t,
    })
}
