use anyhow::Result;
use nalgebra::Vector3;
use std::io::{self, Write};

use memograph_gesture::config::Config;
use memograph_gesture::gesture::{GestureStateMachine, HandInput, MachineInput};
use memograph_gesture::hit::{find_node_hit, NodeSphere};

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load_or_default(CONFIG_PATH);
    config.validate()?;
    let frame_dt = 1.0 / config.app.target_fps as f64;

    println!("=== Memograph Gesture - 状態機械テスト ({}) ===", env!("GIT_VERSION"));
    println!();
    println!("コマンド:");
    println!("  n id x y z r   - ノード球を追加 (例: n 1 0 0 -2 0.5)");
    println!("  m x y z        - ピンチ点を移動 (例: m 0 0 0)");
    println!("  f pinch grab point - 1フレーム注入 (例: f 0.9 0 0.9)");
    println!("  seq v1 v2 ...  - ピンチ列を注入 (point=0.9固定)");
    println!("  s              - 現在の状態を表示");
    println!("  reset          - 状態機械をリセット");
    println!("  q              - 終了");
    println!();

    let mut machine = GestureStateMachine::new(config.gesture.clone());
    let mut nodes: Vec<NodeSphere> = Vec::new();
    let mut pinch_point = Vector3::new(0.5, 0.5, 0.0);
    let mut t = 0.0_f64;

    // ピンチ点から奥(−z)に向けたレイでヒット判定する
    let feed = |machine: &mut GestureStateMachine,
                    nodes: &[NodeSphere],
                    pinch_point: Vector3<f32>,
                    t: f64,
                    pinch: f32,
                    grab: f32,
                    point: f32| {
        let hit = find_node_hit(
            pinch_point,
            Vector3::new(0.0, 0.0, -1.0),
            nodes,
            config.gesture.max_hit_distance,
        );
        let hit_center = hit.and_then(|h| {
            nodes.iter().find(|n| n.id == h.node_id).map(|n| n.center)
        });
        let input = MachineInput {
            left: None,
            right: Some(HandInput {
                pinch,
                grab,
                point,
                pinch_point,
                hit: hit.map(|h| h.node_id),
                hit_center,
            }),
            two_hand_deltas: None,
            timestamp_secs: t,
        };
        let out = machine.update(&input);
        if out.pressed {
            println!("  [押下] node={:?}", out.press_node);
        }
        if out.released {
            println!("  [解放] selected={:?}", out.selected);
        }
        if let Some((id, pos)) = out.grab_update {
            println!("  [グラブ] node={} pos=({:.3}, {:.3}, {:.3})", id, pos.x, pos.y, pos.z);
        }
    };

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let parts: Vec<&str> = input.trim().split_whitespace().collect();

        if parts.is_empty() {
            continue;
        }

        match parts[0] {
            "n" if parts.len() == 6 => {
                let id: u64 = parts[1].parse()?;
                let x: f32 = parts[2].parse()?;
                let y: f32 = parts[3].parse()?;
                let z: f32 = parts[4].parse()?;
                let radius: f32 = parts[5].parse()?;
                nodes.push(NodeSphere {
                    id,
                    center: Vector3::new(x, y, z),
                    radius,
                });
                println!("ノード {} 追加 ({}個)", id, nodes.len());
            }
            "m" if parts.len() == 4 => {
                let x: f32 = parts[1].parse()?;
                let y: f32 = parts[2].parse()?;
                let z: f32 = parts[3].parse()?;
                pinch_point = Vector3::new(x, y, z);
                println!("ピンチ点: ({}, {}, {})", x, y, z);
            }
            "f" if parts.len() == 4 => {
                let pinch: f32 = parts[1].parse()?;
                let grab: f32 = parts[2].parse()?;
                let point: f32 = parts[3].parse()?;
                t += frame_dt;
                feed(&mut machine, &nodes, pinch_point, t, pinch, grab, point);
                println!("状態: {:?}", machine.lock_state().mode);
            }
            "seq" if parts.len() > 1 => {
                for part in &parts[1..] {
                    let pinch: f32 = part.parse()?;
                    t += frame_dt;
                    feed(&mut machine, &nodes, pinch_point, t, pinch, 0.0, 0.9);
                }
                println!("状態: {:?}", machine.lock_state().mode);
            }
            "s" => {
                let state = machine.lock_state();
                println!("モード: {:?}", state.mode);
                println!("コミット手: {:?}", state.hand.map(|h| h.as_str()));
                println!("グラブ対象: {:?}", state.grab_node);
                println!("ノード数: {}", nodes.len());
            }
            "reset" => {
                machine.reset();
                println!("リセットしました");
            }
            "q" => {
                println!("終了します");
                break;
            }
            _ => {
                println!("不明なコマンド: {}", parts[0]);
            }
        }
    }

    Ok(())
}
