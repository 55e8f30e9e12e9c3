//! 記録済みセッションの再生ツール
//!
//! ブリッジ形式の改行区切りJSON記録を1行ずつパイプラインに流し、
//! 発生したジェスチャイベントを時系列で表示する

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{Context, Result};
use nalgebra::Vector3;

use memograph_gesture::config::Config;
use memograph_gesture::gesture::LockMode;
use memograph_gesture::hit::NodeSphere;
use memograph_gesture::pipeline::GesturePipeline;
use memograph_gesture::source::{BridgeSource, LandmarkSource};

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: replay <recording.jsonl>")?;

    let config = Config::load_or_default(CONFIG_PATH);
    config.validate()?;

    let mut source = BridgeSource::new();
    let ingest = source.producer();
    let mut pipeline = GesturePipeline::new(config);
    pipeline.set_nodes(vec![
        NodeSphere {
            id: 0,
            center: Vector3::new(0.3, 0.5, -1.0),
            radius: 0.2,
        },
        NodeSphere {
            id: 1,
            center: Vector3::new(0.7, 0.5, -1.0),
            radius: 0.2,
        },
    ]);

    let file = File::open(&path).with_context(|| format!("open {}", path))?;
    let mut frames = 0u64;
    let mut last_mode = LockMode::Idle;

    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        ingest.handle_line(&line);

        // 1行＝最大1フレーム。状態メッセージ等の行では何も出ない
        let Some(frame) = source.poll() else { continue };
        frames += 1;
        let state = pipeline.process(&frame);

        let t = state.timestamp_secs;
        if state.lock.mode != last_mode {
            println!("[{t:9.3}] {:?} -> {:?}", last_mode, state.lock.mode);
            last_mode = state.lock.mode;
        }
        if state.events.pressed {
            println!("[{t:9.3}] press on {:?}", state.events.press_node);
        }
        if state.events.released {
            println!("[{t:9.3}] release, selected={:?}", state.events.selected);
        }
        if let Some((id, pos)) = state.events.grab_update {
            println!(
                "[{t:9.3}] grab node {} -> ({:.3}, {:.3}, {:.3})",
                id, pos.x, pos.y, pos.z
            );
        }
        if let Some(two) = state.two_hand {
            if state.lock.mode == LockMode::TwoHand {
                println!(
                    "[{t:9.3}] two-hand dist={:.3} rot={:.3}",
                    two.distance, two.rotation
                );
            }
        }
    }

    println!("{} frames replayed from {}", frames, path);
    Ok(())
}
