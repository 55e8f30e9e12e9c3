//! 電話ブリッジ疎通確認ツール
//!
//! 中継サーバに接続してフレームをパイプラインへ流し、
//! 状態遷移とジェスチャイベントを標準出力に表示する

use std::time::Duration;

use anyhow::Result;
use nalgebra::Vector3;

use memograph_gesture::config::Config;
use memograph_gesture::gesture::LockMode;
use memograph_gesture::hit::NodeSphere;
use memograph_gesture::pipeline::GesturePipeline;
use memograph_gesture::protocol;
use memograph_gesture::source::{BridgeSource, LandmarkSource};

const CONFIG_PATH: &str = "config.toml";

/// 動作確認用の固定シーン: 原点の奥に並べた3球
fn probe_nodes() -> Vec<NodeSphere> {
    (0..3)
        .map(|i| NodeSphere {
            id: i as u64,
            center: Vector3::new(-0.5 + i as f32 * 0.5, 0.5, -1.0),
            radius: 0.2,
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::load_or_default(CONFIG_PATH);
    config.validate()?;

    println!("=== Bridge Probe ({}) ===", env!("GIT_VERSION"));
    println!("接続先: {}", config.bridge.addr);

    let mut source = BridgeSource::new();
    let ingest = source.producer();
    let frame_dt = Duration::from_millis(1000 / config.app.target_fps.max(1) as u64);
    let addr = config.bridge.addr.clone();
    let mut pipeline = GesturePipeline::new(config);
    pipeline.set_nodes(probe_nodes());

    // 接続、受信、切断時は再接続
    loop {
        println!("[tcp] connecting to {}...", addr);
        match tokio::net::TcpStream::connect(&addr).await {
            Ok(tcp) => {
                tcp.set_nodelay(true)?;
                println!("[tcp] connected");
                let mut stream = protocol::message_stream(tcp);
                let mut tick = tokio::time::interval(frame_dt);
                let mut last_mode = LockMode::Idle;
                let mut phone_connected = false;

                loop {
                    tokio::select! {
                        msg = protocol::recv_message(&mut stream) => {
                            match msg {
                                Ok(Some(msg)) => ingest.handle_message(&msg),
                                Ok(None) => {}
                                Err(e) => {
                                    println!("[tcp] session error: {e:#}");
                                    break;
                                }
                            }
                        }
                        _ = tick.tick() => {
                            let status = source.status();
                            if status.phone_connected != phone_connected {
                                phone_connected = status.phone_connected;
                                println!(
                                    "[bridge] phone {} (port {})",
                                    if phone_connected { "connected" } else { "disconnected" },
                                    status.phone_port
                                );
                            }
                            if let Some(frame) = source.poll() {
                                let state = pipeline.process(&frame);
                                if state.lock.mode != last_mode {
                                    println!("[gesture] {:?} -> {:?}", last_mode, state.lock.mode);
                                    last_mode = state.lock.mode;
                                }
                                if state.events.pressed {
                                    println!("[gesture] press on {:?}", state.events.press_node);
                                }
                                if let Some(id) = state.events.selected {
                                    println!("[gesture] selected node {}", id);
                                }
                                if let Some((id, pos)) = state.events.grab_update {
                                    println!(
                                        "[gesture] grab node {} -> ({:.3}, {:.3}, {:.3})",
                                        id, pos.x, pos.y, pos.z
                                    );
                                }
                            }
                        }
                    }
                }
            }
            Err(e) => {
                println!("[tcp] connection failed: {e}");
            }
        }
        source.reset();
        pipeline.reset();
        println!("[tcp] reconnecting in 2s...");
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}
