//! JSON protocol for the phone-bridge relay channel.
//!
//! Self-contained: no imports from other memograph_gesture modules.
//! The relay forwards phone sensor frames as newline-delimited JSON text.

use std::collections::HashMap;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

// --- Message types ---

/// Phone bridge → viewer
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    /// One frame of hand-tracking data from the phone.
    #[serde(rename = "hand_tracking")]
    HandTracking {
        hands: Vec<BridgeHand>,
        #[serde(rename = "frameTimestamp")]
        frame_timestamp: f64,
    },
    /// Connection status, consumed for UI display only.
    #[serde(rename = "bridge_status")]
    Status {
        #[serde(rename = "phoneConnected")]
        phone_connected: bool,
        #[serde(default)]
        ips: Vec<String>,
        #[serde(rename = "phonePort")]
        phone_port: u16,
    },
}

/// One hand as reported by the phone: joints keyed by name.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BridgeHand {
    pub handedness: String,
    pub landmarks: HashMap<String, JointPoint>,
    /// Depth values are metric (meters from the LiDAR sensor).
    #[serde(rename = "hasLiDARDepth", default)]
    pub has_lidar_depth: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct JointPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Relay connection status snapshot for UI display.
#[derive(Debug, Clone, Default)]
pub struct BridgeStatus {
    pub phone_connected: bool,
    pub ips: Vec<String>,
    pub phone_port: u16,
}

/// Parse one relay line. Malformed text yields None, never an error:
/// a bad frame must not interrupt the frame pipeline.
pub fn parse_message(line: &str) -> Option<BridgeMessage> {
    serde_json::from_str(line).ok()
}

// --- TCP codec helpers ---

pub type MessageStream = Framed<TcpStream, LinesCodec>;

/// Create a framed line stream over the relay socket.
pub fn message_stream(stream: TcpStream) -> MessageStream {
    let codec = LinesCodec::new_with_max_length(1024 * 1024);
    Framed::new(stream, codec)
}

/// Receive the next relay line. Malformed lines yield Ok(None).
pub async fn recv_message(stream: &mut MessageStream) -> anyhow::Result<Option<BridgeMessage>> {
    match stream.next().await {
        Some(Ok(line)) => Ok(parse_message(&line)),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}
