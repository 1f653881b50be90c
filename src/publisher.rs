use crate::message::PublishMessage;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    collections::HashSet,
    io::Write,
    net::{SocketAddr, TcpStream},
    time::Duration,
};
use tracing::{debug, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const POINT_CLOUD2_TYPE: &str = "sensor_msgs/PointCloud2";

/// A fire-and-forget message sink.
///
/// Delivery is at most once. A sink that cannot deliver a message drops it
/// and logs the reason; the next cycle publishes a fresh message anyway.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: Vec<u8>);
}

impl<P> Publisher for Box<P>
where
    P: Publisher + ?Sized,
{
    fn publish(&mut self, topic: &str, payload: Vec<u8>) {
        (**self).publish(topic, payload)
    }
}

/// Publishes to every inner sink.
impl<P> Publisher for Vec<P>
where
    P: Publisher,
{
    fn publish(&mut self, topic: &str, payload: Vec<u8>) {
        if let Some((last, rest)) = self.split_last_mut() {
            for sink in rest {
                sink.publish(topic, payload.clone());
            }
            last.publish(topic, payload);
        }
    }
}

/// Hands messages over to another thread through a bounded channel.
pub struct ChannelPublisher {
    tx: flume::Sender<PublishMessage>,
    seq: usize,
}

impl ChannelPublisher {
    pub fn new(tx: flume::Sender<PublishMessage>) -> Self {
        Self { tx, seq: 0 }
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&mut self, topic: &str, payload: Vec<u8>) {
        use flume::TrySendError as E;

        let msg = PublishMessage {
            seq: self.seq,
            topic: topic.to_string(),
            payload,
        };
        self.seq += 1;

        match self.tx.try_send(msg) {
            Ok(()) => (),
            Err(E::Full(msg)) => warn!("Consumer is busy, dropped message #{} on {topic}", msg.seq),
            Err(E::Disconnected(msg)) => {
                warn!("Consumer is gone, dropped message #{} on {topic}", msg.seq)
            }
        }
    }
}

/// Streams messages to a ROS TCP endpoint.
///
/// Every frame is `u32 topic length, topic, u32 payload length, payload`,
/// little-endian. Topics are announced with a `__publish` system command
/// the first time they are used on a connection.
pub struct TcpPublisher {
    addr: SocketAddr,
    stream: Option<TcpStream>,
    registered: HashSet<String>,
}

#[derive(Serialize)]
struct RegisterPublisher<'a> {
    topic: &'a str,
    message_name: &'a str,
    queue_size: u32,
    latch: bool,
}

impl TcpPublisher {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            stream: None,
            registered: HashSet::new(),
        }
    }

    fn send(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            let stream = TcpStream::connect_timeout(&self.addr, CONNECT_TIMEOUT)
                .with_context(|| format!("unable to connect to {}", self.addr))?;
            stream.set_nodelay(true)?;
            info!("Connected to ROS TCP endpoint at {}", self.addr);

            self.stream = Some(stream);
            self.registered.clear();
        }

        if !self.registered.contains(topic) {
            let command = RegisterPublisher {
                topic,
                message_name: POINT_CLOUD2_TYPE,
                queue_size: 10,
                latch: false,
            };
            let json = serde_json::to_string(&command)?;
            self.write_frame("__publish", json.as_bytes())?;
            self.registered.insert(topic.to_string());
            debug!("Registered publisher for {topic}");
        }

        self.write_frame(topic, payload)
    }

    fn write_frame(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            anyhow::bail!("not connected");
        };
        let frame = encode_frame(topic, payload);
        stream.write_all(&frame)?;
        Ok(())
    }
}

impl Publisher for TcpPublisher {
    fn publish(&mut self, topic: &str, payload: Vec<u8>) {
        if let Err(err) = self.send(topic, &payload) {
            warn!("Dropped message on {topic}: {err:#}");
            self.stream = None;
        }
    }
}

pub fn encode_frame(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(8 + topic.len() + payload.len());
    frame.extend_from_slice(&(topic.len() as u32).to_le_bytes());
    frame.extend_from_slice(topic.as_bytes());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}
