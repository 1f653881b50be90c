mod aggregator;
mod config;
mod consts;
mod data;
mod encoder;
mod lidar;
mod looper;
mod message;
mod pattern;
mod publisher;
mod scene;

use crate::{
    config::Config,
    consts::DEFAULT_CONFIG,
    lidar::LidarSimulator,
    looper::Looper,
    publisher::{ChannelPublisher, Publisher, TcpPublisher},
    scene::Scene,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{
    fs,
    net::SocketAddr,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering::*},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::info;

#[derive(Parser)]
struct Opts {
    /// JSON5 config file. Built-in defaults are used if omitted.
    #[clap(short, long)]
    pub config: Option<PathBuf>,
    /// Write every published cloud as a .pcd file into this directory.
    #[clap(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Address of a ROS TCP endpoint to publish to.
    #[clap(long)]
    pub tcp: Option<SocketAddr>,
    /// Stop after publishing this many frames.
    #[clap(long)]
    pub max_frames: Option<usize>,
}

fn main() -> Result<()> {
    // Enable logging
    tracing_subscriber::fmt::init();

    // Parse command line arguments
    let opts = Opts::parse();

    // Load config
    let config = match &opts.config {
        Some(path) => Config::load(path)?,
        None => {
            info!("No config file given, using built-in defaults");
            DEFAULT_CONFIG
        }
    };

    // Prepare files and dirs
    if let Some(output_dir) = &opts.output_dir {
        fs::create_dir_all(output_dir).with_context(|| {
            format!("unable to create output directory '{}'", output_dir.display())
        })?;
    }

    // Register termination signal
    let is_terminated = Arc::new(AtomicBool::new(false));
    {
        let is_terminated = is_terminated.clone();
        ctrlc::set_handler(move || is_terminated.store(true, SeqCst))?;
    }

    // Build the world and the sensor
    let scene = Scene::from_config(&config.scene)?;
    info!("Scene has {} objects", scene.primitives().len());
    let pose = config.pose.to_isometry();
    let lidar = LidarSimulator::new(&config.lidar, &config.publish.frame_id, &pose)?;
    info!(
        "Lidar casts {} rays per frame on topic {}",
        lidar.pattern().len(),
        config.publish.topic
    );

    // Start message aggregator
    let (msg_tx, msg_rx) = flume::bounded(4);
    let output_dir = opts.output_dir.clone();
    let aggregator = thread::spawn(move || aggregator::run_aggregator(msg_rx, output_dir));

    let mut sinks: Vec<Box<dyn Publisher>> = vec![Box::new(ChannelPublisher::new(msg_tx))];
    if let Some(addr) = opts.tcp {
        sinks.push(Box::new(TcpPublisher::new(addr)));
    }

    // Tick the sensor
    let mut looper = Looper {
        lidar,
        position: pose.translation.vector.into(),
        caster: &scene,
        publisher: sinks,
        topic: &config.publish.topic,
        period: Duration::from_millis(config.publish.period_ms),
        max_frames: opts.max_frames,
    };
    let n_frames = looper.run(&is_terminated);
    info!("Published {n_frames} frames in total");

    // Closing the channel stops the aggregator
    drop(looper);
    aggregator
        .join()
        .map_err(|_| anyhow::anyhow!("aggregator thread panicked"))??;

    Ok(())
}
