use crate::{
    data::PcdPoint,
    encoder::decode_points,
    message::{PointCloud2, PublishMessage},
};
use anyhow::{Context, Result};
use pcd_rs::{DataKind, WriterInit};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Drain published messages until every sender is gone.
///
/// Each payload is decoded back into a cloud. If `output_dir` is set, the
/// cloud is also written to `{seq:05}.pcd` in that directory.
pub fn run_aggregator(rx: flume::Receiver<PublishMessage>, output_dir: Option<PathBuf>) -> Result<()> {
    let mut n_msgs = 0;

    for msg in rx.iter() {
        // A bad message must not stop the consumer.
        if let Err(err) = process_msg(&msg, output_dir.as_deref()) {
            warn!("Unable to process message #{} on {}: {err:#}", msg.seq, msg.topic);
        }
        n_msgs += 1;
    }

    info!("Aggregator processed {n_msgs} messages");
    Ok(())
}

fn process_msg(msg: &PublishMessage, output_dir: Option<&Path>) -> Result<()> {
    let PublishMessage {
        seq,
        ref topic,
        ref payload,
    } = *msg;

    let cloud = PointCloud2::from_bytes(payload)?;
    let points = decode_points(&cloud)?;
    info!(
        "Message #{seq} on {topic}: {} points in frame '{}'",
        points.len(),
        cloud.header.frame_id
    );

    if let Some(output_dir) = output_dir {
        let output_path = output_dir.join(format!("{seq:05}.pcd"));
        write_pcd(&output_path, &cloud, &points)
            .with_context(|| format!("unable to write '{}'", output_path.display()))?;
    }

    Ok(())
}

fn write_pcd(path: &Path, cloud: &PointCloud2, points: &[[f32; 4]]) -> Result<()> {
    let mut writer = WriterInit {
        width: cloud.width as u64,
        height: cloud.height as u64,
        viewpoint: Default::default(),
        data_kind: DataKind::Binary,
        schema: None,
    }
    .create(path)?;

    for &values in points {
        writer.push(&PcdPoint::from(values))?;
    }

    writer.finish()?;
    Ok(())
}
