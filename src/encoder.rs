//! Packs sensor points into a `PointCloud2` message.
//!
//! Every point occupies 16 bytes:
//!
//! ```text
//! ┌───────┬───────┬───────┬───────────────┐
//! │ x:f32 │ y:f32 │ z:f32 │ intensity:f32 │
//! │ 4B    │ 4B    │ 4B    │ 4B            │
//! └───────┴───────┴───────┴───────────────┘
//! ```
//!
//! The simulation frame is Y-up while the wire frame is Z-up, so the wire
//! `(x, y, z)` triple is the simulation `(x, z, y)` triple. Downstream tools
//! depend on this exact swap.

use crate::message::{Header, PointCloud2, PointField};
use anyhow::{ensure, Result};
use nalgebra::Point3;

pub const POINT_STEP: u32 = 16;

/// Point field data types, as in `sensor_msgs/PointField`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(dead_code)]
pub enum PointFieldType {
    INT8 = 1,
    UINT8 = 2,
    INT16 = 3,
    UINT16 = 4,
    INT32 = 5,
    UINT32 = 6,
    FLOAT32 = 7,
    FLOAT64 = 8,
}

/// The field layout shared by every emitted cloud.
///
/// The intensity slot is tagged `UINT32` to match the layout consumers
/// expect, but it always carries the bit pattern of `0.0f32`, which is zero
/// under either interpretation.
pub fn xyz_intensity_fields() -> Vec<PointField> {
    [
        ("x", 0, PointFieldType::FLOAT32),
        ("y", 4, PointFieldType::FLOAT32),
        ("z", 8, PointFieldType::FLOAT32),
        ("intensity", 12, PointFieldType::UINT32),
    ]
    .into_iter()
    .map(|(name, offset, datatype)| PointField {
        name: name.to_string(),
        offset,
        datatype: datatype as u8,
        count: 1,
    })
    .collect()
}

/// Map a sensor-local simulation point to the wire `(x, y, z, intensity)`.
pub fn to_wire(point: &Point3<f32>) -> [f32; 4] {
    [point.x, point.z, point.y, 0.0]
}

/// Build an unordered (single row) cloud from sensor-local points.
pub fn encode_cloud(frame_id: &str, points: &[Point3<f32>]) -> PointCloud2 {
    let mut data = Vec::with_capacity(points.len() * POINT_STEP as usize);
    for point in points {
        for value in to_wire(point) {
            data.extend_from_slice(&value.to_le_bytes());
        }
    }

    let width = points.len() as u32;

    PointCloud2 {
        header: Header {
            frame_id: frame_id.to_string(),
            ..Default::default()
        },
        height: 1,
        width,
        fields: xyz_intensity_fields(),
        is_bigendian: false,
        point_step: POINT_STEP,
        row_step: width * POINT_STEP,
        data,
        is_dense: false,
    }
}

/// Unpack the `(x, y, z, intensity)` values of a cloud with the standard layout.
pub fn decode_points(cloud: &PointCloud2) -> Result<Vec<[f32; 4]>> {
    ensure!(!cloud.is_bigendian, "big-endian clouds are not supported");
    ensure!(
        cloud.fields == xyz_intensity_fields(),
        "unexpected point field layout"
    );
    ensure!(
        cloud.point_step == POINT_STEP,
        "expect point_step {POINT_STEP}, but got {}",
        cloud.point_step
    );

    let n_points = cloud.height as usize * cloud.width as usize;
    ensure!(
        cloud.row_step as usize == cloud.width as usize * POINT_STEP as usize,
        "row_step {} does not match width {}",
        cloud.row_step,
        cloud.width
    );
    ensure!(
        cloud.data.len() == n_points * POINT_STEP as usize,
        "expect {} data bytes for {n_points} points, but got {}",
        n_points * POINT_STEP as usize,
        cloud.data.len()
    );

    let points = cloud
        .data
        .chunks_exact(POINT_STEP as usize)
        .map(|chunk| {
            let mut values = [0f32; 4];
            for (value, bytes) in values.iter_mut().zip(chunk.chunks_exact(4)) {
                *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            values
        })
        .collect();
    Ok(points)
}
