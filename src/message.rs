//! Wire messages exchanged with the robotics middleware.
//!
//! The layout mirrors `builtin_interfaces/Time`, `std_msgs/Header`,
//! `sensor_msgs/PointField` and `sensor_msgs/PointCloud2`. Messages are
//! encoded as little-endian CDR.

use anyhow::{Context, Result};
use cdr::{CdrLe, Infinite};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    pub sec: i32,
    pub nanosec: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub stamp: Time,
    pub frame_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointField {
    pub name: String,
    pub offset: u32,
    pub datatype: u8,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointCloud2 {
    pub header: Header,
    pub height: u32,
    pub width: u32,
    pub fields: Vec<PointField>,
    pub is_bigendian: bool,
    pub point_step: u32,
    pub row_step: u32,
    pub data: Vec<u8>,
    pub is_dense: bool,
}

/// A serialized message on its way to a publish sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishMessage {
    pub seq: usize,
    pub topic: String,
    pub payload: Vec<u8>,
}

impl PointCloud2 {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = cdr::serialize::<_, _, CdrLe>(self, Infinite)
            .context("unable to serialize PointCloud2")?;
        Ok(bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let msg = cdr::deserialize::<PointCloud2>(bytes)
            .context("unable to deserialize PointCloud2")?;
        Ok(msg)
    }
}
