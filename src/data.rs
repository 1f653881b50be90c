use pcd_rs::PcdSerialize;

/// The point type that is written to the .pcd file.
///
/// Values are kept in the wire frame, so the files line up with what
/// downstream tools receive.
#[derive(Debug, Clone, Copy, PartialEq, PcdSerialize)]
pub struct PcdPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

impl From<[f32; 4]> for PcdPoint {
    fn from([x, y, z, intensity]: [f32; 4]) -> Self {
        Self { x, y, z, intensity }
    }
}
