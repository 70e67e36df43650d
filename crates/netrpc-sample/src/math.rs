use netrpc::pack::Reader;
use netrpc::pack::Writer;
use netrpc::pack::primitives::read_f32;
use netrpc::pack::primitives::write_f32;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Writes the three components in order, 12 bytes.
pub fn write_vec3(writer: &mut Writer, value: &Vec3) {
    write_f32(writer, value.x);
    write_f32(writer, value.y);
    write_f32(writer, value.z);
}

pub fn read_vec3(reader: &mut Reader<'_>) -> netrpc::pack::Result<Vec3> {
    Ok(Vec3 {
        x: read_f32(reader)?,
        y: read_f32(reader)?,
        z: read_f32(reader)?,
    })
}
