//! Geometry value types stored inside keyframe records.
//!
//! `Vector2` and `Rectangle` are opaque 8- and 16-byte values as far as the
//! record layouts are concerned: they are always stored at natural width.

use serde::{Deserialize, Serialize};

use recircuit_layout::{bits, PackedValue, ScalarType};

/// A 2D point or offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Linear interpolation; `t = 0` yields `self`, `t = 1` yields `other`.
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
        }
    }
}

/// An axis-aligned rectangle given by its corner and extent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
            width: lerp(self.width, other.width, t),
            height: lerp(self.height, other.height, t),
        }
    }
}

/// A circular node territory.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vector2,
    pub radius: f32,
}

impl Circle {
    pub const fn new(center: Vector2, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            center: self.center.lerp(other.center, t),
            radius: lerp(self.radius, other.radius, t),
        }
    }
}

/// A territory shape that can be blended between two keyframes.
pub trait Interpolate: Copy {
    fn interpolate(self, other: Self, t: f32) -> Self;
}

impl Interpolate for Rectangle {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolate for Circle {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn pack_f32s(values: &[f32], buf: &mut [u8], bit_offset: u32) {
    for (i, v) in values.iter().enumerate() {
        bits::write_bits(buf, bit_offset + 32 * i as u32, 32, u64::from(v.to_bits()));
    }
}

fn unpack_f32(buf: &[u8], bit_offset: u32, index: u32) -> f32 {
    f32::from_bits(bits::read_bits(buf, bit_offset + 32 * index, 32) as u32)
}

impl PackedValue for Vector2 {
    const BITS: u32 = 64;

    fn scalar_type() -> ScalarType {
        ScalarType::composite("Vector2", Self::BITS)
    }

    fn pack_into(&self, buf: &mut [u8], bit_offset: u32) {
        pack_f32s(&[self.x, self.y], buf, bit_offset);
    }

    fn unpack_from(buf: &[u8], bit_offset: u32) -> Self {
        Self {
            x: unpack_f32(buf, bit_offset, 0),
            y: unpack_f32(buf, bit_offset, 1),
        }
    }
}

impl PackedValue for Rectangle {
    const BITS: u32 = 128;

    fn scalar_type() -> ScalarType {
        ScalarType::composite("Rectangle", Self::BITS)
    }

    fn pack_into(&self, buf: &mut [u8], bit_offset: u32) {
        pack_f32s(&[self.x, self.y, self.width, self.height], buf, bit_offset);
    }

    fn unpack_from(buf: &[u8], bit_offset: u32) -> Self {
        Self {
            x: unpack_f32(buf, bit_offset, 0),
            y: unpack_f32(buf, bit_offset, 1),
            width: unpack_f32(buf, bit_offset, 2),
            height: unpack_f32(buf, bit_offset, 3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_is_sixteen_bytes_of_floats() {
        let r = Rectangle::new(1.0, 2.0, 3.0, 4.0);
        let mut buf = [0u8; 16];
        r.pack_into(&mut buf, 0);
        assert_eq!(&buf[8..12], &3.0f32.to_le_bytes());
        assert_eq!(Rectangle::unpack_from(&buf, 0), r);
    }

    #[test]
    fn vector_round_trips_off_byte_boundary() {
        let v = Vector2::new(-7.5, 0.125);
        let mut buf = [0u8; 9];
        v.pack_into(&mut buf, 3);
        assert_eq!(Vector2::unpack_from(&buf, 3), v);
    }

    #[test]
    fn interpolation_endpoints_and_midpoint() {
        let a = Circle::new(Vector2::new(0.0, 0.0), 1.0);
        let b = Circle::new(Vector2::new(10.0, -4.0), 3.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Circle::new(Vector2::new(5.0, -2.0), 2.0));

        let r = Rectangle::new(0.0, 0.0, 2.0, 2.0).lerp(Rectangle::new(4.0, 4.0, 6.0, 10.0), 0.25);
        assert_eq!(r, Rectangle::new(1.0, 1.0, 3.0, 4.0));
    }
}
