//! Lumen engine crate.
//!
//! A small wgpu renderer built around two pieces: a registry of built-in
//! shader programs compiled at startup ([`shader`]) and a primitive draw
//! adapter that binds vertex/index buffers and issues draws, optionally
//! replaying cached bind state ([`primitive`]).

pub mod color;
pub mod core;
pub mod device;
pub mod logging;
pub mod mesh;
pub mod primitive;
pub mod render;
pub mod shader;
pub mod time;
pub mod window;
