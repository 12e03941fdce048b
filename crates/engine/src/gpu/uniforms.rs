//! CPU-side uniform blocks with the exact float layout the effect programs
//! declare. Offsets are in 4-byte float units.
//!
//! Compute block (`12 + 4·MAX_RIPPLES` floats):
//!   0..4   current time, ripple count, canvas width, canvas height
//!   4..8   current time (duplicated), interaction x/y, mode scalar
//!   8..12  four general parameters
//!   12..   ripple slots `[x, y, start_time, 0]`, or for depth-feedback
//!          effects the four lighting parameters in the first slot only
//!
//! Media block (`8 + 4·MAX_RIPPLES` floats):
//!   0..4   canvas width/height, source width/height
//!   4..8   current time, ripple count, ripple mode flag, reserved
//!   8..    ripple slots

use bytemuck::{Pod, Zeroable};

use crate::types::MAX_RIPPLES;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ComputeUniforms {
    frame: [f32; 4],
    target: [f32; 4],
    params: [f32; 4],
    slots: [[f32; 4]; MAX_RIPPLES],
}

impl ComputeUniforms {
    pub fn new() -> Self {
        Self {
            frame: [0.0; 4],
            target: [0.0; 4],
            params: [0.0; 4],
            slots: [[0.0; 4]; MAX_RIPPLES],
        }
    }

    pub fn set_frame(&mut self, time: f32, ripple_count: u32, width: u32, height: u32) {
        self.frame = [time, ripple_count as f32, width as f32, height as f32];
    }

    /// Interaction vector: duplicated time, target point, and the per-mode
    /// scalar (depth threshold for depth-feedback effects, pointer-down flag
    /// for pointer-driven ones, else zero).
    pub fn set_target(&mut self, time: f32, x: f32, y: f32, mode_scalar: f32) {
        self.target = [time, x, y, mode_scalar];
    }

    pub fn set_params(&mut self, params: [f32; 4]) {
        self.params = params;
    }

    pub fn set_ripples(&mut self, slots: &[[f32; 4]; MAX_RIPPLES]) {
        self.slots = *slots;
    }

    /// Depth-feedback layout: the lighting parameters overwrite exactly the
    /// first ripple slot. Mutually exclusive with `set_ripples` per effect.
    pub fn set_lighting(&mut self, lighting: [f32; 4]) {
        self.slots[0] = lighting;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct MediaUniforms {
    size: [f32; 4],
    misc: [f32; 4],
    slots: [[f32; 4]; MAX_RIPPLES],
}

impl MediaUniforms {
    pub fn new() -> Self {
        Self {
            size: [0.0; 4],
            misc: [0.0; 4],
            slots: [[0.0; 4]; MAX_RIPPLES],
        }
    }

    pub fn set_sizes(&mut self, canvas_w: u32, canvas_h: u32, source_w: u32, source_h: u32) {
        self.size = [
            canvas_w as f32,
            canvas_h as f32,
            source_w as f32,
            source_h as f32,
        ];
    }

    /// `ripple_mode` distinguishes plain display (0) from ripple-distorted
    /// display (1).
    pub fn set_state(&mut self, time: f32, ripple_count: u32, ripple_mode: f32) {
        self.misc = [time, ripple_count as f32, ripple_mode, 0.0];
    }

    pub fn set_ripples(&mut self, slots: &[[f32; 4]; MAX_RIPPLES]) {
        self.slots = *slots;
    }
}

/// Procedural full-screen pass block: time, zoom, pan.
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ProceduralUniforms {
    pub values: [f32; 4],
}

impl ProceduralUniforms {
    pub fn new(time: f32, zoom: f32, pan_x: f32, pan_y: f32) -> Self {
        Self {
            values: [time, zoom, pan_x, pan_y],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floats(uniforms: &ComputeUniforms) -> &[f32] {
        bytemuck::cast_slice(std::slice::from_ref(uniforms))
    }

    #[test]
    fn compute_block_field_offsets() {
        let mut u = ComputeUniforms::new();
        u.set_frame(1.5, 3, 1920, 1080);
        u.set_target(1.5, 0.25, 0.75, 0.5);
        u.set_params([10.0, 20.0, 30.0, 40.0]);
        let data = floats(&u);
        assert_eq!(data.len(), 12 + 4 * MAX_RIPPLES);
        assert_eq!(&data[0..4], &[1.5, 3.0, 1920.0, 1080.0]);
        assert_eq!(&data[4..8], &[1.5, 0.25, 0.75, 0.5]);
        assert_eq!(&data[8..12], &[10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn ripple_tail_starts_at_offset_twelve() {
        let mut u = ComputeUniforms::new();
        let mut slots = [[0.0; 4]; MAX_RIPPLES];
        slots[0] = [0.1, 0.2, 0.3, 0.0];
        u.set_ripples(&slots);
        let data = floats(&u);
        assert_eq!(&data[12..16], &[0.1, 0.2, 0.3, 0.0]);
        assert_eq!(&data[16..20], &[0.0; 4]);
    }

    #[test]
    fn lighting_overwrites_only_first_slot() {
        let mut u = ComputeUniforms::new();
        let mut slots = [[0.0; 4]; MAX_RIPPLES];
        slots[0] = [9.0, 9.0, 9.0, 9.0];
        slots[1] = [8.0, 8.0, 8.0, 8.0];
        u.set_ripples(&slots);
        u.set_lighting([1.0, 0.2, 0.1, 4.0]);
        let data = floats(&u);
        assert_eq!(&data[12..16], &[1.0, 0.2, 0.1, 4.0]);
        assert_eq!(&data[16..20], &[8.0; 4]);
    }

    #[test]
    fn media_block_layout() {
        let mut u = MediaUniforms::new();
        u.set_sizes(800, 600, 1024, 768);
        u.set_state(2.0, 5, 1.0);
        let data: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&u));
        assert_eq!(data.len(), 8 + 4 * MAX_RIPPLES);
        assert_eq!(&data[0..4], &[800.0, 600.0, 1024.0, 768.0]);
        assert_eq!(&data[4..8], &[2.0, 5.0, 1.0, 0.0]);
    }
}
