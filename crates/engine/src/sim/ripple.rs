//! Ordered, time-stamped set of interaction points with age-based eviction.
//! Pointer-reactive effects read the packed export straight out of the
//! compute uniform tail.

use catalog::RippleLifetime;

use crate::types::MAX_RIPPLES;

/// One timestamped interaction location in normalized `[0, 1]` coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RipplePoint {
    pub x: f32,
    pub y: f32,
    pub start_time: f32,
}

/// FIFO set of ripple points. Insertion order is eviction order: once over
/// capacity the oldest entries are dropped first.
#[derive(Debug)]
pub struct RippleField {
    points: Vec<RipplePoint>,
    capacity: usize,
}

impl Default for RippleField {
    fn default() -> Self {
        Self::new(MAX_RIPPLES)
    }
}

impl RippleField {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: Vec::new(),
            capacity,
        }
    }

    /// At capacity the oldest point makes way for the new one, so the set
    /// stays bounded even when no frame ticks it (e.g. while a procedural
    /// effect is selected).
    pub fn add_point(&mut self, x: f32, y: f32, now: f32) {
        if self.points.len() >= self.capacity {
            self.points.remove(0);
        }
        self.points.push(RipplePoint {
            x,
            y,
            start_time: now,
        });
    }

    /// Drops points older than the effect's lifetime. Called once per frame
    /// before the uniform repack.
    pub fn tick(&mut self, now: f32, lifetime: RippleLifetime) {
        let threshold = lifetime.seconds();
        self.points.retain(|p| now - p.start_time < threshold);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[RipplePoint] {
        &self.points
    }

    /// Flat `[x, y, start_time, 0]` slots, zero-padded to the fixed uniform
    /// capacity.
    pub fn packed_slots(&self) -> [[f32; 4]; MAX_RIPPLES] {
        let mut slots = [[0.0; 4]; MAX_RIPPLES];
        for (slot, point) in slots.iter_mut().zip(self.points.iter()) {
            *slot = [point.x, point.y, point.start_time, 0.0];
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retains_points_inside_lifetime_window() {
        let mut field = RippleField::default();
        field.add_point(0.5, 0.25, 0.0);
        field.tick(3.9, RippleLifetime::Standard);
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn evicts_points_past_standard_lifetime() {
        let mut field = RippleField::default();
        field.add_point(0.5, 0.25, 0.0);
        field.tick(4.1, RippleLifetime::Standard);
        assert!(field.is_empty());
    }

    #[test]
    fn viscous_effects_keep_points_longer() {
        let mut field = RippleField::default();
        field.add_point(0.1, 0.1, 0.0);
        field.tick(4.1, RippleLifetime::Viscous);
        assert_eq!(field.len(), 1);
        field.tick(8.1, RippleLifetime::Viscous);
        assert!(field.is_empty());
    }

    #[test]
    fn capacity_overflow_drops_oldest_first() {
        let mut field = RippleField::default();
        for i in 0..(MAX_RIPPLES + 10) {
            field.add_point(i as f32, 0.0, 0.0);
        }
        assert_eq!(field.len(), MAX_RIPPLES);
        // The 10 oldest insertions are gone; the survivors are the most
        // recent MAX_RIPPLES in insertion order.
        assert_eq!(field.points()[0].x, 10.0);
        assert_eq!(field.points()[MAX_RIPPLES - 1].x, (MAX_RIPPLES + 9) as f32);
    }

    #[test]
    fn insertion_bound_holds_without_any_tick() {
        // A selected effect that never ticks the field (procedural, or a
        // compute entry whose source failed to compile) must not let
        // interaction points accumulate past capacity.
        let mut field = RippleField::new(3);
        for i in 0..50 {
            field.add_point(i as f32, 0.0, i as f32);
        }
        assert_eq!(field.len(), 3);
        assert_eq!(field.points()[0].x, 47.0);
        assert_eq!(field.points()[2].x, 49.0);
    }

    #[test]
    fn packed_slots_zero_pad_to_capacity() {
        let mut field = RippleField::default();
        field.add_point(0.25, 0.75, 1.5);
        let slots = field.packed_slots();
        assert_eq!(slots[0], [0.25, 0.75, 1.5, 0.0]);
        assert_eq!(slots[1], [0.0; 4]);
        assert_eq!(slots[MAX_RIPPLES - 1], [0.0; 4]);
    }
}
