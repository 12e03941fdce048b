//! Capacity-bounded set of moving colored balls with drag, age-based expiry,
//! off-screen eviction, and elastic pairwise collision. One dedicated effect
//! family reads the packed export out of the particle storage buffer.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{MAX_PLASMA_BALLS, PLASMA_RECORD_FLOATS};

/// Extended bounds box; balls leaving it on either axis are evicted.
const BOUNDS_MIN: f32 = -0.5;
const BOUNDS_MAX: f32 = 1.5;

/// Multiplicative velocity damping applied once per tick.
const DRAG: f32 = 0.99;

/// A simulated colored particle in normalized space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlasmaBall {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub radius: f32,
    pub age: f32,
    pub max_age: f32,
    /// Per-ball constant for shader-side pseudo-randomness.
    pub seed: f32,
}

/// Owns every live plasma ball. All balls have unit mass; collisions are
/// fully elastic (restitution 1.0).
#[derive(Debug)]
pub struct PlasmaField {
    balls: Vec<PlasmaBall>,
    capacity: usize,
    rng: StdRng,
}

impl Default for PlasmaField {
    fn default() -> Self {
        Self::new(MAX_PLASMA_BALLS, rand::random())
    }
}

impl PlasmaField {
    pub fn new(capacity: usize, seed: u64) -> Self {
        Self {
            balls: Vec::new(),
            capacity,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Launches a ball with caller-supplied position and velocity. Color is
    /// randomized within a warm fire palette, radius and lifetime within
    /// fixed ranges. Silently rejected once at capacity.
    pub fn fire(&mut self, x: f32, y: f32, vx: f32, vy: f32) {
        if self.balls.len() >= self.capacity {
            return;
        }
        let ball = PlasmaBall {
            x,
            y,
            vx,
            vy,
            r: 0.8 + self.rng.gen::<f32>() * 0.2,
            g: self.rng.gen::<f32>() * 0.6,
            b: self.rng.gen::<f32>() * 0.2,
            radius: 0.05 + self.rng.gen::<f32>() * 0.08,
            age: 0.0,
            max_age: 5.0 + self.rng.gen::<f32>() * 5.0,
            seed: self.rng.gen::<f32>() * 100.0,
        };
        self.balls.push(ball);
    }

    /// Advances the simulation one step: drag, integrate, age, evict, then
    /// pairwise collision resolution. O(n²) over the fixed small capacity.
    pub fn tick(&mut self, dt: f32) {
        for ball in &mut self.balls {
            ball.vx *= DRAG;
            ball.vy *= DRAG;
            ball.x += ball.vx * dt;
            ball.y += ball.vy * dt;
            ball.age += dt;
        }
        self.balls.retain(|ball| {
            ball.age <= ball.max_age
                && (BOUNDS_MIN..=BOUNDS_MAX).contains(&ball.x)
                && (BOUNDS_MIN..=BOUNDS_MAX).contains(&ball.y)
        });
        self.resolve_collisions();
    }

    fn resolve_collisions(&mut self) {
        for i in 0..self.balls.len() {
            for j in (i + 1)..self.balls.len() {
                let (head, tail) = self.balls.split_at_mut(j);
                let b1 = &mut head[i];
                let b2 = &mut tail[0];

                let dx = b2.x - b1.x;
                let dy = b2.y - b1.y;
                let dist = (dx * dx + dy * dy).sqrt();
                let min_dist = b1.radius + b2.radius;
                if dist >= min_dist || dist <= 1e-4 {
                    continue;
                }

                let nx = dx / dist;
                let ny = dy / dist;
                let normal_vel = (b1.vx - b2.vx) * nx + (b1.vy - b2.vy) * ny;
                // Positive relative velocity along the line of centers means
                // the pair is approaching; pairs moving apart are left alone.
                if normal_vel < 0.0 {
                    continue;
                }

                // Unit mass, restitution 1.0: the normal components swap.
                let impulse = -normal_vel;
                b1.vx += impulse * nx;
                b1.vy += impulse * ny;
                b2.vx -= impulse * nx;
                b2.vy -= impulse * ny;

                // Positional separation by half the overlap each prevents
                // sustained overlap from re-triggering the impulse.
                let overlap = min_dist - dist;
                let sep_x = nx * overlap * 0.5;
                let sep_y = ny * overlap * 0.5;
                b1.x -= sep_x;
                b1.y -= sep_y;
                b2.x += sep_x;
                b2.y += sep_y;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.balls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balls.is_empty()
    }

    pub fn balls(&self) -> &[PlasmaBall] {
        &self.balls
    }

    /// Packs every capacity slot (dead ones zeroed) into the 12-float record
    /// layout of the particle storage buffer. Rewritten in full each frame
    /// the particle family is active; shaders derive liveness from the
    /// per-slot age vs. max-age fields.
    pub fn packed(&self) -> Vec<f32> {
        let mut data = vec![0.0f32; self.capacity * PLASMA_RECORD_FLOATS];
        for (slot, ball) in data
            .chunks_exact_mut(PLASMA_RECORD_FLOATS)
            .zip(self.balls.iter())
        {
            slot.copy_from_slice(&[
                ball.x, ball.y, ball.vx, ball.vy, ball.r, ball.g, ball.b, ball.radius, ball.age,
                ball.max_age, ball.seed, 0.0,
            ]);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> PlasmaField {
        PlasmaField::new(MAX_PLASMA_BALLS, 7)
    }

    fn kinetic_energy(balls: &[PlasmaBall]) -> f32 {
        balls
            .iter()
            .map(|b| 0.5 * (b.vx * b.vx + b.vy * b.vy))
            .sum()
    }

    #[test]
    fn fire_randomizes_within_warm_palette() {
        let mut field = field();
        field.fire(0.5, 0.5, 0.0, 0.0);
        let ball = field.balls()[0];
        assert!((0.8..=1.0).contains(&ball.r));
        assert!((0.0..=0.6).contains(&ball.g));
        assert!((0.0..=0.2).contains(&ball.b));
        assert!((0.05..=0.13).contains(&ball.radius));
        assert!((5.0..=10.0).contains(&ball.max_age));
        assert!((0.0..100.0).contains(&ball.seed));
    }

    #[test]
    fn fire_at_capacity_is_a_silent_no_op() {
        let mut field = PlasmaField::new(3, 1);
        for _ in 0..5 {
            field.fire(0.5, 0.5, 0.0, 0.0);
        }
        assert_eq!(field.len(), 3);
    }

    #[test]
    fn drag_applies_before_integration() {
        let mut field = field();
        field.fire(0.5, 0.5, 1.0, 0.0);
        field.tick(1.0);
        let ball = field.balls()[0];
        assert!((ball.x - (0.5 + 0.99)).abs() < 1e-6);
        assert!((ball.vx - 0.99).abs() < 1e-6);
    }

    #[test]
    fn expired_ball_is_removed_on_next_tick() {
        let mut field = field();
        field.fire(0.5, 0.5, 0.0, 0.0);
        field.balls[0].max_age = 1.0;
        field.balls[0].age = 1.0;
        field.tick(0.016);
        assert!(field.is_empty());
    }

    #[test]
    fn out_of_bounds_ball_is_removed_on_next_tick() {
        let mut field = field();
        field.fire(1.49, 0.5, 10.0, 0.0);
        field.tick(0.016);
        assert!(field.is_empty());
    }

    #[test]
    fn head_on_collision_swaps_velocities() {
        let mut field = field();
        field.fire(0.4, 0.5, 1.0, 0.0);
        field.fire(0.6, 0.5, -1.0, 0.0);
        field.balls[0].radius = 0.15;
        field.balls[1].radius = 0.15;
        field.tick(0.016);
        let (b1, b2) = (field.balls()[0], field.balls()[1]);
        assert!((b1.vx + 0.99).abs() < 1e-5);
        assert!((b2.vx - 0.99).abs() < 1e-5);
        assert!(b1.vy.abs() < 1e-6 && b2.vy.abs() < 1e-6);
    }

    #[test]
    fn collision_separates_and_conserves_energy() {
        let mut field = field();
        field.fire(0.45, 0.48, 0.8, 0.1);
        field.fire(0.55, 0.52, -0.6, -0.2);
        field.balls[0].radius = 0.1;
        field.balls[1].radius = 0.1;
        let energy_before = kinetic_energy(field.balls()) * DRAG * DRAG;
        field.tick(0.001);
        let (b1, b2) = (field.balls()[0], field.balls()[1]);
        let dist = ((b2.x - b1.x).powi(2) + (b2.y - b1.y).powi(2)).sqrt();
        assert!(dist >= b1.radius + b2.radius - 1e-5);
        let energy_after = kinetic_energy(field.balls());
        assert!((energy_before - energy_after).abs() < 1e-4);
    }

    #[test]
    fn separating_pair_is_left_untouched() {
        let mut field = field();
        field.fire(0.45, 0.5, -1.0, 0.0);
        field.fire(0.55, 0.5, 1.0, 0.0);
        field.balls[0].radius = 0.15;
        field.balls[1].radius = 0.15;
        field.tick(0.0);
        // Overlapping but moving apart: velocities keep their signs.
        assert!(field.balls()[0].vx < 0.0);
        assert!(field.balls()[1].vx > 0.0);
    }

    #[test]
    fn packed_export_writes_all_slots() {
        let mut field = PlasmaField::new(4, 9);
        field.fire(0.1, 0.2, 0.3, 0.4);
        let data = field.packed();
        assert_eq!(data.len(), 4 * PLASMA_RECORD_FLOATS);
        assert_eq!(&data[0..4], &[0.1, 0.2, 0.3, 0.4]);
        let ball = field.balls()[0];
        assert_eq!(data[8], ball.age);
        assert_eq!(data[9], ball.max_age);
        assert_eq!(data[10], ball.seed);
        assert_eq!(data[11], 0.0);
        // Dead slots stay zeroed.
        assert!(data[PLASMA_RECORD_FLOATS..].iter().all(|&v| v == 0.0));
    }
}
