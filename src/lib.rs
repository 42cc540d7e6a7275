//! # Ballistics - Deterministic Projectile Simulation
//!
//! The projectile physics and weapon-behaviour core of a networked 2D artillery game.
//! Projectiles are integrated on a fixed tick, collide with a pixel terrain, the map border,
//! worms and other projectiles, and run a data-driven tree of conditions and actions that
//! content authors use to describe weapons.
//!
//! ## Features
//!
//! - Fixed-step integrator with adaptive sub-stepping for fast projectiles
//! - Pixel-exact terrain collision with per-side hit counts
//! - Worm trace checks along the travelled segment
//! - Bucketed projectile-vs-projectile hit detection
//! - Composable condition/action trees loaded from JSON content
//! - Parametric child projectile spawning with a replay-stable random stream
//!
//! ## Core Modules
//!
//! - [`simulation::world`] - Outer tick driver and simulation context
//! - [`simulation::simulator`] - Per-projectile frame integration
//! - [`simulation::collision`] - Map border, terrain and worm collision tests
//! - [`simulation::events`] - Conditions that trigger actions
//! - [`simulation::actions`] - Actions and the per-step mutation record
//! - [`simulation::spawn`] - Child projectile generation

/// Core simulation logic and data structures.
pub mod simulation {
    /// Actions applied when conditions match, and the per-step mutation record.
    pub mod actions;
    /// Map border, terrain, worm and projectile collision tests.
    pub mod collision;
    /// Content registry and loading of projectile descriptors.
    pub mod content;
    /// Authored, immutable projectile descriptions.
    pub mod descriptor;
    /// Side-effect hooks and lifecycle notifications towards the game.
    pub mod event_log;
    /// Conditions evaluated every step ("events" in weapon scripts).
    pub mod events;
    /// Vector math and shape overlap tests.
    pub mod geometry;
    /// Simulation parameters.
    pub mod params;
    /// Live projectile state.
    pub mod projectile;
    /// Deterministic random sources.
    pub mod random;
    /// Per-projectile frame integration and the catch-up loop.
    pub mod simulator;
    /// Projectile storage and the bucketed spatial index.
    pub mod spatial;
    /// Child projectile generation.
    pub mod spawn;
    /// Terrain interface and a bitmap-backed implementation.
    pub mod terrain;
    /// Simulation clock values.
    pub mod time;
    /// Outer tick driver and the explicit simulation context.
    pub mod world;
    /// Worm (player avatar) state as seen by projectiles.
    pub mod worm;
}
