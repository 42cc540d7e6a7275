use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::time::SimTime;

/// Errors raised while reading or writing a parameter file.
#[derive(Debug, Error)]
pub enum ParamsError {
    /// The file could not be read or written.
    #[error("failed to access params file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON or does not match the parameter layout.
    #[error("malformed params: {0}")]
    Json(#[from] serde_json::Error),
}

/// Simulation parameters shared by every projectile in a game.
///
/// These are the read-only game settings the projectile core consumes. All peers of a game
/// must use identical values, otherwise trajectories diverge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Length of one fixed simulation tick in milliseconds.
    pub tick_ms: u64,
    /// Global game speed multiplier. Scales the physics step, not the tick length.
    pub game_speed: f32,
    /// Whether teams are active. Affects enemy and team-mate relations.
    pub team_game: bool,
    /// Lets a projectile hit its owner before the spawn grace period ended.
    pub new_net: bool,
    /// Seed for the fixed random table and the rotation RNG.
    pub random_seed: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            game_speed: 1.0,
            team_game: false,
            new_net: false,
            random_seed: 0x5eed,
        }
    }
}

impl Params {
    /// Duration of one fixed tick on the simulation clock.
    pub fn tick(&self) -> SimTime {
        SimTime::from_millis(self.tick_ms)
    }

    /// Physics step in seconds for one tick, scaled by the game speed.
    pub fn physics_dt(&self) -> f32 {
        self.tick().seconds() * self.game_speed
    }

    /// Loads parameters from a JSON file. Missing fields take their default value.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the JSON file
    ///
    /// # Returns
    ///
    /// The parsed parameters, or an error if the file is unreadable or malformed.
    pub fn load_from_file(path: &str) -> Result<Self, ParamsError> {
        let json = std::fs::read_to_string(path)?;
        let params = serde_json::from_str(&json)?;
        Ok(params)
    }

    /// Saves the parameters as pretty printed JSON.
    pub fn save_to_file(&self, path: &str) -> Result<(), ParamsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
