//! Shared test harness modules for the map viewer CLI.

use super::*;

mod helpers;
mod tile_steps;
