//! Design and operation of multi-carrier energy hubs as a mixed-integer linear program.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod carrier;
pub mod cli;
pub mod demand;
pub mod error;
pub mod finance;
pub mod horizon;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod pareto;
pub mod results;
pub mod retrofit;
pub mod settings;
pub mod solver;
pub mod storage;
pub mod technology;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the path to the program's folder in the user's config directory
pub fn get_energyhub_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        panic!("Could not get path to user's config directory");
    };
    config_dir.push("energyhub");

    config_dir
}
