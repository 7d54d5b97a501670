//! Elector Simulator
//!
//! Command-line front end for `elector-simulation`. Flags map one to one onto
//! [`elector_simulation::SimulationConfig`]; the binary runs the simulation and
//! prints the final report as text or JSON.
//!
//! # Example
//!
//! ```text
//! elector-sim --protocol ring --ids 1,2,3,4,5 --steps 50 \
//!     --crash 10:5 --recover 30:5 --p-crash 0 --p-recover 0
//! ```

pub mod cli;

pub use cli::{Cli, CliError, InitialArg, ModelArg, ProtocolArg, ScriptedFault};
