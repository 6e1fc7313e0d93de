mod bayesnet;
mod bif;
mod enumeration_engine;
mod error;
mod join_tree;
mod join_tree_engine;
mod mcmc_engine;
mod potential;
mod triangulate;
mod values;

pub use bayesnet::{BayesNet, BayesNode};
pub use bif::{bif_string, parse_bif, read_bif, write_bif};
pub use enumeration_engine::EnumerationEngine;
pub use error::{BnetError, Result};
pub use join_tree::{Clique, JoinTree, Sepset};
pub use join_tree_engine::JoinTreeEngine;
pub use mcmc_engine::McmcEngine;
pub use potential::{CondPot, Potential};
pub use values::PotArray;
