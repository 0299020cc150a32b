//! examples of usage of RustedPlateModes
/// BVP for ODEs examples: integrator, linear shooting and plate eigenfrequencies
pub mod bvp_examples;
