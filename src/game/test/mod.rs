//! Tests for the Mafia rules engine, one submodule per area of the rules.

#![cfg(test)]

pub mod player_management;
pub mod test_utils;
pub mod victory_conditions;
