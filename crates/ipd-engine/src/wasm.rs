//! WASM bindings for the browser visualizer

#![cfg(feature = "wasm")]

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::strategy::describe_strategy;
use crate::{
    run_match, run_round_robin, Evolution, EvolutionConfig, MatchConfig, SeededRng, Strategy,
    StrategyBase, TournamentConfig,
};

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

fn parse_strategy(json: &str, side: &str) -> Result<Strategy, JsError> {
    serde_json::from_str(json).map_err(|e| JsError::new(&format!("Invalid strategy {}: {}", side, e)))
}

/// Replay a match with full round-by-round details
///
/// # Arguments
/// * `strategy_a_json` - JSON serialized Strategy for player A
/// * `strategy_b_json` - JSON serialized Strategy for player B
/// * `config_json` - JSON serialized MatchConfig; missing fields take defaults
/// * `seed` - Seed for noise and stochastic strategies
///
/// # Returns
/// Serialized MatchResult
#[wasm_bindgen]
pub fn replay_match(
    strategy_a_json: &str,
    strategy_b_json: &str,
    config_json: &str,
    seed: u64,
) -> Result<JsValue, JsError> {
    let strategy_a = parse_strategy(strategy_a_json, "A")?;
    let strategy_b = parse_strategy(strategy_b_json, "B")?;
    let config: MatchConfig = serde_json::from_str(config_json)?;

    let result = run_match(&strategy_a, &strategy_b, &config, &mut SeededRng::new(seed))?;
    to_js(&result)
}

/// Run a round robin over a JSON array of strategies
#[wasm_bindgen]
pub fn run_tournament(roster_json: &str, config_json: &str, seed: u64) -> Result<JsValue, JsError> {
    let roster: Vec<Strategy> = serde_json::from_str(roster_json)?;
    let config: TournamentConfig = serde_json::from_str(config_json)?;

    let leaderboard = run_round_robin(&roster, &config, &mut SeededRng::new(seed))?;
    to_js(&leaderboard)
}

/// Run an evolution to completion and return every generation snapshot
#[wasm_bindgen]
pub fn run_evolution(config_json: &str) -> Result<JsValue, JsError> {
    let config = EvolutionConfig::from_json(config_json)?;
    let mut evolution = Evolution::new(config)?;
    to_js(&evolution.run())
}

/// Get human-readable description of a strategy
#[wasm_bindgen]
pub fn get_strategy_description(strategy_json: &str) -> Result<String, JsError> {
    let strategy = parse_strategy(strategy_json, "")?;
    Ok(describe_strategy(&strategy))
}

#[derive(Serialize)]
struct StrategyInfo {
    id: StrategyBase,
    name: &'static str,
    description: &'static str,
}

/// Get all available strategy base types
#[wasm_bindgen]
pub fn get_strategy_types() -> Result<JsValue, JsError> {
    let types: Vec<StrategyInfo> = StrategyBase::ALL
        .iter()
        .map(|base| StrategyInfo {
            id: *base,
            name: base.name(),
            description: base.description(),
        })
        .collect();

    to_js(&types)
}

/// Create a strategy JSON from base type
#[wasm_bindgen]
pub fn create_strategy(base: &str) -> Result<String, JsError> {
    let base: StrategyBase = serde_json::from_value(serde_json::Value::String(base.to_string()))
        .map_err(|_| JsError::new(&format!("Unknown strategy: {}", base)))?;

    Ok(serde_json::to_string(&Strategy::new(base))?)
}
