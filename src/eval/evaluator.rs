use crate::eval::evaluator::EvalResult::*;
use crate::eval::log_builder::EvalLogBuilder;
use crate::model::feature::Feature;
use crate::strategy::StrategyRegistry;
use crate::Context;
use log::{info, log_enabled};

macro_rules! eval_log_enabled {
    () => {
        log_enabled!(log::Level::Info)
    };
}

const EVAL_LOG_EVENT_ID: u16 = 5000;

#[derive(Debug, PartialEq)]
pub enum EvalResult {
    /// Enabled by the named strategy.
    Enabled(String),
    /// None of the feature's strategies matched.
    NoMatch,
    Disabled,
}

impl EvalResult {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Enabled(_))
    }
}

/// Evaluates `feature` for `context`.
///
/// The strategies are tried in order and the first one enabling the feature wins.
/// Strategies missing from `registry` never match, `on_unknown` is called with their name.
pub fn eval_feature(
    feature: &Feature,
    context: &Context,
    registry: &StrategyRegistry,
    on_unknown: &dyn Fn(&str),
) -> EvalResult {
    let mut log = EvalLogBuilder::default();
    if eval_log_enabled!() {
        log = log
            .append(format!("Evaluating '{}' for Context '{context}'", feature.name))
            .inc_indent();
    }

    eval_strategies(feature, context, registry, on_unknown, log)
}

fn eval_strategies(
    feature: &Feature,
    context: &Context,
    registry: &StrategyRegistry,
    on_unknown: &dyn Fn(&str),
    mut log: EvalLogBuilder,
) -> EvalResult {
    let result = if !feature.enabled {
        if eval_log_enabled!() {
            log = log.new_ln(Some("Feature is disabled."));
        }
        Disabled
    } else {
        let mut result = NoMatch;
        for constraint in feature.strategies.iter() {
            if eval_log_enabled!() {
                log = log.append_constraint(constraint);
            }
            let Some(strategy) = registry.get(constraint.name.as_str()) else {
                if eval_log_enabled!() {
                    log = log.append(" => unknown strategy, skipping");
                }
                on_unknown(constraint.name.as_str());
                continue;
            };
            let enabled =
                strategy.is_enabled(feature.name.as_str(), &constraint.parameters, context);
            if eval_log_enabled!() {
                log = log.append_result(enabled);
            }
            if enabled {
                result = Enabled(constraint.name.clone());
                break;
            }
        }
        result
    };

    if eval_log_enabled!() {
        log = log
            .dec_indent()
            .new_ln(Some(format!("Returning '{}'.", result.is_enabled()).as_str()));
        info!(event_id = EVAL_LOG_EVENT_ID; "{}", log.content());
    }
    result
}
