//! Threshold policy for requirement blocks.

use log::trace;

use super::predicates::{EvalContext, PredicateRegistry};
use super::{BlockEvaluation, PredicateResult, RequirementBlock};

/// Evaluate `block` for the player in `ctx`.
///
/// Predicates run in definition order. With a minimum set and
/// `stop_at_success`, evaluation stops as soon as the pass count reaches the
/// minimum and the remaining predicates get no result. The block passes when
/// the pass count reaches the minimum, or, without a minimum, when every
/// evaluated predicate passed (so an empty block passes).
pub fn evaluate_block(
    registry: &PredicateRegistry,
    ctx: &EvalContext<'_>,
    block: &RequirementBlock,
) -> BlockEvaluation {
    let minimum = block.minimum.map(|m| m.max(1));
    let mut results = Vec::with_capacity(block.predicates.len());
    let mut passes = 0usize;

    for (name, spec) in &block.predicates {
        let passed = registry.evaluate(ctx, spec);
        if passed {
            passes += 1;
        }
        results.push(PredicateResult {
            name: name.clone(),
            passed,
            success_actions: spec.success_actions.clone(),
            deny_actions: spec.deny_actions.clone(),
        });
        if let Some(min) = minimum {
            if block.stop_at_success && passes >= min {
                trace!("requirement block reached {} passes, stopping early", min);
                break;
            }
        }
    }

    let passed = match minimum {
        Some(min) => passes >= min,
        None => passes == results.len(),
    };

    BlockEvaluation {
        passed,
        results,
        minimum,
        stop_at_success: block.stop_at_success,
        success_actions: block.success_actions.clone(),
        deny_actions: block.deny_actions.clone(),
    }
}
