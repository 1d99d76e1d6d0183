//! Human-readable step output.

use crate::types::Action;

/// Format one step as a fixed-width console line.
pub fn render_step_line(action: Action, rul: f64, cost: f64, reward: f64) -> String {
    format!(
        "{:<20} | RUL: {:>8.2} | Cost: {:>8.2} | Reward: {:>12.3}",
        action.label(),
        rul,
        cost,
        reward
    )
}
