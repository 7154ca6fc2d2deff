//! Shared math utilities.

/// Logistic sigmoid, mapping a pre-activation score into [0, 1].
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        // Avoids overflow of exp(-x) for large negative inputs
        let e = x.exp();
        e / (1.0 + e)
    }
}
