use crate::network::delta::ParameterDelta;

/// Global L2-norm clipping.
///
/// With no threshold the delta is returned untouched (and a warning is
/// logged). Otherwise, when `‖delta‖ > threshold`, every element is scaled
/// by `threshold / ‖delta‖` so the direction is preserved.
pub fn clip_by_global_norm(delta: ParameterDelta, threshold: Option<f64>) -> ParameterDelta {
    let Some(threshold) = threshold else {
        log::warn!("no gradient threshold set, applying the delta unclipped");
        return delta;
    };
    let norm = delta.global_norm();
    if norm <= threshold {
        return delta;
    }
    log::debug!("clipping gradient norm {:.6} to {:.6}", norm, threshold);
    let mut clipped = delta;
    clipped.scale(threshold / norm);
    clipped
}
