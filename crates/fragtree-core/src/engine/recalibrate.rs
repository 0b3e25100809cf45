//! Linear mass recalibration.
//!
//! Once a tree is available, its annotations pair each observed peak mass
//! with a theoretical formula mass. A robust linear model fitted through
//! these pairs corrects systematic instrument error; rerunning the analysis
//! on corrected masses can only be accepted when it improves the score.

use crate::core::models::tree::FragmentationTree;
use tracing::debug;

const IDENTITY_EPSILON: f64 = 1e-9;

/// An affine correction `m -> slope * m + intercept` applied to observed
/// masses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassCorrection {
    pub slope: f64,
    pub intercept: f64,
}

impl MassCorrection {
    pub fn identity() -> Self {
        Self {
            slope: 1.0,
            intercept: 0.0,
        }
    }

    pub fn apply(&self, mass: f64) -> f64 {
        self.slope * mass + self.intercept
    }

    /// True when applying the correction would not move any mass by a
    /// meaningful amount.
    pub fn is_identity(&self) -> bool {
        (self.slope - 1.0).abs() < IDENTITY_EPSILON && self.intercept.abs() < IDENTITY_EPSILON
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 1 {
        values[mid]
    } else {
        0.5 * (values[mid - 1] + values[mid])
    })
}

/// Fits a line through (observed, reference) pairs using the median of all
/// pairwise slopes and the median of the per-point intercepts. The median
/// makes the fit robust against a few misannotated peaks.
///
/// Returns `None` when fewer than two distinct observations exist, when the
/// fit degenerates to a non-finite or non-positive slope, or when the inputs
/// disagree in length.
pub fn fit_median_linear(observed: &[f64], reference: &[f64]) -> Option<MassCorrection> {
    if observed.len() != reference.len() || observed.len() < 2 {
        return None;
    }
    let mut slopes = Vec::with_capacity(observed.len() * (observed.len() - 1) / 2);
    for i in 0..observed.len() {
        for j in (i + 1)..observed.len() {
            let dx = observed[j] - observed[i];
            if dx.abs() < f64::EPSILON {
                continue;
            }
            slopes.push((reference[j] - reference[i]) / dx);
        }
    }
    let slope = median(&mut slopes)?;
    if !slope.is_finite() || slope <= 0.0 {
        return None;
    }
    let mut intercepts: Vec<f64> = observed
        .iter()
        .zip(reference)
        .map(|(&x, &y)| y - slope * x)
        .collect();
    let intercept = median(&mut intercepts)?;
    if !intercept.is_finite() {
        return None;
    }
    Some(MassCorrection { slope, intercept })
}

/// Fits a correction from a tree's annotated peaks. Trees explaining fewer
/// than `min_peaks` peaks are rejected as statistically unreliable, as are
/// fits that collapse to the identity.
pub fn fit_from_tree(tree: &FragmentationTree, min_peaks: usize) -> Option<MassCorrection> {
    if tree.explained_peaks() < min_peaks {
        debug!(
            explained = tree.explained_peaks(),
            required = min_peaks,
            "too few annotated peaks for recalibration"
        );
        return None;
    }
    let observed: Vec<f64> = tree.nodes().iter().map(|n| n.observed_mass).collect();
    let reference: Vec<f64> = tree.nodes().iter().map(|n| n.formula.mass()).collect();
    let correction = fit_median_linear(&observed, &reference)?;
    if correction.is_identity() {
        return None;
    }
    Some(correction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_known_linear_distortion() {
        // observed = (reference - 0.002) / 1.00001
        let reference = [58.0419, 72.0575, 102.0681, 130.0630, 146.0579];
        let observed: Vec<f64> = reference.iter().map(|m| (m - 0.002) / 1.00001).collect();
        let correction = fit_median_linear(&observed, &reference).unwrap();
        assert!((correction.slope - 1.00001).abs() < 1e-8);
        assert!((correction.intercept - 0.002).abs() < 1e-6);
        for (&obs, &re) in observed.iter().zip(&reference) {
            assert!((correction.apply(obs) - re).abs() < 1e-9);
        }
    }

    #[test]
    fn median_slope_resists_a_single_outlier() {
        let reference = [50.0, 100.0, 150.0, 200.0, 250.0];
        let mut observed = reference;
        observed[2] += 0.5; // one badly annotated peak
        let correction = fit_median_linear(&observed, &reference).unwrap();
        assert!((correction.slope - 1.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_points_are_rejected() {
        assert!(fit_median_linear(&[100.0], &[100.001]).is_none());
        assert!(fit_median_linear(&[], &[]).is_none());
    }

    #[test]
    fn non_positive_slopes_are_rejected() {
        // reference decreases while observed increases
        let observed = [50.0, 100.0, 150.0];
        let reference = [150.0, 100.0, 50.0];
        assert!(fit_median_linear(&observed, &reference).is_none());
    }

    #[test]
    fn coincident_observations_are_rejected() {
        let observed = [100.0, 100.0];
        let reference = [100.001, 100.002];
        assert!(fit_median_linear(&observed, &reference).is_none());
    }

    #[test]
    fn identity_detection_uses_a_tight_epsilon() {
        assert!(MassCorrection::identity().is_identity());
        assert!(
            !MassCorrection {
                slope: 1.0,
                intercept: 0.001
            }
            .is_identity()
        );
    }
}
