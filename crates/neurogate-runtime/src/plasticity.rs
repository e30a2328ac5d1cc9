//! Plasticity rules for synaptic learning

use crate::error::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Plasticity mode of a synapse
///
/// Only `Static` and `Stdp` have dynamics; the other two are accepted and inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum PlasticityMode {
    /// No weight changes
    #[default]
    Static,
    /// Spike-timing-dependent plasticity
    Stdp,
    /// Basic Hebbian learning
    Hebbian,
    /// Homeostatic plasticity
    Homeostatic,
}

impl PlasticityMode {
    /// Decode from a wire code
    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            0 => Ok(Self::Static),
            1 => Ok(Self::Stdp),
            2 => Ok(Self::Hebbian),
            3 => Ok(Self::Homeostatic),
            other => Err(RuntimeError::invalid_parameter(
                "plasticity",
                other.to_string(),
                "0..=3",
            )),
        }
    }
}

/// Parameters for the STDP rule
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StdpParams {
    /// Peak weight change per pairing
    pub learning_rate: f32,
    /// Exponential decay constant of the timing window
    pub time_constant: f32,
}

impl Default for StdpParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            time_constant: 20.0,
        }
    }
}

impl StdpParams {
    /// Create new STDP parameters with validation
    pub fn new(learning_rate: f32, time_constant: f32) -> Result<Self> {
        if learning_rate <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "learning_rate",
                learning_rate.to_string(),
                "> 0.0",
            ));
        }
        if time_constant <= 0.0 {
            return Err(RuntimeError::invalid_parameter(
                "time_constant",
                time_constant.to_string(),
                "> 0.0",
            ));
        }
        Ok(Self {
            learning_rate,
            time_constant,
        })
    }

    /// Validate parameters
    pub fn validate(&self) -> Result<()> {
        Self::new(self.learning_rate, self.time_constant)?;
        Ok(())
    }
}

/// Trait for plasticity rules
pub trait PlasticityRule {
    /// Weight change for one pre/post spike pairing (before clamping)
    fn weight_change(&self, pre_spike_time: f32, post_spike_time: f32) -> f32;
}

/// STDP rule
///
/// Post after pre potentiates, anything else (including simultaneous spikes)
/// depresses; both decay exponentially with the timing difference.
#[derive(Debug, Clone, Default)]
pub struct StdpRule {
    /// STDP parameters
    pub params: StdpParams,
}

impl StdpRule {
    /// Create a new STDP rule
    pub fn new(params: StdpParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }
}

impl PlasticityRule for StdpRule {
    fn weight_change(&self, pre_spike_time: f32, post_spike_time: f32) -> f32 {
        let time_diff = post_spike_time - pre_spike_time;
        let StdpParams {
            learning_rate,
            time_constant,
        } = self.params;

        if time_diff > 0.0 {
            learning_rate * (-time_diff / time_constant).exp()
        } else {
            -learning_rate * (time_diff / time_constant).exp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdp_params_default() {
        let params = StdpParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.learning_rate, 0.01);
        assert_eq!(params.time_constant, 20.0);
    }

    #[test]
    fn test_stdp_params_validation() {
        assert!(StdpParams::new(0.0, 20.0).is_err());
        assert!(StdpParams::new(0.01, -1.0).is_err());
        assert!(StdpParams::new(0.05, 10.0).is_ok());
    }

    #[test]
    fn test_potentiation_and_depression() {
        let rule = StdpRule::default();

        let ltp = rule.weight_change(10.0, 15.0);
        assert!((ltp - 0.01 * (-5.0f32 / 20.0).exp()).abs() < 1e-7);

        let ltd = rule.weight_change(15.0, 10.0);
        assert!((ltd + 0.01 * (-5.0f32 / 20.0).exp()).abs() < 1e-7);

        // Simultaneous spikes depress at full strength
        assert!((rule.weight_change(3.0, 3.0) + 0.01).abs() < 1e-7);
    }

    #[test]
    fn test_window_decays_with_distance() {
        let rule = StdpRule::default();
        assert!(rule.weight_change(0.0, 1.0) > rule.weight_change(0.0, 40.0));
        assert!(rule.weight_change(1.0, 0.0) < rule.weight_change(40.0, 0.0));
    }

    #[test]
    fn test_mode_codes() {
        assert_eq!(PlasticityMode::from_code(1).unwrap(), PlasticityMode::Stdp);
        assert!(PlasticityMode::from_code(9).is_err());
        assert_eq!(PlasticityMode::default(), PlasticityMode::Static);
    }
}
