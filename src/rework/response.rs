use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::context::Error;

// {{{ Attribute groups
/// Difficulty attributes as computed by the remote engine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DifficultyAttributes {
	pub stars: f64,
	pub aim: f64,
	pub speed: f64,
	pub max_combo: u32,
}

/// Performance attributes as computed by the remote engine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PerformanceAttributes {
	pub total: f64,
	pub aim: f64,
	pub speed: f64,
	pub accuracy: f64,
}
// }}}
// {{{ Calculation response
/// What the calculation server sends back: difficulty and performance
/// attributes, plus an echo of the normalized score it computed them for.
///
/// The serde derives exist for the HTTP wire only. Cache storage goes
/// through the canonical text encoding below, which is hand-written for the
/// same reason the request encoding is: byte-stable output.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CalculationResponse {
	pub difficulty: DifficultyAttributes,
	pub performance: PerformanceAttributes,

	/// Normalized accuracy of the score that was calculated, in [0, 1].
	pub accuracy: f64,
	/// Combo the score was normalized to.
	pub combo: u32,
}

impl CalculationResponse {
	// {{{ Canonical encoding
	pub fn to_canonical_string(&self) -> String {
		use std::fmt::Write;

		let mut out = String::with_capacity(128);
		let _ = writeln!(out, "stars:{}", self.difficulty.stars);
		let _ = writeln!(out, "aim:{}", self.difficulty.aim);
		let _ = writeln!(out, "speed:{}", self.difficulty.speed);
		let _ = writeln!(out, "max_combo:{}", self.difficulty.max_combo);
		let _ = writeln!(out, "pp:{}", self.performance.total);
		let _ = writeln!(out, "pp_aim:{}", self.performance.aim);
		let _ = writeln!(out, "pp_speed:{}", self.performance.speed);
		let _ = writeln!(out, "pp_accuracy:{}", self.performance.accuracy);
		let _ = writeln!(out, "accuracy:{}", self.accuracy);
		let _ = writeln!(out, "combo:{}", self.combo);
		out
	}

	pub fn from_canonical_string(text: &str) -> Result<Self, Error> {
		let mut stars = None;
		let mut aim = None;
		let mut speed = None;
		let mut max_combo = None;
		let mut pp = None;
		let mut pp_aim = None;
		let mut pp_speed = None;
		let mut pp_accuracy = None;
		let mut accuracy = None;
		let mut combo = None;

		for line in text.lines() {
			let (key, value) = line
				.split_once(':')
				.ok_or_else(|| anyhow!("Malformed cache line `{line}`"))?;

			let slot = match key {
				"stars" => &mut stars,
				"aim" => &mut aim,
				"speed" => &mut speed,
				"max_combo" => &mut max_combo,
				"pp" => &mut pp,
				"pp_aim" => &mut pp_aim,
				"pp_speed" => &mut pp_speed,
				"pp_accuracy" => &mut pp_accuracy,
				"accuracy" => &mut accuracy,
				"combo" => &mut combo,
				other => return Err(anyhow!("Unknown cache field `{other}`")),
			};

			*slot = Some(
				value
					.parse::<f64>()
					.with_context(|| format!("Bad value for cache field `{key}`"))?,
			);
		}

		let require = |slot: Option<f64>, key: &str| {
			slot.ok_or_else(|| anyhow!("Missing cache field `{key}`"))
		};

		Ok(Self {
			difficulty: DifficultyAttributes {
				stars: require(stars, "stars")?,
				aim: require(aim, "aim")?,
				speed: require(speed, "speed")?,
				max_combo: require(max_combo, "max_combo")? as u32,
			},
			performance: PerformanceAttributes {
				total: require(pp, "pp")?,
				aim: require(pp_aim, "pp_aim")?,
				speed: require(pp_speed, "pp_speed")?,
				accuracy: require(pp_accuracy, "pp_accuracy")?,
			},
			accuracy: require(accuracy, "accuracy")?,
			combo: require(combo, "combo")? as u32,
		})
	}
	// }}}
}
// }}}
// {{{ Tests
#[cfg(test)]
mod response_tests {
	use super::*;

	pub(crate) fn sample() -> CalculationResponse {
		CalculationResponse {
			difficulty: DifficultyAttributes {
				stars: 6.32,
				aim: 3.1,
				speed: 2.9,
				max_combo: 1203,
			},
			performance: PerformanceAttributes {
				total: 432.55,
				aim: 180.2,
				speed: 160.01,
				accuracy: 92.34,
			},
			accuracy: 0.9871,
			combo: 1100,
		}
	}

	#[test]
	fn canonical_encoding_round_trips() {
		let response = sample();
		let text = response.to_canonical_string();
		assert_eq!(CalculationResponse::from_canonical_string(&text).unwrap(), response);
		assert_eq!(text.lines().count(), 10);
	}

	#[test]
	fn missing_fields_are_rejected() {
		let result = CalculationResponse::from_canonical_string("stars:1.0\naim:2.0");
		assert!(result.is_err());

		let result = CalculationResponse::from_canonical_string("nonsense");
		assert!(result.is_err());
	}
}
// }}}
