//! Statistical estimate of a player's timing deviation ("estimated UR")
//! from aggregate judgement counts.

use std::f64::consts::PI;

use crate::osu::math::{erf, erf_inv};

/// Estimates the player's timing deviation from the hit-count breakdown of
/// a score, in unstable-rate units (deviation × 10).
///
/// Judgements are assigned to circles first (misses, then 50s, then 100s,
/// the remainder being 300s); 300s and 100s on circles are modeled as a
/// truncated normal distribution over their hit windows while 50s
/// contribute a uniform spread over the 50-window band. When no 300 landed
/// on a circle the estimate falls back to slider hit/miss counts alone, and
/// when that is degenerate too there is no estimate.
///
/// A score with no hits at all has unbounded nominal deviation, so it maps
/// to positive infinity rather than `None`.
pub fn estimate_deviation(
	count_300: u32,
	count_100: u32,
	count_50: u32,
	misses: u32,
	circle_count: u32,
	slider_count: u32,
	overall_difficulty: f64,
	clock_rate: f64,
) -> Option<f64> {
	if count_300 + count_100 + count_50 == 0 {
		return Some(f64::INFINITY);
	}

	// The 300 window comes straight from the adjusted OD. The wider windows
	// scale with OD at the unadjusted (pre-clock) value, so that one is
	// recovered first.
	let window_300 = 80.0 - 6.0 * overall_difficulty;
	let unscaled_od = (80.0 - window_300 * clock_rate) / 6.0;
	let window_100 = (140.0 - 8.0 * unscaled_od) / clock_rate;
	let window_50 = (200.0 - 10.0 * unscaled_od) / clock_rate;

	// Misses, 50s and 100s land on circles before they land on sliders
	let misses_on_circles = misses.min(circle_count);
	let mehs_on_circles = count_50.min(circle_count - misses_on_circles);
	let oks_on_circles = count_100.min(circle_count - misses_on_circles - mehs_on_circles);
	let greats_on_circles = circle_count - misses_on_circles - mehs_on_circles - oks_on_circles;

	if greats_on_circles > 0 {
		// Note count the normal part is estimated over; +1 keeps the
		// inverse error function finite on all-300 scores
		let n = (circle_count - misses_on_circles - mehs_on_circles) as f64;
		let great_probability = greats_on_circles as f64 / (n + 1.0);

		let mut deviation = window_300 / (2f64.sqrt() * erf_inv(great_probability));

		// Truncate the normal at the 100 window. The clamp covers float
		// noise pushing the factor barely below zero on near-uniform spreads
		let random_value = (2.0 / PI).sqrt() * window_100
			* (-0.5 * (window_100 / deviation).powi(2)).exp()
			/ (deviation * erf(window_100 / (2f64.sqrt() * deviation)));
		deviation *= (1.0 - random_value).max(0.0).sqrt();

		// 50s spread uniformly over the 50-window band
		let meh_variance =
			(window_50 * window_50 + window_100 * window_50 + window_100 * window_100) / 3.0;

		let normal_count = (greats_on_circles + oks_on_circles) as f64;
		let meh_count = mehs_on_circles as f64;
		deviation = ((normal_count * deviation * deviation + meh_count * meh_variance)
			/ (normal_count + meh_count))
			.sqrt();

		return Some(deviation * 10.0);
	}

	// Everything on circles missed or was judged on sliders; all that's
	// left to go by is whether slider hits stayed inside the 50 window
	let misses_on_sliders = (misses - misses_on_circles).min(slider_count);
	let greats_on_sliders = slider_count - misses_on_sliders;

	if greats_on_sliders == 0 {
		return None;
	}

	let great_probability = greats_on_sliders as f64 / (slider_count as f64 + 1.0);
	let deviation = window_50 / (2f64.sqrt() * erf_inv(great_probability));

	Some(deviation * 10.0)
}

// {{{ Tests
#[cfg(test)]
mod deviation_tests {
	use super::*;

	#[test]
	fn zero_hit_score_has_unbounded_deviation() {
		let estimate = estimate_deviation(0, 0, 0, 0, 5, 0, 8.0, 1.0);
		assert_eq!(estimate, Some(f64::INFINITY));
	}

	#[test]
	fn all_misses_with_no_sliders_is_undetermined() {
		let estimate = estimate_deviation(0, 0, 1, 99, 100, 0, 8.0, 1.0);
		assert_eq!(estimate, None);
	}

	#[test]
	fn cleaner_scores_estimate_lower() {
		let clean = estimate_deviation(395, 5, 0, 0, 300, 100, 9.0, 1.0).unwrap();
		let sloppy = estimate_deviation(320, 60, 15, 5, 300, 100, 9.0, 1.0).unwrap();

		assert!(clean.is_finite() && clean > 0.0);
		assert!(sloppy.is_finite());
		assert!(clean < sloppy, "expected {clean} < {sloppy}");
	}

	#[test]
	fn narrower_windows_estimate_lower_for_same_counts() {
		let od_5 = estimate_deviation(390, 10, 0, 0, 300, 100, 5.0, 1.0).unwrap();
		let od_10 = estimate_deviation(390, 10, 0, 0, 300, 100, 10.0, 1.0).unwrap();
		assert!(od_10 < od_5);
	}

	#[test]
	fn slider_only_fallback() {
		// Every circle missed, but most sliders survived
		let estimate = estimate_deviation(90, 0, 0, 10, 10, 100, 8.0, 1.0).unwrap();
		assert!(estimate.is_finite() && estimate > 0.0);
	}
}
// }}}
