//! Error-function approximations used by the deviation estimator.
//!
//! Accurate to roughly 1e-7, which is more than the estimator needs.

use std::f64::consts::PI;

/// Abramowitz & Stegun 7.1.26, maximal error around 1.5e-7.
pub fn erf(x: f64) -> f64 {
	const A1: f64 = 0.254829592;
	const A2: f64 = -0.284496736;
	const A3: f64 = 1.421413741;
	const A4: f64 = -1.453152027;
	const A5: f64 = 1.061405429;
	const P: f64 = 0.3275911;

	let sign = if x < 0.0 { -1.0 } else { 1.0 };
	let x = x.abs();

	let t = 1.0 / (1.0 + P * x);
	let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

	sign * y
}

/// Inverse of [erf] over (-1, 1). Giles' polynomial initial guess, then two
/// Newton steps against [erf] to tighten it.
///
/// Returns infinity at ±1, mirroring the unbounded deviation of a
/// probability-one estimate.
pub fn erf_inv(x: f64) -> f64 {
	if x <= -1.0 {
		return f64::NEG_INFINITY;
	}
	if x >= 1.0 {
		return f64::INFINITY;
	}
	if x == 0.0 {
		return 0.0;
	}

	let mut w = -((1.0 - x) * (1.0 + x)).ln();
	let mut p;

	if w < 5.0 {
		w -= 2.5;
		p = 2.81022636e-08;
		p = 3.43273939e-07 + p * w;
		p = -3.5233877e-06 + p * w;
		p = -4.39150654e-06 + p * w;
		p = 0.00021858087 + p * w;
		p = -0.00125372503 + p * w;
		p = -0.00417768164 + p * w;
		p = 0.246640727 + p * w;
		p = 1.50140941 + p * w;
	} else {
		w = w.sqrt() - 3.0;
		p = -0.000200214257;
		p = 0.000100950558 + p * w;
		p = 0.00134934322 + p * w;
		p = -0.00367342844 + p * w;
		p = 0.00573950773 + p * w;
		p = -0.0076224613 + p * w;
		p = 0.00943887047 + p * w;
		p = 1.00167406 + p * w;
		p = 2.83297682 + p * w;
	}

	let mut r = p * x;

	// The refinement multiplies the polynomial's error by exp(r²), so it
	// only helps close to the origin
	for _ in 0..2 {
		if r * r > 9.0 {
			break;
		}

		let err = erf(r) - x;
		r -= err * PI.sqrt() / 2.0 * (r * r).exp();
	}

	r
}

// {{{ Tests
#[cfg(test)]
mod erf_tests {
	use super::*;

	#[test]
	fn erf_known_values() {
		assert_eq!(erf(0.0), 0.0);
		assert!((erf(1.0) - 0.8427007929).abs() < 1e-6);
		assert!((erf(-1.0) + 0.8427007929).abs() < 1e-6);
		assert!((erf(3.0) - 0.9999779095).abs() < 1e-6);
	}

	#[test]
	fn erf_inv_inverts_erf() {
		for x in [-1.5, -0.7, -0.1, 0.05, 0.5, 1.0, 2.0] {
			let there_and_back = erf_inv(erf(x));
			assert!(
				(there_and_back - x).abs() < 1e-5,
				"erf_inv(erf({x})) = {there_and_back}"
			);
		}
	}

	#[test]
	fn erf_inv_saturates() {
		assert_eq!(erf_inv(1.0), f64::INFINITY);
		assert_eq!(erf_inv(-1.0), f64::NEG_INFINITY);
	}
}
// }}}
