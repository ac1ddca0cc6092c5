use crate::osu::mods::ModifierSet;

// {{{ Base attributes
/// Unmodified beatmap attributes, as served by the beatmap source.
/// Immutable once fetched; everything mod-dependent is derived on demand
/// through [BeatmapAttributes::adjust].
#[derive(Debug, Clone, PartialEq)]
pub struct BeatmapAttributes {
	pub beatmap_id: u32,
	pub title: String,
	pub version: String,

	pub circle_size: f64,
	pub approach_rate: f64,
	pub overall_difficulty: f64,
	pub drain_rate: f64,
	pub bpm: f64,
	pub length_seconds: f64,

	pub circle_count: u32,
	pub slider_count: u32,
	pub spinner_count: u32,
	pub max_combo: u32,
}

impl BeatmapAttributes {
	#[inline]
	pub fn object_count(&self) -> u32 {
		self.circle_count + self.slider_count + self.spinner_count
	}

	/// Derives the attributes the map effectively plays at under `mods`.
	pub fn adjust(&self, mods: &ModifierSet) -> AdjustedAttributes {
		let clock_rate = mods.clock_rate();

		AdjustedAttributes {
			circle_size: adjusted_circle_size(self.circle_size, mods),
			approach_rate: adjusted_approach_rate(self.approach_rate, mods),
			overall_difficulty: adjusted_overall_difficulty(self.overall_difficulty, mods),
			drain_rate: adjusted_drain_rate(self.drain_rate, mods),
			bpm: self.bpm * clock_rate,
			length_seconds: self.length_seconds / clock_rate,
			clock_rate,
		}
	}
}
// }}}
// {{{ Adjusted attributes
/// Mod-adjusted attributes. Never stored; recomputed per request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedAttributes {
	pub circle_size: f64,
	pub approach_rate: f64,
	pub overall_difficulty: f64,
	pub drain_rate: f64,
	pub bpm: f64,
	pub length_seconds: f64,
	pub clock_rate: f64,
}
// }}}
// {{{ Attribute math
/// AR→preempt, in milliseconds. Three-segment piecewise linear map.
#[inline]
fn preempt_from_approach_rate(ar: f64) -> f64 {
	if ar >= 5.0 {
		1200.0 - 750.0 * (ar - 5.0) / 5.0
	} else {
		1200.0 + 600.0 * (5.0 - ar) / 5.0
	}
}

/// The inverse of [preempt_from_approach_rate]. The 1200ms case is special
/// cased so a unit clock rate maps an AR back to exactly itself.
#[inline]
fn approach_rate_from_preempt(ms: f64) -> f64 {
	if ms == 1200.0 {
		5.0
	} else if ms < 1200.0 {
		5.0 + (1200.0 - ms) / 150.0
	} else {
		5.0 - (ms - 1200.0) / 120.0
	}
}

fn adjusted_circle_size(cs: f64, mods: &ModifierSet) -> f64 {
	if let Some(value) = mods.adjusted_circle_size() {
		return value;
	}

	let cs = if mods.is_hard_rock() {
		cs * 1.3
	} else if mods.is_easy() {
		cs * 0.5
	} else {
		cs
	};

	cs.min(10.0)
}

fn adjusted_approach_rate(ar: f64, mods: &ModifierSet) -> f64 {
	if let Some(value) = mods.adjusted_approach_rate() {
		return value;
	}

	let ar = if mods.is_hard_rock() {
		(ar * 1.4).min(10.0)
	} else if mods.is_easy() {
		ar * 0.5
	} else {
		ar
	};

	let preempt = preempt_from_approach_rate(ar) / mods.clock_rate();
	approach_rate_from_preempt(preempt).min(11.11)
}

fn adjusted_overall_difficulty(od: f64, mods: &ModifierSet) -> f64 {
	if let Some(value) = mods.adjusted_overall_difficulty() {
		return value;
	}

	let od = if mods.is_hard_rock() {
		(od * 1.4).min(10.0)
	} else if mods.is_easy() {
		od * 0.5
	} else {
		od
	};

	let hit_window = (80.0 - 6.0 * od) / mods.clock_rate();
	((80.0 - hit_window) / 6.0).min(11.1)
}

fn adjusted_drain_rate(hp: f64, mods: &ModifierSet) -> f64 {
	let hp = if mods.is_hard_rock() {
		hp * 1.4
	} else if mods.is_easy() {
		hp * 0.5
	} else {
		hp
	};

	hp.min(10.0)
}
// }}}
// {{{ Tests
#[cfg(test)]
mod adjust_tests {
	use super::*;

	fn base() -> BeatmapAttributes {
		BeatmapAttributes {
			beatmap_id: 75,
			title: "Disco Prince".to_string(),
			version: "Normal".to_string(),
			circle_size: 4.0,
			approach_rate: 8.0,
			overall_difficulty: 8.0,
			drain_rate: 6.0,
			bpm: 120.0,
			length_seconds: 142.0,
			circle_count: 160,
			slider_count: 30,
			spinner_count: 1,
			max_combo: 314,
		}
	}

	#[test]
	fn hard_rock_overall_difficulty_caps_at_ten() {
		let adjusted = base().adjust(&ModifierSet::parse("HR"));
		assert_eq!(adjusted.overall_difficulty, 10.0);
	}

	#[test]
	fn no_mods_is_identity() {
		let map = base();
		let adjusted = map.adjust(&ModifierSet::parse(""));
		assert_eq!(adjusted.circle_size, map.circle_size);
		assert_eq!(adjusted.approach_rate, map.approach_rate);
		assert_eq!(adjusted.overall_difficulty, map.overall_difficulty);
		assert_eq!(adjusted.drain_rate, map.drain_rate);
		assert_eq!(adjusted.bpm, map.bpm);
		assert_eq!(adjusted.length_seconds, map.length_seconds);
		assert_eq!(adjusted.clock_rate, 1.0);
	}

	#[test]
	fn double_time_scales_approach_rate() {
		let adjusted = base().adjust(&ModifierSet::parse("DT"));

		// AR8 has a 750ms preempt; DT brings it down to 500ms
		let expected = 5.0 + (1200.0 - 750.0 / 1.5) / 150.0;
		assert!((adjusted.approach_rate - expected).abs() < 1e-9);
		assert_eq!(adjusted.bpm, 180.0);
		assert!((adjusted.length_seconds - 142.0 / 1.5).abs() < 1e-9);
	}

	#[test]
	fn half_time_lowers_approach_rate() {
		let map = BeatmapAttributes {
			approach_rate: 5.0,
			..base()
		};
		let adjusted = map.adjust(&ModifierSet::parse("HT"));

		// AR5 preempt is exactly 1200ms; at 0.75x it becomes 1600ms
		assert!((adjusted.approach_rate - (5.0 - 400.0 / 120.0)).abs() < 1e-9);
		assert_eq!(adjusted.bpm, 90.0);
	}

	#[test]
	fn double_time_overall_difficulty() {
		let adjusted = base().adjust(&ModifierSet::parse("DT"));

		// 300-window of OD8 is 32ms; at 1.5x it narrows to 32/1.5
		let expected = (80.0 - 32.0 / 1.5) / 6.0;
		assert!((adjusted.overall_difficulty - expected).abs() < 1e-9);
	}

	#[test]
	fn easy_halves_difficulty_fields() {
		let adjusted = base().adjust(&ModifierSet::parse("EZ"));
		assert_eq!(adjusted.circle_size, 2.0);
		assert_eq!(adjusted.approach_rate, 4.0);
		assert_eq!(adjusted.overall_difficulty, 4.0);
		assert_eq!(adjusted.drain_rate, 3.0);
	}

	#[test]
	fn hard_rock_wins_over_easy() {
		let adjusted = base().adjust(&ModifierSet::parse("EZHR"));
		assert_eq!(adjusted.overall_difficulty, 10.0);
		assert!((adjusted.circle_size - 4.0 * 1.3).abs() < 1e-9);
	}

	#[test]
	fn explicit_override_beats_everything() {
		let adjusted = base().adjust(&ModifierSet::parse("HRDT(2x)DA(ar:9.5,cs:5)"));
		assert_eq!(adjusted.approach_rate, 9.5);
		assert_eq!(adjusted.circle_size, 5.0);

		// OD has no override here, so the usual math applies
		assert!(adjusted.overall_difficulty > 10.0);
	}
}
// }}}
