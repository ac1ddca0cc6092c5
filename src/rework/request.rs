use std::fmt::Write;

use crate::osu::mods::ModifierSet;

// {{{ Rework
/// A named, versioned variant of the scoring algorithm hosted by the
/// calculation server. `algorithm_version` bumps whenever the remote math
/// changes, which is what keeps stale cache entries from ever being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rework {
	pub id: u32,
	pub code: String,
	pub name: String,
	pub algorithm_version: u32,
}
// }}}
// {{{ Hit statistics
/// Judgement counts of the score being recalculated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitStatistics {
	pub count_300: u32,
	pub count_100: u32,
	pub count_50: u32,
	pub misses: u32,
	pub large_tick_hits: Option<u32>,
	pub slider_tail_hits: Option<u32>,
}
// }}}
// {{{ Calculation request
/// Everything the calculation server needs to recalculate one score.
///
/// Equality deliberately only considers the rework's id and
/// algorithm-version (not its code/name), so that structural equality and
/// fingerprint equality always agree.
#[derive(Debug, Clone)]
pub struct CalculationRequest {
	pub beatmap_id: u32,
	pub rework: Rework,
	pub mods: ModifierSet,
	pub combo: Option<u32>,
	pub statistics: Option<HitStatistics>,
}

impl PartialEq for CalculationRequest {
	fn eq(&self, other: &Self) -> bool {
		self.beatmap_id == other.beatmap_id
			&& self.rework.id == other.rework.id
			&& self.rework.algorithm_version == other.rework.algorithm_version
			&& self.mods == other.mods
			&& self.combo == other.combo
			&& self.statistics == other.statistics
	}
}

impl CalculationRequest {
	#[inline]
	pub fn new(beatmap_id: u32, rework: Rework, mods: ModifierSet) -> Self {
		Self {
			beatmap_id,
			rework,
			mods,
			combo: None,
			statistics: None,
		}
	}

	#[inline]
	pub fn with_combo(mut self, combo: Option<u32>) -> Self {
		self.combo = combo;
		self
	}

	#[inline]
	pub fn with_statistics(mut self, statistics: Option<HitStatistics>) -> Self {
		self.statistics = statistics;
		self
	}

	/// The same request pointed at a different rework. Used to rerun a
	/// score against e.g. the live baseline for comparison.
	#[inline]
	pub fn with_rework(&self, rework: Rework) -> Self {
		Self {
			rework,
			..self.clone()
		}
	}

	// {{{ Canonical encoding
	/// Canonical, stable text encoding of everything except the rework
	/// identity. Field order is fixed and optional fields are omitted
	/// outright, so structurally equal requests serialize identically.
	///
	/// The fingerprint below is a cache key, so this encoding's byte
	/// stability cannot depend on a serialization library's field ordering
	/// or float formatting. It stays hand-written.
	pub fn serialize(&self) -> String {
		let mut out = String::with_capacity(64);

		// Infallible: writing to a String cannot fail
		let _ = writeln!(out, "beatmap:{}", self.beatmap_id);
		let _ = writeln!(out, "mods:{}", self.mods);

		if let Some(combo) = self.combo {
			let _ = writeln!(out, "combo:{combo}");
		}

		if let Some(stats) = &self.statistics {
			let _ = writeln!(out, "count_300:{}", stats.count_300);
			let _ = writeln!(out, "count_100:{}", stats.count_100);
			let _ = writeln!(out, "count_50:{}", stats.count_50);
			let _ = writeln!(out, "misses:{}", stats.misses);

			if let Some(ticks) = stats.large_tick_hits {
				let _ = writeln!(out, "large_tick_hits:{ticks}");
			}

			if let Some(tails) = stats.slider_tail_hits {
				let _ = writeln!(out, "slider_tail_hits:{tails}");
			}
		}

		out
	}

	/// The cache key for this request: the rework identity on the first
	/// line, the canonical body after it. Not a hash: collision avoidance
	/// comes from the encoding being lossless and canonical.
	#[inline]
	pub fn fingerprint(&self) -> String {
		format!(
			"{},{}\n{}",
			self.rework.id,
			self.rework.algorithm_version,
			self.serialize()
		)
	}
	// }}}
}
// }}}
