use std::collections::BTreeMap;
use std::fmt::Display;

// {{{ Acronym
/// Every modifier acronym the calculation server knows about. The variant
/// order doubles as the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModAcronym {
	EZ,
	NF,
	HT,
	DC,
	HD,
	HR,
	SD,
	PF,
	DT,
	NC,
	FL,
	SO,
	TD,
	RX,
	AP,
	CL,
	DA,
}

impl ModAcronym {
	pub const ACRONYMS: [Self; 17] = [
		Self::EZ,
		Self::NF,
		Self::HT,
		Self::DC,
		Self::HD,
		Self::HR,
		Self::SD,
		Self::PF,
		Self::DT,
		Self::NC,
		Self::FL,
		Self::SO,
		Self::TD,
		Self::RX,
		Self::AP,
		Self::CL,
		Self::DA,
	];

	pub const ACRONYM_STRINGS: [&'static str; 17] = [
		"EZ", "NF", "HT", "DC", "HD", "HR", "SD", "PF", "DT", "NC", "FL", "SO", "TD", "RX", "AP",
		"CL", "DA",
	];

	const DOUBLE_TIME_FAMILY: [Self; 2] = [Self::DT, Self::NC];
	const HALF_TIME_FAMILY: [Self; 2] = [Self::HT, Self::DC];

	#[inline]
	pub fn to_index(self) -> usize {
		self as usize
	}

	/// Whether this modifier alters the playback clock.
	#[inline]
	pub fn is_speed_changing(self) -> bool {
		Self::DOUBLE_TIME_FAMILY.contains(&self) || Self::HALF_TIME_FAMILY.contains(&self)
	}

	/// The clock rate this modifier implies when no explicit
	/// `speed_change` setting is attached to it.
	#[inline]
	pub fn default_clock_rate(self) -> Option<f64> {
		if Self::DOUBLE_TIME_FAMILY.contains(&self) {
			Some(1.5)
		} else if Self::HALF_TIME_FAMILY.contains(&self) {
			Some(0.75)
		} else {
			None
		}
	}
}

impl TryFrom<&str> for ModAcronym {
	type Error = String;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		for (i, s) in Self::ACRONYM_STRINGS.iter().enumerate() {
			if value == *s {
				return Ok(Self::ACRONYMS[i]);
			}
		}

		Err(format!("Unknown modifier acronym {value}"))
	}
}

impl Display for ModAcronym {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", Self::ACRONYM_STRINGS[self.to_index()])
	}
}
// }}}
// {{{ Setting
/// Numeric sub-settings a modifier can carry. The variant order fixes the
/// order they are rendered in, which keeps serialized mod strings stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModSetting {
	SpeedChange,
	CircleSize,
	ApproachRate,
	OverallDifficulty,
}

impl ModSetting {
	pub const SETTINGS: [Self; 4] = [
		Self::SpeedChange,
		Self::CircleSize,
		Self::ApproachRate,
		Self::OverallDifficulty,
	];

	pub const SETTING_STRINGS: [&'static str; 4] = [
		"speed_change",
		"circle_size",
		"approach_rate",
		"overall_difficulty",
	];

	/// The abbreviated keys users type inside `DA(...)`.
	pub const SETTING_SHORTHANDS: [&'static str; 4] = ["rate", "cs", "ar", "od"];

	#[inline]
	pub fn to_index(self) -> usize {
		self as usize
	}

	fn from_shorthand(value: &str) -> Option<Self> {
		for (i, s) in Self::SETTING_SHORTHANDS.iter().enumerate() {
			if value.eq_ignore_ascii_case(s) {
				return Some(Self::SETTINGS[i]);
			}
		}

		None
	}
}

impl Display for ModSetting {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", Self::SETTING_STRINGS[self.to_index()])
	}
}
// }}}
// {{{ Modifier
/// An acronym together with its settings. Settings are only ever built at
/// parse time or through the pure `with_*` helpers on [ModifierSet].
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
	pub acronym: ModAcronym,
	pub settings: BTreeMap<ModSetting, f64>,
}

impl Modifier {
	#[inline]
	pub fn new(acronym: ModAcronym) -> Self {
		Self {
			acronym,
			settings: BTreeMap::new(),
		}
	}

	#[inline]
	pub fn setting(&self, setting: ModSetting) -> Option<f64> {
		self.settings.get(&setting).copied()
	}
}
// }}}
// {{{ ModifierSet
/// A set of modifiers, keyed by acronym. The key order of the inner map is
/// the canonical display order, so iteration is deterministic.
#[derive(Debug, Clone, Default)]
pub struct ModifierSet {
	mods: BTreeMap<ModAcronym, Modifier>,

	/// How many acronyms the parser actually understood. Callers can warn
	/// when a non-empty input produced zero recognized modifiers.
	recognized: usize,
}

impl PartialEq for ModifierSet {
	fn eq(&self, other: &Self) -> bool {
		self.mods == other.mods
	}
}

impl ModifierSet {
	// {{{ Parsing
	/// Parses a free-form mod string like `+HDDT(1.3x)` or `DA(cs:5,ar:9.5)`.
	///
	/// The input is split into two-character chunks after stripping a leading
	/// `+`, all whitespace, and case. Chunks that aren't known acronyms are
	/// dropped, together with any parenthesized suffix attached to them, so
	/// this never fails; at worst it returns an empty set.
	pub fn parse(text: &str) -> Self {
		let cleaned: String = text
			.trim()
			.trim_start_matches('+')
			.chars()
			.filter(|c| !c.is_whitespace())
			.collect::<String>()
			.to_uppercase();
		let chars: Vec<char> = cleaned.chars().collect();

		let mut mods = BTreeMap::new();
		let mut recognized = 0;
		let mut i = 0;

		while i + 2 <= chars.len() {
			let chunk: String = chars[i..i + 2].iter().collect();
			i += 2;

			// A parenthesized suffix belongs to the chunk before it, even
			// when that chunk ends up being dropped.
			let suffix = if chars.get(i) == Some(&'(') {
				match chars[i..].iter().position(|&c| c == ')') {
					Some(close) => {
						let inner: String = chars[i + 1..i + close].iter().collect();
						i += close + 1;
						Some(inner)
					}
					None => {
						// Unterminated settings list; consume the rest
						let inner: String = chars[i + 1..].iter().collect();
						i = chars.len();
						Some(inner)
					}
				}
			} else {
				None
			};

			let Ok(acronym) = ModAcronym::try_from(chunk.as_str()) else {
				continue;
			};

			recognized += 1;

			let mut modifier = Modifier::new(acronym);
			if let Some(inner) = suffix {
				modifier.settings = Self::parse_settings(acronym, &inner);
			}

			mods.insert(acronym, modifier);
		}

		Self { mods, recognized }
	}

	fn parse_settings(acronym: ModAcronym, raw: &str) -> BTreeMap<ModSetting, f64> {
		let mut settings = BTreeMap::new();

		if acronym.is_speed_changing() {
			// Bare numeric suffix like `1.3x`
			if let Ok(rate) = raw.trim_end_matches(['x', 'X']).parse::<f64>() {
				settings.insert(ModSetting::SpeedChange, rate);
			}
		} else if acronym == ModAcronym::DA {
			// Comma separated `key:value` list with abbreviated keys
			for pair in raw.split(',') {
				let Some((key, value)) = pair.split_once(':') else {
					continue;
				};
				let Some(setting) = ModSetting::from_shorthand(key.trim()) else {
					continue;
				};
				let Ok(value) = value.trim().parse::<f64>() else {
					continue;
				};

				settings.insert(setting, value);
			}
		}

		settings
	}
	// }}}
	// {{{ Queries
	#[inline]
	pub fn len(&self) -> usize {
		self.mods.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.mods.is_empty()
	}

	#[inline]
	pub fn contains(&self, acronym: ModAcronym) -> bool {
		self.mods.contains_key(&acronym)
	}

	#[inline]
	pub fn get(&self, acronym: ModAcronym) -> Option<&Modifier> {
		self.mods.get(&acronym)
	}

	#[inline]
	pub fn iter(&self) -> impl Iterator<Item = &Modifier> {
		self.mods.values()
	}

	/// How many acronyms [Self::parse] understood. Zero for sets built by
	/// hand through the `with_*` helpers.
	#[inline]
	pub fn recognized_count(&self) -> usize {
		self.recognized
	}

	/// The playback speed multiplier implied by this set.
	pub fn clock_rate(&self) -> f64 {
		for acronym in [ModAcronym::DT, ModAcronym::NC, ModAcronym::HT, ModAcronym::DC] {
			if let Some(modifier) = self.get(acronym) {
				return modifier
					.setting(ModSetting::SpeedChange)
					.or(acronym.default_clock_rate())
					.unwrap_or(1.0);
			}
		}

		1.0
	}

	#[inline]
	pub fn is_hard_rock(&self) -> bool {
		self.contains(ModAcronym::HR)
	}

	#[inline]
	pub fn is_easy(&self) -> bool {
		self.contains(ModAcronym::EZ)
	}

	#[inline]
	pub fn is_classic(&self) -> bool {
		self.contains(ModAcronym::CL)
	}

	#[inline]
	pub fn is_flashlight(&self) -> bool {
		self.contains(ModAcronym::FL)
	}

	#[inline]
	pub fn adjusted_circle_size(&self) -> Option<f64> {
		self.difficulty_override(ModSetting::CircleSize)
	}

	#[inline]
	pub fn adjusted_approach_rate(&self) -> Option<f64> {
		self.difficulty_override(ModSetting::ApproachRate)
	}

	#[inline]
	pub fn adjusted_overall_difficulty(&self) -> Option<f64> {
		self.difficulty_override(ModSetting::OverallDifficulty)
	}

	#[inline]
	fn difficulty_override(&self, setting: ModSetting) -> Option<f64> {
		self.get(ModAcronym::DA)?.setting(setting)
	}
	// }}}
	// {{{ Pure updates
	/// Returns a set whose clock rate is `rate`, rounded to two decimals.
	///
	/// A rounded rate of 1.0 removes every speed modifier; rates above 1.0
	/// keep/introduce a double-time-family modifier, rates below keep the
	/// half-time family.
	pub fn with_clock_rate(mut self, rate: f64) -> Self {
		let rate = (rate * 100.0).round() / 100.0;

		let family = if rate > 1.0 {
			&[ModAcronym::NC, ModAcronym::DT]
		} else {
			&[ModAcronym::DC, ModAcronym::HT]
		};

		if rate == 1.0 {
			for acronym in [ModAcronym::DT, ModAcronym::NC, ModAcronym::HT, ModAcronym::DC] {
				self.mods.remove(&acronym);
			}

			return self;
		}

		// The opposite family can't coexist with the new rate
		for acronym in [ModAcronym::DT, ModAcronym::NC, ModAcronym::HT, ModAcronym::DC] {
			if !family.contains(&acronym) {
				self.mods.remove(&acronym);
			}
		}

		// Prefer whichever family member is already present
		let acronym = if self.contains(family[0]) {
			family[0]
		} else {
			family[1]
		};

		self.mods
			.entry(acronym)
			.or_insert_with(|| Modifier::new(acronym))
			.settings
			.insert(ModSetting::SpeedChange, rate);

		self
	}

	pub fn with_circle_size(self, value: f64) -> Self {
		self.with_difficulty_override(ModSetting::CircleSize, value)
	}

	pub fn with_approach_rate(self, value: f64) -> Self {
		self.with_difficulty_override(ModSetting::ApproachRate, value)
	}

	pub fn with_overall_difficulty(self, value: f64) -> Self {
		self.with_difficulty_override(ModSetting::OverallDifficulty, value)
	}

	/// Rounds to one decimal and stores the value on the difficulty-adjust
	/// modifier, leaving its other settings untouched.
	fn with_difficulty_override(mut self, setting: ModSetting, value: f64) -> Self {
		let value = (value * 10.0).round() / 10.0;

		self.mods
			.entry(ModAcronym::DA)
			.or_insert_with(|| Modifier::new(ModAcronym::DA))
			.settings
			.insert(setting, value);

		self
	}
	// }}}
}

impl Display for ModifierSet {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		for modifier in self.mods.values() {
			write!(f, "{}", modifier.acronym)?;

			if modifier.acronym.is_speed_changing() {
				if let Some(rate) = modifier.setting(ModSetting::SpeedChange) {
					write!(f, "({rate}x)")?;
				}
			} else if modifier.acronym == ModAcronym::DA && !modifier.settings.is_empty() {
				write!(f, "(")?;
				for (i, (setting, value)) in modifier.settings.iter().enumerate() {
					if i > 0 {
						write!(f, ",")?;
					}
					write!(
						f,
						"{}:{}",
						ModSetting::SETTING_SHORTHANDS[setting.to_index()],
						value
					)?;
				}
				write!(f, ")")?;
			}
		}

		Ok(())
	}
}
// }}}
// {{{ Tests
#[cfg(test)]
mod modifier_tests {
	use super::*;

	#[test]
	fn parses_speed_settings() {
		let mods = ModifierSet::parse("HDDT(1.3x)");
		assert_eq!(mods.len(), 2);
		assert!(mods.contains(ModAcronym::HD));
		assert_eq!(
			mods.get(ModAcronym::DT).unwrap().setting(ModSetting::SpeedChange),
			Some(1.3)
		);
		assert_eq!(mods.clock_rate(), 1.3);
	}

	#[test]
	fn parses_difficulty_overrides() {
		let mods = ModifierSet::parse("DA(cs:5,ar:9.5)");
		assert_eq!(mods.len(), 1);
		assert_eq!(mods.adjusted_circle_size(), Some(5.0));
		assert_eq!(mods.adjusted_approach_rate(), Some(9.5));
		assert_eq!(mods.adjusted_overall_difficulty(), None);
	}

	#[test]
	fn drops_unknown_chunks() {
		let mods = ModifierSet::parse("+hd zz(9x) dt");
		assert_eq!(mods.len(), 2);
		assert_eq!(mods.recognized_count(), 2);
		assert!(mods.contains(ModAcronym::HD));
		assert!(mods.contains(ModAcronym::DT));

		let garbage = ModifierSet::parse("speed up the map please");
		assert!(garbage.is_empty());
		assert_eq!(garbage.recognized_count(), 0);
	}

	#[test]
	fn default_clock_rates() {
		assert_eq!(ModifierSet::parse("HD").clock_rate(), 1.0);
		assert_eq!(ModifierSet::parse("NC").clock_rate(), 1.5);
		assert_eq!(ModifierSet::parse("HT").clock_rate(), 0.75);
		assert_eq!(ModifierSet::parse("DC(0.8x)").clock_rate(), 0.8);
	}

	#[test]
	fn display_round_trips() {
		for text in [
			"",
			"HD",
			"HDDT(1.3x)",
			"EZHTFL",
			"DA(cs:5,ar:9.5)",
			"HRDA(od:10)",
			"NC(1.45x)HDCL",
		] {
			let mods = ModifierSet::parse(text);
			let reparsed = ModifierSet::parse(&mods.to_string());
			assert_eq!(mods, reparsed, "{text} did not round-trip");
		}
	}

	#[test]
	fn clock_rate_updates() {
		let mods = ModifierSet::parse("HDDT").with_clock_rate(1.333333);
		assert_eq!(mods.clock_rate(), 1.33);

		// 1.0 drops the speed modifier entirely
		let mods = ModifierSet::parse("HDDT(1.2x)").with_clock_rate(1.0);
		assert!(!mods.contains(ModAcronym::DT));
		assert_eq!(mods.clock_rate(), 1.0);

		// Crossing 1.0 swaps families
		let mods = ModifierSet::parse("NC").with_clock_rate(0.9);
		assert!(!mods.contains(ModAcronym::NC));
		assert_eq!(
			mods.get(ModAcronym::HT).unwrap().setting(ModSetting::SpeedChange),
			Some(0.9)
		);

		// An existing nightcore is kept rather than replaced by DT
		let mods = ModifierSet::parse("NC").with_clock_rate(1.6);
		assert!(mods.contains(ModAcronym::NC));
		assert!(!mods.contains(ModAcronym::DT));
		assert_eq!(mods.clock_rate(), 1.6);
	}

	#[test]
	fn difficulty_override_updates() {
		let mods = ModifierSet::parse("DA(cs:4)")
			.with_approach_rate(9.47)
			.with_overall_difficulty(8.0);

		assert_eq!(mods.adjusted_circle_size(), Some(4.0));
		assert_eq!(mods.adjusted_approach_rate(), Some(9.5));
		assert_eq!(mods.adjusted_overall_difficulty(), Some(8.0));
		assert_eq!(mods.len(), 1);
	}
}
// }}}
