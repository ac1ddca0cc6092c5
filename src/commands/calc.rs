// {{{ Imports
use anyhow::anyhow;
use poise::serenity_prelude::CreateEmbed;
use poise::CreateReply;

use crate::context::{Error, ErrorKind, PoiseContext, TagError, TaggedError};
use crate::get_user_error;
use crate::osu::beatmap::BeatmapAttributes;
use crate::osu::deviation::estimate_deviation;
use crate::osu::mods::ModifierSet;
use crate::rework::request::{CalculationRequest, HitStatistics};
// }}}

/// The rework every recalculation is compared against.
const BASELINE_REWORK: &str = "live";

// {{{ Top command
/// Recalculate scores against experimental pp reworks
#[poise::command(
	prefix_command,
	slash_command,
	subcommands("score", "attributes"),
	subcommand_required
)]
pub async fn calc(_ctx: PoiseContext<'_>) -> Result<(), Error> {
	Ok(())
}
// }}}
// {{{ Shared helpers
/// Parses the user's mod string, refusing inputs that contained text but no
/// single recognizable modifier.
fn parse_mods(text: Option<&str>) -> Result<ModifierSet, TaggedError> {
	let text = text.unwrap_or_default();
	let mods = ModifierSet::parse(text);

	if !text.trim().is_empty() && mods.recognized_count() == 0 {
		return Err(
			anyhow!("I couldn't make sense of any modifier in \"{text}\"").tag(ErrorKind::User)
		);
	}

	Ok(mods)
}

fn display_mods(mods: &ModifierSet) -> String {
	if mods.is_empty() {
		"NM".to_string()
	} else {
		mods.to_string()
	}
}

fn display_length(length_seconds: f64) -> String {
	let length = length_seconds.round() as u32;
	format!("{}:{:02}", length / 60, length % 60)
}

/// Judgement counts as typed by the user. The amount of 300s is whatever is
/// left after the explicitly given judgements.
fn build_statistics(
	map: &BeatmapAttributes,
	count_100: Option<u32>,
	count_50: Option<u32>,
	misses: Option<u32>,
) -> Option<HitStatistics> {
	if count_100.is_none() && count_50.is_none() && misses.is_none() {
		return None;
	}

	let count_100 = count_100.unwrap_or(0);
	let count_50 = count_50.unwrap_or(0);
	let misses = misses.unwrap_or(0);

	Some(HitStatistics {
		count_300: map
			.object_count()
			.saturating_sub(count_100 + count_50 + misses),
		count_100,
		count_50,
		misses,
		large_tick_hits: None,
		slider_tail_hits: None,
	})
}
// }}}
// {{{ Score
// {{{ Implementation
#[allow(clippy::too_many_arguments)]
async fn score_impl(
	ctx: &PoiseContext<'_>,
	beatmap_id: u32,
	rework_code: &str,
	mods: Option<&str>,
	combo: Option<u32>,
	count_100: Option<u32>,
	count_50: Option<u32>,
	misses: Option<u32>,
) -> Result<(), TaggedError> {
	let data = ctx.data();
	let mods = parse_mods(mods)?;

	let rework = data.client.rework(rework_code).await?;
	let baseline = data.client.rework(BASELINE_REWORK).await?;
	let map = data.client.beatmap(beatmap_id).await?;

	let statistics = build_statistics(&map, count_100, count_50, misses);
	let request = CalculationRequest::new(beatmap_id, rework.clone(), mods.clone())
		.with_combo(combo)
		.with_statistics(statistics);
	let baseline_request = request.with_rework(baseline);

	let response = data.calc_cache.get_or_compute(&data.client, &request).await?;
	let baseline_response = data
		.calc_cache
		.get_or_compute(&data.client, &baseline_request)
		.await?;

	// {{{ Presentation
	let adjusted = map.adjust(&mods);
	let deviation = statistics.and_then(|stats| {
		estimate_deviation(
			stats.count_300,
			stats.count_100,
			stats.count_50,
			stats.misses,
			map.circle_count,
			map.slider_count,
			adjusted.overall_difficulty,
			adjusted.clock_rate,
		)
	});

	let deviation_text = match deviation {
		Some(ur) if ur.is_infinite() => "∞".to_string(),
		Some(ur) => format!("{ur:.2}"),
		None => "not determinable".to_string(),
	};

	let pp_delta = response.performance.total - baseline_response.performance.total;

	let embed = CreateEmbed::default()
		.title(format!(
			"{} [{}] +{}",
			map.title,
			map.version,
			display_mods(&mods)
		))
		.field("Rework", rework.name, true)
		.field("Stars", format!("{:.2}★", response.difficulty.stars), true)
		.field(
			"PP",
			format!("{:.2}pp ({pp_delta:+.2} vs live)", response.performance.total),
			true,
		)
		.field("Accuracy", format!("{:.2}%", response.accuracy * 100.0), true)
		.field(
			"Combo",
			format!("{}/{}x", response.combo, response.difficulty.max_combo),
			true,
		)
		.field("Estimated UR", deviation_text, true);
	// }}}

	ctx.send(CreateReply::default().embed(embed)).await?;

	Ok(())
}
// }}}
/// Recalculate a score's pp under a given rework
#[poise::command(prefix_command, slash_command)]
#[allow(clippy::too_many_arguments)]
pub async fn score(
	ctx: PoiseContext<'_>,
	#[description = "Id of the map the score was set on"] beatmap_id: u32,
	#[description = "Code of the rework to recalculate against"] rework: String,
	#[description = "Modifiers, e.g. HDDT(1.3x)"] mods: Option<String>,
	#[description = "Highest combo reached"] combo: Option<u32>,
	#[description = "Amount of 100s"] count_100: Option<u32>,
	#[description = "Amount of 50s"] count_50: Option<u32>,
	#[description = "Amount of misses"] misses: Option<u32>,
) -> Result<(), Error> {
	let res = score_impl(
		&ctx,
		beatmap_id,
		&rework,
		mods.as_deref(),
		combo,
		count_100,
		count_50,
		misses,
	)
	.await;

	if let Err(err) = res {
		ctx.reply(format!("❌ {}", get_user_error!(err))).await?;
	}

	Ok(())
}
// }}}
// {{{ Attributes
// {{{ Implementation
async fn attributes_impl(
	ctx: &PoiseContext<'_>,
	beatmap_id: u32,
	mods: Option<&str>,
) -> Result<(), TaggedError> {
	let data = ctx.data();
	let mods = parse_mods(mods)?;
	let map = data.client.beatmap(beatmap_id).await?;
	let adjusted = map.adjust(&mods);

	let embed = CreateEmbed::default()
		.title(format!(
			"{} [{}] +{}",
			map.title,
			map.version,
			display_mods(&mods)
		))
		.field("CS", format!("{:.2}", adjusted.circle_size), true)
		.field("AR", format!("{:.2}", adjusted.approach_rate), true)
		.field("OD", format!("{:.2}", adjusted.overall_difficulty), true)
		.field("HP", format!("{:.2}", adjusted.drain_rate), true)
		.field("BPM", format!("{:.0}", adjusted.bpm), true)
		.field("Length", display_length(adjusted.length_seconds), true);

	ctx.send(CreateReply::default().embed(embed)).await?;

	Ok(())
}
// }}}
/// Show the mod-adjusted attributes of a map
#[poise::command(prefix_command, slash_command)]
pub async fn attributes(
	ctx: PoiseContext<'_>,
	#[description = "Id of the map"] beatmap_id: u32,
	#[description = "Modifiers, e.g. HDDT(1.3x)"] mods: Option<String>,
) -> Result<(), Error> {
	let res = attributes_impl(&ctx, beatmap_id, mods.as_deref()).await;

	if let Err(err) = res {
		ctx.reply(format!("❌ {}", get_user_error!(err))).await?;
	}

	Ok(())
}
// }}}
