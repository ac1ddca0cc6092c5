use clap::Parser;
use command::{Cli, Command};
use glimmerpp::context::{BotContext, Error};
use glimmerpp::osu::mods::ModifierSet;
use glimmerpp::rework::request::CalculationRequest;

mod command;

#[tokio::main]
async fn main() -> Result<(), Error> {
	let cli = Cli::parse();
	let ctx = BotContext::new()?;

	match cli.command {
		Command::Reworks => {
			for rework in ctx.client.reworks().await? {
				println!(
					"#{} {} ({}), algorithm v{}",
					rework.id, rework.code, rework.name, rework.algorithm_version
				);
			}
		}
		Command::Calculate(args) => {
			let mods = ModifierSet::parse(args.mods.as_deref().unwrap_or_default());
			let rework = ctx
				.client
				.rework(&args.rework)
				.await
				.map_err(|err| err.error)?;

			let request = CalculationRequest::new(args.beatmap_id, rework, mods)
				.with_combo(args.combo);
			let response = ctx
				.calc_cache
				.get_or_compute(&ctx.client, &request)
				.await
				.map_err(|err| err.error)?;

			println!(
				"{:.2}★ | {:.2}pp | {:.2}% at {}x combo",
				response.difficulty.stars,
				response.performance.total,
				response.accuracy * 100.0,
				response.combo
			);
		}
	}

	Ok(())
}
