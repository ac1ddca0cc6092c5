use glimmerpp::commands;
use glimmerpp::context::{BotContext, Error};
use poise::serenity_prelude::{self as serenity};
use std::{env::var, sync::Arc, time::Duration};

// {{{ Error handler
async fn on_error(error: poise::FrameworkError<'_, BotContext, Error>) {
	if let Err(e) = poise::builtins::on_error(error).await {
		println!("Error while handling error: {}", e)
	}
}
// }}}

#[tokio::main]
async fn main() {
	// {{{ Poise options
	let options = poise::FrameworkOptions {
		commands: vec![commands::help(), commands::calc::calc()],
		prefix_options: poise::PrefixFrameworkOptions {
			prefix: Some("!".to_string()),
			edit_tracker: Some(Arc::new(poise::EditTracker::for_timespan(
				Duration::from_secs(3600),
			))),
			..Default::default()
		},
		on_error: |error| Box::pin(on_error(error)),
		..Default::default()
	};
	// }}}
	// {{{ Start poise
	let framework = poise::Framework::builder()
		.setup(move |ctx, _ready, framework| {
			Box::pin(async move {
				println!("Logged in as {}", _ready.user.name);
				poise::builtins::register_globally(ctx, &framework.options().commands).await?;
				let ctx = BotContext::new()?;

				Ok(ctx)
			})
		})
		.options(options)
		.build();

	let token = var("GLIMMER_DISCORD_TOKEN").expect("Missing `GLIMMER_DISCORD_TOKEN` env var");
	let intents =
		serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

	let client = serenity::ClientBuilder::new(token, intents)
		.framework(framework)
		.await;

	client.unwrap().start().await.unwrap()
	// }}}
}
