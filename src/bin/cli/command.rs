#[derive(clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
	/// List the reworks hosted by the calculation server
	Reworks,

	/// Run a single calculation and print the result
	Calculate(CalculateArgs),
}

#[derive(clap::Args)]
pub struct CalculateArgs {
	/// Id of the map the score was set on
	pub beatmap_id: u32,

	/// Code of the rework to recalculate against
	pub rework: String,

	/// Modifiers, e.g. HDDT(1.3x)
	#[arg(long)]
	pub mods: Option<String>,

	/// Highest combo reached
	#[arg(long)]
	pub combo: Option<u32>,
}
