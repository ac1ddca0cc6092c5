//! This module provides helpers for working with environment
//! variables and paths, together with a struct
//! that keeps track of all the runtime-relevant paths.

use anyhow::Context;
use std::{path::PathBuf, str::FromStr};

/// Wrapper around [std::env::var] which adds [anyhow] context around errors.
pub fn get_var(name: &str) -> anyhow::Result<String> {
	std::env::var(name).with_context(|| format!("Missing ${name} environment variable"))
}

/// Reads an environment variable containing a directory path,
/// creating the directory if it doesn't exist.
pub fn get_env_dir_path(name: &str, default_to: Option<&str>) -> anyhow::Result<PathBuf> {
	let var = get_var(name);
	let var = match default_to {
		None => var?,
		Some(other) => var.or(get_var(other))?,
	};

	let path = PathBuf::from_str(&var).with_context(|| format!("${name} is not a valid path"))?;

	if !path.exists() {
		std::fs::create_dir_all(&path).with_context(|| format!("Could not create ${name}"))?;
	}

	Ok(path)
}

#[derive(Clone, Debug)]
pub struct GlimmerPaths {
	/// This directory contains files that are entirely managed
	/// by the runtime of the app, i.e. the calculation cache database.
	data_dir: PathBuf,
}

impl GlimmerPaths {
	/// Gets all the standard paths from the environment,
	/// creating every involved directory in the process.
	pub fn new() -> anyhow::Result<Self> {
		let res = Self {
			data_dir: get_env_dir_path("GLIMMER_DATA_DIR", Some("STATE_DIRECTORY"))?,
		};

		Ok(res)
	}

	pub fn data_dir(&self) -> &PathBuf {
		&self.data_dir
	}

	pub fn db_path(&self) -> PathBuf {
		self.data_dir.join("db.sqlite")
	}
}
