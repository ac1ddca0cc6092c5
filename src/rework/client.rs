// {{{ Imports
use std::future::Future;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::context::paths::get_var;
use crate::context::{Error, ErrorKind, TagError, TaggedError};
use crate::osu::beatmap::BeatmapAttributes;
use crate::rework::request::Rework;
use crate::rework::response::CalculationResponse;
// }}}

// {{{ Remote calculator seam
/// The one thing this crate asks of the scoring engine: turn a serialized
/// calculation request into a response. No retry policy lives here; if an
/// implementer wants one, it goes behind this trait.
pub trait RemoteCalculator {
	fn compute(
		&self,
		payload: &str,
	) -> impl Future<Output = Result<CalculationResponse, Error>> + Send;
}
// }}}
// {{{ Wire types
#[derive(Deserialize)]
struct RawRework {
	id: u32,
	code: String,
	name: String,
	algorithm_version: u32,
}

#[derive(Deserialize)]
struct RawBeatmap {
	id: u32,
	title: String,
	version: String,
	cs: f64,
	ar: f64,
	od: f64,
	hp: f64,
	bpm: f64,
	total_length: f64,
	count_circles: u32,
	count_sliders: u32,
	count_spinners: u32,
	max_combo: u32,
}

impl From<RawRework> for Rework {
	fn from(raw: RawRework) -> Self {
		Self {
			id: raw.id,
			code: raw.code,
			name: raw.name,
			algorithm_version: raw.algorithm_version,
		}
	}
}

impl From<RawBeatmap> for BeatmapAttributes {
	fn from(raw: RawBeatmap) -> Self {
		Self {
			beatmap_id: raw.id,
			title: raw.title,
			version: raw.version,
			circle_size: raw.cs,
			approach_rate: raw.ar,
			overall_difficulty: raw.od,
			drain_rate: raw.hp,
			bpm: raw.bpm,
			length_seconds: raw.total_length,
			circle_count: raw.count_circles,
			slider_count: raw.count_sliders,
			spinner_count: raw.count_spinners,
			max_combo: raw.max_combo,
		}
	}
}
// }}}
// {{{ ReworkClient
/// Client for the rework server's HTTP api.
#[derive(Clone)]
pub struct ReworkClient {
	http_client: reqwest::Client,
	base_url: String,
	token: String,
}

impl ReworkClient {
	pub fn new(base_url: String, token: String) -> Self {
		Self {
			http_client: reqwest::Client::new(),
			base_url,
			token,
		}
	}

	pub fn from_env() -> Result<Self, Error> {
		Ok(Self::new(
			get_var("GLIMMER_API_URL")?,
			get_var("GLIMMER_API_TOKEN")?,
		))
	}

	// {{{ Rework queries
	pub async fn rework(&self, code: &str) -> Result<Rework, TaggedError> {
		let response = self
			.http_client
			.get(format!("{}/api/v1/reworks/{code}", self.base_url))
			.header("Token", &self.token)
			.send()
			.await
			.context("Failed to send request")?;

		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(anyhow!("There's no rework called \"{code}\"").tag(ErrorKind::User));
		}

		let raw = response
			.error_for_status()
			.context("Request has non-ok status")?
			.json::<RawRework>()
			.await
			.context("Failed to decode response")?;

		Ok(raw.into())
	}

	pub async fn reworks(&self) -> Result<Vec<Rework>, Error> {
		let raw = self
			.http_client
			.get(format!("{}/api/v1/reworks", self.base_url))
			.header("Token", &self.token)
			.send()
			.await
			.context("Failed to send request")?
			.error_for_status()
			.context("Request has non-ok status")?
			.json::<Vec<RawRework>>()
			.await
			.context("Failed to decode response")?;

		Ok(raw.into_iter().map(Rework::from).collect())
	}
	// }}}
	// {{{ Beatmap source
	pub async fn beatmap(&self, beatmap_id: u32) -> Result<BeatmapAttributes, TaggedError> {
		let response = self
			.http_client
			.get(format!("{}/api/v1/beatmaps/{beatmap_id}", self.base_url))
			.header("Token", &self.token)
			.send()
			.await
			.context("Failed to send request")?;

		if response.status() == reqwest::StatusCode::NOT_FOUND {
			return Err(anyhow!("Beatmap {beatmap_id} doesn't exist").tag(ErrorKind::User));
		}

		let raw = response
			.error_for_status()
			.context("Request has non-ok status")?
			.json::<RawBeatmap>()
			.await
			.context("Failed to decode response")?;

		Ok(raw.into())
	}
	// }}}
}

impl RemoteCalculator for ReworkClient {
	/// The payload is the request's fingerprint text: the rework identity
	/// line followed by the canonical body.
	async fn compute(&self, payload: &str) -> Result<CalculationResponse, Error> {
		let response = self
			.http_client
			.post(format!("{}/api/v1/calculate", self.base_url))
			.header("Token", &self.token)
			.body(payload.to_string())
			.send()
			.await
			.context("Failed to send calculation request")?
			.error_for_status()
			.context("Calculation request has non-ok status")?
			.json::<CalculationResponse>()
			.await
			.context("Failed to decode calculation response")?;

		Ok(response)
	}
}
// }}}
