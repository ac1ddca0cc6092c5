// {{{ Imports
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context};
use rusqlite::OptionalExtension;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;

use crate::context::db::SqlitePool;
use crate::context::{Error, ErrorKind, TagError, TaggedError};
use crate::rework::client::RemoteCalculator;
use crate::rework::request::CalculationRequest;
use crate::rework::response::CalculationResponse;
// }}}

/// What in-flight subscribers receive. Errors travel as rendered strings
/// because [anyhow::Error] isn't [Clone].
type FlightResult = Result<CalculationResponse, String>;

/// The storage key for a fingerprint. Hashing is only a size optimization;
/// the full fingerprint is stored alongside the entry for inspection.
fn storage_key(fingerprint: &str) -> String {
	let mut hasher = Sha256::default();
	hasher.update(fingerprint.as_bytes());
	base16ct::lower::encode_string(&hasher.finalize())
}

// {{{ Calculation cache
/// Durable cache of calculation results, keyed by request fingerprint.
///
/// Entries are written once and never updated or evicted: when the remote
/// algorithm changes, its version bump changes every affected fingerprint
/// and the old entries simply stop being referenced.
///
/// The pool and in-flight table are shared across clones, so cloning this
/// hands out another handle to the same cache.
#[derive(Clone)]
pub struct CalculationCache {
	db: SqlitePool,
	in_flight: Arc<Mutex<HashMap<String, broadcast::Sender<FlightResult>>>>,
}

impl CalculationCache {
	pub fn new(db: SqlitePool) -> Self {
		Self {
			db,
			in_flight: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	// {{{ Durable storage
	/// Looks the request up in durable storage. Storage failures count as
	/// a miss: recomputing is always possible, merely expensive.
	pub fn lookup(&self, request: &CalculationRequest) -> Option<CalculationResponse> {
		match self.lookup_inner(request) {
			Ok(response) => response,
			Err(error) => {
				println!("😞 Calculation cache read failed, treating as a miss: {error:?}");
				None
			}
		}
	}

	fn lookup_inner(&self, request: &CalculationRequest) -> Result<Option<CalculationResponse>, Error> {
		let conn = self.db.get()?;
		let serialized: Option<String> = conn
			.prepare_cached("SELECT response FROM calculations WHERE key=?")?
			.query_row([storage_key(&request.fingerprint())], |row| {
				row.get("response")
			})
			.optional()?;

		serialized
			.map(|text| CalculationResponse::from_canonical_string(&text))
			.transpose()
	}

	/// Persists a computed response. Writing the same payload twice is a
	/// no-op; writing a different payload for an existing fingerprint means
	/// either a fingerprinting bug or a missed algorithm-version bump, and
	/// is refused.
	pub fn store(
		&self,
		request: &CalculationRequest,
		response: &CalculationResponse,
	) -> Result<(), Error> {
		let fingerprint = request.fingerprint();
		let key = storage_key(&fingerprint);
		let serialized = response.to_canonical_string();

		let conn = self.db.get()?;
		let existing: Option<String> = conn
			.prepare_cached("SELECT response FROM calculations WHERE key=?")?
			.query_row([&key], |row| row.get("response"))
			.optional()?;

		if let Some(existing) = existing {
			if existing != serialized {
				return Err(anyhow!(
					"Refusing to overwrite cache entry for rework {} v{} (beatmap {}): the stored response differs",
					request.rework.id,
					request.rework.algorithm_version,
					request.beatmap_id
				));
			}

			return Ok(());
		}

		conn.prepare_cached(
			"
        INSERT INTO calculations(key, fingerprint, response)
        VALUES (?,?,?)
        ON CONFLICT(key) DO NOTHING
      ",
		)?
		.execute((&key, &fingerprint, &serialized))
		.context("Could not write calculation cache entry")?;

		Ok(())
	}
	// }}}
	// {{{ Get or compute
	/// Returns the cached response for `request`, computing and caching it
	/// through `client` on a miss.
	///
	/// Concurrent callers with the same fingerprint share a single remote
	/// call: the first one spawns the computation, everyone subscribes to
	/// its result. The computation runs in its own task, so a caller being
	/// cancelled never cancels it, and the cache still gets populated for
	/// whoever asks next.
	pub async fn get_or_compute<C>(
		&self,
		client: &C,
		request: &CalculationRequest,
	) -> Result<CalculationResponse, TaggedError>
	where
		C: RemoteCalculator + Clone + Send + Sync + 'static,
	{
		if let Some(hit) = self.lookup(request) {
			return Ok(hit);
		}

		let fingerprint = request.fingerprint();

		let mut receiver = {
			let mut in_flight = self.in_flight.lock().unwrap();

			match in_flight.get(&fingerprint) {
				Some(sender) => sender.subscribe(),
				None => {
					let (sender, receiver) = broadcast::channel(1);
					in_flight.insert(fingerprint.clone(), sender.clone());

					let cache = self.clone();
					let client = client.clone();
					let request = request.clone();
					tokio::spawn(async move {
						cache.compute_flight(&client, &request, fingerprint, sender).await;
					});

					receiver
				}
			}
		};

		match receiver.recv().await {
			Ok(Ok(response)) => Ok(response),
			Ok(Err(message)) => {
				Err(anyhow!("The calculation server failed: {message}").tag(ErrorKind::User))
			}
			Err(_) => Err(anyhow!("The calculation task died before reporting back").into()),
		}
	}

	/// Body of the spawned computation task for one fingerprint.
	async fn compute_flight<C: RemoteCalculator>(
		&self,
		client: &C,
		request: &CalculationRequest,
		fingerprint: String,
		sender: broadcast::Sender<FlightResult>,
	) {
		// A previous flight may have landed between our caller's cache miss
		// and this task winning the in-flight slot
		let result = match self.lookup(request) {
			Some(hit) => Ok(hit),
			None => match client.compute(&fingerprint).await {
				Ok(response) => {
					// Failures never make it into the cache; only the
					// persistence of successes is best-effort
					if let Err(error) = self.store(request, &response) {
						println!("😞 Could not persist calculation result: {error:?}");
					}

					Ok(response)
				}
				Err(error) => Err(format!("{error:#}")),
			},
		};

		// Holding the lock across remove+send means every subscriber got
		// its receiver while the entry was still visible
		let mut in_flight = self.in_flight.lock().unwrap();
		in_flight.remove(&fingerprint);
		let _ = sender.send(result);
	}
	// }}}
}
// }}}
// {{{ Tests
#[cfg(test)]
mod cache_tests {
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::time::Duration;

	use super::*;
	use crate::context::db::connect_db;
	use crate::osu::mods::ModifierSet;
	use crate::rework::request::Rework;
	use crate::rework::response::{DifficultyAttributes, PerformanceAttributes};

	// {{{ Fixtures
	fn test_cache() -> (CalculationCache, tempfile::TempDir) {
		let dir = tempfile::tempdir().unwrap();
		let db = connect_db(&dir.path().join("db.sqlite")).unwrap();
		(CalculationCache::new(db), dir)
	}

	fn sample_request() -> CalculationRequest {
		CalculationRequest::new(
			75,
			Rework {
				id: 3,
				code: "statistical-accuracy".to_string(),
				name: "Statistical Accuracy".to_string(),
				algorithm_version: 7,
			},
			ModifierSet::parse("HDDT(1.3x)"),
		)
		.with_combo(Some(432))
	}

	fn sample_response(pp: f64) -> CalculationResponse {
		CalculationResponse {
			difficulty: DifficultyAttributes {
				stars: 6.32,
				aim: 3.1,
				speed: 2.9,
				max_combo: 1203,
			},
			performance: PerformanceAttributes {
				total: pp,
				aim: 180.2,
				speed: 160.01,
				accuracy: 92.34,
			},
			accuracy: 0.9871,
			combo: 1100,
		}
	}

	#[derive(Clone)]
	struct CountingCalculator {
		calls: Arc<AtomicU32>,
		response: CalculationResponse,
	}

	impl CountingCalculator {
		fn new(response: CalculationResponse) -> Self {
			Self {
				calls: Arc::new(AtomicU32::new(0)),
				response,
			}
		}
	}

	impl RemoteCalculator for CountingCalculator {
		async fn compute(&self, _payload: &str) -> Result<CalculationResponse, Error> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(Duration::from_millis(20)).await;
			Ok(self.response)
		}
	}

	#[derive(Clone)]
	struct FailingCalculator {
		calls: Arc<AtomicU32>,
	}

	impl RemoteCalculator for FailingCalculator {
		async fn compute(&self, _payload: &str) -> Result<CalculationResponse, Error> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(anyhow!("the server is on fire"))
		}
	}
	// }}}

	#[test]
	fn lookup_misses_on_absent_entries() {
		let (cache, _dir) = test_cache();
		assert_eq!(cache.lookup(&sample_request()), None);
	}

	#[test]
	fn store_is_idempotent() {
		let (cache, _dir) = test_cache();
		let request = sample_request();
		let response = sample_response(432.55);

		cache.store(&request, &response).unwrap();
		cache.store(&request, &response).unwrap();

		assert_eq!(cache.lookup(&request), Some(response));
	}

	#[test]
	fn conflicting_store_is_refused() {
		let (cache, _dir) = test_cache();
		let request = sample_request();

		cache.store(&request, &sample_response(432.55)).unwrap();
		let result = cache.store(&request, &sample_response(999.99));

		assert!(result.is_err());
		assert_eq!(cache.lookup(&request), Some(sample_response(432.55)));
	}

	#[test]
	fn versions_do_not_share_entries() {
		let (cache, _dir) = test_cache();
		let request = sample_request();
		let mut bumped = request.rework.clone();
		bumped.algorithm_version = 8;
		let bumped = request.with_rework(bumped);

		cache.store(&request, &sample_response(432.55)).unwrap();

		assert_eq!(cache.lookup(&bumped), None);
		cache.store(&bumped, &sample_response(440.0)).unwrap();
		assert_eq!(cache.lookup(&request), Some(sample_response(432.55)));
		assert_eq!(cache.lookup(&bumped), Some(sample_response(440.0)));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn remote_is_invoked_exactly_once_under_contention() {
		let (cache, _dir) = test_cache();
		let calculator = CountingCalculator::new(sample_response(432.55));
		let request = sample_request();

		let handles: Vec<_> = (0..16)
			.map(|_| {
				let cache = cache.clone();
				let calculator = calculator.clone();
				let request = request.clone();
				tokio::spawn(async move { cache.get_or_compute(&calculator, &request).await })
			})
			.collect();

		for handle in handles {
			let response = handle.await.unwrap().unwrap();
			assert_eq!(response, sample_response(432.55));
		}

		assert_eq!(calculator.calls.load(Ordering::SeqCst), 1);
		assert_eq!(cache.lookup(&request), Some(sample_response(432.55)));

		// Later callers don't touch the remote at all
		cache.get_or_compute(&calculator, &request).await.unwrap();
		assert_eq!(calculator.calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(flavor = "multi_thread")]
	async fn failures_are_not_cached() {
		let (cache, _dir) = test_cache();
		let calculator = FailingCalculator {
			calls: Arc::new(AtomicU32::new(0)),
		};
		let request = sample_request();

		let result = cache.get_or_compute(&calculator, &request).await;
		assert!(result.is_err());
		assert_eq!(cache.lookup(&request), None);

		// A second attempt hits the remote again instead of a poisoned entry
		let result = cache.get_or_compute(&calculator, &request).await;
		assert!(result.is_err());
		assert_eq!(calculator.calls.load(Ordering::SeqCst), 2);
	}
}
// }}}
