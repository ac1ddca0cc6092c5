// {{{ Imports
use db::{connect_db, SqlitePool};

use crate::context::paths::GlimmerPaths;
use crate::rework::cache::CalculationCache;
use crate::rework::client::ReworkClient;
use crate::timed;
// }}}

pub mod db;
pub mod paths;

// {{{ Common types
pub type Error = anyhow::Error;
pub type PoiseContext<'a> = poise::Context<'a, BotContext, Error>;
// }}}
// {{{ Error handling
#[derive(Debug, Clone, Copy)]
pub enum ErrorKind {
	User,
	Internal,
}

#[derive(Debug)]
pub struct TaggedError {
	pub kind: ErrorKind,
	pub error: Error,
}

impl TaggedError {
	#[inline]
	pub fn new(kind: ErrorKind, error: Error) -> Self {
		Self { kind, error }
	}
}

#[macro_export]
macro_rules! get_user_error {
	($err:expr) => {{
		match $err.kind {
			$crate::context::ErrorKind::User => $err.error,
			$crate::context::ErrorKind::Internal => Err($err.error)?,
		}
	}};
}

impl<E: Into<Error>> From<E> for TaggedError {
	fn from(value: E) -> Self {
		Self::new(ErrorKind::Internal, value.into())
	}
}

pub trait TagError {
	fn tag(self, tag: ErrorKind) -> TaggedError;
}

impl TagError for Error {
	fn tag(self, tag: ErrorKind) -> TaggedError {
		TaggedError::new(tag, self)
	}
}
// }}}
// {{{ BotContext
/// Custom user data passed to all command functions
#[derive(Clone)]
pub struct BotContext {
	pub db: SqlitePool,
	pub paths: GlimmerPaths,

	pub client: ReworkClient,
	pub calc_cache: CalculationCache,
}

impl BotContext {
	pub fn new() -> Result<Self, Error> {
		timed!("create_context", {
			let paths = GlimmerPaths::new()?;
			let db = connect_db(&paths.db_path())?;
			let client = ReworkClient::from_env()?;
			let calc_cache = CalculationCache::new(db.clone());

			Ok(Self {
				db,
				paths,
				client,
				calc_cache,
			})
		})
	}
}
// }}}
