use rocksdb::DB;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::{error, state::Status, types::Result};

/// Durable per-PR record. The crash-recovery ground truth: everything else
/// about a PR is reconstructed from the platform on startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
	pub status: String,
	pub merge_sha: String,
}

impl StateRecord {
	pub fn status(&self) -> Status {
		Status::from_str(&self.status)
	}
}

/// One logical table `(repo, num) -> {status, merge_sha}` with uniqueness
/// on the key. Writes are synchronous; rocksdb keeps them durable.
pub struct StateStore {
	db: DB,
}

fn key(repo: &str, num: i64) -> Vec<u8> {
	format!("{}#{}", repo, num).into_bytes()
}

fn parse_key(raw: &[u8]) -> Option<(String, i64)> {
	let text = std::str::from_utf8(raw).ok()?;
	let (repo, num) = text.rsplit_once('#')?;
	Some((repo.to_string(), num.parse().ok()?))
}

impl StateStore {
	pub fn open(path: &str) -> Result<Self> {
		let db = DB::open_default(path).context(error::Db)?;
		Ok(Self { db })
	}

	pub fn get(&self, repo: &str, num: i64) -> Result<Option<StateRecord>> {
		match self.db.get(key(repo, num)).context(error::Db)? {
			Some(raw) => {
				let record =
					bincode::deserialize(&raw).context(error::Bincode)?;
				Ok(Some(record))
			}
			None => Ok(None),
		}
	}

	/// Replaces the row wholesale. A status write invalidates any merge SHA
	/// recorded for the previous build; `update_merge_sha` re-attaches one.
	pub fn upsert_status(
		&self,
		repo: &str,
		num: i64,
		status: Status,
	) -> Result<()> {
		self.put(
			repo,
			num,
			&StateRecord {
				status: status.as_str().to_string(),
				merge_sha: String::new(),
			},
		)
	}

	pub fn update_merge_sha(
		&self,
		repo: &str,
		num: i64,
		merge_sha: &str,
	) -> Result<()> {
		let status = self
			.get(repo, num)?
			.map(|record| record.status)
			.unwrap_or_default();
		self.put(
			repo,
			num,
			&StateRecord {
				status,
				merge_sha: merge_sha.to_string(),
			},
		)
	}

	pub fn delete(&self, repo: &str, num: i64) -> Result<()> {
		self.db.delete(key(repo, num)).context(error::Db)
	}

	/// Full scan, used once at startup to reconcile the store against the
	/// live PR set. Undecodable entries are logged and skipped.
	pub fn scan(&self) -> Vec<(String, i64, StateRecord)> {
		let mut rows = vec![];
		for (raw_key, raw_value) in self.db.iterator(rocksdb::IteratorMode::Start)
		{
			let parsed_key = match parse_key(&raw_key) {
				Some(parsed) => parsed,
				None => {
					log::error!(
						"Skipping malformed store key {}",
						String::from_utf8_lossy(&raw_key)
					);
					continue;
				}
			};
			match bincode::deserialize::<StateRecord>(&raw_value) {
				Ok(record) => rows.push((parsed_key.0, parsed_key.1, record)),
				Err(err) => {
					log::error!(
						"Failed to deserialize store row {} due to {:?}",
						String::from_utf8_lossy(&raw_key),
						err
					);
				}
			}
		}
		rows
	}

	fn put(&self, repo: &str, num: i64, record: &StateRecord) -> Result<()> {
		self.db
			.put(
				key(repo, num),
				bincode::serialize(record).context(error::Bincode)?,
			)
			.context(error::Db)
	}
}
