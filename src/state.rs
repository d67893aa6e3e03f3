use std::cmp::Reverse;
use std::collections::HashMap;

use crate::{store::StateStore, types::Result};

/// Persisted build status of a PR. `Idle` maps to the empty string in the
/// store and means "not queued for anything yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
	Idle,
	Pending,
	Success,
	Error,
	Failure,
}

impl Status {
	pub fn as_str(self) -> &'static str {
		match self {
			Status::Idle => "",
			Status::Pending => "pending",
			Status::Success => "success",
			Status::Error => "error",
			Status::Failure => "failure",
		}
	}

	pub fn from_str(raw: &str) -> Status {
		match raw {
			"" => Status::Idle,
			"pending" => Status::Pending,
			"success" => Status::Success,
			"error" => Status::Error,
			"failure" => Status::Failure,
			other => {
				log::warn!("Unknown persisted status {:?}; treating as idle", other);
				Status::Idle
			}
		}
	}
}

/// Status as the queue sees it: an idle, approved, not-known-unmergeable PR
/// reports `Approved` without a dedicated persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveStatus {
	Success,
	Pending,
	Approved,
	Idle,
	Error,
	Failure,
}

impl EffectiveStatus {
	/// Queue bucket; smaller builds sooner. Successful builds sort ahead of
	/// everything so their promotion is immediate, and the pending build
	/// sorts ahead of fresh approvals so the scheduler stops on it.
	pub fn queue_bucket(self) -> u8 {
		match self {
			EffectiveStatus::Success => 0,
			EffectiveStatus::Pending => 1,
			EffectiveStatus::Approved => 2,
			EffectiveStatus::Idle => 3,
			EffectiveStatus::Error => 4,
			EffectiveStatus::Failure => 5,
		}
	}
}

pub type SortKey = (u8, bool, bool, bool, Reverse<i64>, i64);

/// In-memory model of one open PR and its queueable attributes.
///
/// `status` and `merge_sha` are mirrored into the state store on every
/// change; everything else is reconstructed from the platform on startup.
#[derive(Debug, Clone, Default)]
pub struct PullReqState {
	pub repo: String,
	pub num: i64,
	pub head_sha: String,
	pub status: Status,
	pub approved_by: String,
	pub priority: i64,
	pub rollup: bool,
	pub try_build: bool,
	pub merge_sha: String,
	/// builder name -> None (pending) / Some(passed)
	pub build_results: HashMap<String, Option<bool>>,
	pub mergeable: Option<bool>,
	pub title: String,
	pub body: String,
	pub head_ref: String,
	pub base_ref: String,
	pub assignee: String,
}

impl Default for Status {
	fn default() -> Status {
		Status::Idle
	}
}

impl PartialEq for PullReqState {
	fn eq(&self, other: &Self) -> bool {
		self.repo == other.repo && self.num == other.num
	}
}

impl Eq for PullReqState {}

impl PullReqState {
	pub fn new(repo: String, num: i64, head_sha: String, status: Status) -> Self {
		Self {
			repo,
			num,
			head_sha,
			status,
			..Default::default()
		}
	}

	/// A new push landed on the PR branch: every attribute derived from the
	/// old head is void, and the empty status is persisted so a crashed
	/// build cannot resurrect against the new head.
	pub fn head_advanced(
		&mut self,
		head_sha: &str,
		store: &StateStore,
	) -> Result<()> {
		self.head_sha = head_sha.to_string();
		self.approved_by.clear();
		self.merge_sha.clear();
		self.build_results.clear();
		self.try_build = false;
		self.mergeable = None;
		self.set_status(Status::Idle, store)
	}

	pub fn set_status(
		&mut self,
		status: Status,
		store: &StateStore,
	) -> Result<()> {
		self.status = status;
		store.upsert_status(&self.repo, self.num, status)
	}

	pub fn effective_status(&self) -> EffectiveStatus {
		if self.status == Status::Idle
			&& !self.approved_by.is_empty()
			&& self.mergeable != Some(false)
		{
			return EffectiveStatus::Approved;
		}
		match self.status {
			Status::Idle => EffectiveStatus::Idle,
			Status::Pending => EffectiveStatus::Pending,
			Status::Success => EffectiveStatus::Success,
			Status::Error => EffectiveStatus::Error,
			Status::Failure => EffectiveStatus::Failure,
		}
	}

	/// Lexicographic queue key; smaller sorts earlier. Ties break on the PR
	/// number, so the order is total.
	pub fn sort_key(&self) -> SortKey {
		(
			self.effective_status().queue_bucket(),
			self.mergeable == Some(false),
			self.approved_by.is_empty(),
			self.rollup,
			Reverse(self.priority),
			self.num,
		)
	}

	/// Any builder reported a failure.
	pub fn build_failed(&self) -> bool {
		self.build_results
			.values()
			.any(|result| *result == Some(false))
	}

	/// Every expected builder reported success.
	pub fn build_succeeded(&self) -> bool {
		!self.build_results.is_empty()
			&& self
				.build_results
				.values()
				.all(|result| *result == Some(true))
	}
}
