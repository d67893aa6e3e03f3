use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
	build::BuildSlot, config::MainConfig, config::RepoConfig, error::Error,
	github::client::GithubClient, state::PullReqState, store::StateStore,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A single builder's verdict delivered by the CI, keyed by the merge
/// commit it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderResult {
	pub builder: String,
	pub sha: String,
	pub success: bool,
}

pub struct AppState {
	pub store: StateStore,
	pub gh_client: GithubClient,
	pub config: MainConfig,
	pub repo_configs: HashMap<String, RepoConfig>,
	pub bot_login: String,
	pub world: Mutex<World>,
}

/// Everything the scheduler mutates. Exactly one task at a time holds the
/// lock, across the whole critical section of an event.
#[derive(Default)]
pub struct World {
	/// repo full name -> PR number -> state
	pub prs: HashMap<String, HashMap<i64, PullReqState>>,
	pub slot: BuildSlot,
}

impl World {
	pub fn repo_prs_mut(
		&mut self,
		repo: &str,
	) -> &mut HashMap<i64, PullReqState> {
		self.prs.entry(repo.to_string()).or_default()
	}

	/// Locates the PR currently testing the given merge commit.
	pub fn find_by_merge_sha(&self, sha: &str) -> Option<(String, i64)> {
		for (repo, prs) in &self.prs {
			for state in prs.values() {
				if !state.merge_sha.is_empty() && state.merge_sha == sha {
					return Some((repo.clone(), state.num));
				}
			}
		}
		None
	}
}
