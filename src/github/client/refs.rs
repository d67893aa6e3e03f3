use reqwest::StatusCode;
use snafu::ResultExt;

use super::GithubClient;
use crate::{
	error,
	github::{MergeCommit, Ref},
	types::Result,
};

impl GithubClient {
	pub async fn branch_ref(
		&self,
		owner: &str,
		repo: &str,
		branch: &str,
	) -> Result<Ref> {
		self.get(format!(
			"{}/repos/{}/{}/git/refs/heads/{}",
			self.github_api_url,
			owner,
			repo,
			urlencoding::encode(branch)
		))
		.await
	}

	pub async fn create_branch(
		&self,
		owner: &str,
		repo: &str,
		branch: &str,
		sha: &str,
	) -> Result<()> {
		let url =
			format!("{}/repos/{}/{}/git/refs", self.github_api_url, owner, repo);
		self.post_response(
			&url,
			&serde_json::json!({
				"ref": format!("refs/heads/{}", branch),
				"sha": sha,
			}),
		)
		.await
		.map(|_| ())
	}

	/// Points a branch at a commit. `force = false` only fast-forwards.
	pub async fn update_branch(
		&self,
		owner: &str,
		repo: &str,
		branch: &str,
		sha: &str,
		force: bool,
	) -> Result<()> {
		let url = format!(
			"{}/repos/{}/{}/git/refs/heads/{}",
			self.github_api_url,
			owner,
			repo,
			urlencoding::encode(branch)
		);
		self.patch_response(
			&url,
			&serde_json::json!({ "sha": sha, "force": force }),
		)
		.await
		.map(|_| ())
	}

	/// Merges `head` into the branch `base`, producing a new commit. A
	/// merge conflict surfaces as `Error::Response` with status 409.
	pub async fn merge_branch(
		&self,
		owner: &str,
		repo: &str,
		base: &str,
		head: &str,
		commit_message: &str,
	) -> Result<MergeCommit> {
		let url =
			format!("{}/repos/{}/{}/merges", self.github_api_url, owner, repo);
		let response = self
			.post_response(
				&url,
				&serde_json::json!({
					"base": base,
					"head": head,
					"commit_message": commit_message,
				}),
			)
			.await?;

		// 204 means the base already contained the head; there is no new
		// commit to test in that case.
		if response.status() == StatusCode::NO_CONTENT {
			return error::Message {
				msg: format!("{} already contains {}", base, head),
			}
			.fail();
		}

		response.json::<MergeCommit>().await.context(error::Http)
	}
}
