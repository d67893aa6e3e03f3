use super::GithubClient;
use crate::{github::CommitStatus, types::Result};

impl GithubClient {
	pub async fn statuses(
		&self,
		owner: &str,
		repo: &str,
		sha: &str,
	) -> Result<Vec<CommitStatus>> {
		self.get_all(format!(
			"{}/repos/{}/{}/statuses/{}?per_page=100",
			self.github_api_url, owner, repo, sha
		))
		.await
	}

	pub async fn create_status(
		&self,
		owner: &str,
		repo: &str,
		sha: &str,
		state: &str,
		description: &str,
		context: &str,
	) -> Result<()> {
		let url = format!(
			"{}/repos/{}/{}/statuses/{}",
			self.github_api_url, owner, repo, sha
		);
		self.post_response(
			&url,
			&serde_json::json!({
				"state": state,
				"target_url": "",
				"description": description,
				"context": context,
			}),
		)
		.await
		.map(|_| ())
	}
}
