use super::GithubClient;
use crate::{github::PullRequest, types::Result};

impl GithubClient {
	pub async fn pull_requests(
		&self,
		owner: &str,
		repo: &str,
	) -> Result<Vec<PullRequest>> {
		self.get_all(format!(
			"{}/repos/{}/{}/pulls?state=open&per_page=100",
			self.github_api_url, owner, repo
		))
		.await
	}

	pub async fn pull_request(
		&self,
		owner: &str,
		repo: &str,
		number: i64,
	) -> Result<PullRequest> {
		self.get(format!(
			"{}/repos/{}/{}/pulls/{}",
			self.github_api_url, owner, repo, number
		))
		.await
	}
}
