use super::GithubClient;
use crate::{
	github::{Comment, ReviewComment},
	types::Result,
};

impl GithubClient {
	pub async fn issue_comments(
		&self,
		owner: &str,
		repo: &str,
		number: i64,
	) -> Result<Vec<Comment>> {
		self.get_all(format!(
			"{}/repos/{}/{}/issues/{}/comments?per_page=100",
			self.github_api_url, owner, repo, number
		))
		.await
	}

	/// Review comments are anchored to a commit; the anchor serves as the
	/// approval SHA during startup replay.
	pub async fn review_comments(
		&self,
		owner: &str,
		repo: &str,
		number: i64,
	) -> Result<Vec<ReviewComment>> {
		self.get_all(format!(
			"{}/repos/{}/{}/pulls/{}/comments?per_page=100",
			self.github_api_url, owner, repo, number
		))
		.await
	}

	pub async fn create_issue_comment(
		&self,
		owner: &str,
		repo: &str,
		number: i64,
		body: &str,
	) -> Result<()> {
		let url = format!(
			"{}/repos/{}/{}/issues/{}/comments",
			self.github_api_url, owner, repo, number
		);
		self.post_response(&url, &serde_json::json!({ "body": body }))
			.await
			.map(|_| ())
	}
}
