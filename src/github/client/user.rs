use super::GithubClient;
use crate::{github::User, types::Result};

impl GithubClient {
	/// The account the bot runs as; its `@login` is the command trigger.
	pub async fn current_user(&self) -> Result<User> {
		self.get(format!("{}/user", self.github_api_url)).await
	}
}
