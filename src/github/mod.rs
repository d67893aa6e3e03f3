use serde::{Deserialize, Serialize};

pub mod client;

pub use client::GithubClient;

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
	pub login: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
	pub full_name: String,
}

// The owner might be missing when e.g. they have deleted their account
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadRepo {
	pub name: String,
	pub owner: Option<User>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Head {
	#[serde(rename = "ref")]
	pub ref_field: String,
	pub sha: String,
	pub repo: Option<HeadRepo>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Base {
	#[serde(rename = "ref")]
	pub ref_field: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
	pub number: i64,
	pub title: Option<String>,
	pub body: Option<String>,
	pub mergeable: Option<bool>,
	pub head: Head,
	pub base: Base,
	pub assignee: Option<User>,
}

impl PullRequest {
	/// `<head-owner>:<branch>`, as rendered into merge commit messages.
	pub fn head_label(&self) -> String {
		let owner = self
			.head
			.repo
			.as_ref()
			.and_then(|repo| repo.owner.as_ref())
			.map(|user| user.login.as_str())
			.unwrap_or("");
		format!("{}:{}", owner, self.head.ref_field)
	}
}

// User might be missing when it has been deleted
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
	pub body: String,
	pub user: Option<User>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewComment {
	pub body: String,
	pub user: Option<User>,
	pub original_commit_id: String,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ref {
	pub object: RefObject,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefObject {
	pub sha: String,
}

/// Commit created by the platform-side merge endpoint.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeCommit {
	pub sha: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitStatusState {
	Pending,
	Success,
	Failure,
	Error,
	#[serde(other)]
	Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitStatus {
	pub state: CommitStatusState,
	pub context: String,
	pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCommentAction {
	Created,
	#[serde(other)]
	Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestAction {
	Opened,
	Reopened,
	Synchronize,
	Closed,
	#[serde(other)]
	Unknown,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuePullRequest {}

/// The issue half of an `issue_comment` event; `pull_request` is present
/// exactly when the issue is a PR.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookIssue {
	pub number: i64,
	pub pull_request: Option<IssuePullRequest>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Payload {
	IssueComment {
		action: IssueCommentAction,
		issue: WebhookIssue,
		comment: Comment,
		repository: Repository,
	},
	PullRequest {
		action: PullRequestAction,
		number: i64,
		pull_request: PullRequest,
		repository: Repository,
	},
	CommitStatus {
		sha: String,
		state: CommitStatusState,
		context: String,
	},
}
