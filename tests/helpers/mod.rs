#![allow(dead_code)]

use std::collections::HashMap;

use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::json;
use tokio::sync::Mutex;

use homu::{
	config::{MainConfig, RepoConfig},
	github::GithubClient,
	store::StateStore,
	types::{AppState, World},
};

pub const OWNER: &str = "acme";
pub const REPO: &str = "widget";
pub const REPO_FULL_NAME: &str = "acme/widget";
pub const BOT_LOGIN: &str = "homu";

pub const HEAD_SHA: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const NEW_HEAD_SHA: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const MASTER_SHA: &str = "1111111111111111111111111111111111111111";
pub const MERGE_SHA: &str = "cccccccccccccccccccccccccccccccccccccccc";

pub fn server_url(server: &Server) -> String {
	let url = server.url("").to_string();
	url[0..url.len() - 1].to_string()
}

pub fn repo_config() -> RepoConfig {
	RepoConfig {
		owner: OWNER.to_string(),
		repo: REPO.to_string(),
		reviewers: vec!["alice".to_string(), "bob".to_string()],
		master_branch: "master".to_string(),
		tmp_branch: "tmp".to_string(),
		buildbot_branch: "auto".to_string(),
		buildbot_try_branch: "try".to_string(),
		builders: vec!["linux".to_string()],
		try_builders: vec!["linux-try".to_string()],
		buildbot_url: String::new(),
		buildbot_username: String::new(),
		buildbot_password: String::new(),
		travis_token: None,
	}
}

pub struct TestApp {
	pub app: AppState,
	// dropping the directory would drop the database under the store
	_db_dir: tempfile::TempDir,
}

pub fn test_app(github_api: &Server) -> TestApp {
	let db_dir = tempfile::tempdir().unwrap();
	let config = MainConfig {
		db_path: db_dir.path().display().to_string(),
		github_token: "does not matter".to_string(),
		github_api_url: server_url(github_api),
		webhook_secret: "does not matter".to_string(),
		webhook_port: 0,
		repo_config_path: String::new(),
	};
	let store = StateStore::open(&config.db_path).unwrap();
	let gh_client = GithubClient::new(&config);

	let mut repo_configs = HashMap::new();
	repo_configs.insert(REPO_FULL_NAME.to_string(), repo_config());

	TestApp {
		app: AppState {
			store,
			gh_client,
			config,
			repo_configs,
			bot_login: BOT_LOGIN.to_string(),
			world: Mutex::new(World::default()),
		},
		_db_dir: db_dir,
	}
}

pub fn pull_request_json(number: i64, head_sha: &str) -> serde_json::Value {
	json!({
		"number": number,
		"title": "Add a widget",
		"body": "Adds the widget.",
		"mergeable": true,
		"head": {
			"ref": "feature",
			"sha": head_sha,
			"repo": {
				"name": REPO,
				"owner": { "login": "contributor" },
			},
		},
		"base": { "ref": "master" },
		"assignee": null,
	})
}

/// Platform endpoints consulted while synchronizing one PR at startup.
pub fn expect_bootstrap(server: &Server, number: i64, head_sha: &str) {
	server.expect(
		Expectation::matching(request::method_path(
			"GET",
			format!("/repos/{}/{}/pulls", OWNER, REPO),
		))
		.times(0..)
		.respond_with(json_encoded(json!([
			pull_request_json(number, head_sha)
		]))),
	);
	server.expect(
		Expectation::matching(request::method_path(
			"GET",
			format!("/repos/{}/{}/statuses/{}", OWNER, REPO, head_sha),
		))
		.times(0..)
		.respond_with(json_encoded(json!([]))),
	);
	server.expect(
		Expectation::matching(request::method_path(
			"GET",
			format!("/repos/{}/{}/pulls/{}/comments", OWNER, REPO, number),
		))
		.times(0..)
		.respond_with(json_encoded(json!([]))),
	);
	server.expect(
		Expectation::matching(request::method_path(
			"GET",
			format!("/repos/{}/{}/issues/{}/comments", OWNER, REPO, number),
		))
		.times(0..)
		.respond_with(json_encoded(json!([]))),
	);
}

/// Platform endpoints touched by a successful speculative merge.
pub fn expect_build_start(server: &Server, number: i64, head_sha: &str) {
	server.expect(
		Expectation::matching(request::method_path(
			"GET",
			format!("/repos/{}/{}/pulls/{}", OWNER, REPO, number),
		))
		.times(0..)
		.respond_with(json_encoded(pull_request_json(number, head_sha))),
	);
	server.expect(
		Expectation::matching(request::method_path(
			"GET",
			format!("/repos/{}/{}/git/refs/heads/master", OWNER, REPO),
		))
		.times(0..)
		.respond_with(json_encoded(json!({
			"object": { "sha": MASTER_SHA },
		}))),
	);
	server.expect(
		Expectation::matching(request::method_path(
			"PATCH",
			format!("/repos/{}/{}/git/refs/heads/tmp", OWNER, REPO),
		))
		.times(0..)
		.respond_with(json_encoded(json!({
			"object": { "sha": MASTER_SHA },
		}))),
	);
	server.expect(
		Expectation::matching(request::method_path(
			"POST",
			format!("/repos/{}/{}/merges", OWNER, REPO),
		))
		.times(0..)
		.respond_with(json_encoded(json!({ "sha": MERGE_SHA }))),
	);
	for ci_branch in &["auto", "try"] {
		server.expect(
			Expectation::matching(request::method_path(
				"PATCH",
				format!(
					"/repos/{}/{}/git/refs/heads/{}",
					OWNER, REPO, ci_branch
				),
			))
			.times(0..)
			.respond_with(json_encoded(json!({
				"object": { "sha": MERGE_SHA },
			}))),
		);
	}
	expect_reporting(server, number, head_sha);
}

/// Commit statuses and PR comments; every lifecycle transition posts some.
pub fn expect_reporting(server: &Server, number: i64, head_sha: &str) {
	server.expect(
		Expectation::matching(request::method_path(
			"POST",
			format!("/repos/{}/{}/statuses/{}", OWNER, REPO, head_sha),
		))
		.times(0..)
		.respond_with(json_encoded(json!({}))),
	);
	server.expect(
		Expectation::matching(request::method_path(
			"POST",
			format!("/repos/{}/{}/issues/{}/comments", OWNER, REPO, number),
		))
		.times(0..)
		.respond_with(json_encoded(json!({}))),
	);
}

/// The target-branch fast-forward performed after a gated build passes.
pub fn expect_fast_forward(server: &Server) {
	server.expect(
		Expectation::matching(request::method_path(
			"PATCH",
			format!("/repos/{}/{}/git/refs/heads/master", OWNER, REPO),
		))
		.times(0..)
		.respond_with(json_encoded(json!({
			"object": { "sha": MERGE_SHA },
		}))),
	);
}

pub fn issue_comment_payload(
	number: i64,
	author: &str,
	body: &str,
) -> homu::github::Payload {
	homu::github::Payload::IssueComment {
		action: homu::github::IssueCommentAction::Created,
		issue: homu::github::WebhookIssue {
			number,
			pull_request: Some(homu::github::IssuePullRequest {}),
		},
		comment: homu::github::Comment {
			body: body.to_string(),
			user: Some(homu::github::User {
				login: author.to_string(),
			}),
		},
		repository: homu::github::Repository {
			full_name: REPO_FULL_NAME.to_string(),
		},
	}
}
