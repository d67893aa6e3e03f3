use httptest::{matchers::*, responders::*, Expectation, Server};
use serde_json::json;

use homu::{
	bootstrap, queue,
	state::{PullReqState, Status},
	webhook::{handle_builder_result, handle_payload},
};

mod helpers;

use helpers::*;

#[tokio::test]
async fn approval_runs_a_gated_build_and_lands_the_merge() {
	let server = Server::run();
	expect_bootstrap(&server, 1, HEAD_SHA);
	expect_build_start(&server, 1, HEAD_SHA);
	expect_fast_forward(&server);

	let test = test_app(&server);
	let app = &test.app;

	{
		let mut world = app.world.lock().await;
		bootstrap::synchronize(app, &mut world).await.unwrap();
		let state = &world.prs[REPO_FULL_NAME][&1];
		assert_eq!(state.status, Status::Idle);
		assert_eq!(state.approved_by, "");
	}

	handle_payload(issue_comment_payload(1, "bob", "@homu r+"), app)
		.await
		.unwrap();

	{
		let world = app.world.lock().await;
		let state = &world.prs[REPO_FULL_NAME][&1];
		assert_eq!(state.approved_by, "bob");
		assert_eq!(state.status, Status::Pending);
		assert_eq!(state.merge_sha, MERGE_SHA);
		assert_eq!(state.build_results.len(), 1);
		assert_eq!(state.build_results["linux"], None);
		assert_eq!(world.slot.occupant(), Some(MERGE_SHA));
	}

	let record = app.store.get(REPO_FULL_NAME, 1).unwrap().unwrap();
	assert_eq!(record.status(), Status::Pending);
	assert_eq!(record.merge_sha, MERGE_SHA);

	handle_builder_result(app, "linux", MERGE_SHA, true)
		.await
		.unwrap();

	{
		let world = app.world.lock().await;
		let state = &world.prs[REPO_FULL_NAME][&1];
		assert_eq!(state.status, Status::Success);
		assert!(!world.slot.is_busy());
	}
	let record = app.store.get(REPO_FULL_NAME, 1).unwrap().unwrap();
	assert_eq!(record.status(), Status::Success);
}

#[tokio::test]
async fn failing_build_releases_the_slot_without_merging() {
	let server = Server::run();
	expect_bootstrap(&server, 1, HEAD_SHA);
	expect_build_start(&server, 1, HEAD_SHA);

	let test = test_app(&server);
	let app = &test.app;

	{
		let mut world = app.world.lock().await;
		bootstrap::synchronize(app, &mut world).await.unwrap();
	}
	handle_payload(issue_comment_payload(1, "alice", "@homu r+"), app)
		.await
		.unwrap();

	handle_builder_result(app, "linux", MERGE_SHA, false)
		.await
		.unwrap();

	let world = app.world.lock().await;
	let state = &world.prs[REPO_FULL_NAME][&1];
	assert_eq!(state.status, Status::Failure);
	assert!(!world.slot.is_busy());
}

#[tokio::test]
async fn merge_conflict_marks_the_pr_errored() {
	let server = Server::run();
	expect_bootstrap(&server, 1, HEAD_SHA);
	server.expect(
		Expectation::matching(request::method_path(
			"GET",
			format!("/repos/{}/{}/pulls/1", OWNER, REPO),
		))
		.times(0..)
		.respond_with(json_encoded(pull_request_json(1, HEAD_SHA))),
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
	// The target branch has advanced incompatibly underneath the PR.
	server.expect(
		Expectation::matching(request::method_path(
			"POST",
			format!("/repos/{}/{}/merges", OWNER, REPO),
		))
		.times(0..)
		.respond_with(
			status_code(409).body(r#"{"message":"Merge conflict"}"#),
		),
	);
	expect_reporting(&server, 1, HEAD_SHA);

	let test = test_app(&server);
	let app = &test.app;

	{
		let mut world = app.world.lock().await;
		bootstrap::synchronize(app, &mut world).await.unwrap();
	}
	handle_payload(issue_comment_payload(1, "alice", "@homu r+"), app)
		.await
		.unwrap();

	let world = app.world.lock().await;
	let state = &world.prs[REPO_FULL_NAME][&1];
	assert_eq!(state.status, Status::Error);
	assert!(!world.slot.is_busy());

	let record = app.store.get(REPO_FULL_NAME, 1).unwrap().unwrap();
	assert_eq!(record.status(), Status::Error);
}

#[tokio::test]
async fn try_build_then_approval_promotes_the_same_head() {
	let server = Server::run();
	expect_bootstrap(&server, 1, HEAD_SHA);
	expect_build_start(&server, 1, HEAD_SHA);

	let test = test_app(&server);
	let app = &test.app;

	{
		let mut world = app.world.lock().await;
		bootstrap::synchronize(app, &mut world).await.unwrap();
	}

	handle_payload(issue_comment_payload(1, "alice", "@homu try"), app)
		.await
		.unwrap();

	{
		let world = app.world.lock().await;
		let state = &world.prs[REPO_FULL_NAME][&1];
		assert!(state.try_build);
		assert_eq!(state.status, Status::Pending);
		assert_eq!(state.merge_sha, MERGE_SHA);
		// the try lane reports through the try builders
		assert_eq!(state.build_results["linux-try"], None);
		// try builds never take the gated lane
		assert!(!world.slot.is_busy());
	}
	// and their merge commit is not persisted
	let record = app.store.get(REPO_FULL_NAME, 1).unwrap().unwrap();
	assert_eq!(record.merge_sha, "");

	handle_builder_result(app, "linux-try", MERGE_SHA, true)
		.await
		.unwrap();

	{
		let world = app.world.lock().await;
		let state = &world.prs[REPO_FULL_NAME][&1];
		assert_eq!(state.status, Status::Success);
		assert!(state.try_build);
	}

	// the approval promotes the already-tried head into the gated lane
	handle_payload(issue_comment_payload(1, "alice", "@homu r+"), app)
		.await
		.unwrap();

	let world = app.world.lock().await;
	let state = &world.prs[REPO_FULL_NAME][&1];
	assert!(!state.try_build);
	assert_eq!(state.status, Status::Pending);
	assert_eq!(state.build_results["linux"], None);
	assert_eq!(world.slot.occupant(), Some(MERGE_SHA));
}

#[tokio::test]
async fn priority_overrides_queue_age() {
	let server = Server::run();
	// only PR 11 may build; a request for PR 10 would go unmatched
	expect_build_start(&server, 11, HEAD_SHA);

	let test = test_app(&server);
	let app = &test.app;

	{
		let mut world = app.world.lock().await;
		let repo_prs = world.repo_prs_mut(REPO_FULL_NAME);
		for (num, priority) in &[(10, 0), (11, 5)] {
			let mut state = PullReqState::new(
				REPO_FULL_NAME.to_string(),
				*num,
				HEAD_SHA.to_string(),
				Status::Idle,
			);
			state.approved_by = "alice".to_string();
			state.priority = *priority;
			repo_prs.insert(*num, state);
		}
		queue::process_queue(app, &mut world).await.unwrap();

		assert_eq!(
			world.prs[REPO_FULL_NAME][&11].status,
			Status::Pending
		);
		assert_eq!(world.prs[REPO_FULL_NAME][&10].status, Status::Idle);
	}
}

#[tokio::test]
async fn push_invalidates_approval_and_the_orphan_result_frees_the_slot() {
	let server = Server::run();
	expect_bootstrap(&server, 1, HEAD_SHA);
	expect_build_start(&server, 1, HEAD_SHA);

	let test = test_app(&server);
	let app = &test.app;

	{
		let mut world = app.world.lock().await;
		bootstrap::synchronize(app, &mut world).await.unwrap();
	}
	handle_payload(issue_comment_payload(1, "alice", "@homu r+"), app)
		.await
		.unwrap();

	let mut pushed = homu::github::PullRequest::default();
	pushed.number = 1;
	pushed.head.sha = NEW_HEAD_SHA.to_string();
	handle_payload(
		homu::github::Payload::PullRequest {
			action: homu::github::PullRequestAction::Synchronize,
			number: 1,
			pull_request: pushed,
			repository: homu::github::Repository {
				full_name: REPO_FULL_NAME.to_string(),
			},
		},
		app,
	)
	.await
	.unwrap();

	{
		let world = app.world.lock().await;
		let state = &world.prs[REPO_FULL_NAME][&1];
		assert_eq!(state.head_sha, NEW_HEAD_SHA);
		assert_eq!(state.approved_by, "");
		assert_eq!(state.status, Status::Idle);
		assert_eq!(state.merge_sha, "");
		// the abandoned build still occupies the gated lane
		assert_eq!(world.slot.occupant(), Some(MERGE_SHA));
	}

	// its terminal result matches no PR, and gives the lane back
	handle_builder_result(app, "linux", MERGE_SHA, false)
		.await
		.unwrap();

	let world = app.world.lock().await;
	assert!(!world.slot.is_busy());
	assert_eq!(world.prs[REPO_FULL_NAME][&1].status, Status::Idle);
}

#[tokio::test]
async fn commands_from_outside_the_allow_list_change_nothing() {
	let server = Server::run();
	expect_bootstrap(&server, 1, HEAD_SHA);

	let test = test_app(&server);
	let app = &test.app;

	{
		let mut world = app.world.lock().await;
		bootstrap::synchronize(app, &mut world).await.unwrap();
	}
	handle_payload(issue_comment_payload(1, "mallory", "@homu r+ p=9"), app)
		.await
		.unwrap();

	let world = app.world.lock().await;
	let state = &world.prs[REPO_FULL_NAME][&1];
	assert_eq!(state.approved_by, "");
	assert_eq!(state.priority, 0);
	assert_eq!(state.status, Status::Idle);
}

#[test]
fn parsed_commands_snapshot() {
	let commands = homu::command::parse_commands(
		"@homu rollup r=carol",
		"alice",
		&repo_config(),
		BOT_LOGIN,
		None,
	);
	insta::assert_debug_snapshot!(commands, @r###"
	[
	    Rollup(
	        true,
	    ),
	    Approve {
	        reviewer: "carol",
	        sha: None,
	    },
	]
	"###);
}
