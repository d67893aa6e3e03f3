use reqwest::StatusCode;

use crate::{
	config::RepoConfig,
	constants::STATUS_CONTEXT,
	error::Error,
	state::{PullReqState, Status},
	types::{AppState, Result},
};

/// Mutual exclusion for the CI's gated-merge lane: at most one speculative
/// merge commit is in flight per process. Try builds run on a separate
/// branch and never touch the slot.
#[derive(Debug, Default)]
pub struct BuildSlot {
	occupant: Option<String>,
}

impl BuildSlot {
	pub fn is_busy(&self) -> bool {
		self.occupant.is_some()
	}

	pub fn occupant(&self) -> Option<&str> {
		self.occupant.as_deref()
	}

	pub fn claim(&mut self, merge_sha: &str) {
		self.occupant = Some(merge_sha.to_string());
	}

	/// Releases the slot if this merge commit holds it.
	pub fn release(&mut self, merge_sha: &str) -> bool {
		if self.occupant.as_deref() == Some(merge_sha) {
			self.occupant = None;
			true
		} else {
			false
		}
	}
}

#[derive(Debug, PartialEq)]
pub enum StartOutcome {
	/// The CI was triggered; this tick is done.
	Started,
	/// The gated lane is occupied; nothing gated can start until it frees.
	SlotBusy,
	/// This PR cannot build right now (conflict, stale head); the queue
	/// walk may move on.
	NotStarted,
}

/// Speculatively merges the PR against the target branch on the staging
/// ref and pushes the result to the CI destination branch.
pub async fn start_build(
	app: &AppState,
	config: &RepoConfig,
	state: &mut PullReqState,
	slot: &mut BuildSlot,
) -> Result<StartOutcome> {
	if slot.is_busy() && !state.try_build {
		return Ok(StartOutcome::SlotBusy);
	}

	let gh = &app.gh_client;

	// The head may have moved since the event that queued this PR. The
	// push event resets the state; this attempt is just dropped.
	let live = gh
		.pull_request(&config.owner, &config.repo, state.num)
		.await?;
	if live.head.sha != state.head_sha {
		log::warn!(
			"Head of {}#{} moved from {} to {}; not building",
			state.repo,
			state.num,
			state.head_sha,
			live.head.sha
		);
		return Ok(StartOutcome::NotStarted);
	}

	let master_sha = gh
		.branch_ref(&config.owner, &config.repo, &config.master_branch)
		.await?
		.object
		.sha;

	// Reset the staging branch onto the target tip, creating it on first
	// use.
	if let Err(err) = gh
		.update_branch(
			&config.owner,
			&config.repo,
			&config.tmp_branch,
			&master_sha,
			true,
		)
		.await
	{
		match err {
			Error::Response { .. } => {
				gh.create_branch(
					&config.owner,
					&config.repo,
					&config.tmp_branch,
					&master_sha,
				)
				.await?;
			}
			err => return Err(err),
		}
	}

	let merge_message = format!(
		"Auto merge of #{} - {}, r={}\n\n{}",
		state.num,
		state.head_ref,
		if state.try_build {
			"<try>"
		} else {
			state.approved_by.as_str()
		},
		state.body,
	);

	let merge_commit = match gh
		.merge_branch(
			&config.owner,
			&config.repo,
			&config.tmp_branch,
			&state.head_sha,
			&merge_message,
		)
		.await
	{
		Ok(commit) => commit,
		Err(Error::Response { status, .. })
			if status == StatusCode::CONFLICT =>
		{
			let desc = "Merge conflict";
			gh.create_status(
				&config.owner,
				&config.repo,
				&state.head_sha,
				"error",
				desc,
				STATUS_CONTEXT,
			)
			.await?;
			state.set_status(Status::Error, &app.store)?;
			post_comment(app, config, state.num, &format!(":umbrella: {}", desc))
				.await;
			return Ok(StartOutcome::NotStarted);
		}
		Err(err) => return Err(err),
	};

	let ci_branch = config.ci_branch(state.try_build);
	gh.update_branch(
		&config.owner,
		&config.repo,
		ci_branch,
		&merge_commit.sha,
		true,
	)
	.await?;

	state.build_results = config
		.ci_builders(state.try_build)
		.into_iter()
		.map(|builder| (builder, None))
		.collect();
	state.merge_sha = merge_commit.sha;

	if !state.try_build && !config.uses_travis() {
		slot.claim(&state.merge_sha);
	}

	log::info!(
		"Starting build of {}#{} on {}: {}",
		state.repo,
		state.num,
		ci_branch,
		state.merge_sha
	);

	let desc = format!(
		"{} commit {:.7} with merge {:.7}...",
		if state.try_build { "Trying" } else { "Testing" },
		state.head_sha,
		state.merge_sha,
	);
	gh.create_status(
		&config.owner,
		&config.repo,
		&state.head_sha,
		"pending",
		&desc,
		STATUS_CONTEXT,
	)
	.await?;
	state.set_status(Status::Pending, &app.store)?;
	post_comment(app, config, state.num, &format!(":hourglass: {}", desc))
		.await;

	// Only gated merges are recoverable after a crash; a try build's
	// identity dies with the process.
	if !state.try_build {
		app.store
			.update_merge_sha(&state.repo, state.num, &state.merge_sha)?;
	}

	Ok(StartOutcome::Started)
}

/// Records one builder's verdict for the build of `merge_sha` and, once
/// the overall outcome is known, finishes the build: terminal status,
/// report on the PR, slot release, and the target-branch fast-forward for
/// a successful gated merge.
pub async fn handle_build_result(
	app: &AppState,
	config: &RepoConfig,
	state: &mut PullReqState,
	slot: &mut BuildSlot,
	builder: &str,
	succeeded: bool,
) -> Result<()> {
	if state.status != Status::Pending {
		log::info!(
			"Dropping result of {} for {}#{}: no build pending",
			builder,
			state.repo,
			state.num
		);
		return Ok(());
	}
	if !state.build_results.contains_key(builder) {
		log::info!(
			"Dropping result of unexpected builder {} for {}#{}",
			builder,
			state.repo,
			state.num
		);
		return Ok(());
	}

	state
		.build_results
		.insert(builder.to_string(), Some(succeeded));

	let gh = &app.gh_client;

	if state.build_failed() {
		state.set_status(Status::Failure, &app.store)?;
		slot.release(&state.merge_sha);
		let desc = "Test failed";
		gh.create_status(
			&config.owner,
			&config.repo,
			&state.head_sha,
			"failure",
			desc,
			STATUS_CONTEXT,
		)
		.await?;
		post_comment(
			app,
			config,
			state.num,
			&format!(":broken_heart: {}", desc),
		)
		.await;
	} else if state.build_succeeded() {
		state.set_status(Status::Success, &app.store)?;
		if state.try_build {
			// The approval, if any, survives: the scheduler promotes the
			// already-tried head into a gated build.
			let desc = "Try build successful";
			gh.create_status(
				&config.owner,
				&config.repo,
				&state.head_sha,
				"success",
				desc,
				STATUS_CONTEXT,
			)
			.await?;
			post_comment(
				app,
				config,
				state.num,
				&format!(":sunny: {}", desc),
			)
			.await;
		} else {
			// Fast-forward only: the target branch advances to exactly the
			// commit the CI tested.
			gh.update_branch(
				&config.owner,
				&config.repo,
				&config.master_branch,
				&state.merge_sha,
				false,
			)
			.await?;
			slot.release(&state.merge_sha);
			let desc = "Test successful";
			gh.create_status(
				&config.owner,
				&config.repo,
				&state.head_sha,
				"success",
				desc,
				STATUS_CONTEXT,
			)
			.await?;
			post_comment(
				app,
				config,
				state.num,
				&format!(
					":sunny: {} - pushing `{:.7}` to `{}`...",
					desc, state.merge_sha, config.master_branch
				),
			)
			.await;
		}
	}

	Ok(())
}

pub(crate) async fn post_comment(
	app: &AppState,
	config: &RepoConfig,
	num: i64,
	text: &str,
) {
	if let Err(err) = app
		.gh_client
		.create_issue_comment(&config.owner, &config.repo, num, text)
		.await
	{
		log::error!("Error posting comment: {}", err);
	}
}
