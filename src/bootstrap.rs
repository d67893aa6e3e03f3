use crate::{
	command,
	constants::STATUS_CONTEXT,
	github::CommitStatusState,
	state::{PullReqState, Status},
	types::{AppState, Result, World},
};

/// Startup synchronization: rebuilds the in-memory PR set from the
/// platform, replays every comment to recover the ephemeral attributes,
/// and reconciles the store against the live PR set. The store rows for
/// in-flight gated builds keep their merge SHA so a late CI callback still
/// finds its PR; a `pending` row without one lost its build with the
/// previous process and is downgraded.
pub async fn synchronize(app: &AppState, world: &mut World) -> Result<()> {
	log::info!("Retrieving pull requests...");

	for (full_name, config) in &app.repo_configs {
		let pulls = app
			.gh_client
			.pull_requests(&config.owner, &config.repo)
			.await?;

		let repo_prs = world.prs.entry(full_name.clone()).or_default();
		repo_prs.clear();

		for pull in pulls {
			let status = match app.store.get(full_name, pull.number)? {
				Some(record) => record.status(),
				None => {
					// Adopt whatever the bot published about this head in a
					// previous life.
					let mut status = Status::Idle;
					for info in app
						.gh_client
						.statuses(&config.owner, &config.repo, &pull.head.sha)
						.await?
					{
						if info.context == STATUS_CONTEXT {
							status = match info.state {
								CommitStatusState::Pending => Status::Pending,
								CommitStatusState::Success => Status::Success,
								CommitStatusState::Failure => Status::Failure,
								CommitStatusState::Error => Status::Error,
								CommitStatusState::Unknown => Status::Idle,
							};
							break;
						}
					}
					app.store.upsert_status(full_name, pull.number, status)?;
					status
				}
			};

			let mut state = PullReqState::new(
				full_name.clone(),
				pull.number,
				pull.head.sha.clone(),
				status,
			);
			state.title = pull.title.clone().unwrap_or_default();
			state.body = pull.body.clone().unwrap_or_default();
			state.head_ref = pull.head_label();
			state.base_ref = pull.base.ref_field.clone();
			state.assignee = pull
				.assignee
				.as_ref()
				.map(|user| user.login.clone())
				.unwrap_or_default();

			// Review comments first: they carry the commit they were
			// anchored to, and only ones anchored to the current head count.
			for comment in app
				.gh_client
				.review_comments(&config.owner, &config.repo, pull.number)
				.await?
			{
				if comment.original_commit_id != pull.head.sha {
					continue;
				}
				if let Some(user) = &comment.user {
					let commands = command::parse_commands(
						&comment.body,
						&user.login,
						config,
						&app.bot_login,
						Some(&comment.original_commit_id),
					);
					command::apply_commands(
						&app.gh_client,
						&app.store,
						config,
						&mut state,
						&commands,
						false,
					)
					.await?;
				}
			}

			for comment in app
				.gh_client
				.issue_comments(&config.owner, &config.repo, pull.number)
				.await?
			{
				if let Some(user) = &comment.user {
					let commands = command::parse_commands(
						&comment.body,
						&user.login,
						config,
						&app.bot_login,
						None,
					);
					command::apply_commands(
						&app.gh_client,
						&app.store,
						config,
						&mut state,
						&commands,
						false,
					)
					.await?;
				}
			}

			repo_prs.insert(pull.number, state);
		}
	}

	for (repo, num, record) in app.store.scan() {
		let state = match world
			.prs
			.get_mut(&repo)
			.and_then(|repo_prs| repo_prs.get_mut(&num))
		{
			Some(state) => state,
			None => {
				// no live PR behind this row
				log::info!("Deleting stale store row {}#{}", repo, num);
				app.store.delete(&repo, num)?;
				continue;
			}
		};

		if !record.merge_sha.is_empty() {
			let config = match app.repo_configs.get(&repo) {
				Some(config) => config,
				None => continue,
			};
			state.build_results = config
				.ci_builders(false)
				.into_iter()
				.map(|builder| (builder, None))
				.collect();
			state.merge_sha = record.merge_sha.clone();
		} else if state.status == Status::Pending {
			state.status = Status::Idle;
		}
	}

	log::info!("Done!");
	Ok(())
}
