use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::{constants::MERGEABILITY_TICK_SECS, types::AppState};

/// Background refresh of "does this PR still cleanly merge?". Failures are
/// logged and swallowed; the loop continues.
pub async fn poll(app: Arc<AppState>) {
	let mut interval =
		tokio::time::interval(Duration::from_secs(MERGEABILITY_TICK_SECS));
	loop {
		interval.tick().await;
		refresh(&app).await;
	}
}

async fn refresh(app: &AppState) {
	let unknown: Vec<(String, i64, String)> = {
		let world = app.world.lock().await;
		world
			.prs
			.iter()
			.flat_map(|(repo, repo_prs)| {
				repo_prs
					.values()
					.filter(|state| state.mergeable.is_none())
					.map(move |state| {
						(repo.clone(), state.num, state.head_sha.clone())
					})
			})
			.collect()
	};
	if unknown.is_empty() {
		return;
	}

	let refreshed = join_all(unknown.into_iter().map(
		|(repo, num, head_sha)| async move {
			let config = match app.repo_configs.get(&repo) {
				Some(config) => config,
				None => return None,
			};
			match app
				.gh_client
				.pull_request(&config.owner, &config.repo, num)
				.await
			{
				Ok(pull) => Some((repo, num, head_sha, pull.mergeable)),
				Err(err) => {
					log::warn!(
						"Failed to refresh mergeability of {}#{}: {}",
						repo,
						num,
						err
					);
					None
				}
			}
		},
	))
	.await;

	let mut world = app.world.lock().await;
	for (repo, num, head_sha, mergeable) in refreshed.into_iter().flatten() {
		if let Some(state) = world
			.prs
			.get_mut(&repo)
			.and_then(|repo_prs| repo_prs.get_mut(&num))
		{
			// the head may have moved while we were asking
			if state.head_sha == head_sha {
				state.mergeable = mergeable;
			}
		}
	}
}
