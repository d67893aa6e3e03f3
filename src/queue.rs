use crate::{
	build::{start_build, StartOutcome},
	state::Status,
	types::{AppState, Result, World},
};

/// One scheduler tick. For each repository independently: walk the PRs in
/// queue order and start at most one build, so staging-branch operations
/// never race and the gated lane stays single-occupancy.
pub async fn process_queue(app: &AppState, world: &mut World) -> Result<()> {
	let World { prs, slot } = world;

	for (repo_name, config) in &app.repo_configs {
		let repo_prs = match prs.get_mut(repo_name) {
			Some(repo_prs) => repo_prs,
			None => continue,
		};

		let mut order: Vec<i64> = repo_prs.keys().copied().collect();
		order.sort_by_key(|num| repo_prs[num].sort_key());

		for num in &order {
			let state = match repo_prs.get_mut(num) {
				Some(state) => state,
				None => continue,
			};

			if state.status == Status::Pending && !state.try_build {
				// a gated build is in flight; this repo waits
				break;
			}

			if state.status == Status::Idle && !state.approved_by.is_empty() {
				match start_build(app, config, state, slot).await? {
					StartOutcome::Started => return Ok(()),
					StartOutcome::SlotBusy => break,
					StartOutcome::NotStarted => continue,
				}
			}

			if state.status == Status::Success
				&& state.try_build
				&& !state.approved_by.is_empty()
			{
				// the try build already vouched for this head; promote it
				// to the gated lane
				state.try_build = false;
				match start_build(app, config, state, slot).await? {
					StartOutcome::Started => return Ok(()),
					StartOutcome::SlotBusy => break,
					StartOutcome::NotStarted => continue,
				}
			}
		}

		// Second pass, try builds only; they ignore the slot but still
		// count against the one-start-per-tick rule.
		for num in &order {
			let state = match repo_prs.get_mut(num) {
				Some(state) => state,
				None => continue,
			};

			if state.status == Status::Idle && state.try_build {
				if let StartOutcome::Started =
					start_build(app, config, state, slot).await?
				{
					return Ok(());
				}
			}
		}
	}

	Ok(())
}
