use crate::{
	buildbot,
	config::RepoConfig,
	github::GithubClient,
	state::{PullReqState, Status},
	store::StateStore,
	types::Result,
};

/// One reviewer directive, as found in a comment body.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	/// `r+` / `r=<user>`, optionally constrained to a commit SHA.
	Approve {
		reviewer: String,
		sha: Option<String>,
	},
	/// `r-`
	Unapprove,
	/// `p=<int>`
	Priority(i64),
	/// `retry`
	Retry,
	/// `try` / `try-`
	Try(bool),
	/// `rollup` / `rollup-`
	Rollup(bool),
	/// `force`
	Force,
}

/// A short SHA designates a commit iff it has at least 4 characters and is
/// a prefix of the full SHA.
pub fn sha_matches(short: &str, full: &str) -> bool {
	short.len() >= 4 && full.starts_with(short)
}

fn approval_sha(
	review_sha: Option<&str>,
	words: &[&str],
	index: usize,
) -> Option<String> {
	review_sha
		.map(str::to_string)
		.or_else(|| words.get(index + 1).map(|word| word.to_string()))
}

/// Extracts the directives addressed to the bot. The whole comment is
/// ignored unless the author is an allowed reviewer and the bot's handle
/// appears verbatim in the body. Tokens are independent; unrecognized ones
/// are skipped.
///
/// `review_sha` is the commit a review comment is anchored to; when set it
/// overrides the SHA-after-`r+` convention.
pub fn parse_commands(
	body: &str,
	author: &str,
	config: &RepoConfig,
	bot_login: &str,
	review_sha: Option<&str>,
) -> Vec<Command> {
	if !config.reviewers.iter().any(|reviewer| reviewer == author) {
		return vec![];
	}
	if !body.contains(&format!("@{}", bot_login)) {
		return vec![];
	}

	let words: Vec<&str> = body.split_whitespace().collect();
	let mut commands = vec![];

	for (index, word) in words.iter().enumerate() {
		match *word {
			"r+" => commands.push(Command::Approve {
				reviewer: author.to_string(),
				sha: approval_sha(review_sha, &words, index),
			}),
			"r-" => commands.push(Command::Unapprove),
			"retry" => commands.push(Command::Retry),
			"try" => commands.push(Command::Try(true)),
			"try-" => commands.push(Command::Try(false)),
			"rollup" => commands.push(Command::Rollup(true)),
			"rollup-" => commands.push(Command::Rollup(false)),
			"force" => commands.push(Command::Force),
			word if word.starts_with("r=") => {
				commands.push(Command::Approve {
					reviewer: word["r=".len()..].to_string(),
					sha: approval_sha(review_sha, &words, index),
				})
			}
			word if word.starts_with("p=") => {
				// silently ignore a non-integer priority
				if let Ok(priority) = word["p=".len()..].parse::<i64>() {
					commands.push(Command::Priority(priority));
				}
			}
			_ => {}
		}
	}

	commands
}

/// Applies parsed directives to a PR. `realtime` distinguishes live events
/// from startup replay: replay performs no side effects and skips the
/// commands that only make sense against a running CI.
///
/// Returns whether any directive took effect.
pub async fn apply_commands(
	gh_client: &GithubClient,
	store: &StateStore,
	config: &RepoConfig,
	state: &mut PullReqState,
	commands: &[Command],
	realtime: bool,
) -> Result<bool> {
	let mut changed = false;

	for command in commands {
		match command {
			Command::Approve { reviewer, sha } => {
				changed = true;
				match sha {
					// a bare approval targets the current head
					None => state.approved_by = reviewer.clone(),
					Some(sha) if sha_matches(sha, &state.head_sha) => {
						state.approved_by = reviewer.clone()
					}
					Some(sha) if realtime => {
						let text = format!(
							":scream_cat: `{}` is not a valid commit SHA. Please try again with `{:.7}`.",
							sha,
							state.head_sha
						);
						if let Err(err) = gh_client
							.create_issue_comment(
								&config.owner,
								&config.repo,
								state.num,
								&text,
							)
							.await
						{
							log::error!("Error posting comment: {}", err);
						}
					}
					// replay: the PR has moved on, drop silently
					Some(_) => {}
				}
			}
			Command::Unapprove => {
				state.approved_by.clear();
				changed = true;
			}
			Command::Priority(priority) => {
				state.priority = *priority;
				changed = true;
			}
			Command::Retry if realtime => {
				state.set_status(Status::Idle, store)?;
				changed = true;
			}
			Command::Try(try_build) if realtime => {
				state.try_build = *try_build;
				state.merge_sha.clear();
				state.build_results.clear();
				changed = true;
			}
			Command::Rollup(rollup) => {
				state.rollup = *rollup;
				changed = true;
			}
			Command::Force if realtime => {
				if let Some(err) = buildbot::stop_current_build(config).await?
				{
					let text = format!(
						":bomb: Buildbot returned an error: `{}`",
						err
					);
					if let Err(err) = gh_client
						.create_issue_comment(
							&config.owner,
							&config.repo,
							state.num,
							&text,
						)
						.await
					{
						log::error!("Error posting comment: {}", err);
					}
				}
				changed = true;
			}
			// realtime-only commands are dropped during replay
			Command::Retry | Command::Try(_) | Command::Force => {}
		}
	}

	Ok(changed)
}
