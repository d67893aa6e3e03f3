use std::net::SocketAddr;
use std::sync::Arc;

use hyper::{
	service::{make_service_fn, service_fn},
	Body, Method, Request, Response, Server, StatusCode,
};
use ring::hmac;
use snafu::ResultExt;

use crate::{
	build, command,
	constants::{STATUS_CONTEXT, TRAVIS_BUILDER},
	error,
	github::{
		CommitStatusState, IssueCommentAction, Payload, PullRequestAction,
	},
	queue,
	state::{PullReqState, Status},
	types::{AppState, BuilderResult, Result},
};

fn verify(
	secret: &[u8],
	msg: &[u8],
	signature: &[u8],
) -> std::result::Result<(), ring::error::Unspecified> {
	let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret);
	hmac::verify(&key, msg, signature)
}

pub async fn init_server(
	addr: SocketAddr,
	state: Arc<AppState>,
) -> Result<()> {
	let service = make_service_fn(move |_| {
		let state = Arc::clone(&state);
		async move {
			Ok::<_, hyper::Error>(service_fn(move |req: Request<Body>| {
				let state = Arc::clone(&state);
				async move { handle_request(req, state).await }
			}))
		}
	});

	log::info!("Listening on {}", addr);
	Server::bind(&addr)
		.serve(service)
		.await
		.context(error::Hyper)
}

async fn handle_request(
	req: Request<Body>,
	state: Arc<AppState>,
) -> std::result::Result<Response<Body>, hyper::Error> {
	let (parts, body) = req.into_parts();
	let body = hyper::body::to_bytes(body).await?;

	let result = match (&parts.method, parts.uri.path()) {
		(&Method::POST, "/webhook") => {
			handle_webhook(&parts, &body, &state).await
		}
		(&Method::POST, "/buildbot") => handle_buildbot(&body, &state).await,
		_ => Ok(StatusCode::NOT_FOUND),
	};

	let status = match result {
		Ok(status) => status,
		Err(err) => {
			log::error!("Error handling request: {}", err);
			StatusCode::INTERNAL_SERVER_ERROR
		}
	};
	let mut response = Response::new(Body::empty());
	*response.status_mut() = status;
	Ok(response)
}

async fn handle_webhook(
	parts: &hyper::http::request::Parts,
	body: &[u8],
	app: &AppState,
) -> Result<StatusCode> {
	let signature = parts
		.headers
		.get("x-hub-signature")
		.and_then(|value| value.to_str().ok())
		.unwrap_or("")
		.replace("sha1=", "");
	let signature = match base16::decode(signature.as_bytes()) {
		Ok(signature) => signature,
		Err(_) => return Ok(StatusCode::BAD_REQUEST),
	};
	if verify(app.config.webhook_secret.as_bytes(), body, &signature)
		.is_err()
	{
		return Ok(StatusCode::BAD_REQUEST);
	}

	// Events the bot has no use for simply don't deserialize.
	let payload: Payload = match serde_json::from_slice(body) {
		Ok(payload) => payload,
		Err(_) => return Ok(StatusCode::OK),
	};

	handle_payload(payload, app).await?;
	Ok(StatusCode::OK)
}

async fn handle_buildbot(
	body: &[u8],
	app: &AppState,
) -> Result<StatusCode> {
	let result: BuilderResult = match serde_json::from_slice(body) {
		Ok(result) => result,
		Err(_) => return Ok(StatusCode::BAD_REQUEST),
	};
	handle_builder_result(app, &result.builder, &result.sha, result.success)
		.await?;
	Ok(StatusCode::OK)
}

/// Routes one normalized platform event into the command parser, the PR
/// lifecycle, or the build-result path. Unknown and unmatched events are
/// ignored.
pub async fn handle_payload(payload: Payload, app: &AppState) -> Result<()> {
	match payload {
		Payload::IssueComment {
			action: IssueCommentAction::Created,
			issue,
			comment,
			repository,
		} => {
			// plain issues have no queue entry
			if issue.pull_request.is_none() {
				return Ok(());
			}
			let config = match app.repo_configs.get(&repository.full_name) {
				Some(config) => config,
				None => return Ok(()),
			};
			let author = match comment.user {
				Some(user) => user.login,
				None => return Ok(()),
			};
			log::info!(
				"Received comment on {}#{} from {}",
				repository.full_name,
				issue.number,
				author
			);

			let commands = command::parse_commands(
				&comment.body,
				&author,
				config,
				&app.bot_login,
				None,
			);
			if commands.is_empty() {
				return Ok(());
			}

			let mut world = app.world.lock().await;
			let changed = {
				let state = match world
					.repo_prs_mut(&repository.full_name)
					.get_mut(&issue.number)
				{
					Some(state) => state,
					None => return Ok(()),
				};
				command::apply_commands(
					&app.gh_client,
					&app.store,
					config,
					state,
					&commands,
					true,
				)
				.await?
			};
			if changed {
				queue::process_queue(app, &mut world).await?;
			}
			Ok(())
		}
		Payload::PullRequest {
			action,
			number,
			pull_request,
			repository,
		} => {
			let full_name = repository.full_name;
			if !app.repo_configs.contains_key(&full_name) {
				return Ok(());
			}

			let mut world = app.world.lock().await;
			match action {
				PullRequestAction::Synchronize => {
					if let Some(state) =
						world.repo_prs_mut(&full_name).get_mut(&number)
					{
						log::info!(
							"Head of {}#{} advanced to {}",
							full_name,
							number,
							pull_request.head.sha
						);
						state.head_advanced(
							&pull_request.head.sha,
							&app.store,
						)?;
					}
				}
				PullRequestAction::Opened | PullRequestAction::Reopened => {
					let mut state = PullReqState::new(
						full_name.clone(),
						number,
						pull_request.head.sha.clone(),
						Status::Idle,
					);
					state.title =
						pull_request.title.clone().unwrap_or_default();
					state.body = pull_request.body.clone().unwrap_or_default();
					state.head_ref = pull_request.head_label();
					state.base_ref = pull_request.base.ref_field.clone();
					state.assignee = pull_request
						.assignee
						.as_ref()
						.map(|user| user.login.clone())
						.unwrap_or_default();

					app.store.upsert_status(&full_name, number, Status::Idle)?;
					world.repo_prs_mut(&full_name).insert(number, state);
				}
				PullRequestAction::Closed => {
					if world.repo_prs_mut(&full_name).remove(&number).is_some()
					{
						app.store.delete(&full_name, number)?;
					}
				}
				PullRequestAction::Unknown => return Ok(()),
			}
			queue::process_queue(app, &mut world).await
		}
		Payload::CommitStatus {
			sha,
			state: status_state,
			context,
		} => {
			// our own statuses echo back through the webhook
			if context == STATUS_CONTEXT {
				return Ok(());
			}
			let succeeded = match status_state {
				CommitStatusState::Success => true,
				CommitStatusState::Failure | CommitStatusState::Error => {
					false
				}
				_ => return Ok(()),
			};
			handle_builder_result(app, TRAVIS_BUILDER, &sha, succeeded).await
		}
		_ => Ok(()),
	}
}

/// Completion path shared by the two CI back-ends: the callback is keyed
/// by merge commit, not PR number.
pub async fn handle_builder_result(
	app: &AppState,
	builder: &str,
	sha: &str,
	succeeded: bool,
) -> Result<()> {
	let mut world = app.world.lock().await;

	let (repo, num) = match world.find_by_merge_sha(sha) {
		Some(found) => found,
		None => {
			// An orphaned build (its PR moved on or closed) still has to
			// give the gated lane back.
			if world.slot.release(sha) {
				log::info!(
					"Released the build slot for orphaned build {}",
					sha
				);
				queue::process_queue(app, &mut world).await?;
			}
			return Ok(());
		}
	};

	let config = match app.repo_configs.get(&repo) {
		Some(config) => config,
		None => return Ok(()),
	};

	{
		let World { prs, slot } = &mut *world;
		let state = match prs
			.get_mut(&repo)
			.and_then(|repo_prs| repo_prs.get_mut(&num))
		{
			Some(state) => state,
			None => return Ok(()),
		};
		build::handle_build_result(
			app, config, state, slot, builder, succeeded,
		)
		.await?;
	}

	queue::process_queue(app, &mut world).await
}
