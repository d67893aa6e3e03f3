use lazy_static::lazy_static;
use regex::Regex;
use snafu::ResultExt;

use crate::{
	config::RepoConfig, constants::STOP_BUILD_REASON, error, types::Result,
};

lazy_static! {
	static ref ERROR_DIV: Regex =
		Regex::new(r#"(?s)<div class="error">(.*?)</div>"#).unwrap();
}

/// Asks Buildbot to abort whatever it is building for this repository.
///
/// Returns the control API's complaint, if it made one. The
/// token-authenticated back-end has no stop endpoint, so this is a no-op
/// for travis-backed repositories.
pub async fn stop_current_build(
	config: &RepoConfig,
) -> Result<Option<String>> {
	if config.uses_travis() {
		return Ok(None);
	}

	// The control API is session-based: log in, stop, log out.
	let client = reqwest::Client::builder()
		.cookie_store(true)
		.redirect(reqwest::redirect::Policy::none())
		.build()
		.context(error::Http)?;

	client
		.post(format!("{}/login", config.buildbot_url))
		.form(&[
			("username", config.buildbot_username.as_str()),
			("passwd", config.buildbot_password.as_str()),
		])
		.send()
		.await
		.context(error::Http)?;

	let mut form: Vec<(&str, &str)> = config
		.builders
		.iter()
		.map(|builder| ("selected", builder.as_str()))
		.collect();
	form.push(("comments", STOP_BUILD_REASON));

	let response = client
		.post(format!(
			"{}/builders/_selected/stopselected",
			config.buildbot_url
		))
		.form(&form)
		.send()
		.await
		.context(error::Http)?;
	let text = response.text().await.context(error::Http)?;

	// best-effort; an expired session is Buildbot's problem
	let _ = client
		.get(format!("{}/logout", config.buildbot_url))
		.send()
		.await;

	if text.contains("authzfail") {
		return Ok(Some("Authorization failed".to_string()));
	}
	if let Some(captures) = ERROR_DIV.captures(&text) {
		return Ok(Some(captures[1].trim().to_string()));
	}
	Ok(None)
}
