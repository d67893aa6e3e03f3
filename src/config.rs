use std::collections::HashMap;

use serde::Deserialize;
use snafu::ResultExt;

use crate::{error, types::Result};

#[derive(Debug, Clone)]
pub struct MainConfig {
	pub db_path: String,
	pub github_token: String,
	pub github_api_url: String,
	pub webhook_secret: String,
	pub webhook_port: u16,
	pub repo_config_path: String,
}

impl MainConfig {
	pub fn from_env() -> Self {
		dotenv::dotenv().ok();

		let db_path = dotenv::var("DB_PATH").expect("DB_PATH");
		let github_token = dotenv::var("GITHUB_TOKEN").expect("GITHUB_TOKEN");
		let github_api_url = dotenv::var("GITHUB_API_URL")
			.unwrap_or_else(|_| "https://api.github.com".to_string());
		let webhook_secret =
			dotenv::var("WEBHOOK_SECRET").expect("WEBHOOK_SECRET");
		let webhook_port = dotenv::var("WEBHOOK_PORT")
			.expect("WEBHOOK_PORT")
			.parse::<u16>()
			.expect("parse webhook_port");
		let repo_config_path =
			dotenv::var("REPO_CONFIG_PATH").expect("REPO_CONFIG_PATH");

		Self {
			db_path,
			github_token,
			github_api_url,
			webhook_secret,
			webhook_port,
			repo_config_path,
		}
	}
}

/// One managed repository, as declared by a `[[repo]]` table in the
/// repository configuration file. Immutable for the lifetime of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
	pub owner: String,
	pub repo: String,
	pub reviewers: Vec<String>,
	#[serde(default = "default_master_branch")]
	pub master_branch: String,
	#[serde(default = "default_tmp_branch")]
	pub tmp_branch: String,
	#[serde(default = "default_buildbot_branch")]
	pub buildbot_branch: String,
	#[serde(default = "default_buildbot_try_branch")]
	pub buildbot_try_branch: String,
	#[serde(default)]
	pub builders: Vec<String>,
	#[serde(default)]
	pub try_builders: Vec<String>,
	#[serde(default)]
	pub buildbot_url: String,
	#[serde(default)]
	pub buildbot_username: String,
	#[serde(default)]
	pub buildbot_password: String,
	pub travis_token: Option<String>,
}

fn default_master_branch() -> String {
	"master".to_string()
}

fn default_tmp_branch() -> String {
	"tmp".to_string()
}

fn default_buildbot_branch() -> String {
	"auto".to_string()
}

fn default_buildbot_try_branch() -> String {
	"try".to_string()
}

impl RepoConfig {
	pub fn full_name(&self) -> String {
		format!("{}/{}", self.owner, self.repo)
	}

	pub fn uses_travis(&self) -> bool {
		self.travis_token.is_some()
	}

	/// CI destination branch for a gated or try build.
	pub fn ci_branch(&self, try_build: bool) -> &str {
		if try_build {
			&self.buildbot_try_branch
		} else {
			&self.buildbot_branch
		}
	}

	/// Builders expected to report on a build. A travis-backed repository
	/// reports through a single synthetic builder.
	pub fn ci_builders(&self, try_build: bool) -> Vec<String> {
		if self.uses_travis() {
			vec![crate::constants::TRAVIS_BUILDER.to_string()]
		} else if try_build {
			self.try_builders.clone()
		} else {
			self.builders.clone()
		}
	}
}

#[derive(Debug, Deserialize)]
struct RepoConfigFile {
	#[serde(default)]
	repo: Vec<RepoConfig>,
}

/// Loads the `[[repo]]` tables and keys them by full name.
pub fn load_repo_configs(path: &str) -> Result<HashMap<String, RepoConfig>> {
	let raw = std::fs::read_to_string(path).context(error::Io)?;
	let file: RepoConfigFile = toml::from_str(&raw).context(error::Toml)?;
	Ok(file
		.repo
		.into_iter()
		.map(|cfg| (cfg.full_name(), cfg))
		.collect())
}
