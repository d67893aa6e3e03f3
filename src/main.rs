use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

use homu::{
	bootstrap,
	config::{load_repo_configs, MainConfig},
	github::GithubClient,
	mergeability, queue,
	store::StateStore,
	types::{AppState, Result, World},
	webhook,
};

#[tokio::main]
async fn main() -> Result<()> {
	env_logger::init();

	let config = MainConfig::from_env();
	let repo_configs = load_repo_configs(&config.repo_config_path)?;
	let store = StateStore::open(&config.db_path)?;
	let gh_client = GithubClient::new(&config);

	let bot_login = gh_client.current_user().await?.login;
	log::info!("Running as @{}", bot_login);

	let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook_port));
	let app = Arc::new(AppState {
		store,
		gh_client,
		config,
		repo_configs,
		bot_login,
		world: Mutex::new(World::default()),
	});

	{
		let mut world = app.world.lock().await;
		bootstrap::synchronize(&app, &mut world).await?;
		queue::process_queue(&app, &mut world).await?;
	}

	tokio::spawn(mergeability::poll(Arc::clone(&app)));

	webhook::init_server(addr, app).await
}
