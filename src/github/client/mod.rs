use std::borrow::Cow;
use std::time::Duration;

use hyperx::header::{RelationType, TypedHeaders};
use reqwest::{header, RequestBuilder, Response};
use serde::Serialize;
use snafu::ResultExt;

use crate::{
	config::MainConfig,
	error::{self, Error},
	types::Result,
};

mod issue;
mod pull_request;
mod refs;
mod status;
mod user;

pub struct GithubClient {
	client: reqwest::Client,
	pub github_api_url: String,
	token: String,
}

macro_rules! impl_methods_with_body {
	($($method:ident : $method_response_fn:ident),*) => {
		$(
			pub async fn $method<'b, I, B, T>(&self, url: I, body: &B) -> Result<T>
			where
				I: Into<Cow<'b, str>> + Clone,
				B: Serialize,
				T: serde::de::DeserializeOwned,
			{
				self.$method_response_fn(url, body)
					.await?
					.json::<T>()
					.await
					.context(error::Http)
			}

			pub async fn $method_response_fn<'b, I, B>(
				&self,
				url: I,
				body: &B,
			) -> Result<Response>
			where
				I: Into<Cow<'b, str>> + Clone,
				B: Serialize,
			{
				// retry up to N times if request times out
				let mut retries = 0;
				'retry: loop {
					let res = self
						.execute(
							self.client.$method(&*url.clone().into()).json(body),
						)
						.await;
					if let Err(Error::Http { source: e, .. }) = res.as_ref() {
						if e.is_timeout() && retries < 5 {
							log::debug!("Request timed out; retrying");
							retries += 1;
							continue 'retry;
						}
					}
					return res;
				}
			}
		)*
	}
}

async fn handle_response(response: Response) -> Result<Response> {
	log::debug!("response: {:?}", &response);

	let status = response.status();
	if status.is_success() {
		Ok(response)
	} else {
		let text = response.text().await.context(error::Http)?;

		// Try to decode the response error as JSON otherwise store it as
		// plain text in a JSON object.
		let body = if let Ok(value) = serde_json::from_str(&text) {
			value
		} else {
			serde_json::json!({ "error_message": text })
		};

		error::Response { status, body }.fail()
	}
}

impl GithubClient {
	pub fn new(config: &MainConfig) -> Self {
		Self {
			client: reqwest::Client::new(),
			github_api_url: config.github_api_url.clone(),
			token: config.github_token.clone(),
		}
	}

	impl_methods_with_body! {
		post: post_response,
		put: put_response,
		patch: patch_response,
		delete: delete_response
	}

	pub async fn get<'b, I, T>(&self, url: I) -> Result<T>
	where
		I: Into<Cow<'b, str>> + Clone,
		T: serde::de::DeserializeOwned,
	{
		self.get_response(url)
			.await?
			.json::<T>()
			.await
			.context(error::Http)
	}

	pub async fn get_response<'b, I>(&self, url: I) -> Result<Response>
	where
		I: Into<Cow<'b, str>> + Clone,
	{
		let mut retries = 0;
		'retry: loop {
			let res = self
				.execute(self.client.get(&*url.clone().into()))
				.await;
			if let Err(Error::Http { source: e, .. }) = res.as_ref() {
				if e.is_timeout() && retries < 5 {
					log::debug!("Request timed out; retrying");
					retries += 1;
					continue 'retry;
				}
			}
			return res;
		}
	}

	/// Gets all entries across all pages from a resource.
	pub async fn get_all<'b, I, T>(&self, url: I) -> Result<Vec<T>>
	where
		I: Into<Cow<'b, str>>,
		T: serde::de::DeserializeOwned,
	{
		let mut entities = Vec::new();
		let mut next = Some(url.into());

		while let Some(url) = next {
			let response = self.get_response(url).await?;

			next = response
				.headers()
				.decode::<hyperx::header::Link>()
				.ok()
				.iter()
				.flat_map(|v| v.values())
				.find(|link| {
					link.rel().map_or(false, |rel| {
						rel.contains(&RelationType::Next)
					})
				})
				.map(|l| l.link())
				.map(str::to_owned)
				.map(Cow::Owned);

			let mut body = response.json::<Vec<T>>().await.context(error::Http)?;
			entities.append(&mut body);
		}

		Ok(entities)
	}

	async fn execute(&self, builder: RequestBuilder) -> Result<Response> {
		let request = builder
			.bearer_auth(&self.token)
			.header(header::USER_AGENT, "homu/0.1.0")
			.timeout(Duration::from_secs(10))
			.build()
			.context(error::Http)?;

		log::debug!("request: {:?}", &request);
		handle_response(
			self.client.execute(request).await.context(error::Http)?,
		)
		.await
	}
}
