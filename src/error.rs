use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility = "pub")]
pub enum Error {
	#[snafu(display("Error: {}", msg))]
	Message {
		msg: String,
	},

	/// An error response from an integration service (e.g. the hosted
	/// platform or the CI control API).
	#[snafu(display("Status code: {}\nBody:\n{:#?}", status, body))]
	Response {
		status: reqwest::StatusCode,
		body: serde_json::Value,
	},

	/// An error occurred while sending or receiving a HTTP request or
	/// response respectively.
	#[snafu(display("Source: {}", source))]
	Http {
		source: reqwest::Error,
	},

	/// An error occurred in the webhook server.
	#[snafu(display("Source: {}", source))]
	Hyper {
		source: hyper::Error,
	},

	#[snafu(display("Source: {}", source))]
	Io {
		source: std::io::Error,
	},

	/// An error occurred while retrieving or setting values in Rocks DB.
	#[snafu(display("Source: {}", source))]
	Db {
		source: rocksdb::Error,
	},

	#[snafu(display("Source: {}", source))]
	Bincode {
		source: bincode::Error,
	},

	/// An error occurred while parsing TOML.
	#[snafu(display("Source: {}", source))]
	Toml {
		source: toml::de::Error,
	},
}
