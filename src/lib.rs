//! Typed async client for the SimpleFACT invoicing API—rate-aware request orchestration,
//! single-flight token refresh, and pluggable transports behind one request pipeline.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod client;
pub mod error;
pub mod http;
pub mod limit;
pub mod obs;
pub mod retry;
pub mod services;
pub mod testing;
pub mod token;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::Client as ReqwestClient;
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value as Json;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, ErrorCode, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use httpmock as _;
