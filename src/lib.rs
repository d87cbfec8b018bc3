// Library root
// -----------
// Client SDK for the Konfuzio document-processing server. The binary
// (`main.rs`) uses these modules to implement the setup CLI.
//
// Module responsibilities:
// - `settings`: resolves host, token, data folder and project id from the
//   environment and the `.env` file; writes the `.env` file during `init`.
// - `urls`: endpoint URLs of the server.
// - `session`: authenticated blocking HTTP sessions and the `Transport`
//   seam every request goes through.
// - `fetch`: GET with retry and pagination.
// - `api`: `KonfuzioClient`, one method per server operation.
// - `models`: records the server returns.
// - `utils`: file checks, file type sniffing and image loading.
// - `ui`: the interactive `init` and `download_data` flows.
// - `logging`: tracing subscriber setup for the binary.
pub mod api;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod models;
pub mod session;
pub mod settings;
pub mod ui;
pub mod urls;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{FileVariant, KonfuzioClient};
pub use error::{Error, Result};
pub use fetch::{Fetcher, RetryPolicy};
pub use session::{Session, Transport};
pub use settings::Settings;
