mod parsing;
mod secret;
mod settings;
mod types;

pub(crate) use settings::CALLBACK_PATH;
pub(crate) use types::{ExecutorBackend, SecuritySettings, Settings};
