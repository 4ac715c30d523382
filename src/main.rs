mod catalog;
mod cli;
mod config;
mod error;
mod fs_util;
mod instance;
mod library;
mod links;
mod mod_config;
mod noita;
mod preset;
mod query;
mod reconcile;
mod scanner;
mod session;
mod tags;
mod workshop;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
    cli::run()
}
