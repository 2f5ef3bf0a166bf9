use aurum_application::config::{BrokerMode, Config, FeedMode};
use aurum_application::shared::resolve_pair;
use aurum_domain::repositories::broker::BrokerGateway;
use aurum_domain::repositories::market_data::PriceFeed;
use aurum_infrastructure::broker::alpaca::{KEY_ID_ENV, SECRET_KEY_ENV};
use aurum_infrastructure::broker::{AlpacaBroker, SimBroker};
use aurum_infrastructure::journal::CsvJournal;
use aurum_infrastructure::market_data::{AlpacaBarsFeed, CsvPriceFeed};
use std::env;
use std::path::PathBuf;

pub struct EngineDeps {
    pub feed: Box<dyn PriceFeed>,
    pub broker: Box<dyn BrokerGateway>,
    pub journal: CsvJournal,
}

pub fn build_engine_deps(config: &Config) -> Result<EngineDeps, String> {
    let journal = CsvJournal::new(PathBuf::from(&config.paths.state_dir));
    let broker = build_broker(config, &journal)?;
    Ok(EngineDeps {
        feed: build_feed(config)?,
        broker,
        journal,
    })
}

pub fn build_journal(config: &Config) -> CsvJournal {
    CsvJournal::new(PathBuf::from(&config.paths.state_dir))
}

pub fn build_feed(config: &Config) -> Result<Box<dyn PriceFeed>, String> {
    match config.data.feed {
        FeedMode::Csv => {
            let dir = config
                .data
                .csv_dir
                .as_deref()
                .ok_or_else(|| "data.csv_dir is required for the csv feed".to_string())?;
            Ok(Box::new(CsvPriceFeed::new(PathBuf::from(dir))))
        }
        FeedMode::Alpaca => {
            let data_url = config
                .data
                .data_url
                .as_deref()
                .ok_or_else(|| "data.data_url is required for the alpaca feed".to_string())?;
            let (key_id, secret_key) = resolve_credentials()?;
            Ok(Box::new(AlpacaBarsFeed::new(
                data_url.to_string(),
                key_id,
                secret_key,
                config.broker.timeout_ms,
                config.broker.retries,
            )?))
        }
    }
}

pub fn build_broker(
    config: &Config,
    journal: &CsvJournal,
) -> Result<Box<dyn BrokerGateway>, String> {
    match config.broker.mode {
        BrokerMode::Alpaca => Ok(Box::new(AlpacaBroker::from_env(
            config.broker.base_url.clone(),
            config.broker.timeout_ms,
            config.broker.retries,
        )?)),
        BrokerMode::Sim => {
            use aurum_domain::repositories::journal::JournalReader;
            let trades = journal.read_trades()?;
            Ok(Box::new(SimBroker::from_trades(
                config.run.initial_capital,
                &resolve_pair(config),
                &trades,
            )))
        }
    }
}

fn resolve_credentials() -> Result<(String, String), String> {
    let key_id = env::var(KEY_ID_ENV)
        .map_err(|_| format!("missing broker credentials: env {} is not set", KEY_ID_ENV))?;
    let secret_key = env::var(SECRET_KEY_ENV).map_err(|_| {
        format!("missing broker credentials: env {} is not set", SECRET_KEY_ENV)
    })?;
    Ok((key_id, secret_key))
}
