use anyhow::Result;
use detr_draw::{
    config::{Args, Config},
    save_dir::{AssumeYes, Confirm, StdinPrompt},
};
use std::env;
use structopt::StructOpt;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

pub fn main() -> Result<()> {
    // setup tracing
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();
    let filter_layer = {
        let filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            filter.add_directive(LevelFilter::INFO.into())
        } else {
            filter
        }
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();

    // parse arguments
    let config = Config::from_args(Args::from_args())?;
    info!("{:#?}", config);

    let mut confirm: Box<dyn Confirm> = if config.assume_yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinPrompt::stdio())
    };

    // start drawing program
    let outputs = detr_draw::start(&config, confirm.as_mut())?;
    info!("wrote {} images", outputs.len());

    Ok(())
}
