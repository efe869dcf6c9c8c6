use clap::Parser;
use fngate::{catalog, config, config::ConfigError, net::ListFunctionsResponse, Registry, Server};
use std::sync::Arc;

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from("fngate.toml"))]
    config_file: String,
    #[arg(short, long, default_value_t = String::from(""))]
    template: String,
    /// Print the registered functions as JSON and exit.
    #[arg(long, default_value_t = false)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    // Create a template configuration and exit.
    if !args.template.is_empty() {
        config::create_template(&args.template, config::default_conf().as_str())?;
        return Ok(());
    }

    let settings = match config::Settings::from_file(&args.config_file) {
        Ok(settings) => settings,
        Err(ConfigError::Io(err)) => {
            log::warn!("cannot read {}: {}, using defaults", args.config_file, err);
            config::Settings::default()
        }
        Err(err) => return Err(err.into()),
    };

    let mut builder = Registry::builder();
    catalog::register(&mut builder, settings.server.stream_buffer)?;
    let registry = Arc::new(builder.build()?);

    if args.list {
        let functions: ListFunctionsResponse = registry.list().collect();
        println!("{}", serde_json::to_string_pretty(&functions)?);
        return Ok(());
    }

    let addr = settings.server.socket_addr()?;
    let server = Server::new(registry).with_call_timeout(settings.server.call_timeout());

    let async_runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    async_runtime.block_on(server.serve_tcp(addr))?;
    Ok(())
}
