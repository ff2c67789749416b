use clap::Parser;
use hms_server::{logging, MockServer, ServerConfig};
use tracing::info;

/// HTTP mock server for integration tests
#[derive(Parser, Debug)]
#[command(name = "hms-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "HMS_CONFIG")]
    config: Option<String>,

    /// Address to bind (overrides the config file)
    #[arg(long, env = "HMS_HOST")]
    host: Option<String>,

    /// Port to bind (overrides the config file)
    #[arg(short, long, env = "HMS_PORT")]
    port: Option<u16>,

    /// Log level or filter directive (overrides the config file; RUST_LOG wins)
    #[arg(long, env = "HMS_LOG_LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            config.listen.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;
    logging::init(&config.logging)?;

    let server = MockServer::start(&config).await?;
    let shutdown = server.shutdown_handle();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Received Ctrl-C");
            server.shutdown();
        }
        _ = shutdown.wait() => {}
    }

    server.stopped().await?;
    info!("Mock server stopped");
    Ok(())
}
