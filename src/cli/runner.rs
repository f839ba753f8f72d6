//! CLI runner - executes the selected mode

use crate::catalog::Catalog;
use crate::cli::commands::Cli;
use crate::config::TapConfig;
use crate::engine::{SyncEngine, SyncStats};
use crate::error::Result;
use crate::sink::{RecordSink, SingerSink};
use crate::state::StateManager;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = TapConfig::from_file(&self.cli.config)?;

        if self.cli.discover {
            let stdout = std::io::stdout();
            return self.discover(&mut stdout.lock());
        }

        let stats = self.sync(&config, Arc::new(SingerSink::stdout())).await?;
        info!(
            records = stats.total_records(),
            streams = stats.streams_synced,
            "Done"
        );
        Ok(())
    }

    /// Write the discovered catalog as pretty JSON
    pub fn discover(&self, out: &mut impl Write) -> Result<()> {
        let catalog = Catalog::discover()?;
        info!(streams = catalog.streams.len(), "Discovered streams");
        serde_json::to_writer_pretty(&mut *out, &catalog)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }

    /// Sync the selected streams into `sink`
    pub async fn sync(&self, config: &TapConfig, sink: Arc<dyn RecordSink>) -> Result<SyncStats> {
        let catalog = match &self.cli.catalog {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::discover()?,
        };

        let mut state = match &self.cli.state {
            Some(path) => StateManager::from_file(path)?,
            None => StateManager::in_memory(),
        };
        if let Some(path) = &self.cli.state_output {
            state = state.with_output(path);
        }

        SyncEngine::from_config(config, sink, state)?
            .run(&catalog)
            .await
    }
}
