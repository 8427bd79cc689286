use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::kv::{HighMemoryStore, KvStore, SledStore};
use super::{exporter, loader, Lookups, Result, TransformConfig};

/// Orchestrates one end-to-end run: extract any bundled archives, load
/// the reference tables, stage enrichment rows into a KV store, then
/// export every venue shard to the configured gzip output (C5/C6 wired
/// together behind the CLI boundary).
pub struct Transformer {
    config: TransformConfig,
    lookups: Lookups,
}

impl Transformer {
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            lookups: Lookups::new(),
        }
    }

    /// Loads the six (plus optional IBGE) reference tables from the
    /// configured data directory. Must run before `transform`.
    pub fn load_lookups(&mut self) -> Result<()> {
        self.lookups.load_from_directory(&self.config.data_dir)?;
        Ok(())
    }

    /// Runs the loader then the exporter and writes the gzip NDJSON output.
    pub fn transform(&self) -> Result<()> {
        tracing::info!(data_dir = %self.config.data_dir, output = %self.config.output, "starting transformation");
        tracing::info!(privacy = self.config.privacy_mode, high_memory = self.config.high_memory, "run configuration");

        let kv: Arc<dyn KvStore> = if self.config.high_memory {
            Arc::new(HighMemoryStore::new())
        } else {
            Arc::new(SledStore::open_temp()?)
        };

        let load_span = tracing::info_span!("load");
        {
            let _enter = load_span.enter();
            loader::load_all(&self.config.data_dir, &self.lookups, kv.clone())?;
        }

        let file = File::create(&self.config.output)?;
        let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());

        let export_span = tracing::info_span!("export");
        {
            let _enter = export_span.enter();
            exporter::export_all(
                &self.config.data_dir,
                &self.lookups,
                kv.clone(),
                self.config.privacy_mode,
                self.config.batch_size,
                encoder,
            )?;
        }

        // The KV store is only destroyed once export has consumed every
        // staged fragment (§3), never before — see `loader::load_all`'s
        // `flush`-only close of the load phase.
        kv.close()?;

        tracing::info!("transformation complete");
        Ok(())
    }

    /// Extracts a single archive into `output_dir`. The Federal Revenue
    /// distributes each shard group as its own ZIP; shards are read
    /// directly off disk rather than out of the archive, so this runs
    /// once per downloaded file before `transform`.
    pub fn extract_zip(&self, zip_path: &str, output_dir: &str) -> Result<()> {
        use std::io::copy;
        use zip::ZipArchive;

        let file = File::open(zip_path)?;
        let mut archive = ZipArchive::new(file)?;

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let outpath = format!("{}/{}", output_dir, file.name());

            if file.name().ends_with('/') {
                std::fs::create_dir_all(&outpath)?;
            } else {
                if let Some(p) = std::path::Path::new(&outpath).parent() {
                    if !p.exists() {
                        std::fs::create_dir_all(p)?;
                    }
                }
                let mut outfile = File::create(&outpath)?;
                copy(&mut file, &mut outfile)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transformer_creation() {
        let config = TransformConfig::default();
        let transformer = Transformer::new(config);
        assert_eq!(transformer.config.privacy_mode, false);
    }
}
