use serde::Deserialize;

use crate::error::Result;
use crate::storage::disk::DiskType;

#[derive(Debug, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    /// Number of frames the buffer pool manages.
    pub pool_size: usize,
    /// The K of the LRU-K replacement policy.
    pub replacer_k: usize,
    pub disk_type: DiskType,
    /// Backing file for the file disk manager, ignored by the memory one.
    pub path: String,
}

impl Config {
    pub fn new(file: &str) -> Result<Config> {
        let mut cfg = config::Config::builder()
            .set_default("log_level", "debug")?
            .set_default("pool_size", "64")?
            .set_default("replacer_k", "2")?
            .set_default("disk_type", "memory")?
            .set_default("path", "pagebox.db")?;
        if !file.is_empty() {
            cfg = cfg.add_source(config::File::with_name(file))
        }
        cfg = cfg.add_source(config::Environment::with_prefix("PAGEBOX"));
        Ok(cfg.build()?.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() -> Result<()> {
        let cfg = Config::new("")?;
        assert_eq!(LogLevel::Debug, cfg.log_level);
        assert_eq!(64, cfg.pool_size);
        assert_eq!(2, cfg.replacer_k);
        assert_eq!(DiskType::Memory, cfg.disk_type);
        assert_eq!("pagebox.db", cfg.path);
        Ok(())
    }
}
