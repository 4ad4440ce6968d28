//! `pvs-vis`: reads a `.prt` portal file, computes the potentially visible
//! set and writes it next to the map as `.pvs`.

mod cli;
mod config;

use cli::*;
use log::{LevelFilter, error, info};
use mimalloc::MiMalloc;
use prt::PrtFile;
use simplelog::{ColorChoice, CombinedLogger, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use vis::{Checkpoint, Vis, VisData, VisOptions};

use crate::config::UserConfig;

const BASE_DIR: &str = "pvs-vis/";

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<(), Box<dyn Error>> {
    let mut options: CLIOptions = argh::from_env();
    let map = PathBuf::from(&options.map);

    init_logger(&map, options.verbose.unwrap_or(LevelFilter::Info))?;

    let mut user_config = UserConfig::load();
    user_config.sync_cli(&mut options);
    user_config.write();

    if let Err(e) = run(&map, &options) {
        error!("{}: {e}", map.display());
        return Err(e);
    }

    #[cfg(feature = "hprof")]
    coarse_prof::write(&mut std::io::stdout())?;
    Ok(())
}

/// Terminal output at the requested level plus a full log beside the map
fn init_logger(map: &Path, level: LevelFilter) -> Result<(), Box<dyn Error>> {
    let config = ConfigBuilder::default()
        .set_time_level(LevelFilter::Trace)
        .build();
    let stem = map.file_stem().and_then(|s| s.to_str()).unwrap_or("map");
    let log_file = File::create(map.with_file_name(format!("{stem}-vis.log")))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(level.max(LevelFilter::Info), config, log_file),
    ])?;
    Ok(())
}

fn run(map: &Path, options: &CLIOptions) -> Result<(), Box<dyn Error>> {
    let prt = PrtFile::load(map)?;
    let vis = Vis::new(&prt, VisOptions::from(options))?.with_checkpoint(Checkpoint::for_map(map));
    let data = vis.run()?;

    let out = options
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| map.with_extension("pvs"));
    write_pvs(&out, &data)?;
    info!("Saved {} bytes of vis data to {out:?}", data.rows.len());

    if let Some(leaf) = options.dump_leaf {
        dump_leaf(&data, leaf)?;
    }
    Ok(())
}

fn write_pvs(path: &Path, data: &VisData) -> Result<(), Box<dyn Error>> {
    let file = BufWriter::new(File::create(path)?);
    bincode::serialize_into(file, data)?;
    Ok(())
}

fn dump_leaf(data: &VisData, leaf: usize) -> Result<(), Box<dyn Error>> {
    let row = data.leaf_row(leaf)?;
    let visible = data.visible_leafs(leaf)?;
    println!("leaf {leaf}: {} visible", visible.len());
    println!(
        "  row: {}",
        row.iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    );
    println!("  leafs: {visible:?}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_a_readable_pvs() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("box.prt");
        std::fs::write(
            &map,
            "PRT1\n2\n1\n4 0 1 (64 -32 -32 ) (64 32 -32 ) (64 32 32 ) (64 -32 32 )\n",
        )
        .unwrap();
        let options = CLIOptions {
            map: map.display().to_string(),
            threads: Some(1),
            ..CLIOptions::default()
        };

        run(&map, &options).unwrap();

        let bytes = std::fs::read(map.with_extension("pvs")).unwrap();
        let data: VisData = bincode::deserialize(&bytes).unwrap();
        assert_eq!(data.visible_leafs(1).unwrap(), vec![0, 1]);
        assert!(!Checkpoint::for_map(&map).exists());
    }

    #[test]
    fn missing_map_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let map = dir.path().join("nothing.prt");
        let options = CLIOptions {
            map: map.display().to_string(),
            ..CLIOptions::default()
        };
        assert!(run(&map, &options).is_err());
    }
}
