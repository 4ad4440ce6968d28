use argh::FromArgs;
use log::LevelFilter;
use std::time::Duration;
use vis::VisOptions;

/// Compute the potentially visible set of a map from its portal file
#[derive(Debug, Clone, Default, FromArgs)]
pub struct CLIOptions {
    /// path to the portal file (.prt)
    #[argh(positional)]
    pub map: String,
    /// verbose level: off, error, warn, info, debug, trace
    #[argh(option)]
    pub verbose: Option<LevelFilter>,
    /// output file, defaults to the map path with a .pvs extension
    #[argh(option, short = 'o')]
    pub output: Option<String>,
    /// skip the full pass and keep the rough flood result
    #[argh(switch)]
    pub fast: bool,
    /// separator test level, 0-4 (0: portal planes only, 4: tightest)
    #[argh(option)]
    pub level: Option<u8>,
    /// portals further apart than this can't see each other, 0 disables
    #[argh(option)]
    pub visdist: Option<f64>,
    /// worker threads, 0 uses every core
    #[argh(option)]
    pub threads: Option<usize>,
    /// ignore an existing checkpoint and start over
    #[argh(switch)]
    pub nostate: bool,
    /// keep the checkpoint file after a successful run
    #[argh(switch)]
    pub noautoclean: bool,
    /// seconds between checkpoint saves
    #[argh(option)]
    pub state_interval: Option<u64>,
    /// print the leafs visible from this leaf once done
    #[argh(option)]
    pub dump_leaf: Option<usize>,
}

impl From<&CLIOptions> for VisOptions {
    fn from(c: &CLIOptions) -> Self {
        let d = VisOptions::default();
        VisOptions {
            fast: c.fast,
            level: c.level.unwrap_or(d.level),
            visdist: c.visdist.unwrap_or(d.visdist),
            threads: c.threads.unwrap_or(d.threads),
            nostate: c.nostate,
            autoclean: !c.noautoclean,
            state_interval: c
                .state_interval
                .map(Duration::from_secs)
                .unwrap_or(d.state_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args() {
        let cli = CLIOptions::from_args(
            &["pvs-vis"],
            &[
                "e1m1.prt",
                "--level",
                "2",
                "--threads",
                "3",
                "--noautoclean",
                "--verbose",
                "debug",
            ],
        )
        .unwrap();
        assert_eq!(cli.map, "e1m1.prt");
        assert_eq!(cli.verbose, Some(LevelFilter::Debug));

        let opts = VisOptions::from(&cli);
        assert_eq!(opts.level, 2);
        assert_eq!(opts.threads, 3);
        assert!(!opts.autoclean);
        assert!(!opts.fast);
        assert_eq!(opts.state_interval, VisOptions::default().state_interval);
    }

    #[test]
    fn map_is_required() {
        assert!(CLIOptions::from_args(&["pvs-vis"], &["--fast"]).is_err());
    }
}
