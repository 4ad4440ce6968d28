use log::info;
use math::{DVec3, MAX_WINDING};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Most leafs or clusters a portal file may declare
pub const MAX_LEAFS: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum PrtError {
    #[error("could not read portal file: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown portal file header {0:?}, expected PRT1 or PRT2")]
    BadHeader(String),
    #[error("portal file ended early, expected {0}")]
    UnexpectedEof(&'static str),
    #[error("line {line}: {msg}")]
    Parse { line: usize, msg: String },
    #[error("line {line}: {what} {count} is more than {max}")]
    TooLarge {
        line: usize,
        what: &'static str,
        count: usize,
        max: usize,
    },
    #[error("portal {portal} has {points} points, need 3 to {MAX_WINDING}")]
    BadWinding { portal: usize, points: usize },
    #[error("leaf {leaf} listed for cluster {cluster} but there are only {count} leafs")]
    LeafOutOfRange {
        leaf: usize,
        cluster: usize,
        count: usize,
    },
    #[error("leaf {0} is not assigned to any cluster")]
    Unclustered(usize),
}

/// Which layout the file used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrtFormat {
    /// Portals join real leafs
    Prt1,
    /// Portals join clusters of real leafs
    Prt2,
}

/// One undirected portal as written by the compiler
#[derive(Debug, Clone, PartialEq)]
pub struct PrtPortal {
    pub points: Vec<DVec3>,
    /// The winding plane faces into `leafs[0]`
    pub leafs: [usize; 2],
}

/// Everything the visibility tool needs from a portal file
#[derive(Debug, Clone, PartialEq)]
pub struct PrtFile {
    pub format: PrtFormat,
    /// Leafs (PRT1) or clusters (PRT2) the portals join
    pub num_leafs: usize,
    /// Real leafs, equal to `num_leafs` for PRT1
    pub num_real_leafs: usize,
    pub portals: Vec<PrtPortal>,
    /// Cluster of each real leaf, PRT2 only
    pub clusters: Option<Vec<usize>>,
}

impl PrtFile {
    /// Plain leaf graph with no clusters
    pub fn new(num_leafs: usize, portals: Vec<PrtPortal>) -> Self {
        Self {
            format: PrtFormat::Prt1,
            num_leafs,
            num_real_leafs: num_leafs,
            portals,
            clusters: None,
        }
    }

    /// Cluster graph. `clusters[leaf]` is the cluster of each real leaf.
    pub fn with_clusters(num_clusters: usize, portals: Vec<PrtPortal>, clusters: Vec<usize>) -> Self {
        Self {
            format: PrtFormat::Prt2,
            num_leafs: num_clusters,
            num_real_leafs: clusters.len(),
            portals,
            clusters: Some(clusters),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PrtError> {
        let text = fs::read_to_string(path.as_ref())?;
        let prt = Self::parse(&text)?;
        info!("{:6} leafs", prt.num_real_leafs);
        if prt.format == PrtFormat::Prt2 {
            info!("{:6} clusters", prt.num_leafs);
        }
        info!("{:6} portals", prt.portals.len());
        Ok(prt)
    }

    pub fn parse(text: &str) -> Result<Self, PrtError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (_, header) = lines.next().ok_or(PrtError::UnexpectedEof("header"))?;
        let format = match header {
            "PRT1" => PrtFormat::Prt1,
            "PRT2" => PrtFormat::Prt2,
            other => return Err(PrtError::BadHeader(other.to_owned())),
        };

        let mut count = |what: &'static str, max: usize| -> Result<usize, PrtError> {
            let (line, text) = lines.next().ok_or(PrtError::UnexpectedEof(what))?;
            let count = parse_num(text, line, what)?;
            if count > max {
                return Err(PrtError::TooLarge {
                    line,
                    what,
                    count,
                    max,
                });
            }
            Ok(count)
        };

        let (num_real_leafs, num_leafs) = match format {
            PrtFormat::Prt1 => {
                let n = count("leaf count", MAX_LEAFS)?;
                (n, n)
            }
            PrtFormat::Prt2 => {
                let real = count("leaf count", MAX_LEAFS)?;
                (real, count("cluster count", MAX_LEAFS)?)
            }
        };
        let num_portals = count("portal count", usize::MAX)?;

        // the count is only trusted as far as the lines that follow it
        let mut portals = Vec::with_capacity(num_portals.min(4096));
        for portal in 0..num_portals {
            let (line, text) = lines.next().ok_or(PrtError::UnexpectedEof("portal"))?;
            portals.push(parse_portal(text, line, portal)?);
        }

        let clusters = match format {
            PrtFormat::Prt1 => None,
            PrtFormat::Prt2 => Some(parse_clusters(
                lines.flat_map(|(line, text)| tokens(text).map(move |t| (line, t))),
                num_real_leafs,
                num_leafs,
            )?),
        };

        Ok(Self {
            format,
            num_leafs,
            num_real_leafs,
            portals,
            clusters,
        })
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|t| !t.is_empty())
}

fn parse_num<T: FromStr>(text: &str, line: usize, what: &str) -> Result<T, PrtError> {
    text.parse().map_err(|_| PrtError::Parse {
        line,
        msg: format!("bad {what} {text:?}"),
    })
}

fn parse_portal(text: &str, line: usize, portal: usize) -> Result<PrtPortal, PrtError> {
    let mut toks = tokens(text);
    let mut next = |what: &'static str| {
        toks.next().ok_or_else(|| PrtError::Parse {
            line,
            msg: format!("missing {what}"),
        })
    };

    let num_points: usize = parse_num(next("point count")?, line, "point count")?;
    if !(3..=MAX_WINDING).contains(&num_points) {
        return Err(PrtError::BadWinding {
            portal,
            points: num_points,
        });
    }
    let leafs = [
        parse_num(next("leaf")?, line, "leaf")?,
        parse_num(next("leaf")?, line, "leaf")?,
    ];

    let mut points = Vec::with_capacity(num_points);
    for _ in 0..num_points {
        let x = parse_num(next("coordinate")?, line, "coordinate")?;
        let y = parse_num(next("coordinate")?, line, "coordinate")?;
        let z = parse_num(next("coordinate")?, line, "coordinate")?;
        points.push(DVec3::new(x, y, z));
    }

    Ok(PrtPortal { points, leafs })
}

fn parse_clusters<'a>(
    mut toks: impl Iterator<Item = (usize, &'a str)>,
    num_real_leafs: usize,
    num_clusters: usize,
) -> Result<Vec<usize>, PrtError> {
    let mut clusters = vec![None; num_real_leafs];
    for cluster in 0..num_clusters {
        loop {
            let (line, text) = toks.next().ok_or(PrtError::UnexpectedEof("cluster leaf list"))?;
            let leaf: i64 = parse_num(text, line, "leaf")?;
            if leaf < 0 {
                break;
            }
            let leaf = leaf as usize;
            if leaf >= num_real_leafs {
                return Err(PrtError::LeafOutOfRange {
                    leaf,
                    cluster,
                    count: num_real_leafs,
                });
            }
            clusters[leaf] = Some(cluster);
        }
    }

    clusters
        .into_iter()
        .enumerate()
        .map(|(leaf, c)| c.ok_or(PrtError::Unclustered(leaf)))
        .collect()
}
