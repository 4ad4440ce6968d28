use thiserror::Error;

use crate::MAX_PORTALS_ON_LEAF;

#[derive(Debug, Error)]
pub enum VisError {
    #[error("leaf {leaf} has more than {MAX_PORTALS_ON_LEAF} portals")]
    TooManyPortals { leaf: usize },
    #[error("portal {portal} joins leaf {leaf} but there are only {count} leafs")]
    LeafOutOfRange {
        portal: usize,
        leaf: usize,
        count: usize,
    },
    #[error("portal {portal} leads from leaf {leaf} back into itself")]
    SelfPortal { portal: usize, leaf: usize },
    #[error("portal {portal} has a degenerate winding of {points} points")]
    BadWinding { portal: usize, points: usize },
    #[error("portal {portal} was never resolved")]
    PortalNotDone { portal: usize },
    #[error("compressed row overruns its data at byte {offset}")]
    RowOverrun { offset: usize },
    #[error("no leaf {leaf}, there are {count}")]
    NoSuchLeaf { leaf: usize, count: usize },
    #[error("real leaf {leaf} maps to cluster {cluster} which does not exist")]
    BadCluster { leaf: usize, cluster: usize },
    #[error("could not start workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint: {0}")]
    State(String),
}

pub type VisResult<T> = Result<T, VisError>;
