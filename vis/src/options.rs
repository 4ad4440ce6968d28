use std::time::Duration;

/// Highest separator test level
pub const MAX_LEVEL: u8 = 4;

/// Run settings handed to [`crate::Vis`]
#[derive(Debug, Clone, PartialEq)]
pub struct VisOptions {
    /// Take the base pass result as final and skip the flow
    pub fast: bool,
    /// How many separator families the flow clips by, `0..=4`
    pub level: u8,
    /// Portals further apart than this never see each other, `0` disables
    pub visdist: f64,
    /// Worker threads, `0` uses every core
    pub threads: usize,
    /// Ignore an existing checkpoint
    pub nostate: bool,
    /// Remove the checkpoint after a successful run
    pub autoclean: bool,
    /// Time between checkpoint saves
    pub state_interval: Duration,
}

impl Default for VisOptions {
    fn default() -> Self {
        Self {
            fast: false,
            level: MAX_LEVEL,
            visdist: 0.0,
            threads: 0,
            nostate: false,
            autoclean: true,
            state_interval: Duration::from_secs(5 * 60),
        }
    }
}
