//! Participant rosters.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use auction_types::RosterEntry;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Source of the bidders taking part in a round.
pub trait Roster {
    fn get_participants(&self) -> Result<Vec<RosterEntry>>;
}

impl Roster for Vec<RosterEntry> {
    fn get_participants(&self) -> Result<Vec<RosterEntry>> {
        Ok(self.clone())
    }
}

/// On-disk layout: `{"bidders": [{"name": "...", "bid": 7}, ...]}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterFile {
    pub bidders: Vec<RosterEntry>,
}

/// Roster read from a JSON file.
#[derive(Clone, Debug)]
pub struct JsonRoster {
    path: PathBuf,
}

impl JsonRoster {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` in the roster file layout.
    pub fn save(&self, entries: &[RosterEntry]) -> Result<()> {
        let file = RosterFile {
            bidders: entries.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing roster {}", self.path.display()))
    }
}

impl Roster for JsonRoster {
    fn get_participants(&self) -> Result<Vec<RosterEntry>> {
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading roster {}", self.path.display()))?;
        let file: RosterFile = serde_json::from_str(&raw)
            .with_context(|| format!("parsing roster {}", self.path.display()))?;
        debug!(path = %self.path.display(), bidders = file.bidders.len(), "Roster loaded");
        Ok(file.bidders)
    }
}

/// Generate `count` bidders named `bidder0..` with pairwise distinct bids
/// drawn from `min_bid..=max_bid`.
pub fn random_roster<R: Rng>(
    count: usize,
    min_bid: u64,
    max_bid: u64,
    rng: &mut R,
) -> Result<Vec<RosterEntry>> {
    if min_bid > max_bid {
        bail!("empty bid range {min_bid}..={max_bid}");
    }
    let available = (max_bid - min_bid).saturating_add(1);
    if (count as u64) > available {
        bail!("cannot draw {count} distinct bids from {min_bid}..={max_bid}");
    }

    let mut seen = HashSet::with_capacity(count);
    let mut entries = Vec::with_capacity(count);
    while entries.len() < count {
        let bid = rng.gen_range(min_bid..=max_bid);
        if seen.insert(bid) {
            entries.push(RosterEntry::new(format!("bidder{}", entries.len()), bid));
        }
    }
    Ok(entries)
}
