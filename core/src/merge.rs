//! Merging of arguments discovered more than once.
//!
//! The same option often shows up under several spellings, or once in the
//! usage line and again in the option table. [`Flag::merge`] folds two such
//! sightings into one flag; [`Flag::deduplicate`] applies it to every cluster
//! of flags that share a spelling.
//!
//! # Example
//!
//! ```
//! use helpscope_core::*;
//!
//! let from_usage = Flag::new(vec![FlagSynonym::bare("-f")]).with_optional(false);
//! let from_table = Flag::new(vec![
//!     FlagSynonym::bare("-f"),
//!     FlagSynonym::new("--format", FlagArg::simple("FMT")),
//! ])
//! .with_description("Output format");
//!
//! let merged = Flag::deduplicate(vec![from_usage, from_table]);
//! assert_eq!(merged.len(), 1);
//! assert_eq!(merged[0].synonym_names(), vec!["-f", "--format"]);
//! assert!(!merged[0].optional);
//! ```

use std::collections::BTreeMap;

use crate::{Flag, Positional, infer};

impl Flag {
    /// Combines two sightings of the same option.
    ///
    /// Spellings are unioned, `optional` is the logical AND of both sides,
    /// and the argument pattern is the more specific of the two. The longer
    /// description wins. The operation is commutative and associative, and
    /// merging a flag with itself returns it unchanged.
    pub fn merge(&self, other: &Flag) -> Flag {
        let mut synonyms = self.synonyms.clone();
        synonyms.extend(other.synonyms.iter().cloned());

        let mut merged = Flag {
            synonyms,
            args: self.args.most_specific(&other.args).clone(),
            description: longest(&self.description, &other.description),
            optional: self.optional && other.optional,
            cli_type: None,
            identifier: self.identifier.clone().max(other.identifier.clone()),
        };
        merged.refresh_args();
        if self.cli_type.is_some() || other.cli_type.is_some() {
            merged.cli_type = Some(infer::infer_flag_type(&merged));
        }
        merged
    }

    /// Clusters flags whose spellings intersect and merges each cluster.
    ///
    /// Output order follows the first appearance of each cluster.
    pub fn deduplicate(flags: Vec<Flag>) -> Vec<Flag> {
        let mut clusters: Vec<Flag> = Vec::with_capacity(flags.len());
        for flag in flags {
            let mut merged = flag;
            let mut index = 0;
            let mut first_hit: Option<usize> = None;
            while index < clusters.len() {
                if shares_synonym(&clusters[index], &merged) {
                    let existing = clusters.remove(index);
                    merged = existing.merge(&merged);
                    first_hit = Some(first_hit.map_or(index, |hit| hit.min(index)));
                } else {
                    index += 1;
                }
            }
            match first_hit {
                Some(position) => clusters.insert(position, merged),
                None => clusters.push(merged),
            }
        }
        clusters
    }

    /// Merges two flag lists, e.g. from an option table and a usage line.
    pub fn combine(first: Vec<Flag>, second: Vec<Flag>) -> Vec<Flag> {
        let mut all = first;
        all.extend(second);
        Flag::deduplicate(all)
    }
}

fn shares_synonym(a: &Flag, b: &Flag) -> bool {
    a.synonyms
        .iter()
        .any(|left| b.synonyms.iter().any(|right| left.name == right.name))
}

/// Longer text wins; equal lengths are broken lexically so the choice is
/// independent of argument order.
fn longest(a: &Option<String>, b: &Option<String>) -> Option<String> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if (x.len(), x) >= (y.len(), y) {
                Some(x.clone())
            } else {
                Some(y.clone())
            }
        }
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (None, None) => None,
    }
}

impl Positional {
    /// Combines two sightings of the argument at the same position.
    ///
    /// The argument is optional if either sighting considered it optional.
    pub fn merge(&self, other: &Positional) -> Positional {
        let name = if (self.name.len(), &self.name) >= (other.name.len(), &other.name) {
            self.name.clone()
        } else {
            other.name.clone()
        };
        let mut merged = Positional {
            name,
            position: self.position.min(other.position),
            optional: self.optional || other.optional,
            description: longest(&self.description, &other.description),
            cli_type: None,
            identifier: self.identifier.clone().max(other.identifier.clone()),
        };
        if self.cli_type.is_some() || other.cli_type.is_some() {
            merged.cli_type = Some(infer::infer_positional_type(&merged));
        }
        merged
    }

    /// Groups positionals by position, merging each group, in position order.
    pub fn deduplicate(positionals: Vec<Positional>) -> Vec<Positional> {
        let mut by_position: BTreeMap<usize, Positional> = BTreeMap::new();
        for positional in positionals {
            let merged = match by_position.remove(&positional.position) {
                Some(existing) => existing.merge(&positional),
                None => positional,
            };
            by_position.insert(merged.position, merged);
        }
        by_position.into_values().collect()
    }
}
