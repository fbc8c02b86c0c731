//! Entity-relationship discovery over the ownership graph.
//!
//! Three operations share this module: one-hop direct-link resolution for a
//! seed person, heuristic kinship scoring (two-hop, co-partner based), and
//! network-wide aggregation of a bulk edge set.

mod direct;
mod kinship;
mod network;

pub use direct::{classify_degree, resolve_direct_links};
pub use kinship::{
    find_kinship_candidates, KinshipCandidate, KinshipReport, KinshipSeed, CONFIDENCE_CEILING,
};
pub use network::{aggregate_network, PersonNetwork, UNIDENTIFIED_PARTNER};

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Static tag carried by every discovered link. Only direct (one-hop)
/// links exist today; indirect kinds would get their own tag.
pub const LINK_KIND_DIRECT: &str = "direct";

/// A partner/shareholder as mirrored from the external registry.
/// The id is a partial tax identifier; the full CPF is never stored.
#[derive(Debug, Clone, Serialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
}

/// A registered company (CNPJ-keyed).
#[derive(Debug, Clone, Serialize)]
pub struct Company {
    pub id: String,
    pub razao_social: String,
    pub nome_fantasia: Option<String>,
    pub situacao: String,
}

impl Company {
    /// Display name: trade name preferred, falling back to the legal name.
    pub fn display_name(&self) -> &str {
        match &self.nome_fantasia {
            Some(nf) if !nf.trim().is_empty() => nf,
            _ => &self.razao_social,
        }
    }
}

/// A Person -> Company relationship from the registry. The percentage is
/// frequently absent upstream, which is not an error.
#[derive(Debug, Clone)]
pub struct OwnershipEdge {
    pub person_id: String,
    pub company_id: String,
    pub qualificacao: String,
    pub percentual: Option<f64>,
}

/// One row of the bulk network fetch: an ownership edge joined with the
/// partner's name (absent when the person is not mirrored yet).
#[derive(Debug, Clone)]
pub struct NetworkEdge {
    pub person_id: String,
    pub person_name: Option<String>,
    pub company_id: String,
    pub qualificacao: String,
    pub percentual: Option<f64>,
}

/// Ownership strength, derived solely from the edge percentage.
/// Serialized as its numeric tier (1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Degree {
    /// >= 50%: controlling/majority stake
    Controlling = 1,
    /// 20% to <50%: significant minority
    Significant = 2,
    /// < 20% or unknown percentage
    Minor = 3,
}

impl Degree {
    pub fn tier(self) -> u8 {
        self as u8
    }
}

impl Serialize for Degree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.tier())
    }
}

/// A classified one-hop link from a seed person to a company.
/// Derived fresh per request, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredLink {
    pub company_id: String,
    pub company_name: String,
    pub degree: Degree,
    pub kind: &'static str,
}

/// Distinct values in first-seen order. Discovery ordering is part of the
/// contract (stable sorts tie-break on it), so plain HashSet iteration is
/// not enough.
pub(crate) fn distinct_in_order<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.as_str()) {
            out.push(item.clone());
        }
    }
    out
}

/// Redact a tax identifier to its privacy-safe form before it leaves the
/// engine. 11-digit CPFs render as `***.ddd.ddd-**` (digits 4-9 visible);
/// anything else keeps at most the same middle window. Internal comparisons
/// always run on the unmasked stored identifier, never on this output.
pub fn mask_tax_id(id: &str) -> String {
    let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 11 {
        format!("***.{}.{}-**", &digits[3..6], &digits[6..9])
    } else {
        id.chars()
            .enumerate()
            .map(|(i, c)| if (3..9).contains(&i) { c } else { '*' })
            .collect()
    }
}
