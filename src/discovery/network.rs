//! Network-wide aggregation: classify a bulk ownership-edge set into
//! per-person clusters of direct links.
//!
//! Same degree classification as the single-seed resolver, different
//! traversal shape: one bounded bulk fetch, then a group-by on person id.

use std::collections::HashMap;

use serde::Serialize;

use crate::discovery::{
    classify_degree, distinct_in_order, DiscoveredLink, LINK_KIND_DIRECT,
};
use crate::error::Result;
use crate::store::OwnershipStore;

/// Bucket label when no edge carries a usable partner name.
pub const UNIDENTIFIED_PARTNER: &str = "Sócio não identificado";

/// One person's cluster of direct links in the network overview.
#[derive(Debug, Clone, Serialize)]
pub struct PersonNetwork {
    pub person_name: String,
    pub links: Vec<DiscoveredLink>,
}

/// Build per-person link clusters from one bulk edge fetch of at most
/// `limit` rows. Persons keep their first-seen order; buckets that end up
/// with zero links are dropped.
pub async fn aggregate_network(store: &OwnershipStore, limit: usize) -> Result<Vec<PersonNetwork>> {
    let edges = store.network_edges(limit).await?;
    log::debug!("aggregating {} ownership edge(s)", edges.len());

    let company_ids = distinct_in_order(edges.iter().map(|e| &e.company_id));
    let companies = store.companies_by_id(&company_ids).await?;

    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, (Option<String>, Vec<DiscoveredLink>)> = HashMap::new();

    for edge in edges {
        let bucket = buckets.entry(edge.person_id.clone()).or_insert_with(|| {
            order.push(edge.person_id.clone());
            (None, Vec::new())
        });

        // Bucket label: first non-blank partner name across the edges
        if bucket.0.is_none() {
            if let Some(name) = &edge.person_name {
                if !name.trim().is_empty() {
                    bucket.0 = Some(name.clone());
                }
            }
        }

        // Company name fallback chain: trade name, legal name, raw id
        let company_name = companies
            .get(&edge.company_id)
            .map(|c| c.display_name().to_string())
            .unwrap_or_else(|| edge.company_id.clone());

        bucket.1.push(DiscoveredLink {
            company_id: edge.company_id,
            company_name,
            degree: classify_degree(edge.percentual),
            kind: LINK_KIND_DIRECT,
        });
    }

    Ok(order
        .into_iter()
        .filter_map(|person_id| {
            let (name, links) = buckets.remove(&person_id)?;
            if links.is_empty() {
                return None;
            }
            Some(PersonNetwork {
                person_name: name.unwrap_or_else(|| UNIDENTIFIED_PARTNER.to_string()),
                links,
            })
        })
        .collect())
}
