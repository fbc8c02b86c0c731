//! One-hop expansion: a seed person's ownership edges, classified by
//! ownership strength.

use crate::discovery::{distinct_in_order, Degree, DiscoveredLink, LINK_KIND_DIRECT};
use crate::error::Result;
use crate::store::OwnershipStore;

/// Ordinal ownership strength from an edge percentage.
///
/// Pure and total: an absent percentage is deliberately the weakest tier,
/// not an error, because the upstream registry frequently omits it. Both
/// the direct resolver and the network aggregator classify through this
/// one function so the tiers never diverge.
pub fn classify_degree(percentual: Option<f64>) -> Degree {
    match percentual {
        Some(p) if p >= 50.0 => Degree::Controlling,
        Some(p) if p >= 20.0 => Degree::Significant,
        _ => Degree::Minor,
    }
}

/// Resolve a seed person's direct company links.
///
/// `exclude_company` drops the edge pointing at the company the caller is
/// already viewing. `max_companies`, when set, caps how many edges are
/// considered before the company-name lookup. Links come back in storage
/// order; a person with zero edges yields an empty vec.
pub async fn resolve_direct_links(
    store: &OwnershipStore,
    person_id: &str,
    exclude_company: Option<&str>,
    max_companies: Option<usize>,
) -> Result<Vec<DiscoveredLink>> {
    // Seed lookup and edge fetch are independent reads; issue them together.
    let (seed, edges) = tokio::try_join!(
        store.get_person(person_id),
        store.edges_for_person(person_id.trim()),
    )?;

    let mut edges: Vec<_> = edges
        .into_iter()
        .filter(|e| exclude_company.map_or(true, |c| e.company_id != c))
        .collect();
    if let Some(cap) = max_companies {
        edges.truncate(cap);
    }

    let company_ids = distinct_in_order(edges.iter().map(|e| &e.company_id));
    let companies = store.companies_by_id(&company_ids).await?;

    log::debug!(
        "resolved {} direct link(s) for seed {}",
        edges.len(),
        seed.id
    );

    Ok(edges
        .into_iter()
        .map(|e| {
            let company_name = companies
                .get(&e.company_id)
                .map(|c| c.display_name().to_string())
                .unwrap_or_else(|| e.company_id.clone());
            DiscoveredLink {
                company_id: e.company_id,
                company_name,
                degree: classify_degree(e.percentual),
                kind: LINK_KIND_DIRECT,
            }
        })
        .collect())
}
