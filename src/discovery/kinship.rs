//! Kinship heuristics: estimate likely family ties between a seed person
//! and their co-partners from weak, non-authoritative signals.
//!
//! No registry records kinship, so this engine scores three signals per
//! (seed, candidate) pair: a shared surname, a shared tax-id prefix, and
//! co-membership in the same companies. Signals are folded into a
//! per-candidate accumulator, clamped at the confidence ceiling, and
//! emitted as one deduplicated candidate each.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::config::DiscoveryConfig;
use crate::discovery::{distinct_in_order, mask_tax_id};
use crate::error::Result;
use crate::store::OwnershipStore;

const SURNAME_WEIGHT: u32 = 45;
const CPF_PREFIX_WEIGHT: u32 = 25;
const SHARED_COMPANY_WEIGHT: u32 = 10;
const CPF_PREFIX_LEN: usize = 6;

/// Hard ceiling on heuristic confidence: these ties are never externally
/// verified, so the score never reaches 100. Applied at every
/// accumulation step, not just at the end.
pub const CONFIDENCE_CEILING: u32 = 95;

/// A probable relative of the seed, with the aggregated evidence.
/// The tax id is already masked; this struct is safe to return as-is.
#[derive(Debug, Clone, Serialize)]
pub struct KinshipCandidate {
    pub cpf_mask: String,
    pub name: String,
    pub reasons: String,
    pub confidence: u32,
}

/// The seed person as echoed back to the caller (masked).
#[derive(Debug, Clone, Serialize)]
pub struct KinshipSeed {
    pub cpf_mask: String,
    pub name: String,
}

/// Result of a kinship run: the seed plus candidates sorted descending by
/// confidence (ties keep discovery order).
#[derive(Debug, Clone, Serialize)]
pub struct KinshipReport {
    pub seed: KinshipSeed,
    pub candidates: Vec<KinshipCandidate>,
}

/// Running score for one candidate while signals are folded in.
#[derive(Debug, Default)]
struct ScoreAccumulator {
    total: u32,
    reasons: Vec<String>,
}

impl ScoreAccumulator {
    fn add(&mut self, points: u32, reason: String) {
        self.total = (self.total + points).min(CONFIDENCE_CEILING);
        self.reasons.push(reason);
    }
}

/// Last whitespace-delimited token of a display name, upper-cased.
/// Single-token and empty names have no usable surname.
fn surname(name: &str) -> Option<String> {
    let mut tokens = name.split_whitespace();
    tokens.next()?;
    tokens.last().map(|t| t.to_uppercase())
}

/// Find probable relatives of the seed person.
///
/// Candidate generation is two-hop: the seed's companies, then every
/// co-partner of those companies. The co-partner fan-out is capped at
/// `copartner_company_cap` companies before the bulk edge query is issued.
/// A seed with no companies yields an empty (successful) report.
pub async fn find_kinship_candidates(
    store: &OwnershipStore,
    config: &DiscoveryConfig,
    seed_id: &str,
) -> Result<KinshipReport> {
    // Independent reads for the seed row and its edges.
    let (seed, seed_edges) = tokio::try_join!(
        store.get_person(seed_id),
        store.edges_for_person(seed_id.trim()),
    )?;

    let report_seed = KinshipSeed {
        cpf_mask: mask_tax_id(&seed.id),
        name: seed.name.clone(),
    };

    let mut seed_companies = distinct_in_order(seed_edges.iter().map(|e| &e.company_id));
    if seed_companies.len() > config.copartner_company_cap {
        log::warn!(
            "seed {} has {} companies, capping co-partner lookup at {}",
            report_seed.cpf_mask,
            seed_companies.len(),
            config.copartner_company_cap
        );
        seed_companies.truncate(config.copartner_company_cap);
    }

    if seed_companies.is_empty() {
        return Ok(KinshipReport {
            seed: report_seed,
            candidates: Vec::new(),
        });
    }

    let co_edges = store.edges_for_companies(&seed_companies).await?;

    // Candidate pool: every co-partner except the seed, in discovery order,
    // with their distinct shared companies.
    let mut candidate_ids: Vec<String> = Vec::new();
    let mut shared_companies: HashMap<String, Vec<String>> = HashMap::new();
    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    for edge in &co_edges {
        if edge.person_id == seed.id {
            continue;
        }
        if !shared_companies.contains_key(&edge.person_id) {
            candidate_ids.push(edge.person_id.clone());
        }
        if seen_pairs.insert((edge.person_id.clone(), edge.company_id.clone())) {
            shared_companies
                .entry(edge.person_id.clone())
                .or_default()
                .push(edge.company_id.clone());
        }
    }

    if candidate_ids.is_empty() {
        return Ok(KinshipReport {
            seed: report_seed,
            candidates: Vec::new(),
        });
    }

    let persons = store.persons_by_id(&candidate_ids).await?;

    // Fold every signal into the per-candidate accumulator. Signal order
    // per candidate: surname, tax-id prefix, then shared companies in
    // discovery order.
    let seed_surname = surname(&seed.name);
    let mut accumulators: HashMap<String, ScoreAccumulator> = HashMap::new();
    for candidate_id in &candidate_ids {
        let candidate_name = persons
            .get(candidate_id)
            .map(|p| p.name.as_str())
            .unwrap_or("");

        if let (Some(seed_sn), Some(candidate_sn)) = (&seed_surname, surname(candidate_name)) {
            if *seed_sn == candidate_sn {
                accumulators.entry(candidate_id.clone()).or_default().add(
                    SURNAME_WEIGHT,
                    format!("Mesmo sobrenome ({})", candidate_sn),
                );
            }
        }

        if let (Some(seed_prefix), Some(candidate_prefix)) =
            (seed.id.get(..CPF_PREFIX_LEN), candidate_id.get(..CPF_PREFIX_LEN))
        {
            if seed_prefix == candidate_prefix {
                accumulators
                    .entry(candidate_id.clone())
                    .or_default()
                    .add(CPF_PREFIX_WEIGHT, "CPF com prefixo igual".to_string());
            }
        }

        if let Some(companies) = shared_companies.get(candidate_id) {
            for company_id in companies {
                accumulators.entry(candidate_id.clone()).or_default().add(
                    SHARED_COMPANY_WEIGHT,
                    format!("Empresa compartilhada {}", company_id),
                );
            }
        }
    }

    // Materialize in discovery order, drop score-zero candidates, mask,
    // then stable-sort descending by confidence.
    let mut candidates: Vec<KinshipCandidate> = candidate_ids
        .iter()
        .filter_map(|id| {
            let acc = accumulators.get(id)?;
            if acc.total == 0 {
                return None;
            }
            Some(KinshipCandidate {
                cpf_mask: mask_tax_id(id),
                name: persons.get(id).map(|p| p.name.clone()).unwrap_or_default(),
                reasons: acc.reasons.join("; "),
                confidence: acc.total,
            })
        })
        .collect();
    candidates.sort_by(|a, b| b.confidence.cmp(&a.confidence));

    log::debug!(
        "kinship run for seed {}: {} co-partner edge(s), {} scored candidate(s)",
        report_seed.cpf_mask,
        co_edges.len(),
        candidates.len()
    );

    Ok(KinshipReport {
        seed: report_seed,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VinculosError;
    use crate::store::tests::{insert_edge, insert_person, setup_store};

    fn config() -> DiscoveryConfig {
        DiscoveryConfig::default()
    }

    #[test]
    fn test_surname_extraction() {
        assert_eq!(surname("Maria Silva"), Some("SILVA".to_string()));
        assert_eq!(surname("Ana Clara de Souza"), Some("SOUZA".to_string()));
        assert_eq!(surname("Madonna"), None);
        assert_eq!(surname(""), None);
        assert_eq!(surname("   "), None);
    }

    #[tokio::test]
    async fn test_scenario_surname_and_shared_company() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        insert_person(&store, "98765432100", "João Silva").await;
        insert_edge(&store, "12345678900", "C1", "Sócio", Some(50.0)).await;
        insert_edge(&store, "12345678900", "C2", "Sócio", Some(50.0)).await;
        insert_edge(&store, "98765432100", "C1", "Sócio", None).await;

        let report = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        assert_eq!(report.seed.name, "Maria Silva");
        assert_eq!(report.candidates.len(), 1);

        let joao = &report.candidates[0];
        assert_eq!(joao.cpf_mask, "***.654.321-**");
        assert_eq!(joao.name, "João Silva");
        assert_eq!(joao.confidence, 55);
        assert!(joao.reasons.contains("Mesmo sobrenome (SILVA)"));
        assert!(joao.reasons.contains("Empresa compartilhada C1"));
    }

    #[tokio::test]
    async fn test_dedup_one_candidate_many_signals() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        insert_person(&store, "98765432100", "João Silva").await;
        insert_edge(&store, "12345678900", "C1", "Sócio", None).await;
        insert_edge(&store, "12345678900", "C2", "Sócio", None).await;
        insert_edge(&store, "98765432100", "C1", "Sócio", None).await;
        insert_edge(&store, "98765432100", "C2", "Sócio", None).await;

        let report = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        // One merged candidate, never one entry per signal
        assert_eq!(report.candidates.len(), 1);

        let joao = &report.candidates[0];
        assert_eq!(joao.confidence, 45 + 10 + 10);
        let fragments: Vec<&str> = joao.reasons.split("; ").collect();
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0], "Mesmo sobrenome (SILVA)");
        assert_eq!(fragments[1], "Empresa compartilhada C1");
        assert_eq!(fragments[2], "Empresa compartilhada C2");
    }

    #[tokio::test]
    async fn test_confidence_clamped_to_ceiling() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "11122233344", "Pedro Almeida").await;
        insert_person(&store, "11122299988", "Lucas Almeida").await;
        for c in ["C1", "C2", "C3"] {
            insert_edge(&store, "11122233344", c, "Sócio", None).await;
            insert_edge(&store, "11122299988", c, "Sócio", None).await;
        }

        let report = find_kinship_candidates(&store, &config(), "11122233344")
            .await
            .unwrap();
        assert_eq!(report.candidates.len(), 1);
        // 45 (surname) + 25 (prefix) + 3 * 10 (companies) would be 100
        assert_eq!(report.candidates[0].confidence, CONFIDENCE_CEILING);
        assert!(report.candidates[0].reasons.contains("CPF com prefixo igual"));
    }

    #[tokio::test]
    async fn test_no_self_candidate() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        // Seed has two edges to the same company; only co-partners count
        insert_edge(&store, "12345678900", "C1", "Sócio", None).await;
        insert_edge(&store, "12345678900", "C1", "Administrador", None).await;

        let report = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        assert!(report.candidates.is_empty());
    }

    #[tokio::test]
    async fn test_sorted_descending_with_stable_ties() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        insert_person(&store, "20000000001", "Carlos Pereira").await;
        insert_person(&store, "30000000002", "Rita Silva").await;
        insert_person(&store, "40000000003", "Bruno Costa").await;
        insert_edge(&store, "12345678900", "C1", "Sócio", None).await;
        // Carlos first in discovery order but only shares the company (10);
        // Rita also matches the surname (55); Bruno ties Carlos at 10.
        insert_edge(&store, "20000000001", "C1", "Sócio", None).await;
        insert_edge(&store, "30000000002", "C1", "Sócio", None).await;
        insert_edge(&store, "40000000003", "C1", "Sócio", None).await;

        let report = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        let scores: Vec<u32> = report.candidates.iter().map(|c| c.confidence).collect();
        assert_eq!(scores, vec![55, 10, 10]);
        assert_eq!(report.candidates[0].name, "Rita Silva");
        // Tie keeps discovery order: Carlos before Bruno
        assert_eq!(report.candidates[1].name, "Carlos Pereira");
        assert_eq!(report.candidates[2].name, "Bruno Costa");
    }

    #[tokio::test]
    async fn test_seed_without_companies_yields_empty_report() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;

        let report = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        assert!(report.candidates.is_empty());
        assert_eq!(report.seed.cpf_mask, "***.456.789-**");
    }

    #[tokio::test]
    async fn test_missing_seed_is_not_found() {
        let (store, _temp) = setup_store().await;
        let err = find_kinship_candidates(&store, &config(), "00000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, VinculosError::SeedNotFound(_)));
    }

    #[tokio::test]
    async fn test_unmirrored_candidate_scores_without_name() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        // Candidate appears only in the edge table, no person row
        insert_edge(&store, "12345678900", "C1", "Sócio", None).await;
        insert_edge(&store, "55566677788", "C1", "Sócio", None).await;

        let report = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        assert_eq!(report.candidates.len(), 1);
        let candidate = &report.candidates[0];
        // No surname signal possible, but the shared company still counts
        assert_eq!(candidate.confidence, 10);
        assert_eq!(candidate.name, "");
        assert_eq!(candidate.reasons, "Empresa compartilhada C1");
    }

    #[tokio::test]
    async fn test_copartner_cap_bounds_fanout() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        insert_person(&store, "20000000001", "Carlos Pereira").await;
        for i in 0..4 {
            insert_edge(&store, "12345678900", &format!("C{}", i), "Sócio", None).await;
            insert_edge(&store, "20000000001", &format!("C{}", i), "Sócio", None).await;
        }

        let cfg = DiscoveryConfig {
            copartner_company_cap: 2,
            ..DiscoveryConfig::default()
        };
        let report = find_kinship_candidates(&store, &cfg, "12345678900")
            .await
            .unwrap();
        // Only the first two companies feed the co-partner lookup
        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].confidence, 20);
    }

    #[tokio::test]
    async fn test_idempotent_runs() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        insert_person(&store, "98765432100", "João Silva").await;
        insert_person(&store, "20000000001", "Carlos Pereira").await;
        insert_edge(&store, "12345678900", "C1", "Sócio", None).await;
        insert_edge(&store, "98765432100", "C1", "Sócio", None).await;
        insert_edge(&store, "20000000001", "C1", "Sócio", None).await;

        let first = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        let second = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_all_confidences_within_range() {
        let (store, _temp) = setup_store().await;
        insert_person(&store, "12345678900", "Maria Silva").await;
        insert_person(&store, "12345699900", "Paula Silva").await;
        insert_person(&store, "20000000001", "Carlos Pereira").await;
        insert_edge(&store, "12345678900", "C1", "Sócio", None).await;
        insert_edge(&store, "12345699900", "C1", "Sócio", None).await;
        insert_edge(&store, "20000000001", "C1", "Sócio", None).await;

        let report = find_kinship_candidates(&store, &config(), "12345678900")
            .await
            .unwrap();
        assert!(!report.candidates.is_empty());
        for candidate in &report.candidates {
            assert!(candidate.confidence > 0);
            assert!(candidate.confidence <= CONFIDENCE_CEILING);
            assert_ne!(candidate.cpf_mask, report.seed.cpf_mask);
        }
    }
}
