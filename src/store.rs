//! Ownership Graph Accessor: the read-only query surface over the CRM
//! store that every discovery operation goes through.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::Row;

use crate::db::Db;
use crate::discovery::{Company, NetworkEdge, OwnershipEdge, Person};
use crate::error::{Result, VinculosError};

/// Read-only accessor over persons, companies and ownership edges.
/// Storage failures surface as `VinculosError::Storage`; a missing seed is
/// the distinct `SeedNotFound` so callers can 404 instead of 500.
pub struct OwnershipStore {
    db: Db,
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<OwnershipEdge> {
    Ok(OwnershipEdge {
        person_id: row.get(0)?,
        company_id: row.get(1)?,
        qualificacao: row.get(2)?,
        percentual: row.get(3)?,
    })
}

fn parse_birth_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

/// Build a `?,?,...` placeholder list for an IN clause.
fn placeholders(n: usize) -> String {
    std::iter::repeat("?").take(n).collect::<Vec<_>>().join(",")
}

impl OwnershipStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Resolve a person by identifier. Blank ids are rejected before any
    /// store call; an unknown id is `SeedNotFound`.
    pub async fn get_person(&self, id: &str) -> Result<Person> {
        let id = id.trim();
        if id.is_empty() {
            return Err(VinculosError::InvalidInput(
                "person identifier must not be empty".to_string(),
            ));
        }

        let id_owned = id.to_string();
        let found = self
            .db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT cpf_mask, name, birth_date FROM persons WHERE cpf_mask = ?1",
                )?;
                let mut rows = stmt.query([&id_owned])?;
                match rows.next()? {
                    Some(row) => Ok(Some(Person {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        birth_date: parse_birth_date(row.get(2)?),
                    })),
                    None => Ok(None),
                }
            })
            .await?;

        found.ok_or_else(|| VinculosError::SeedNotFound(id.to_string()))
    }

    /// All ownership edges where this person is the source, in storage order.
    /// Empty vec (not an error) when none.
    pub async fn edges_for_person(&self, person_id: &str) -> Result<Vec<OwnershipEdge>> {
        let person_id = person_id.to_string();
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT person_id, company_id, qualificacao, percentual \
                     FROM ownership_edges WHERE person_id = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map([&person_id], edge_from_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(VinculosError::Storage)?);
                }
                Ok(out)
            })
            .await
    }

    /// All edges whose company is in the given set, across all persons.
    /// Used to discover co-partners. An empty input set short-circuits to an
    /// empty result without a storage round-trip.
    pub async fn edges_for_companies(&self, company_ids: &[String]) -> Result<Vec<OwnershipEdge>> {
        if company_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = company_ids.to_vec();
        self.db
            .with_connection(move |conn| {
                let query = format!(
                    "SELECT person_id, company_id, qualificacao, percentual \
                     FROM ownership_edges WHERE company_id IN ({}) ORDER BY id",
                    placeholders(ids.len())
                );
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), edge_from_row)?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(VinculosError::Storage)?);
                }
                Ok(out)
            })
            .await
    }

    /// Companies by id set, keyed by id. Missing ids are simply absent from
    /// the map; the caller decides the fallback.
    pub async fn companies_by_id(&self, ids: &[String]) -> Result<HashMap<String, Company>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = ids.to_vec();
        self.db
            .with_connection(move |conn| {
                let query = format!(
                    "SELECT cnpj, razao_social, nome_fantasia, situacao \
                     FROM companies WHERE cnpj IN ({})",
                    placeholders(ids.len())
                );
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                    Ok(Company {
                        id: row.get(0)?,
                        razao_social: row.get(1)?,
                        nome_fantasia: row.get(2)?,
                        situacao: row.get(3)?,
                    })
                })?;
                let mut out = HashMap::new();
                for row in rows {
                    let company = row.map_err(VinculosError::Storage)?;
                    out.insert(company.id.clone(), company);
                }
                Ok(out)
            })
            .await
    }

    /// Persons by id set, keyed by id. Missing ids are absent from the map.
    pub async fn persons_by_id(&self, ids: &[String]) -> Result<HashMap<String, Person>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let ids = ids.to_vec();
        self.db
            .with_connection(move |conn| {
                let query = format!(
                    "SELECT cpf_mask, name, birth_date FROM persons WHERE cpf_mask IN ({})",
                    placeholders(ids.len())
                );
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?;
                let mut out = HashMap::new();
                for row in rows {
                    let (id, name, birth_date) = row.map_err(VinculosError::Storage)?;
                    out.insert(
                        id.clone(),
                        Person {
                            id,
                            name,
                            birth_date: parse_birth_date(birth_date),
                        },
                    );
                }
                Ok(out)
            })
            .await
    }

    /// Bulk edge fetch for the network aggregator: edges joined with the
    /// partner's name (LEFT JOIN, the person may not be mirrored yet),
    /// bounded by `limit`.
    pub async fn network_edges(&self, limit: usize) -> Result<Vec<NetworkEdge>> {
        self.db
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT e.person_id, p.name, e.company_id, e.qualificacao, e.percentual \
                     FROM ownership_edges e \
                     LEFT JOIN persons p ON p.cpf_mask = e.person_id \
                     ORDER BY e.id LIMIT ?1",
                )?;
                let rows = stmt.query_map([limit as i64], |row| {
                    Ok(NetworkEdge {
                        person_id: row.get(0)?,
                        person_name: row.get(1)?,
                        company_id: row.get(2)?,
                        qualificacao: row.get(3)?,
                        percentual: row.get(4)?,
                    })
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(VinculosError::Storage)?);
                }
                Ok(out)
            })
            .await
    }
}
