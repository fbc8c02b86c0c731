use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::params;
use std::path::Path;

use vinculos::db::{migrate, Db};
use vinculos::discovery::{aggregate_network, find_kinship_candidates, resolve_direct_links};
use vinculos::store::OwnershipStore;
use vinculos::Config;

#[derive(Parser, Debug)]
#[command(name = "vinculos")]
#[command(about = "Entity-relationship discovery over the CRM ownership graph")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify database schema and pragmas
    Verify,
    /// Load a small demo dataset for trying out the discovery commands
    Seed,
    /// Direct company links for a seed person
    Direct {
        /// Seed person identifier (partial CPF)
        person_id: String,
        /// Drop the link to this company (the one the caller is viewing)
        #[arg(long)]
        exclude_company: Option<String>,
        /// Cap on the number of companies considered
        #[arg(long)]
        max_companies: Option<usize>,
    },
    /// Probable relatives of a seed person (heuristic, confidence-scored)
    Kinship {
        /// Seed person identifier (partial CPF)
        person_id: String,
    },
    /// Per-person link clusters across the whole edge table
    Network {
        /// Row limit for the bulk edge fetch (default from config)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    let config = Config::load()?;
    log::info!("Starting Vinculos v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| {
        migrate::run_migrations(conn, migrations_dir)
    }).await?;

    match args.command {
        Command::Verify => {
            verify_schema(&db).await?;
        }
        Command::Seed => {
            seed_demo_data(&db).await?;
        }
        Command::Direct { person_id, exclude_company, max_companies } => {
            let store = OwnershipStore::new(db);
            let links = resolve_direct_links(
                &store,
                &person_id,
                exclude_company.as_deref(),
                max_companies,
            ).await?;
            println!("{}", serde_json::to_string_pretty(&links)?);
        }
        Command::Kinship { person_id } => {
            let store = OwnershipStore::new(db);
            let report = find_kinship_candidates(&store, &config.discovery, &person_id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Network { limit } => {
            let store = OwnershipStore::new(db);
            let limit = limit.unwrap_or(config.discovery.network_edge_limit);
            let network = aggregate_network(&store, limit).await?;
            println!("{}", serde_json::to_string_pretty(&network)?);
        }
    }

    Ok(())
}

/// Verify that all expected database objects exist
async fn verify_schema(db: &Db) -> Result<()> {
    use vinculos::error::VinculosError;

    db.with_connection(|conn| {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = vec!["companies", "ownership_edges", "persons", "schema_migrations"];
        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                return Err(VinculosError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("✓ Table exists: {}", table);
        }

        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%' ORDER BY name")?;
        let indexes: Vec<String> = stmt.query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        for index_name in ["idx_edges_person", "idx_edges_company"] {
            if !indexes.iter().any(|i| i == index_name) {
                return Err(VinculosError::Config(format!("Missing index: {}", index_name)));
            }
            log::debug!("✓ Index exists: {}", index_name);
        }

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(VinculosError::Config(format!("Journal mode is not WAL: {}", journal_mode)));
        }
        log::debug!("✓ Journal mode: WAL");

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(VinculosError::Config(format!("Database integrity check failed: {}", integrity)));
        }
        log::info!("✓ Database integrity: OK");

        Ok(())
    }).await?;

    log::info!("✓ Database schema verification complete");
    Ok(())
}

/// Replace the demo dataset: a handful of partners and companies that
/// exercise every discovery command.
async fn seed_demo_data(db: &Db) -> Result<()> {
    db.with_connection(|conn| {
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM ownership_edges", [])?;
        tx.execute("DELETE FROM persons", [])?;
        tx.execute("DELETE FROM companies", [])?;

        let persons = [
            ("12345678900", "Maria Silva", Some("1975-03-12")),
            ("98765432100", "João Silva", Some("1979-11-02")),
            ("12345699911", "Paula Silva", None),
            ("45678912300", "Carlos Pereira", Some("1968-07-30")),
        ];
        for (cpf, name, birth) in persons {
            tx.execute(
                "INSERT INTO persons (cpf_mask, name, birth_date) VALUES (?1, ?2, ?3)",
                params![cpf, name, birth],
            )?;
        }

        let companies = [
            ("11222333000181", "Padaria Central LTDA", Some("Pão Quente"), "ATIVA"),
            ("22333444000172", "Transportes Silva LTDA", None::<&str>, "ATIVA"),
            ("33444555000163", "Mercado Bom Preço LTDA", Some("Bom Preço"), "BAIXADA"),
        ];
        for (cnpj, razao, fantasia, situacao) in companies {
            tx.execute(
                "INSERT INTO companies (cnpj, razao_social, nome_fantasia, situacao) VALUES (?1, ?2, ?3, ?4)",
                params![cnpj, razao, fantasia, situacao],
            )?;
        }

        let edges = [
            ("12345678900", "11222333000181", "Sócio-Administrador", Some(60.0)),
            ("12345678900", "22333444000172", "Sócio", Some(15.0)),
            ("98765432100", "11222333000181", "Sócio", None::<f64>),
            ("12345699911", "22333444000172", "Sócio", Some(30.0)),
            ("45678912300", "33444555000163", "Administrador", None),
            // Edge to a company the CRM has not mirrored yet
            ("45678912300", "44555666000154", "Sócio", Some(50.0)),
        ];
        for (person, company, qualificacao, percentual) in edges {
            tx.execute(
                "INSERT INTO ownership_edges (person_id, company_id, qualificacao, percentual) VALUES (?1, ?2, ?3, ?4)",
                params![person, company, qualificacao, percentual],
            )?;
        }

        tx.commit()?;
        Ok(())
    }).await?;

    log::info!("Demo dataset loaded (4 persons, 3 companies, 6 edges)");
    log::info!("Try: vinculos kinship 12345678900");
    Ok(())
}
