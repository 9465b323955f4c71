use dcfba::core::errors::OracleError;
use dcfba::core::execution::{
    ConcurrencyMode, DynamicJointFba, DynamicParallelFba, SimulationConfig, SimulationOutcome,
};
use dcfba::core::network::{MetabolicNetwork, Reaction, Species};
use dcfba::core::oracle::FluxSolution;
use dcfba::core::state::StateLedger;
use dcfba::core::types::FluxMap;
use std::collections::HashMap;

/// Configuration for the glucose competition demo
#[derive(Debug, Clone)]
pub struct DemoConfig {
    // Shared medium
    pub glucose: f64,

    // Organisms: (id, uptake per unit biomass, yield, initial biomass)
    pub organisms: Vec<(&'static str, f64, f64, f64)>,

    // Simulation parameters
    pub dt: f64,
    pub max_ticks: usize,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            glucose: 50.0,
            organisms: vec![("ecoli", 10.0, 0.08, 0.1), ("strep", 6.0, 0.12, 0.1)],
            dt: 0.1,
            max_ticks: 500,
        }
    }
}

fn add_organism(
    net: &mut MetabolicNetwork,
    org: &str,
    uptake: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let internal = format!("glc_{org}");
    net.add_species(Species::new(internal.clone(), "c"))?;
    net.add_organism_reaction(
        org,
        Reaction::new(format!("UPT_{org}"), uptake)
            .with_reagent("glc_e", -1.0)
            .with_reagent(internal.clone(), 1.0),
    )?;
    let bio = format!("BIO_{org}");
    net.add_organism_reaction(org, Reaction::new(bio.clone(), 1000.0).with_reagent(internal, -1.0))?;
    net.set_biomass_reaction(org, &bio)?;
    Ok(())
}

fn medium(id: &str, glucose: f64) -> Result<MetabolicNetwork, Box<dyn std::error::Error>> {
    let mut net = MetabolicNetwork::new(id);
    net.add_species(Species::new("glc_e", "e"))?;
    net.add_reaction(Reaction::exchange("EX_glc", "glc_e", -glucose, 1000.0))?;
    Ok(net)
}

/// Every uptake reaction runs at its bound, shared out when the medium is short
fn greedy_oracle(
    yields: HashMap<String, f64>,
) -> impl Fn(&MetabolicNetwork) -> Result<FluxSolution, OracleError> + Send + Sync {
    move |network: &MetabolicNetwork| -> Result<FluxSolution, OracleError> {
        let capacity = network
            .reaction("EX_glc")
            .map(|r| -r.lower_bound())
            .ok_or_else(|| OracleError::Failed("no glucose exchange".to_string()))?
            .max(0.0);
        let demand: f64 = network
            .organisms()
            .filter_map(|org| network.reaction(&format!("UPT_{org}")))
            .map(|r| r.upper_bound().max(0.0))
            .sum();
        let scale = if demand > capacity { capacity / demand } else { 1.0 };

        let mut fluxes = FluxMap::new();
        let mut growth = 0.0;
        for org in network.organisms() {
            let Some(uptake) = network.reaction(&format!("UPT_{org}")) else {
                continue;
            };
            let v = uptake.upper_bound().max(0.0) * scale;
            let bio = yields.get(org.as_str()).copied().unwrap_or(0.0) * v;
            growth += bio;
            fluxes.insert(format!("UPT_{org}"), v);
            fluxes.insert(format!("BIO_{org}"), bio);
        }
        fluxes.insert("EX_glc".to_string(), -(demand * scale));
        if network.has_reaction("X_comm") {
            fluxes.insert("X_comm".to_string(), growth);
        }
        Ok(FluxSolution::new(growth, fluxes))
    }
}

fn print_summary(name: &str, outcome: &SimulationOutcome, ledger: &StateLedger) {
    println!("{name}:");
    println!(
        "  stopped after {} ticks at t={:.3} ({} corrected): {}",
        outcome.ticks, outcome.elapsed, outcome.corrected_ticks, outcome.reason
    );
    if let Some(glc) = ledger.latest_concentration("glc_e") {
        println!("  glucose left: {:.4}", glc);
    }
    for (org, series) in ledger.biomasses() {
        let first = series.first().copied().unwrap_or(0.0);
        let last = series.last().copied().unwrap_or(0.0);
        println!("  {org}: biomass {first:.3} -> {last:.3}");
    }
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let config = DemoConfig::default();
    println!("Glucose competition");
    println!("  glucose: {}", config.glucose);
    for (org, uptake, yield_coefficient, biomass) in &config.organisms {
        println!("  {org}: uptake={uptake}, yield={yield_coefficient}, biomass={biomass}");
    }
    println!();

    let yields: HashMap<String, f64> = config
        .organisms
        .iter()
        .map(|(org, _, y, _)| (org.to_string(), *y))
        .collect();
    let oracle = greedy_oracle(yields);
    let run = SimulationConfig::new(config.dt).with_max_ticks(config.max_ticks);

    // Joint: one combined network maximizing community growth
    let mut community = medium("community", config.glucose)?;
    for (org, uptake, _, _) in &config.organisms {
        add_organism(&mut community, org, *uptake)?;
    }
    let mut joint = DynamicJointFba::new(community, config.organisms.iter().map(|o| o.3))?;
    let outcome = joint.simulate(&oracle, &run)?;
    print_summary("Joint", &outcome, joint.ledger());

    // Parallel: each organism solved on its own against the shared medium
    let mut builder = DynamicParallelFba::builder().concentration("glc_e", config.glucose);
    for (org, uptake, _, biomass) in &config.organisms {
        let mut net = medium(org, config.glucose)?;
        add_organism(&mut net, org, *uptake)?;
        net.set_objective(&format!("BIO_{org}"))?;
        builder = builder.organism(net, *biomass);
    }
    let mut parallel = builder.build()?;
    let outcome = parallel.simulate(&oracle, &run.with_concurrency(ConcurrencyMode::Rayon))?;
    print_summary("Parallel", &outcome, parallel.ledger());

    for (org, shares) in parallel.relative_abundance() {
        let last = shares.last().copied().unwrap_or(0.0);
        println!("{org}: final share {:.1}%", last * 100.0);
    }
    println!("\nFull trajectory: {} bytes of JSON", parallel.ledger().to_json()?.len());

    Ok(())
}
