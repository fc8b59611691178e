use crate::Features::archetypes::ModifyGen;
use crate::Features::extrapolation::{MassExtrap, NoExtrap};
use crate::Recognition::omniplex::{OmniSpec, StateQuery};
use crate::Stochastic::dumpable::{dump_table, read_snapshot, write_snapshot, Dumpable};
use crate::Stochastic::event_queue::FixedEvent;
use crate::Stochastic::species::SpeciesId;
use crate::Structure::molecule::{BindingSite, ModSite, ModValue, MolId, MolType};
use crate::Structure::plex::{Plex, SiteSpec};
use crate::settings::SimConfig;
use crate::simulation::{SimError, Simulation};
use log::info;

/// A with site s1, B with site s2, binding both ways
pub fn binding_model(config: SimConfig, kon: f64, koff: f64) -> Result<(Simulation, MolId, MolId), SimError> {
    let mut sim = Simulation::new(config);
    let a = sim.define_molecule(MolType::new("A", vec![BindingSite::new("s1")], vec![], Some(100.0))?)?;
    let b = sim.define_molecule(MolType::new("B", vec![BindingSite::new("s2")], vec![], Some(200.0))?)?;
    sim.add_dimerization(a, "s1", b, "s2", NoExtrap::new(kon).into())?;
    if koff > 0.0 {
        sim.add_decomposition(a, "s1", b, "s2", NoExtrap::new(koff).into())?;
    }
    Ok((sim, a, b))
}

/// default member of the single-mol family of `mol`
pub fn lone_species(sim: &mut Simulation, mol: MolId) -> Result<SpeciesId, SimError> {
    let (family, _) = sim.recognize(&Plex::single(mol))?;
    sim.get_default_member(family)
}

fn print_counters(sim: &Simulation) {
    let counters = sim.counters().dumpables();
    let items: Vec<&dyn Dumpable> = counters.iter().map(|c| c as &dyn Dumpable).collect();
    dump_table(&items).printstd();
}

pub fn plex_examples(task: usize) -> Result<(), SimError> {
    match task {
        0 => {
            // REVERSIBLE BINDING A + B <-> AB
            let (mut sim, a, b) = binding_model(SimConfig::unit_molar(1.0), 1.0, 0.5)?;
            let sp_a = lone_species(&mut sim, a)?;
            let sp_b = lone_species(&mut sim, b)?;
            sim.create_event(sp_a, 100)?;
            sim.create_event(sp_b, 100)?;
            sim.schedule_fixed_event(FixedEvent::Stop, 1.0)?;
            let outcome = sim.run(|_| false)?;
            info!("binding example finished: {:?} at t = {}", outcome, sim.now());
            sim.species_table().printstd();
            print_counters(&sim);
        }
        1 => {
            // KINASE ON A SCAFFOLD PHOSPHORYLATES ITS SUBSTRATE
            let mut sim = Simulation::new(SimConfig::unit_molar(1.0));
            let kin = sim.define_molecule(MolType::new(
                "Kin",
                vec![BindingSite::new("scaf")],
                vec![],
                Some(50_000.0),
            )?)?;
            let scaf = sim.define_molecule(MolType::new(
                "Scaf",
                vec![BindingSite::new("kin"), BindingSite::new("sub")],
                vec![],
                Some(80_000.0),
            )?)?;
            let sub = sim.define_molecule(MolType::new(
                "Sub",
                vec![BindingSite::with_shapes("scaf", vec!["tight", "loose"])],
                vec![ModSite::with_values(
                    "T1",
                    vec![ModValue::new("none", 0.0), ModValue::new("p", 80.0)],
                    "none",
                )?],
                Some(40_000.0),
            )?)?;
            let atp = sim.define_molecule(MolType::new("ATP", vec![], vec![], Some(507.0))?)?;
            let adp = sim.define_molecule(MolType::new("ADP", vec![], vec![], Some(427.0))?)?;
            // phosphorylated substrate lets go of the scaffold
            sim.set_allosteric_shapes(sub, &[("T1", "p")], &[("scaf", "loose")])?;

            sim.add_dimerization(kin, "scaf", scaf, "kin", MassExtrap::new(0.01, 50_000.0, 80_000.0).into())?;
            sim.add_decomposition(kin, "scaf", scaf, "kin", NoExtrap::new(0.1).into())?;
            sim.add_dimerization(sub, "scaf", scaf, "sub", NoExtrap::new(0.01).into())?;
            sim.add_decomposition(
                sub,
                "scaf",
                scaf,
                "sub",
                NoExtrap::new(0.1).with_shape_rate(1, 0, 5.0).into(),
            )?;

            // Kin - Scaf - Sub, the substrate being unphosphorylated
            let mut pattern = Plex::new();
            let k = pattern.add_mol(kin);
            let s = pattern.add_mol(scaf);
            let u = pattern.add_mol(sub);
            pattern.add_binding(SiteSpec::new(k, 0), SiteSpec::new(s, 0))?;
            pattern.add_binding(SiteSpec::new(s, 1), SiteSpec::new(u, 0))?;
            let docked = sim.add_omniplex(OmniSpec {
                pattern,
                free_sites: vec![],
                query: StateQuery::Always,
                overlay: vec![],
            })?;

            let sp_atp = lone_species(&mut sim, atp)?;
            let sp_adp = lone_species(&mut sim, adp)?;
            let sub_type = sim.mol(sub)?.clone();
            let phosphorylate = ModifyGen::new(
                "phosphorylate",
                &sub_type,
                sub,
                &[("T1", "none")],
                &[("T1", "p")],
                NoExtrap::new(0.001).into(),
            )?
            .with_target(u)
            .with_aux_substrate(sp_atp)
            .with_aux_product(sp_adp);
            sim.add_omni_modification(docked, phosphorylate)?;

            for (mol, count) in [(kin, 50), (scaf, 50), (sub, 100)] {
                let sp = lone_species(&mut sim, mol)?;
                sim.create_event(sp, count)?;
            }
            sim.create_event(sp_atp, 1000)?;
            sim.schedule_fixed_event(FixedEvent::Stop, 10.0)?;
            let outcome = sim.run(|_| false)?;
            info!("kinase example finished: {:?} at t = {}", outcome, sim.now());
            sim.species_table().printstd();
            print_counters(&sim);
        }
        2 => {
            // CHECKPOINT AND REPLAY
            let (mut sim, a, b) = binding_model(SimConfig::unit_molar(1.0), 1.0, 0.5)?;
            let sp_a = lone_species(&mut sim, a)?;
            let sp_b = lone_species(&mut sim, b)?;
            sim.create_event(sp_a, 50)?;
            sim.create_event(sp_b, 50)?;
            sim.run(|s| s.counters().firings >= 25)?;
            let path = "plex_snapshot.json";
            write_snapshot(&sim.snapshot()?, path)?;

            let (mut restored, _, _) = binding_model(SimConfig::unit_molar(1.0), 1.0, 0.5)?;
            let records = read_snapshot(path)?;
            restored.replay(&records)?;
            info!(
                "replayed {} species, {} reactions regenerated",
                records.len(),
                restored.counters().reactions
            );
            restored.species_table().printstd();
        }
        3 => {
            // GROWING VOLUME WITH PERIODIC DUMPS
            let (mut sim, a, b) = binding_model(SimConfig::unit_molar(1.0), 1.0, 0.5)?;
            let sp_a = lone_species(&mut sim, a)?;
            let sp_b = lone_species(&mut sim, b)?;
            sim.create_event(sp_a, 200)?;
            sim.create_event(sp_b, 200)?;
            sim.schedule_fixed_event(FixedEvent::Grow { factor: 1.1, period: 0.5 }, 0.5)?;
            sim.schedule_fixed_event(FixedEvent::Dump { period: Some(1.0) }, 1.0)?;
            sim.set_dump_sink(Box::new(|s: &Simulation| {
                println!("t = {:.3}, volume = {:.3}", s.now(), s.volume());
                s.species_table().printstd();
                Ok(())
            }));
            sim.schedule_fixed_event(FixedEvent::Stop, 3.0)?;
            sim.run(|_| false)?;
            print_counters(&sim);
        }
        _ => {
            println!("no example with number {}", task);
        }
    }
    Ok(())
}
