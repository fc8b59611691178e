#[cfg(test)]
mod tests {
    use crate::Recognition::omniplex::{OmniSpec, StateQuery};
    use crate::Recognition::plex_family::FamilyId;
    use crate::Structure::molecule::{BindingSite, ModSite, MolId, MolParam, MolType};
    use crate::Structure::plex::{Plex, SiteSpec};
    use crate::settings::SimConfig;
    use crate::simulation::{SimError, Simulation};

    /// A(x, y) with a modification site, B(z)
    fn setup() -> (Simulation, MolId, MolId) {
        let mut sim = Simulation::new(SimConfig::unit_molar(1.0));
        let a = sim
            .define_molecule(
                MolType::new(
                    "A",
                    vec![
                        BindingSite::new("x"),
                        BindingSite::with_shapes("y", vec!["open", "closed"]),
                    ],
                    vec![ModSite::new("T", vec!["none", "p"], "none").unwrap()],
                    Some(10.0),
                )
                .unwrap(),
            )
            .unwrap();
        let b = sim
            .define_molecule(MolType::new("B", vec![BindingSite::new("z")], vec![], Some(5.0)).unwrap())
            .unwrap();
        (sim, a, b)
    }

    /// A - B bound through A.x, mols listed in the given order
    fn a_b(a: MolId, b: MolId, b_first: bool) -> Plex {
        let mut p = Plex::new();
        if b_first {
            let nb = p.add_mol(b);
            let na = p.add_mol(a);
            p.add_binding(SiteSpec::new(nb, 0), SiteSpec::new(na, 0)).unwrap();
        } else {
            let na = p.add_mol(a);
            let nb = p.add_mol(b);
            p.add_binding(SiteSpec::new(na, 0), SiteSpec::new(nb, 0)).unwrap();
        }
        p
    }

    #[test]
    fn test_isomorphic_plexes_share_family() {
        let (mut sim, a, b) = setup();
        sim.declare_binding(a, "x", b, "z").unwrap();
        let (f1, iso1) = sim.recognize(&a_b(a, b, false)).unwrap();
        let (f2, iso2) = sim.recognize(&a_b(a, b, true)).unwrap();
        assert_eq!(f1, f2);
        assert_eq!(sim.families().len(), 1);
        // the paradigm is the first listing; the second maps B (its mol 0) to paradigm mol 1
        assert_eq!(iso1.forward.mol(0), Some(0));
        assert_eq!(iso2.forward.mol(0), Some(1));
        assert_eq!(iso2.backward.mol(1), Some(0));
    }

    #[test]
    fn test_recognize_is_idempotent() {
        let (mut sim, a, _) = setup();
        let (f1, iso1) = sim.recognize(&Plex::single(a)).unwrap();
        let (f2, iso2) = sim.recognize(&Plex::single(a)).unwrap();
        assert_eq!(f1, f2);
        assert_eq!(iso1, iso2);
        assert_eq!(sim.counters().families, 1);
    }

    #[test]
    fn test_get_member_returns_same_species() {
        let (mut sim, a, _) = setup();
        let (family, _) = sim.recognize(&Plex::single(a)).unwrap();
        let first = sim.get_default_member(family).unwrap();
        let again = sim.get_default_member(family).unwrap();
        assert_eq!(first, again);
        let phospho = sim.mol(a).unwrap().param_from_names(&[("T", "p")]).unwrap();
        let other = sim.get_member(family, vec![phospho]).unwrap();
        assert_ne!(first, other);
        assert_eq!(sim.family(family).unwrap().members(), &[first, other]);
        assert_eq!(sim.counters().species, 2);
    }

    #[test]
    fn test_get_member_rejects_bad_params() {
        let (mut sim, a, _) = setup();
        let (family, _) = sim.recognize(&Plex::single(a)).unwrap();
        let err = sim.get_member(family, vec![MolParam::Small]);
        assert!(matches!(err, Err(SimError::BadParamVector(_))));
        let err = sim.get_member(family, vec![]);
        assert!(matches!(err, Err(SimError::BadParamVector(_))));
        assert_eq!(sim.counters().species, 0);
    }

    #[test]
    fn test_missing_binding_feature_leaves_no_family() {
        let (mut sim, a, b) = setup();
        let features_before = sim.features().len();
        let err = sim.recognize(&a_b(a, b, false));
        match err {
            Err(SimError::MissingBindingFeature { left, right }) => {
                assert_eq!(left, "A//x");
                assert_eq!(right, "B//z");
            }
            other => panic!("unexpected {:?}", other.map(|(f, _)| f)),
        }
        assert_eq!(sim.families().len(), 0);
        assert_eq!(sim.features().len(), features_before);
        // declaring the binding afterwards makes the same plex recognizable
        sim.declare_binding(a, "x", b, "z").unwrap();
        assert!(sim.recognize(&a_b(a, b, false)).is_ok());
    }

    #[test]
    fn test_species_names_and_weights() {
        let (mut sim, a, b) = setup();
        sim.declare_binding(a, "x", b, "z").unwrap();
        let params = vec![
            sim.mol(a).unwrap().default_param(),
            sim.mol(b).unwrap().default_param(),
        ];
        let sp = sim.species_from_plex(&a_b(a, b, false), params).unwrap();
        let species = sim.species(sp).unwrap();
        assert_eq!(species.name, "A_B::(A//x -> B//z)::A[none]");
        assert!((species.weight - 15.0).abs() < 1e-12);
        assert!(species.site_state(0, 0).unwrap().bound);
        assert!(!species.site_state(0, 1).unwrap().bound);
    }

    #[test]
    fn test_species_from_plex_reorders_params() {
        let (mut sim, a, b) = setup();
        sim.declare_binding(a, "x", b, "z").unwrap();
        let phospho = sim.mol(a).unwrap().param_from_names(&[("T", "p")]).unwrap();
        // paradigm lists A first
        let first = sim
            .species_from_plex(&a_b(a, b, false), vec![phospho.clone(), MolParam::Small])
            .unwrap();
        // the same species written with B first
        let second = sim
            .species_from_plex(&a_b(a, b, true), vec![MolParam::Small, phospho])
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_allostery_sets_site_shape() {
        let (mut sim, a, _) = setup();
        sim.set_allosteric_shapes(a, &[("T", "p")], &[("y", "closed")])
            .unwrap();
        let (family, _) = sim.recognize(&Plex::single(a)).unwrap();
        let plain = sim.get_default_member(family).unwrap();
        let phospho = sim.mol(a).unwrap().param_from_names(&[("T", "p")]).unwrap();
        let modified = sim.get_member(family, vec![phospho]).unwrap();
        assert_eq!(sim.species(plain).unwrap().site_state(0, 1).unwrap().shape, 0);
        assert_eq!(sim.species(modified).unwrap().site_state(0, 1).unwrap().shape, 1);
    }

    #[test]
    fn test_omniplex_overlay_when_query_holds() {
        let (mut sim, a, b) = setup();
        sim.declare_binding(a, "x", b, "z").unwrap();
        let mol_a = sim.mol(a).unwrap().clone();
        let t = mol_a.mod_site_index("T").unwrap();
        let p = mol_a.mod_value_index(t, "p").unwrap();
        // B docked on A closes A.y, but only once A is phosphorylated
        let omni = sim
            .add_omniplex(OmniSpec {
                pattern: a_b(a, b, false),
                free_sites: vec![SiteSpec::new(0, 1)],
                query: StateQuery::ModIs {
                    mol: 0,
                    mod_site: t,
                    value: p,
                },
                overlay: vec![(SiteSpec::new(0, 1), 1)],
            })
            .unwrap();
        let (family, _) = sim.recognize(&a_b(a, b, true)).unwrap();
        let omni_feature = sim.omniplex_feature(omni).unwrap();
        assert!(
            sim.family(family)
                .unwrap()
                .edges
                .iter()
                .any(|e| e.feature == omni_feature)
        );
        let plain = sim.get_default_member(family).unwrap();
        let phospho = sim
            .get_member(family, vec![MolParam::Small, mol_a.param_from_names(&[("T", "p")]).unwrap()])
            .unwrap();
        // paradigm is B first here, so A is paradigm mol 1
        assert_eq!(sim.species(plain).unwrap().site_state(1, 1).unwrap().shape, 0);
        assert_eq!(sim.species(phospho).unwrap().site_state(1, 1).unwrap().shape, 1);
    }

    #[test]
    fn test_omniplex_requires_free_sites() {
        let (mut sim, a, b) = setup();
        sim.declare_binding(a, "x", b, "z").unwrap();
        let omni = sim
            .add_omniplex(OmniSpec {
                pattern: Plex::single(b),
                free_sites: vec![SiteSpec::new(0, 0)],
                query: StateQuery::Always,
                overlay: vec![],
            })
            .unwrap();
        let feature = sim.omniplex_feature(omni).unwrap();
        let (lone, _) = sim.recognize(&Plex::single(b)).unwrap();
        let (bound, _) = sim.recognize(&a_b(a, b, false)).unwrap();
        let has_edge = |sim: &Simulation, f: FamilyId| {
            sim.family(f)
                .unwrap()
                .edges
                .iter()
                .any(|e| e.feature == feature)
        };
        assert!(has_edge(&sim, lone));
        assert!(!has_edge(&sim, bound));
    }

    #[test]
    fn test_late_omniplex_connects_existing_families() {
        let (mut sim, a, _) = setup();
        let (family, _) = sim.recognize(&Plex::single(a)).unwrap();
        let omni = sim
            .add_omniplex(OmniSpec {
                pattern: Plex::single(a),
                free_sites: vec![],
                query: StateQuery::Always,
                overlay: vec![],
            })
            .unwrap();
        let feature = sim.omniplex_feature(omni).unwrap();
        assert!(
            sim.family(family)
                .unwrap()
                .edges
                .iter()
                .any(|e| e.feature == feature)
        );
    }

    #[test]
    fn test_bad_omniplex_rejected() {
        let (mut sim, a, b) = setup();
        sim.declare_binding(a, "x", b, "z").unwrap();
        // a pattern site cannot be both bound and required free
        let err = sim.add_omniplex(OmniSpec {
            pattern: a_b(a, b, false),
            free_sites: vec![SiteSpec::new(0, 0)],
            query: StateQuery::Always,
            overlay: vec![],
        });
        assert!(matches!(err, Err(SimError::SiteAlreadyBound { .. })));
        let err = sim.add_omniplex(OmniSpec {
            pattern: Plex::single(a),
            free_sites: vec![SiteSpec::new(0, 5)],
            query: StateQuery::Always,
            overlay: vec![],
        });
        assert!(matches!(err, Err(SimError::UnknownSite { .. })));
    }

    #[test]
    fn test_literal_cache_skips_isomorphism_search() {
        let (mut sim, a, b) = setup();
        sim.declare_binding(a, "x", b, "z").unwrap();
        sim.recognize(&Plex::single(a)).unwrap();
        // a different mol multiset lands in its own bucket, no search needed
        sim.recognize(&Plex::single(b)).unwrap();
        assert_eq!(sim.recognizer().search_count(), 0);
        assert_eq!(sim.recognizer().bucket_count(), 2);

        let (family, _) = sim.recognize(&a_b(a, b, false)).unwrap();
        assert_eq!(sim.recognizer().bucket_count(), 3);
        assert_eq!(sim.recognizer().search_count(), 0);
        // the relabeled isomorph is searched for once, then served from the cache
        let (first, iso_first) = sim.recognize(&a_b(a, b, true)).unwrap();
        assert_eq!(sim.recognizer().search_count(), 1);
        let (second, iso_second) = sim.recognize(&a_b(a, b, true)).unwrap();
        assert_eq!(sim.recognizer().search_count(), 1);
        assert_eq!(first, family);
        assert_eq!(second, family);
        assert_eq!(iso_first, iso_second);
        assert_eq!(sim.families().len(), 3);
    }

    #[test]
    fn test_homodimer_members_keyed_canonically() {
        let (mut sim, a, _) = setup();
        sim.declare_binding(a, "x", a, "x").unwrap();
        let mut dimer = Plex::new();
        let a0 = dimer.add_mol(a);
        let a1 = dimer.add_mol(a);
        dimer
            .add_binding(SiteSpec::new(a0, 0), SiteSpec::new(a1, 0))
            .unwrap();
        let (family, _) = sim.recognize(&dimer).unwrap();
        let mol_a = sim.mol(a).unwrap().clone();
        let plain = mol_a.default_param();
        let phospho = mol_a.param_from_names(&[("T", "p")]).unwrap();
        let one = sim
            .get_member(family, vec![phospho.clone(), plain.clone()])
            .unwrap();
        let other = sim
            .get_member(family, vec![plain.clone(), phospho.clone()])
            .unwrap();
        assert_eq!(one, other);
        assert_eq!(sim.counters().species, 1);
        assert_eq!(sim.species(one).unwrap().params, vec![plain, phospho]);
        assert_eq!(
            sim.species(one).unwrap().name,
            "A_A::(A//x -> A//x)::A[none],A[p]"
        );
    }
}
