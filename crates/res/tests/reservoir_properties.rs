use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};
use res::{Activation, Esn, EsnParameters};

fn activation() -> impl Strategy<Value = Activation> {
    prop_oneof![
        Just(Activation::Identity),
        Just(Activation::Tanh),
        Just(Activation::Sigmoid),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn constructed_radius_matches_target(
        size in 3usize..24,
        density in 0.3f64..=1.0,
        spectral_radius in 0.1f64..2.0,
        bias in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let params = EsnParameters::new(size)
            .with_density(density)
            .with_spectral_radius(spectral_radius)
            .with_bias(bias);
        let esn = Esn::with_rng(params, &mut StdRng::seed_from_u64(seed)).unwrap();
        let radius = esn.weights().spectral_radius();
        prop_assert!(((radius - spectral_radius) / spectral_radius).abs() < 1e-6);
        prop_assert_eq!(esn.weights().dim(), params.weight_dim());
        prop_assert_eq!(esn.state().len(), size);
        prop_assert!(esn.state().iter().all(|v| *v == 0.));
    }

    #[test]
    fn stepping_never_changes_dimensions_or_weights(
        size in 1usize..16,
        bias in any::<bool>(),
        activation in activation(),
        norm_rate in proptest::option::of(0.01f64..0.99),
        kick in -3.0f64..3.0,
        steps in 1usize..64,
        seed in any::<u64>(),
    ) {
        let params = EsnParameters::new(size)
            .with_density(1.0)
            .with_bias(bias)
            .with_activation(activation)
            .with_norm_rate(norm_rate);
        let mut esn = Esn::with_rng(params, &mut StdRng::seed_from_u64(seed)).unwrap();
        let weights = esn.weights().clone();
        esn.state_mut()[0] += kick;
        for _ in 0..steps {
            esn.step();
            prop_assert_eq!(esn.state().len(), size);
        }
        esn.reset();
        prop_assert!(esn.state().iter().all(|v| *v == 0.));
        prop_assert_eq!(esn.weights(), &weights);
    }
}
