use envoy_types::pb::envoy::config::listener::v3::Listener;
use proptest::prelude::*;
use xdsctl::xds::listener::{filter_listener, match_filter_chain};
use xdsctl::xds::ListenerCriteria;

use crate::support::{chain, http_filter, listener};

fn build(ports: &[u32]) -> Listener {
    let chains = ports
        .iter()
        .enumerate()
        .map(|(i, port)| chain(&format!("chain-{}", i), "10.0.0.1", *port, vec![http_filter()]))
        .collect();
    listener("virtualInbound", 15006, chains)
}

proptest! {
    #[test]
    fn chain_filter_keeps_matching_chains_in_order(
        ports in prop::collection::vec(8080u32..8084, 0..12),
        wanted in 8080u32..8084,
    ) {
        let original = build(&ports);
        let criteria = ListenerCriteria {
            chain_port: Some(wanted),
            ..Default::default()
        };

        let filtered = filter_listener(&original, &criteria);
        prop_assert!(filtered.is_some());
        let filtered = filtered.unwrap();

        let expected: Vec<String> = original
            .filter_chains
            .iter()
            .filter(|c| match_filter_chain(c, &criteria))
            .map(|c| c.name.clone())
            .collect();
        let kept: Vec<String> = filtered.filter_chains.iter().map(|c| c.name.clone()).collect();

        prop_assert_eq!(kept, expected);
        prop_assert!(filtered.filter_chains.len() <= original.filter_chains.len());
        prop_assert_eq!(filtered.name, original.name);
        prop_assert_eq!(filtered.address, original.address);
    }

    #[test]
    fn listener_criteria_never_admit_a_different_name(
        name in "[a-z]{1,8}",
        other in "[a-z]{1,8}",
    ) {
        prop_assume!(name != other && other != "all");
        let criteria = ListenerCriteria {
            name: Some(other),
            ..Default::default()
        };
        prop_assert!(filter_listener(&listener(&name, 80, vec![]), &criteria).is_none());
    }
}
