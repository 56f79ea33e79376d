//! Property tests for the diff engine.

use std::collections::{BTreeSet, HashSet};

use epp::diff::{diff_members, Member};
use epp::{diff, Domain, NameServer};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "ok",
        "clientHold",
        "clientTransferProhibited",
        "clientUpdateProhibited",
        "clientDeleteProhibited",
    ])
    .prop_map(str::to_string)
}

fn handle_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z]{2}[0-9]{1,2}").expect("Invalid regex")
}

fn nameserver_strategy() -> impl Strategy<Value = NameServer> {
    (
        prop::sample::select(vec![
            "ns1.example.it",
            "NS1.Example.IT",
            "ns2.example.it",
            "dns.other.net",
        ]),
        prop::sample::subsequence(vec!["192.0.2.1", "192.0.2.2"], 0..=2),
        any::<bool>(),
    )
        .prop_map(|(name, ipv4, reversed)| {
            let mut ns = NameServer::new(name);
            let addrs: Vec<_> = if reversed {
                ipv4.into_iter().rev().collect()
            } else {
                ipv4
            };
            for addr in addrs {
                ns = ns.with_ipv4(addr);
            }
            ns
        })
}

fn domain_strategy() -> impl Strategy<Value = Domain> {
    (
        prop::collection::vec(status_strategy(), 0..4),
        prop::option::of(handle_strategy()),
        prop::collection::vec(handle_strategy(), 0..3),
        prop::collection::vec(handle_strategy(), 0..3),
        prop::collection::vec(nameserver_strategy(), 0..4),
    )
        .prop_map(|(statuses, registrant, admin, tech, nameservers)| {
            let mut domain = Domain::new("example.it");
            domain.statuses = statuses;
            domain.registrant = registrant;
            domain.admin_contacts = admin;
            domain.tech_contacts = tech;
            domain.nameservers = nameservers;
            domain
        })
}

fn set(items: &[String]) -> BTreeSet<String> {
    items.iter().cloned().collect()
}

fn keys<M: Member>(items: &[M]) -> HashSet<M::Key> {
    items.iter().map(Member::key).collect()
}

proptest! {
    #[test]
    fn prop_add_and_rem_are_disjoint(
        old in prop::collection::vec(status_strategy(), 0..6),
        new in prop::collection::vec(status_strategy(), 0..6),
    ) {
        let (add, rem) = diff_members(&old, &new);
        prop_assert!(set(&add).is_disjoint(&set(&rem)));
        prop_assert!(set(&add).is_disjoint(&set(&old)));
        prop_assert!(set(&rem).is_subset(&set(&old)));
    }

    #[test]
    fn prop_applying_changes_reaches_new(
        old in prop::collection::vec(handle_strategy(), 0..6),
        new in prop::collection::vec(handle_strategy(), 0..6),
    ) {
        let (add, rem) = diff_members(&old, &new);
        let mut applied = set(&old);
        for item in &rem {
            applied.remove(item);
        }
        applied.extend(add.iter().cloned());
        prop_assert_eq!(applied, set(&new));
    }

    #[test]
    fn prop_applying_nameserver_changes_reaches_new(
        old in prop::collection::vec(nameserver_strategy(), 0..5),
        new in prop::collection::vec(nameserver_strategy(), 0..5),
    ) {
        let mut old_domain = Domain::new("example.it");
        old_domain.nameservers = old;
        let mut new_domain = Domain::new("example.it");
        new_domain.nameservers = new;

        let changes = diff(&old_domain, &new_domain);
        let add = changes.add_clause().map(|m| m.nameservers.clone()).unwrap_or_default();
        let rem = changes.rem_clause().map(|m| m.nameservers.clone()).unwrap_or_default();

        prop_assert!(keys(&add).is_disjoint(&keys(&rem)));
        let mut applied = keys(&old_domain.nameservers);
        for ns in &rem {
            prop_assert!(applied.remove(&ns.key()));
        }
        applied.extend(keys(&add));
        prop_assert_eq!(applied, keys(&new_domain.nameservers));
    }

    #[test]
    fn prop_self_diff_is_empty(domain in domain_strategy()) {
        prop_assert!(diff(&domain, &domain).is_empty());
    }

    #[test]
    fn prop_scalar_change_only_when_different(old in domain_strategy(), new in domain_strategy()) {
        let changes = diff(&old, &new);
        prop_assert_eq!(changes.chg.registrant.is_some(), old.registrant != new.registrant);
        prop_assert!(changes.chg.auth_info_pw.is_none());
    }
}
